use std::path::{Path, PathBuf};

use kd_core::Settings;

use crate::catalog::{load_language_catalogs, LabelCatalog};
use crate::fonts::load_font_names;

/// Bundled default skin whose fonts every skin may use without defining them.
pub const DEFAULT_SKIN: &str = "skin.estuary";

/// Read-only data of the installed host application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostApp {
    pub catalogs: Vec<LabelCatalog>,
    pub default_fonts: Vec<String>,
}

impl HostApp {
    pub fn load(settings: &Settings) -> Self {
        let mut catalogs = Vec::new();
        if let Some(userdata) = settings.resolve_userdata_folder() {
            catalogs = load_language_catalogs(&userdata.join("addons"), &settings.language_folders);
        }
        if catalogs.is_empty() {
            if let Some(kodi_path) = &settings.kodi_path {
                catalogs =
                    load_language_catalogs(&kodi_path.join("addons"), &settings.language_folders);
            }
        }

        let default_fonts = match &settings.kodi_path {
            Some(kodi_path) => load_font_names(&default_skin_font_file(kodi_path)),
            None => {
                log::info!("kodi_path not configured, default skin fonts unavailable");
                Vec::new()
            }
        };

        log::info!(
            "host data: {} catalogs, {} default fonts",
            catalogs.len(),
            default_fonts.len()
        );
        Self {
            catalogs,
            default_fonts,
        }
    }
}

pub fn default_skin_font_file(kodi_path: &Path) -> PathBuf {
    kodi_path
        .join("addons")
        .join(DEFAULT_SKIN)
        .join("1080i")
        .join("Font.xml")
}

#[cfg(test)]
mod host_tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_catalogs_and_default_fonts_from_install() {
        let kodi = std::env::temp_dir().join(format!(
            "kd-host-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or(0)
        ));
        let language = kodi
            .join("addons")
            .join("resource.language.en_gb")
            .join("resources");
        fs::create_dir_all(&language).expect("language dir");
        fs::write(
            language.join("strings.po"),
            "msgid \"\"\nmsgstr \"\"\n\nmsgctxt \"#0\"\nmsgid \"Programs\"\nmsgstr \"\"\n",
        )
        .expect("write");
        let font_file = default_skin_font_file(&kodi);
        fs::create_dir_all(font_file.parent().expect("parent")).expect("font dir");
        fs::write(
            &font_file,
            "<fonts><fontset id=\"Default\"><font><name>font13</name></font></fontset></fonts>",
        )
        .expect("write");

        let settings = Settings {
            kodi_path: Some(kodi.clone()),
            userdata_folder: Some(kodi.join("no-userdata")),
            ..Settings::default()
        };
        let host = HostApp::load(&settings);
        assert_eq!(host.catalogs.len(), 1);
        assert_eq!(host.catalogs[0].label_folder(), "en_gb");
        assert_eq!(host.default_fonts, vec!["font13".to_string()]);
        let _ = fs::remove_dir_all(&kodi);
    }

    #[test]
    fn missing_install_yields_empty_data() {
        let settings = Settings {
            kodi_path: Some(PathBuf::from("/definitely/not/kodi")),
            userdata_folder: Some(PathBuf::from("/definitely/not/userdata")),
            ..Settings::default()
        };
        assert_eq!(HostApp::load(&settings), HostApp::default());
    }
}
