use std::path::Path;

use kd_core::KdError;
use kd_parser::{read_xml_file, XmlElementNode};
use serde::Serialize;

pub const MANIFEST_FILE: &str = "addon.xml";
/// An import of this add-on turns a project into a scripting extension.
pub const PYTHON_API_ADDON: &str = "xbmc.python";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddonImport {
    pub addon: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub id: String,
    pub version: Option<String>,
    pub name: Option<String>,
    /// `<res folder=...>` declarations in manifest order, deduplicated.
    pub res_folders: Vec<String>,
    pub imports: Vec<AddonImport>,
}

impl Manifest {
    pub fn load(project_root: &Path) -> Result<Self, KdError> {
        let path = project_root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(KdError::with_path(
                "NOT_A_PROJECT",
                format!("No {} found in {}", MANIFEST_FILE, project_root.display()),
                project_root,
            ));
        }
        let document = read_xml_file(&path)
            .map_err(|error| KdError::with_path("MANIFEST_INVALID", error.message, &path))?;
        Self::from_root(&document.root).map_err(|error| KdError {
            path: Some(path.clone()),
            ..error
        })
    }

    pub fn from_root(root: &XmlElementNode) -> Result<Self, KdError> {
        let Some(id) = root.attr("id").filter(|id| !id.trim().is_empty()) else {
            return Err(KdError::new(
                "MANIFEST_INVALID",
                format!("<{}> is missing the required id attribute", root.name),
            ));
        };

        let mut res_folders: Vec<String> = Vec::new();
        for res in root.descendants_named(&["res"]) {
            if let Some(folder) = res.attr("folder") {
                if !res_folders.iter().any(|known| known == folder) {
                    res_folders.push(folder.to_string());
                }
            }
        }

        let imports = root
            .descendants_named(&["import"])
            .into_iter()
            .filter_map(|node| {
                node.attr("addon").map(|addon| AddonImport {
                    addon: addon.to_string(),
                    version: node.attr("version").map(str::to_string),
                })
            })
            .collect();

        Ok(Self {
            id: id.to_string(),
            version: root.attr("version").map(str::to_string),
            name: root.attr("name").map(str::to_string),
            res_folders,
            imports,
        })
    }

    pub fn depends_on(&self, addon: &str) -> bool {
        self.imports.iter().any(|import| import.addon == addon)
    }
}

#[cfg(test)]
mod manifest_tests {
    use super::*;
    use kd_parser::parse_xml_document;

    fn manifest(xml: &str) -> Result<Manifest, KdError> {
        let document = parse_xml_document(xml).expect("manifest xml should parse");
        Manifest::from_root(&document.root)
    }

    #[test]
    fn skin_manifest_collects_res_folders_once() {
        let parsed = manifest(
            r#"<addon id="skin.test" version="1.0.0" name="Test">
  <requires><import addon="xbmc.gui" version="5.15.0"/></requires>
  <extension point="xbmc.gui.skin">
    <res width="1920" height="1080" folder="1080i" default="true"/>
    <res width="1920" height="1440" folder="1080i"/>
    <res width="1280" height="720" folder="720p"/>
  </extension>
</addon>"#,
        )
        .expect("manifest");
        assert_eq!(parsed.id, "skin.test");
        assert_eq!(parsed.version.as_deref(), Some("1.0.0"));
        assert_eq!(parsed.res_folders, vec!["1080i", "720p"]);
        assert_eq!(parsed.imports.len(), 1);
        assert!(!parsed.depends_on(PYTHON_API_ADDON));
    }

    #[test]
    fn python_import_is_detected() {
        let parsed = manifest(
            r#"<addon id="script.test"><requires><import addon="xbmc.python" version="3.0.0"/></requires></addon>"#,
        )
        .expect("manifest");
        assert!(parsed.depends_on(PYTHON_API_ADDON));
        assert_eq!(parsed.imports[0].version.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn missing_id_is_rejected() {
        let error = manifest("<addon name=\"x\"/>").expect_err("id is required");
        assert_eq!(error.code, "MANIFEST_INVALID");
    }

    #[test]
    fn missing_manifest_is_not_a_project() {
        let dir = std::env::temp_dir().join(format!("kd-manifest-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let error = Manifest::load(&dir).expect_err("no addon.xml");
        assert_eq!(error.code, "NOT_A_PROJECT");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
