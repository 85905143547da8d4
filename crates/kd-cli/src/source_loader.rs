use std::fs;
use std::path::{Path, PathBuf};

use kd_core::{KdError, Settings};
use kd_project::MANIFEST_FILE;

use crate::{map_cli_source_path, map_cli_source_read, GlobalArgs};

/// Settings file (if any) with the command-line overrides applied on top.
pub(crate) fn load_settings(global: &GlobalArgs) -> Result<Settings, KdError> {
    let mut settings = match &global.settings {
        Some(path) => Settings::from_file(resolve_input_path(path)?)?,
        None => Settings::default(),
    };
    if let Some(kodi_path) = &global.kodi_path {
        settings.kodi_path = Some(kodi_path.clone());
    }
    if let Some(userdata) = &global.userdata_folder {
        settings.userdata_folder = Some(userdata.clone());
    }
    if !global.language_folders.is_empty() {
        settings.language_folders = global.language_folders.clone();
    }
    if global.portable {
        settings.portable_mode = true;
    }
    Ok(settings)
}

pub(crate) fn resolve_input_path(path: &Path) -> Result<PathBuf, KdError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(KdError::with_path(
            "CLI_SOURCE_NOT_FOUND",
            format!("path does not exist: {}", absolute.display()),
            &absolute,
        ));
    }
    Ok(absolute)
}

pub(crate) fn resolve_project_dir(path: &Path) -> Result<PathBuf, KdError> {
    let absolute = resolve_input_path(path)?;
    if !absolute.is_dir() {
        return Err(KdError::with_path(
            "CLI_SOURCE_NOT_DIR",
            format!("project is not a directory: {}", absolute.display()),
            &absolute,
        ));
    }
    Ok(absolute)
}

/// Nearest ancestor of `file` holding an add-on manifest.
pub(crate) fn find_project_root(file: &Path) -> Result<PathBuf, KdError> {
    file.ancestors()
        .skip(1)
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            KdError::with_path(
                "NOT_A_PROJECT",
                format!("no {} above {}", MANIFEST_FILE, file.display()),
                file,
            )
        })
}

pub(crate) fn read_source(path: &Path) -> Result<String, KdError> {
    fs::read_to_string(path).map_err(map_cli_source_read)
}
