use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::KdError;

pub const DEFAULT_LANGUAGE_FOLDERS: [&str; 2] = ["resource.language.en_gb", "English"];

/// Host-application settings threaded explicitly through every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub kodi_path: Option<PathBuf>,
    pub userdata_folder: Option<PathBuf>,
    pub language_folders: Vec<String>,
    pub portable_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            kodi_path: None,
            userdata_folder: None,
            language_folders: DEFAULT_LANGUAGE_FOLDERS
                .iter()
                .map(|folder| folder.to_string())
                .collect(),
            portable_mode: false,
        }
    }
}

impl Settings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KdError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|error| {
            KdError::with_path(
                "SETTINGS_READ",
                format!("Failed to read settings {}: {}", path.display(), error),
                path,
            )
        })?;
        Self::from_json(&raw).map_err(|error| KdError {
            path: Some(path.to_path_buf()),
            ..error
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, KdError> {
        serde_json::from_str(raw)
            .map_err(|error| KdError::new("SETTINGS_INVALID", error.to_string()))
    }

    /// The first configured language folder; new labels are written there.
    pub fn primary_language_folder(&self) -> &str {
        self.language_folders
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_LANGUAGE_FOLDERS[0])
    }

    /// Per-user data folder of the host application.
    pub fn resolve_userdata_folder(&self) -> Option<PathBuf> {
        if let Some(folder) = &self.userdata_folder {
            return Some(folder.clone());
        }
        if self.portable_mode {
            return self
                .kodi_path
                .as_ref()
                .map(|path| path.join("portable_data"));
        }
        if cfg!(target_os = "windows") {
            return std::env::var_os("APPDATA").map(|base| PathBuf::from(base).join("kodi"));
        }
        let home = std::env::var_os("HOME").map(PathBuf::from)?;
        if cfg!(target_os = "macos") {
            Some(
                home.join("Library")
                    .join("Application Support")
                    .join("Kodi")
                    .join("userdata"),
            )
        } else {
            Some(home.join(".kodi"))
        }
    }
}
