use kd_core::KdError;
use kd_parser::{parse_xml_document, XmlElementNode};
use serde::{Deserialize, Serialize};

const BUILTIN_DATA: &str = include_str!("../data/data.xml");
const BUILTIN_WINDOWS: &str = include_str!("../data/windows.json");
/// Window ids may be written relative to this base.
pub const WINDOW_ID_BASE: u32 = 10000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelpEntry {
    pub code: String,
    pub help: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub name: String,
    pub id: u32,
    pub filename: String,
}

impl WindowInfo {
    pub fn short_id(&self) -> u32 {
        self.id.saturating_sub(WINDOW_ID_BASE)
    }
}

/// Static knowledge about the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceData {
    pub builtins: Vec<HelpEntry>,
    pub conditions: Vec<HelpEntry>,
    pub windows: Vec<WindowInfo>,
}

impl ReferenceData {
    pub fn builtin() -> Result<Self, KdError> {
        Self::from_sources(BUILTIN_DATA, BUILTIN_WINDOWS)
    }

    pub fn from_sources(data_xml: &str, windows_json: &str) -> Result<Self, KdError> {
        let document = parse_xml_document(data_xml).map_err(|error| KdError {
            code: "REFERENCE_INVALID".to_string(),
            ..error
        })?;
        let windows = serde_json::from_str(windows_json)
            .map_err(|error| KdError::new("REFERENCE_INVALID", error.to_string()))?;
        Ok(Self {
            builtins: help_group(&document.root, "builtins"),
            conditions: help_group(&document.root, "conditions"),
            windows,
        })
    }

    /// Matches `10000` as well as the short form `0`.
    pub fn window_by_id(&self, id: u32) -> Option<&WindowInfo> {
        self.windows
            .iter()
            .find(|window| window.id == id || window.short_id() == id)
    }

    pub fn window_by_name(&self, name: &str) -> Option<&WindowInfo> {
        self.windows
            .iter()
            .find(|window| window.name.eq_ignore_ascii_case(name))
    }

    /// Help text for a builtin or condition whose code starts with `keyword`.
    pub fn help_for(&self, keyword: &str) -> Option<&HelpEntry> {
        let keyword = keyword.to_lowercase();
        self.conditions
            .iter()
            .chain(self.builtins.iter())
            .find(|entry| {
                let code = entry.code.to_lowercase();
                let bare = code.split('(').next().unwrap_or_default();
                bare == keyword || code == keyword
            })
    }
}

fn help_group(root: &XmlElementNode, group: &str) -> Vec<HelpEntry> {
    root.find_child(group)
        .map(|node| {
            node.element_children()
                .filter_map(|item| {
                    let code = item.find_child("code")?.text()?.trim().to_string();
                    let help = item
                        .find_child("help")
                        .and_then(|help| help.text())
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    Some(HelpEntry { code, help })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod reference_tests {
    use super::*;

    #[test]
    fn builtin_tables_load() {
        let data = ReferenceData::builtin().expect("reference data");
        assert!(!data.builtins.is_empty());
        assert!(!data.conditions.is_empty());
        let home = data.window_by_id(10000).expect("home");
        assert_eq!(home.name, "home");
        assert_eq!(home.filename, "Home.xml");
        assert_eq!(data.window_by_id(0).map(|window| window.name.as_str()), Some("home"));
        assert_eq!(
            data.window_by_name("VideoOSD").map(|window| window.id),
            Some(12901)
        );
        assert!(data.window_by_id(4242).is_none());
    }

    #[test]
    fn help_lookup_ignores_arguments_and_case() {
        let data = ReferenceData::builtin().expect("reference data");
        let help = data.help_for("player.hasvideo").expect("condition help");
        assert_eq!(help.code, "Player.HasVideo");
        assert!(data.help_for("Skin.SetBool").is_some());
        assert!(data.help_for("Nope.Nothing").is_none());
    }

    #[test]
    fn malformed_window_table_is_reported() {
        let error = ReferenceData::from_sources("<data/>", "{").expect_err("bad json");
        assert_eq!(error.code, "REFERENCE_INVALID");
    }
}
