use std::path::{Path, PathBuf};

use kd_parser::parse_xml_file;
use serde::Serialize;

use crate::paths::{file_name_of, list_xml_files};

pub const DEFAULT_COLORS_FILE: &str = "defaults.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorEntry {
    pub name: String,
    pub line: usize,
    /// `AARRGGBB` hex value as written in the file.
    pub content: String,
    pub file: PathBuf,
}

impl ColorEntry {
    pub fn is_default(&self) -> bool {
        file_name_of(&self.file).eq_ignore_ascii_case(DEFAULT_COLORS_FILE)
    }
}

/// Color definitions of every file in the colors folder, `defaults.xml`
/// first and the theme files after it in name order.
pub fn load_colors(colors_folder: &Path) -> Vec<ColorEntry> {
    let mut files = list_xml_files(colors_folder);
    files.sort_by_key(|path| {
        let name = file_name_of(path);
        (!name.eq_ignore_ascii_case(DEFAULT_COLORS_FILE), name)
    });

    let mut colors = Vec::new();
    for path in files {
        let Some(document) = parse_xml_file(&path) else {
            continue;
        };
        for node in document.root.descendants_named(&["color"]) {
            let Some(name) = node.attr("name") else {
                continue;
            };
            colors.push(ColorEntry {
                name: name.to_string(),
                line: node.line(),
                content: node.text().unwrap_or_default().trim().to_string(),
                file: path.clone(),
            });
        }
    }
    colors
}

/// Later definitions shadow earlier ones, so theme files override defaults.
pub fn find_color<'a>(colors: &'a [ColorEntry], name: &str) -> Option<&'a ColorEntry> {
    colors.iter().rev().find(|color| color.name == name)
}
