use std::path::{Path, PathBuf};

use kd_parser::{parse_xml_file, XmlElementNode};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontEntry {
    pub name: String,
    pub size: Option<String>,
    pub filename: Option<String>,
    pub line: usize,
    pub content: String,
    pub file: PathBuf,
}

/// A `<font>` usage inside a window file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontReference {
    pub name: String,
    pub file: PathBuf,
    pub line: usize,
}

/// Reads the fonts of the `Default` fontset (or the first fontset when no
/// set carries that id).
pub fn load_fonts(font_file: &Path) -> Vec<FontEntry> {
    let Some(document) = parse_xml_file(font_file) else {
        return Vec::new();
    };
    let fontsets: Vec<&XmlElementNode> = document.root.find_children("fontset").collect();
    let chosen = fontsets
        .iter()
        .find(|set| {
            set.attr("id")
                .map(|id| id.eq_ignore_ascii_case("default"))
                .unwrap_or(false)
        })
        .or_else(|| fontsets.first());
    let Some(fontset) = chosen else {
        log::info!("no fontset in {}", font_file.display());
        return Vec::new();
    };

    fontset
        .find_children("font")
        .filter_map(|font| {
            let name = child_text(font, "name")?;
            Some(FontEntry {
                name,
                size: child_text(font, "size"),
                filename: child_text(font, "filename"),
                line: font.line(),
                content: font.to_xml_string(),
                file: font_file.to_path_buf(),
            })
        })
        .collect()
}

/// Names of the fonts in the first fontset; used for the bundled default skin.
pub fn load_font_names(font_file: &Path) -> Vec<String> {
    let Some(document) = parse_xml_file(font_file) else {
        return Vec::new();
    };
    document
        .root
        .find_child("fontset")
        .map(|fontset| {
            fontset
                .find_children("font")
                .filter_map(|font| child_text(font, "name"))
                .collect()
        })
        .unwrap_or_default()
}

pub fn collect_font_refs(window_files: &[PathBuf]) -> Vec<FontReference> {
    let mut refs = Vec::new();
    for path in window_files {
        let Some(document) = parse_xml_file(path) else {
            continue;
        };
        for node in document.root.descendants_named(&["font"]) {
            if node.has_element_children() {
                continue;
            }
            let name = node.text().unwrap_or_default().trim();
            if name.is_empty() {
                continue;
            }
            refs.push(FontReference {
                name: name.to_string(),
                file: path.clone(),
                line: node.line(),
            });
        }
    }
    refs
}

fn child_text(node: &XmlElementNode, tag: &str) -> Option<String> {
    node.find_child(tag)
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
}
