use std::path::{Path, PathBuf};

use walkdir::WalkDir;

pub const FONT_FILE: &str = "Font.xml";
pub const INCLUDES_FILE: &str = "Includes.xml";
/// Generated by the skin shortcuts script at runtime; never part of the sources.
pub const SHORTCUTS_INCLUDES_FILE: &str = "script-skinshortcuts-includes.xml";

pub(crate) fn is_xml_file(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// XML files directly inside `folder`, sorted by file name.
pub(crate) fn list_xml_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_xml_file(entry.path()) => {
                files.push(entry.into_path());
            }
            Ok(_) => {}
            Err(error) => log::info!("skipping entry in {}: {}", folder.display(), error),
        }
    }
    files
}

/// File names of the window files of one XML folder.
pub(crate) fn list_window_files(folder: &Path) -> Vec<String> {
    list_xml_files(folder)
        .iter()
        .map(|path| file_name_of(path))
        .filter(|name| {
            !name.eq_ignore_ascii_case(FONT_FILE)
                && !name.eq_ignore_ascii_case(SHORTCUTS_INCLUDES_FILE)
        })
        .collect()
}

/// Stems of the regular files directly inside `folder`, sorted.
pub(crate) fn list_file_stems(folder: &Path) -> Vec<String> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
        })
        .collect()
}

/// Locates `name` inside `folder` ignoring ASCII case.
pub(crate) fn find_file_ignore_case(folder: &Path, name: &str) -> Option<PathBuf> {
    let exact = folder.join(name);
    if exact.is_file() {
        return Some(exact);
    }
    list_xml_files(folder)
        .into_iter()
        .find(|path| file_name_of(path).eq_ignore_ascii_case(name))
}
