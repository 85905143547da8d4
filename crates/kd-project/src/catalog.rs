use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use kd_core::KdError;
use kd_parser::{parse_po_file, write_po_document, PoDocument, PoEntry};

/// Field a catalog lookup matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKey {
    Msgctxt,
    Msgid,
}

pub fn label_key(id: u32) -> String {
    format!("#{}", id)
}

/// Numeric id of a `#NNNNN` context key.
pub fn label_id(msgctxt: &str) -> Option<u32> {
    msgctxt.strip_prefix('#')?.parse().ok()
}

/// One `strings.po` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    path: PathBuf,
    document: PoDocument,
}

impl LabelCatalog {
    pub fn load(path: &Path) -> Option<Self> {
        if !path.is_file() {
            log::info!("no catalog at {}", path.display());
            return None;
        }
        match parse_po_file(path) {
            Ok(document) => Some(Self {
                path: path.to_path_buf(),
                document,
            }),
            Err(error) => {
                log::warn!("{}", error);
                None
            }
        }
    }

    /// Empty catalog with a fresh header; nothing is written until `save`.
    pub fn create(path: &Path, project_id: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            document: PoDocument::with_header(project_id),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &PoDocument {
        &self.document
    }

    pub fn entries(&self) -> &[PoEntry] {
        &self.document.entries
    }

    pub fn find(&self, key: &str, by: CatalogKey) -> Option<&PoEntry> {
        self.document.entries.iter().find(|entry| match by {
            CatalogKey::Msgctxt => entry.msgctxt.as_deref() == Some(key),
            CatalogKey::Msgid => entry.msgid == key,
        })
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.document
            .entries
            .iter()
            .filter_map(|entry| entry.msgctxt.as_deref().and_then(label_id))
            .collect()
    }

    /// Inserts at `index`, clamped to the entry count.
    pub fn insert(&mut self, index: usize, entry: PoEntry) -> usize {
        let index = index.min(self.document.entries.len());
        self.document.entries.insert(index, entry);
        index
    }

    pub fn save(&mut self) -> Result<(), KdError> {
        self.document.touch_revision_date();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|error| KdError::io(error, parent))?;
        }
        fs::write(&self.path, write_po_document(&self.document)).map_err(|error| {
            KdError::with_path(
                "PO_WRITE_ERROR",
                format!("Failed to write {}: {}", self.path.display(), error),
                &self.path,
            )
        })
    }

    /// Display name of the language folder holding this catalog.
    pub fn label_folder(&self) -> String {
        let mut parents = self.path.ancestors().skip(1);
        let parent = parents.next().map(folder_name).unwrap_or_default();
        if parent != "resources" {
            return parent;
        }
        let grandparent = parents.next().map(folder_name).unwrap_or_default();
        grandparent
            .strip_prefix("resource.language.")
            .map(str::to_string)
            .unwrap_or(grandparent)
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Read-only concatenation of host built-ins and project catalogs.
#[derive(Debug, Clone, Copy)]
pub struct LabelCatalogs<'a> {
    host: &'a [LabelCatalog],
    project: &'a [LabelCatalog],
}

impl<'a> LabelCatalogs<'a> {
    pub fn new(host: &'a [LabelCatalog], project: &'a [LabelCatalog]) -> Self {
        Self { host, project }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a LabelCatalog> {
        self.host.iter().chain(self.project.iter())
    }

    /// True when any catalog defines `#<key>`.
    pub fn contains_key(&self, key: &str) -> bool {
        let wanted = format!("#{}", key);
        self.iter()
            .any(|catalog| catalog.find(&wanted, CatalogKey::Msgctxt).is_some())
    }

    pub fn find_all(&self, id: u32) -> Vec<(&'a LabelCatalog, &'a PoEntry)> {
        let wanted = label_key(id);
        self.iter()
            .filter_map(|catalog| {
                catalog
                    .find(&wanted, CatalogKey::Msgctxt)
                    .map(|entry| (catalog, entry))
            })
            .collect()
    }

    pub fn ids(&self) -> BTreeSet<u32> {
        self.iter().flat_map(|catalog| catalog.ids()).collect()
    }
}

/// Lowest id in `[start, start + 1000)` not used by `taken`.
pub fn next_free_label_id(taken: &BTreeSet<u32>, start: u32) -> Option<u32> {
    (start..start + 1000).find(|id| !taken.contains(id))
}

/// Catalogs of the configured languages below `language_root`, in
/// configuration order. Both `<lang>/strings.po` and
/// `<lang>/resources/strings.po` layouts are accepted.
pub fn load_language_catalogs(
    language_root: &Path,
    language_folders: &[String],
) -> Vec<LabelCatalog> {
    language_folders
        .iter()
        .filter_map(|language| {
            let folder = language_root.join(language);
            [
                folder.join("strings.po"),
                folder.join("resources").join("strings.po"),
            ]
            .into_iter()
            .find(|path| path.is_file())
        })
        .filter_map(|path| LabelCatalog::load(&path))
        .collect()
}

#[cfg(test)]
mod catalog_tests {
    use super::*;
    use kd_parser::PoOccurrence;

    fn temp_catalog(label: &str, folder: &str, contents: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "kd-catalog-{}-{}-{}",
            label,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or(0)
        ));
        let dir = root.join(folder);
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("strings.po");
        fs::write(&path, contents).expect("write");
        path
    }

    const CATALOG: &str = r##"# Skin language file
msgid ""
msgstr ""
"Project-Id-Version: skin.test\n"
"Content-Type: text/plain; charset=utf-8\n"

msgctxt "#31000"
msgid "Home"
msgstr ""

#: /1080i/Home.xml:12
msgctxt "#31001"
msgid "Settings"
msgstr "Einstellungen"
"##;

    #[test]
    fn find_by_context_and_id() {
        let path = temp_catalog("find", "resource.language.en_gb", CATALOG);
        let catalog = LabelCatalog::load(&path).expect("catalog");
        assert_eq!(catalog.entries().len(), 2);
        let settings = catalog.find("#31001", CatalogKey::Msgctxt).expect("entry");
        assert_eq!(settings.msgstr, "Einstellungen");
        assert!(catalog.find("Home", CatalogKey::Msgid).is_some());
        assert!(catalog.find("#31002", CatalogKey::Msgctxt).is_none());
        assert_eq!(catalog.ids().into_iter().collect::<Vec<_>>(), vec![31000, 31001]);
        assert_eq!(catalog.label_folder(), "resource.language.en_gb");
    }

    #[test]
    fn resources_folder_uses_language_name() {
        let path = temp_catalog("folder", "resource.language.de_de/resources", CATALOG);
        let catalog = LabelCatalog::load(&path).expect("catalog");
        assert_eq!(catalog.label_folder(), "de_de");
    }

    #[test]
    fn saved_catalog_keeps_entries_and_metadata() {
        let path = temp_catalog("save", "English", CATALOG);
        let mut catalog = LabelCatalog::load(&path).expect("catalog");
        let index = catalog.insert(
            99,
            PoEntry {
                msgctxt: Some(label_key(31002)),
                msgid: "Weather".to_string(),
                occurrences: vec![PoOccurrence {
                    path: "/1080i/MyWeather.xml".to_string(),
                    line: None,
                }],
                ..PoEntry::default()
            },
        );
        assert_eq!(index, 2);
        catalog.save().expect("save");

        let reloaded = LabelCatalog::load(&path).expect("reload");
        assert_eq!(reloaded.entries().len(), 3);
        let weather = reloaded.find("#31002", CatalogKey::Msgctxt).expect("new entry");
        assert_eq!(weather.occurrences[0].path, "/1080i/MyWeather.xml");
        assert_eq!(
            reloaded.document().metadata_value("Project-Id-Version"),
            Some("skin.test")
        );
        assert!(reloaded
            .document()
            .metadata_value("PO-Revision-Date")
            .is_some());
    }

    #[test]
    fn merged_view_spans_host_and_project() {
        let host = vec![LabelCatalog::load(&temp_catalog("host", "English", CATALOG)).expect("host")];
        let project = vec![LabelCatalog::create(Path::new("/nowhere/strings.po"), "skin.x")];
        let merged = LabelCatalogs::new(&host, &project);
        assert!(merged.contains_key("31000"));
        assert!(!merged.contains_key("31005"));
        assert_eq!(merged.find_all(31001).len(), 1);
        assert_eq!(merged.iter().count(), 2);
    }

    #[test]
    fn allocation_picks_lowest_gap() {
        let taken: BTreeSet<u32> = [32000, 32001, 32003].into_iter().collect();
        assert_eq!(next_free_label_id(&taken, 32000), Some(32002));
        let full: BTreeSet<u32> = (31000..32000).collect();
        assert_eq!(next_free_label_id(&full, 31000), None);
        assert_eq!(label_id("#31050"), Some(31050));
        assert_eq!(label_id("31050"), None);
    }

    #[test]
    fn broken_catalog_loads_as_none() {
        let path = temp_catalog("broken", "English", "msgid \"unterminated\nmsgstr");
        assert!(LabelCatalog::load(&path).is_none());
    }
}
