use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use kd_core::{FileLocation, KdError, Settings};
use kd_parser::{parse_xml_document, PoEntry, PoOccurrence, XmlElementNode, XmlNode};
use serde::Serialize;

use crate::catalog::{
    label_key, load_language_catalogs, next_free_label_id, CatalogKey, LabelCatalog,
    LabelCatalogs,
};
use crate::colors::{find_color, load_colors, ColorEntry};
use crate::fonts::{collect_font_refs, load_fonts, FontEntry, FontReference};
use crate::includes::{IncludeEntry, IncludeKind, IncludeTable};
use crate::manifest::{Manifest, PYTHON_API_ADDON};
use crate::paths::{
    file_name_of, find_file_ignore_case, is_xml_file, list_file_stems, list_window_files,
    FONT_FILE,
};
use crate::reference::ReferenceData;

const SKIN_PATH_PREFIX: &str = "special://skin/";
const EXTENSION_XML_FOLDERS: [&str; 2] = [
    "resources/skins/Default/720p",
    "resources/skins/Default/1080i",
];
const MAX_INCLUDE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Skin,
    Extension,
}

impl ProjectKind {
    /// First id of the project-private label range.
    pub fn lang_start_id(self) -> u32 {
        match self {
            Self::Skin => 31000,
            Self::Extension => 32000,
        }
    }

    /// Entries preceding the first private label in a catalog.
    pub fn lang_offset(self) -> usize {
        match self {
            Self::Skin => 0,
            Self::Extension => 2,
        }
    }
}

/// A definition found by name; fonts take precedence over includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    Font(&'a FontEntry),
    Include(&'a IncludeEntry),
}

impl NodeRef<'_> {
    pub fn content(&self) -> &str {
        match self {
            Self::Font(font) => &font.content,
            Self::Include(include) => &include.content,
        }
    }
}

/// Which table a `reload` refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReloadOutcome {
    Includes(String),
    Fonts(String),
    Colors,
    Labels,
    WindowFiles,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    manifest: Manifest,
    kind: ProjectKind,
    language_folders: Vec<String>,
    xml_folders: Vec<String>,
    window_files: BTreeMap<String, Vec<String>>,
    includes: BTreeMap<String, IncludeTable>,
    fonts: BTreeMap<String, Vec<FontEntry>>,
    colors: Vec<ColorEntry>,
    catalogs: Vec<LabelCatalog>,
}

impl Project {
    pub fn open(path: &Path, settings: &Settings) -> Result<Self, KdError> {
        let manifest = Manifest::load(path)?;
        let kind = if manifest.depends_on(PYTHON_API_ADDON) {
            ProjectKind::Extension
        } else {
            ProjectKind::Skin
        };
        let xml_folders = match kind {
            ProjectKind::Skin => manifest.res_folders.clone(),
            ProjectKind::Extension => EXTENSION_XML_FOLDERS
                .iter()
                .find(|folder| path.join(folder).is_dir())
                .map(|folder| vec![folder.to_string()])
                .unwrap_or_default(),
        };
        log::info!(
            "Kodi project detected: {} ({:?}, folders: {:?})",
            path.display(),
            kind,
            xml_folders
        );

        let mut project = Self {
            root: path.to_path_buf(),
            manifest,
            kind,
            language_folders: settings.language_folders.clone(),
            xml_folders,
            window_files: BTreeMap::new(),
            includes: BTreeMap::new(),
            fonts: BTreeMap::new(),
            colors: Vec::new(),
            catalogs: Vec::new(),
        };
        project.update_xml_files();
        for folder in project.xml_folders.clone() {
            project.update_includes(&folder);
            project.update_fonts(&folder);
        }
        project.update_colors();
        project.update_labels();
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn xml_folders(&self) -> &[String] {
        &self.xml_folders
    }

    pub fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join(folder)
    }

    /// The XML folder directly containing `path`, if any.
    pub fn folder_for_file(&self, path: &Path) -> Option<&str> {
        let parent = path.parent()?;
        self.xml_folders
            .iter()
            .find(|folder| self.folder_path(folder) == parent)
            .map(String::as_str)
    }

    pub fn media_path(&self) -> PathBuf {
        match self.kind {
            ProjectKind::Skin => self.root.join("media"),
            ProjectKind::Extension => self.root.join("resources/skins/Default/media"),
        }
    }

    pub fn language_path(&self) -> PathBuf {
        match self.kind {
            ProjectKind::Skin => self.root.join("language"),
            ProjectKind::Extension => self.root.join("resources").join("language"),
        }
    }

    pub fn colors_path(&self) -> Option<PathBuf> {
        match self.kind {
            ProjectKind::Skin => Some(self.root.join("colors")),
            ProjectKind::Extension => None,
        }
    }

    pub fn themes_path(&self) -> Option<PathBuf> {
        match self.kind {
            ProjectKind::Skin => Some(self.root.join("themes")),
            ProjectKind::Extension => None,
        }
    }

    pub fn primary_language_folder(&self) -> &str {
        self.language_folders
            .first()
            .map(String::as_str)
            .unwrap_or(kd_core::DEFAULT_LANGUAGE_FOLDERS[0])
    }

    pub fn window_files(&self, folder: &str) -> &[String] {
        self.window_files
            .get(folder)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn window_file_paths(&self, folder: &str) -> Vec<PathBuf> {
        let base = self.folder_path(folder);
        self.window_files(folder)
            .iter()
            .map(|name| base.join(name))
            .collect()
    }

    /// Window files of every XML folder.
    pub fn all_window_file_paths(&self) -> Vec<PathBuf> {
        self.xml_folders
            .iter()
            .flat_map(|folder| self.window_file_paths(folder))
            .collect()
    }

    pub fn include_table(&self, folder: &str) -> Option<&IncludeTable> {
        self.includes.get(folder)
    }

    pub fn includes(&self, folder: &str) -> &[IncludeEntry] {
        self.includes
            .get(folder)
            .map(|table| table.entries.as_slice())
            .unwrap_or_default()
    }

    pub fn fonts(&self, folder: &str) -> &[FontEntry] {
        self.fonts
            .get(folder)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn colors(&self) -> &[ColorEntry] {
        &self.colors
    }

    pub fn color_names(&self) -> BTreeSet<&str> {
        self.colors.iter().map(|color| color.name.as_str()).collect()
    }

    pub fn constants(&self, folder: &str) -> BTreeSet<&str> {
        self.includes(folder)
            .iter()
            .filter(|entry| entry.kind == IncludeKind::Constant)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    pub fn catalogs(&self) -> &[LabelCatalog] {
        &self.catalogs
    }

    pub fn label_catalogs<'a>(&'a self, host: &'a [LabelCatalog]) -> LabelCatalogs<'a> {
        LabelCatalogs::new(host, &self.catalogs)
    }

    /// Leaf `<font>` usages per XML folder.
    pub fn get_font_refs(&self) -> BTreeMap<String, Vec<FontReference>> {
        self.xml_folders
            .iter()
            .map(|folder| {
                (
                    folder.clone(),
                    collect_font_refs(&self.window_file_paths(folder)),
                )
            })
            .collect()
    }

    pub fn update_xml_files(&mut self) {
        self.window_files = self
            .xml_folders
            .iter()
            .map(|folder| (folder.clone(), list_window_files(&self.folder_path(folder))))
            .collect();
    }

    pub fn update_includes(&mut self, folder: &str) {
        let table = IncludeTable::build(&self.folder_path(folder));
        log::info!(
            "{}: {} include definitions from {} files",
            folder,
            table.entries.len(),
            table.files.len()
        );
        self.includes.insert(folder.to_string(), table);
    }

    pub fn update_fonts(&mut self, folder: &str) {
        let fonts = find_file_ignore_case(&self.folder_path(folder), FONT_FILE)
            .map(|path| load_fonts(&path))
            .unwrap_or_default();
        self.fonts.insert(folder.to_string(), fonts);
    }

    pub fn update_colors(&mut self) {
        self.colors = self
            .colors_path()
            .map(|path| load_colors(&path))
            .unwrap_or_default();
    }

    pub fn update_labels(&mut self) {
        self.catalogs = load_language_catalogs(&self.language_path(), &self.language_folders);
    }

    /// Refreshes whatever table `changed` feeds.
    pub fn reload(&mut self, changed: &Path) -> ReloadOutcome {
        let is_catalog = changed
            .extension()
            .map(|extension| extension.eq_ignore_ascii_case("po"))
            .unwrap_or(false);
        if is_catalog {
            self.update_labels();
            return ReloadOutcome::Labels;
        }
        if !is_xml_file(changed) {
            return ReloadOutcome::Nothing;
        }

        self.update_xml_files();
        if let Some(colors) = self.colors_path() {
            if changed.starts_with(&colors) {
                self.update_colors();
                return ReloadOutcome::Colors;
            }
        }
        let include_folder = self
            .includes
            .iter()
            .find(|(_, table)| table.contains_file(changed))
            .map(|(folder, _)| folder.clone());
        if let Some(folder) = include_folder {
            self.update_includes(&folder);
            return ReloadOutcome::Includes(folder);
        }
        if file_name_of(changed).eq_ignore_ascii_case(FONT_FILE) {
            if let Some(folder) = self.folder_for_file(changed).map(str::to_string) {
                self.update_fonts(&folder);
                return ReloadOutcome::Fonts(folder);
            }
        }
        ReloadOutcome::WindowFiles
    }

    /// Font definitions shadow includes of the same name.
    pub fn return_node(&self, name: &str, folder: &str) -> Option<NodeRef<'_>> {
        if let Some(font) = self.fonts(folder).iter().find(|font| font.name == name) {
            return Some(NodeRef::Font(font));
        }
        self.includes(folder)
            .iter()
            .find(|entry| entry.name == name)
            .map(NodeRef::Include)
    }

    /// Definition site of `keyword`: a label id, include, font or default color.
    pub fn go_to_tag(
        &self,
        keyword: &str,
        folder: &str,
        host_catalogs: &[LabelCatalog],
    ) -> Option<FileLocation> {
        if keyword.is_empty() {
            return None;
        }
        if keyword.chars().all(|ch| ch.is_ascii_digit()) {
            let key = format!("#{}", keyword);
            return self.label_catalogs(host_catalogs).iter().find_map(|catalog| {
                catalog
                    .find(&key, CatalogKey::Msgctxt)
                    .map(|entry| FileLocation {
                        path: catalog.path().to_path_buf(),
                        line: entry.line,
                    })
            });
        }
        if let Some(include) = self.includes(folder).iter().find(|entry| entry.name == keyword) {
            return Some(FileLocation {
                path: include.file.clone(),
                line: include.line,
            });
        }
        if let Some(font) = self.fonts(folder).iter().find(|font| font.name == keyword) {
            return Some(FileLocation {
                path: font.file.clone(),
                line: font.line,
            });
        }
        if let Some(color) = self
            .colors
            .iter()
            .find(|color| color.name == keyword && color.is_default())
        {
            return Some(FileLocation {
                path: color.file.clone(),
                line: color.line,
            });
        }
        log::info!("no node with name {} found", keyword);
        None
    }

    pub fn find_color(&self, name: &str) -> Option<&ColorEntry> {
        find_color(&self.colors, name)
    }

    /// Filesystem path of a texture reference.
    pub fn translate_path(&self, reference: &str) -> PathBuf {
        let media = self.media_path();
        match reference.strip_prefix(SKIN_PATH_PREFIX) {
            Some(rest) => media
                .parent()
                .map(|parent| parent.join(rest))
                .unwrap_or_else(|| media.join(rest)),
            None => media.join(reference),
        }
    }

    /// Adds `text` to the primary catalog under the lowest free private id
    /// and returns that id.
    pub fn create_new_label(&mut self, text: &str, rel_path: &str) -> Result<u32, KdError> {
        let start = self.kind.lang_start_id();
        let offset = self.kind.lang_offset();
        // Edits go to a copy; the table is only refreshed once the file is written.
        let mut catalog = match self.primary_catalog_index() {
            Some(index) => self.catalogs[index].clone(),
            None => {
                let path = self
                    .language_path()
                    .join(self.primary_language_folder())
                    .join("strings.po");
                log::info!("creating catalog {}", path.display());
                LabelCatalog::create(&path, &self.manifest.id)
            }
        };
        let id = next_free_label_id(&catalog.ids(), start).ok_or_else(|| {
            KdError::with_path(
                "LABEL_RANGE_FULL",
                format!("no free label id in [{}, {})", start, start + 1000),
                catalog.path(),
            )
        })?;
        let position = (id - start) as usize + offset;
        catalog.insert(
            position,
            PoEntry {
                msgctxt: Some(label_key(id)),
                msgid: text.to_string(),
                occurrences: vec![PoOccurrence {
                    path: rel_path.to_string(),
                    line: None,
                }],
                ..PoEntry::default()
            },
        );
        catalog.save()?;
        self.update_labels();
        Ok(id)
    }

    /// Reference text to paste into XML for label `id`.
    pub fn translate_label_reference(&self, id: u32) -> String {
        if self.kind == ProjectKind::Extension && (32000..=33000).contains(&id) {
            format!("$ADDON[{} {}]", self.manifest.id, id)
        } else {
            format!("$LOCALIZE[{}]", id)
        }
    }

    /// Copy of `node` with `<include>Name</include>` references replaced by
    /// their definitions.
    pub fn resolve_includes(&self, node: &XmlElementNode, folder: &str) -> XmlElementNode {
        self.resolve_includes_at(node, folder, 0)
    }

    fn resolve_includes_at(
        &self,
        node: &XmlElementNode,
        folder: &str,
        depth: usize,
    ) -> XmlElementNode {
        let mut resolved = node.clone();
        resolved.children = node
            .children
            .iter()
            .map(|child| match child {
                XmlNode::Element(element) => XmlNode::Element(
                    self.expand_include(element, folder, depth)
                        .unwrap_or_else(|| self.resolve_includes_at(element, folder, depth)),
                ),
                XmlNode::Text(text) => XmlNode::Text(text.clone()),
            })
            .collect();
        resolved
    }

    fn expand_include(
        &self,
        reference: &XmlElementNode,
        folder: &str,
        depth: usize,
    ) -> Option<XmlElementNode> {
        if reference.name != "include" || depth >= MAX_INCLUDE_DEPTH {
            return None;
        }
        let name = reference.text()?.trim();
        let entry = self
            .include_table(folder)?
            .find_kind(name, IncludeKind::Include)?;
        let document = parse_xml_document(&entry.content).ok()?;
        Some(self.resolve_includes_at(&document.root, folder, depth + 1))
    }

    /// Core window files the folder does not ship.
    pub fn missing_window_files(&self, folder: &str, reference: &ReferenceData) -> Vec<String> {
        let present = self.window_files(folder);
        let mut missing: Vec<String> = Vec::new();
        for window in &reference.windows {
            let shipped = present
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&window.filename));
            if !shipped && !missing.contains(&window.filename) {
                log::info!("Skin does not include {}", window.filename);
                missing.push(window.filename.clone());
            }
        }
        missing
    }

    pub fn theme_names(&self) -> Vec<String> {
        self.themes_path()
            .map(|path| list_file_stems(&path))
            .unwrap_or_default()
    }

    fn primary_catalog_index(&self) -> Option<usize> {
        let primary = self.language_path().join(self.primary_language_folder());
        self.catalogs
            .iter()
            .position(|catalog| catalog.path().starts_with(&primary))
    }
}
