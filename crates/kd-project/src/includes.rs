use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use kd_parser::{parse_xml_file, XmlElementNode};
use serde::Serialize;

use crate::paths::{file_name_of, find_file_ignore_case, INCLUDES_FILE, SHORTCUTS_INCLUDES_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeKind {
    Include,
    Variable,
    Constant,
    Expression,
}

impl IncludeKind {
    pub const TAGS: [&'static str; 4] = ["include", "variable", "constant", "expression"];

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "include" => Some(Self::Include),
            "variable" => Some(Self::Variable),
            "constant" => Some(Self::Constant),
            "expression" => Some(Self::Expression),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Expression => "expression",
        }
    }
}

impl fmt::Display for IncludeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named definition, computed eagerly when the table is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeEntry {
    pub name: String,
    pub kind: IncludeKind,
    pub file: PathBuf,
    pub line: usize,
    /// Serialized XML of the defining element.
    pub content: String,
    /// Line distance to the next sibling definition; `None` for the last one.
    pub length: Option<usize>,
}

/// A file that was re-entered while still being expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeCycle {
    /// File names from the first occurrence back to itself.
    pub chain: Vec<String>,
    /// The file holding the `<include file=...>` that closes the loop.
    pub file: PathBuf,
    pub line: usize,
}

impl IncludeCycle {
    pub fn describe(&self) -> String {
        self.chain.join(" -> ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncludeTable {
    pub entries: Vec<IncludeEntry>,
    /// Every include file visited, in visiting order.
    pub files: Vec<PathBuf>,
    pub cycles: Vec<IncludeCycle>,
}

impl IncludeTable {
    /// Builds the table of one XML folder starting at its `Includes.xml`.
    pub fn build(folder: &Path) -> Self {
        let mut table = Self::default();
        match find_file_ignore_case(folder, INCLUDES_FILE) {
            Some(root_file) => {
                let mut visited = BTreeSet::new();
                table.follow(&root_file, folder, &mut visited, &mut Vec::new());
            }
            None => log::info!("no {} in {}", INCLUDES_FILE, folder.display()),
        }
        table
    }

    /// Adds the definitions of one more include file (and whatever it
    /// references) unless it was already visited.
    pub fn load_file(&mut self, path: &Path, folder: &Path) {
        let mut visited: BTreeSet<PathBuf> = self.files.iter().cloned().collect();
        self.follow(path, folder, &mut visited, &mut Vec::new());
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.iter().any(|file| file == path)
    }

    pub fn of_kind(&self, kind: IncludeKind) -> impl Iterator<Item = &IncludeEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn find(&self, name: &str) -> Option<&IncludeEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn find_kind(&self, name: &str, kind: IncludeKind) -> Option<&IncludeEntry> {
        self.of_kind(kind).find(|entry| entry.name == name)
    }

    fn follow(
        &mut self,
        path: &Path,
        folder: &Path,
        visited: &mut BTreeSet<PathBuf>,
        stack: &mut Vec<(PathBuf, usize)>,
    ) {
        if let Some(start) = stack.iter().position(|(file, _)| file == path) {
            let mut chain: Vec<String> = stack[start..]
                .iter()
                .map(|(file, _)| file_name_of(file))
                .collect();
            chain.push(file_name_of(path));
            let (file, line) = stack
                .last()
                .cloned()
                .unwrap_or_else(|| (path.to_path_buf(), 1));
            log::warn!("include file cycle: {}", chain.join(" -> "));
            self.cycles.push(IncludeCycle { chain, file, line });
            return;
        }
        if !visited.insert(path.to_path_buf()) {
            return;
        }

        let Some(document) = parse_xml_file(path) else {
            return;
        };
        self.files.push(path.to_path_buf());
        collect_definitions(&document.root, path, &mut self.entries);

        for reference in document.root.descendants_named(&["include"]) {
            let Some(file) = reference.attr("file") else {
                continue;
            };
            if file.eq_ignore_ascii_case(SHORTCUTS_INCLUDES_FILE) {
                continue;
            }
            stack.push((path.to_path_buf(), reference.line()));
            self.follow(&folder.join(file), folder, visited, stack);
            stack.pop();
        }
    }
}

fn collect_definitions(root: &XmlElementNode, file: &Path, out: &mut Vec<IncludeEntry>) {
    collect_from_children(root, file, out);
}

fn collect_from_children(parent: &XmlElementNode, file: &Path, out: &mut Vec<IncludeEntry>) {
    let children: Vec<&XmlElementNode> = parent.element_children().collect();
    for (index, node) in children.iter().enumerate() {
        if let Some(entry) = definition_entry(node, children.get(index + 1).copied(), file) {
            out.push(entry);
        }
        collect_from_children(node, file, out);
    }
}

fn definition_entry(
    node: &XmlElementNode,
    next_sibling: Option<&XmlElementNode>,
    file: &Path,
) -> Option<IncludeEntry> {
    let kind = IncludeKind::from_tag(&node.name)?;
    let name = node.attr("name")?;
    if kind == IncludeKind::Include
        && node.find_child("param").is_some()
        && node.find_child("definition").is_none()
    {
        return None;
    }
    Some(IncludeEntry {
        name: name.to_string(),
        kind,
        file: file.to_path_buf(),
        line: node.line(),
        content: node.to_xml_string(),
        length: next_sibling.map(|next| next.line().saturating_sub(node.line())),
    })
}

#[cfg(test)]
mod includes_tests {
    use super::*;
    use std::fs;

    fn temp_folder(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kd-includes-{}-{}-{}",
            label,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos())
                .unwrap_or(0)
        ));
        fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn collects_all_four_kinds_and_follows_files() {
        let dir = temp_folder("kinds");
        fs::write(
            dir.join("Includes.xml"),
            r#"<includes>
	<include file="Includes_Home.xml"/>
	<include name="CommonBackground">
		<control type="image"><texture>bg.png</texture></control>
	</include>
	<variable name="HomeLabel"><value>$LOCALIZE[31000]</value></variable>
	<constant name="ListWidth">600</constant>
	<expression name="IsPlaying">Player.HasMedia</expression>
	<include name="Templated"><param name="id"/></include>
	<include file="script-skinshortcuts-includes.xml"/>
</includes>"#,
        )
        .expect("write");
        fs::write(
            dir.join("Includes_Home.xml"),
            "<includes>\n\t<include name=\"HomeWidgets\"><visible>true</visible></include>\n</includes>",
        )
        .expect("write");

        let table = IncludeTable::build(&dir);
        let names: Vec<(&str, IncludeKind)> = table
            .entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("CommonBackground", IncludeKind::Include),
                ("HomeLabel", IncludeKind::Variable),
                ("ListWidth", IncludeKind::Constant),
                ("IsPlaying", IncludeKind::Expression),
                ("HomeWidgets", IncludeKind::Include),
            ]
        );
        assert_eq!(table.files.len(), 2);
        assert!(table.cycles.is_empty());

        let background = table.find("CommonBackground").expect("entry");
        assert_eq!(background.line, 3);
        assert_eq!(background.length, Some(3));
        assert!(background.content.starts_with("<include name=\"CommonBackground\">"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn include_file_cycle_is_recorded_once() {
        let dir = temp_folder("cycle");
        fs::write(
            dir.join("Includes.xml"),
            "<includes>\n<include file=\"A.xml\"/>\n</includes>",
        )
        .expect("write");
        fs::write(
            dir.join("A.xml"),
            "<includes>\n<include file=\"B.xml\"/>\n<include name=\"FromA\"/>\n</includes>",
        )
        .expect("write");
        fs::write(
            dir.join("B.xml"),
            "<includes>\n<include name=\"FromB\"/>\n<include file=\"A.xml\"/>\n</includes>",
        )
        .expect("write");

        let table = IncludeTable::build(&dir);
        assert_eq!(table.cycles.len(), 1);
        assert_eq!(table.cycles[0].describe(), "A.xml -> B.xml -> A.xml");
        assert_eq!(file_name_of(&table.cycles[0].file), "B.xml");
        assert_eq!(table.cycles[0].line, 3);
        assert!(table.find("FromA").is_some());
        assert!(table.find("FromB").is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_or_broken_include_file_yields_partial_table() {
        let dir = temp_folder("broken");
        assert!(IncludeTable::build(&dir).entries.is_empty());

        fs::write(
            dir.join("includes.xml"),
            "<includes><include name=\"Ok\"/><include file=\"Broken.xml\"/></includes>",
        )
        .expect("write");
        fs::write(dir.join("Broken.xml"), "<includes><include").expect("write");
        let table = IncludeTable::build(&dir);
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.files.len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let dir = temp_folder("idempotent");
        fs::write(
            dir.join("Includes.xml"),
            "<includes><variable name=\"V\"><value>1</value></variable></includes>",
        )
        .expect("write");
        assert_eq!(IncludeTable::build(&dir), IncludeTable::build(&dir));
        let _ = fs::remove_dir_all(&dir);
    }
}
