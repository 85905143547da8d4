mod brackets;
mod encoding;
mod fonts;
mod general;
mod ids;
mod includes;
mod labels;
mod variables;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kd_core::{Diagnostic, KdError};
use kd_parser::{parse_xml_file, XmlDocument};
use kd_project::{HostApp, Project, ReferenceData, SchemaTemplate};
use serde::Serialize;

pub use brackets::check_brackets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Variable,
    Include,
    Font,
    Label,
    Id,
    General,
    Encoding,
}

impl CheckKind {
    pub const ALL: [CheckKind; 7] = [
        CheckKind::Variable,
        CheckKind::Include,
        CheckKind::Font,
        CheckKind::Label,
        CheckKind::Id,
        CheckKind::General,
        CheckKind::Encoding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Include => "include",
            Self::Font => "font",
            Self::Label => "label",
            Self::Id => "id",
            Self::General => "general",
            Self::Encoding => "encoding",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckKind {
    type Err = KdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                KdError::new(
                    "UNKNOWN_CHECK",
                    format!(
                        "unknown check \"{}\", expected one of: {}",
                        raw,
                        Self::ALL.map(CheckKind::as_str).join(", ")
                    ),
                )
            })
    }
}

/// Borrowed context shared by every validation pass.
#[derive(Debug, Clone, Copy)]
pub struct Checker<'a> {
    project: &'a Project,
    host: &'a HostApp,
    template: &'a SchemaTemplate,
    reference: &'a ReferenceData,
}

impl<'a> Checker<'a> {
    pub fn new(
        project: &'a Project,
        host: &'a HostApp,
        template: &'a SchemaTemplate,
        reference: &'a ReferenceData,
    ) -> Self {
        Self {
            project,
            host,
            template,
            reference,
        }
    }

    pub fn run(&self, kind: CheckKind) -> Vec<Diagnostic> {
        let diagnostics = match kind {
            CheckKind::Variable => variables::check_variables(self.project),
            CheckKind::Include => includes::check_includes(self.project),
            CheckKind::Font => fonts::check_fonts(self.project, self.host),
            CheckKind::Label => labels::check_labels(self.project, self.host),
            CheckKind::Id => ids::check_ids(self.project, self.reference),
            CheckKind::General => self
                .project
                .all_window_file_paths()
                .iter()
                .flat_map(|path| self.check_file(path))
                .collect(),
            CheckKind::Encoding => encoding::check_encoding(self.project),
        };
        log::debug!("{} check: {} diagnostics", kind, diagnostics.len());
        diagnostics
    }

    pub fn run_all(&self) -> Vec<Diagnostic> {
        CheckKind::ALL
            .into_iter()
            .flat_map(|kind| self.run(kind))
            .collect()
    }

    /// Structural checks of a single window file.
    pub fn check_file(&self, path: &Path) -> Vec<Diagnostic> {
        let Some(document) = parse_xml_file(path) else {
            return Vec::new();
        };
        let constants = self
            .project
            .folder_for_file(path)
            .map(|folder| self.project.constants(folder))
            .unwrap_or_default();
        let colors = self.project.color_names();
        general::check_document(
            &document,
            path,
            &general::ValueContext {
                template: self.template,
                constants: &constants,
                colors: &colors,
            },
        )
    }
}

/// A name used somewhere in a window file.
#[derive(Debug, Clone)]
pub(crate) struct Reference {
    pub name: String,
    pub tag: String,
    pub file: PathBuf,
    pub line: usize,
}

impl Reference {
    pub fn new(name: &str, tag: &str, file: &Path, line: usize) -> Self {
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
            file: file.to_path_buf(),
            line,
        }
    }

    pub fn into_diagnostic(self, message: String) -> Diagnostic {
        Diagnostic::new(self.file, self.line, self.tag, self.name, message)
    }
}

/// Window files of `folder` that parse; broken files are skipped.
pub(crate) fn parsed_window_files(project: &Project, folder: &str) -> Vec<(PathBuf, XmlDocument)> {
    project
        .window_file_paths(folder)
        .into_iter()
        .filter_map(|path| parse_xml_file(&path).map(|document| (path, document)))
        .collect()
}

#[cfg(test)]
pub(crate) fn run_check(project: &Project, host: &HostApp, kind: CheckKind) -> Vec<Diagnostic> {
    let template = SchemaTemplate::builtin().expect("builtin template");
    let reference = ReferenceData::builtin().expect("builtin reference data");
    Checker::new(project, host, &template, &reference).run(kind)
}
