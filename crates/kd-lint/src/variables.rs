use std::collections::BTreeSet;
use std::fs;
use std::sync::OnceLock;

use kd_core::Diagnostic;
use kd_project::{IncludeKind, Project};
use regex::Regex;

use crate::Reference;

pub(crate) fn check_variables(project: &Project) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for folder in project.xml_folders() {
        let mut refs = Vec::new();
        for path in project.window_file_paths(folder) {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(error) => {
                    log::info!("skipping {}: {}", path.display(), error);
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);
            for (index, line) in text.lines().enumerate() {
                for captures in variable_regex().captures_iter(line) {
                    let name = captures[1].split(',').next().unwrap_or_default().trim();
                    refs.push(Reference::new(name, "variable", &path, index + 1));
                }
            }
        }

        let Some(table) = project.include_table(folder) else {
            continue;
        };
        for reference in &refs {
            if table.find_kind(&reference.name, IncludeKind::Variable).is_none() {
                let message = format!("Variable not defined: {}", reference.name);
                diagnostics.push(reference.clone().into_diagnostic(message));
            }
        }
        let used: BTreeSet<&str> = refs.iter().map(|reference| reference.name.as_str()).collect();
        for definition in table.of_kind(IncludeKind::Variable) {
            if !used.contains(definition.name.as_str()) {
                diagnostics.push(Diagnostic::new(
                    &definition.file,
                    definition.line,
                    "variable",
                    &definition.name,
                    format!("Unused variable: {}", definition.name),
                ));
            }
        }
    }
    diagnostics
}

fn variable_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\$(?:ESC)?VAR\[(.*?)\]").expect("variable regex"))
}
