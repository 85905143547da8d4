use std::collections::BTreeSet;

use kd_core::Diagnostic;
use kd_project::{IncludeKind, Project, SHORTCUTS_INCLUDES_FILE};

use crate::{parsed_window_files, Reference};

/// Includes generated by the skin shortcuts script at runtime.
const SHORTCUTS_PREFIX: &str = "skinshortcuts-";

pub(crate) fn check_includes(project: &Project) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for folder in project.xml_folders() {
        let folder_path = project.folder_path(folder);
        // Lazily loaded files stay local to this pass.
        let mut table = project.include_table(folder).cloned().unwrap_or_default();
        let mut refs = Vec::new();

        for (path, document) in parsed_window_files(project, folder) {
            for node in document.root.descendants_named(&["include"]) {
                let text = node.text().map(str::trim).filter(|text| !text.is_empty());
                let name = match (text, node.attr("content")) {
                    (Some(text), _) => {
                        if text.starts_with(SHORTCUTS_PREFIX) {
                            continue;
                        }
                        if let Some(file) = node.attr("file") {
                            let include_file = folder_path.join(file);
                            if !file.eq_ignore_ascii_case(SHORTCUTS_INCLUDES_FILE)
                                && !table.contains_file(&include_file)
                            {
                                log::info!("loading include file {}", include_file.display());
                                table.load_file(&include_file, &folder_path);
                            }
                        }
                        text
                    }
                    (None, Some(content)) if !content.is_empty() => content,
                    _ => continue,
                };
                refs.push(Reference::new(name, &node.name, &path, node.line()));
            }
        }

        for reference in &refs {
            if reference.name.starts_with('$') {
                continue;
            }
            if table.find_kind(&reference.name, IncludeKind::Include).is_none() {
                let message = format!("Include not defined: {}", reference.name);
                diagnostics.push(reference.clone().into_diagnostic(message));
            }
        }
        let used: BTreeSet<&str> = refs.iter().map(|reference| reference.name.as_str()).collect();
        for definition in table.of_kind(IncludeKind::Include) {
            if !used.contains(definition.name.as_str()) {
                diagnostics.push(Diagnostic::new(
                    &definition.file,
                    definition.line,
                    "include",
                    &definition.name,
                    format!("Unused include: {}", definition.name),
                ));
            }
        }
        for cycle in &table.cycles {
            diagnostics.push(Diagnostic::new(
                &cycle.file,
                cycle.line,
                "include",
                cycle.describe(),
                format!("Include file cycle: {}", cycle.describe()),
            ));
        }
    }
    diagnostics
}
