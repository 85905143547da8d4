use std::sync::OnceLock;

use kd_core::Diagnostic;
use kd_parser::XmlElementNode;
use kd_project::{HostApp, Project};
use regex::Regex;

use crate::{parsed_window_files, Reference};

const REFERENCE_TAGS: [&str; 6] = ["label", "altlabel", "label2", "value", "onclick", "property"];
const LABEL_TAGS: [&str; 3] = ["label", "altlabel", "label2"];
/// Element tag and the attribute holding a label.
const LABEL_ATTRIBUTES: [(&str, &str); 3] = [
    ("viewtype", "label"),
    ("fontset", "idloc"),
    ("label", "fallback"),
];

pub(crate) fn check_labels(project: &Project, host: &HostApp) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut refs = Vec::new();

    for folder in project.xml_folders() {
        for (path, document) in parsed_window_files(project, folder) {
            let root = &document.root;
            for node in root.descendants_named(&REFERENCE_TAGS) {
                let Some(text) = node.text() else {
                    continue;
                };
                for captures in localize_regex().captures_iter(text) {
                    refs.push(Reference::new(&captures[1], &node.name, &path, node.line()));
                }
            }

            for node in root.descendants_named(&LABEL_TAGS) {
                let Some(text) = node.text().map(str::trim) else {
                    continue;
                };
                if is_numeric(text) {
                    refs.push(Reference::new(text, &node.name, &path, node.line()));
                } else if looks_untranslated(text) {
                    diagnostics.push(Diagnostic::new(
                        &path,
                        node.line(),
                        &node.name,
                        text,
                        format!("Label in <{}> not translated: {}", node.name, text),
                    ));
                }
            }

            for (tag, attribute) in LABEL_ATTRIBUTES {
                for node in attribute_holders(root, tag, attribute) {
                    let Some(value) = node.attr(attribute) else {
                        continue;
                    };
                    for captures in localize_regex().captures_iter(value) {
                        refs.push(Reference::new(&captures[1], &node.name, &path, node.line()));
                    }
                    let trimmed = value.trim();
                    if is_numeric(trimmed) {
                        refs.push(Reference::new(trimmed, &node.name, &path, node.line()));
                    } else if !value.contains('$') && starts_alphabetic(value) {
                        diagnostics.push(Diagnostic::new(
                            &path,
                            node.line(),
                            &node.name,
                            value,
                            format!("Label in attribute {} not translated: {}", attribute, value),
                        ));
                    }
                }
            }
        }
    }

    let catalogs = project.label_catalogs(&host.catalogs);
    for reference in refs {
        if !catalogs.contains_key(&reference.name) {
            let message = format!("Label not defined: {}", reference.name);
            diagnostics.push(reference.into_diagnostic(message));
        }
    }
    diagnostics
}

fn attribute_holders<'a>(
    root: &'a XmlElementNode,
    tag: &str,
    attribute: &str,
) -> Vec<&'a XmlElementNode> {
    root.descendants_named(&[tag])
        .into_iter()
        .filter(|node| node.has_attr(attribute))
        .collect()
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_ascii_digit())
}

fn starts_alphabetic(text: &str) -> bool {
    text.chars()
        .next()
        .map(|ch| ch.is_ascii_alphabetic())
        .unwrap_or(false)
}

/// Literal display text that should have gone through a catalog.
fn looks_untranslated(text: &str) -> bool {
    !text.contains('$')
        && text.chars().count() != 1
        && !text.ends_with(".xml")
        && starts_alphabetic(text)
}

fn localize_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\$LOCALIZE\[([0-9].*?)\]").expect("localize regex"))
}
