use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::OnceLock;

use kd_core::Diagnostic;
use kd_parser::{XmlDocument, XmlElementNode};
use kd_project::{SchemaTemplate, TagRule, ValueType};
use regex::Regex;

use crate::brackets::check_brackets;

const BRACKET_TAGS: [&str; 5] = ["visible", "enable", "usealttexture", "selected", "expression"];
const NOOP_TAGS: [&str; 8] = [
    "onclick",
    "onfocus",
    "onunfocus",
    "onup",
    "onleft",
    "onright",
    "ondown",
    "onback",
];
/// Leaf tags that may appear only once per parent.
const SINGLE_TAGS: [&str; 32] = [
    "camera",
    "posx",
    "posy",
    "top",
    "bottom",
    "left",
    "right",
    "centertop",
    "centerbottom",
    "centerleft",
    "centerright",
    "width",
    "height",
    "colordiffuse",
    "texturefocus",
    "texturenofocus",
    "font",
    "selected",
    "textcolor",
    "disabledcolor",
    "selectedcolor",
    "shadowcolor",
    "align",
    "aligny",
    "textoffsetx",
    "textoffsety",
    "pulseonselect",
    "textwidth",
    "focusedcolor",
    "invalidcolor",
    "angle",
    "hitrect",
];

/// Names a value may refer to besides literals.
pub(crate) struct ValueContext<'a> {
    pub template: &'a SchemaTemplate,
    pub constants: &'a BTreeSet<&'a str>,
    pub colors: &'a BTreeSet<&'a str>,
}

impl ValueContext<'_> {
    fn accepts(&self, type_name: &str, value: &str) -> bool {
        let value = value.trim();
        if value.starts_with('$') {
            return true;
        }
        match self.template.value_type(type_name) {
            ValueType::Int => {
                value.eq_ignore_ascii_case("auto")
                    || number_regex().is_match(value)
                    || self.constants.contains(value)
            }
            ValueType::Color => self.colors.contains(value) || color_regex().is_match(value),
            ValueType::Bool => matches!(
                value.to_lowercase().as_str(),
                "true" | "false" | "yes" | "no"
            ),
            ValueType::Enum(name) => self
                .template
                .enum_members(&name)
                .map(|members| members.contains(&value.to_lowercase()))
                .unwrap_or(true),
            ValueType::String => true,
        }
    }
}

pub(crate) fn check_document(
    document: &XmlDocument,
    path: &Path,
    values: &ValueContext<'_>,
) -> Vec<Diagnostic> {
    let root = &document.root;
    let mut diagnostics = Vec::new();

    for control in root.descendants_named(&["control"]) {
        let Some(control_type) = control.attr("type").filter(|kind| !kind.is_empty()) else {
            continue;
        };
        match values.template.allowed_children(control_type) {
            Some(allowed) => {
                check_control_children(control, control_type, allowed, path, values, &mut diagnostics)
            }
            None => diagnostics.push(Diagnostic::new(
                path,
                control.line(),
                &control.name,
                control_type,
                format!("invalid control type: {}", control_type),
            )),
        }
    }

    for node in root.descendants_named(&BRACKET_TAGS) {
        if node.has_element_children() {
            continue;
        }
        match node.text().map(str::trim).filter(|text| !text.is_empty()) {
            None => diagnostics.push(Diagnostic::new(
                path,
                node.line(),
                &node.name,
                "",
                format!("Empty condition: {}", node.name),
            )),
            Some(text) if !check_brackets(text) => {
                diagnostics.push(bracket_mismatch(path, node, text))
            }
            Some(_) => {}
        }
    }

    for node in std::iter::once(root).chain(root.descendants()) {
        if let Some(condition) = node.attr("condition") {
            if !check_brackets(condition) {
                diagnostics.push(bracket_mismatch(path, node, condition));
            }
        }
    }

    for node in root.descendants_named(&NOOP_TAGS) {
        let text = node.text().map(str::trim).unwrap_or_default();
        if text.is_empty() || text == "-" {
            diagnostics.push(Diagnostic::new(
                path,
                node.line(),
                &node.name,
                &node.name,
                format!("Use 'noop' for empty calls <{}>", node.name),
            ));
        }
    }

    check_repeated_tags(root, path, &mut diagnostics);
    diagnostics
}

fn check_control_children(
    control: &XmlElementNode,
    control_type: &str,
    allowed: &BTreeMap<String, TagRule>,
    path: &Path,
    values: &ValueContext<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for child in control.element_children() {
        let Some(rule) = allowed.get(&child.name) else {
            diagnostics.push(Diagnostic::new(
                path,
                child.line(),
                &child.name,
                &child.name,
                format!(
                    "invalid tag for <{} type={}>: <{}>",
                    control.name, control_type, child.name
                ),
            ));
            continue;
        };

        for (attribute, value) in &child.attributes {
            match rule.attributes.get(attribute) {
                None => diagnostics.push(Diagnostic::new(
                    path,
                    child.line(),
                    &child.name,
                    attribute,
                    format!("invalid attribute for <{}>: {}", child.name, attribute),
                )),
                Some(type_name) if !values.accepts(type_name, value) => {
                    diagnostics.push(Diagnostic::new(
                        path,
                        child.line(),
                        &child.name,
                        value,
                        format!("invalid value for {} attribute: {}", attribute, value),
                    ))
                }
                Some(_) => {}
            }
        }

        if child.has_element_children() {
            continue;
        }
        let (Some(type_name), Some(text)) = (rule.text.as_deref(), child.text()) else {
            continue;
        };
        let text = text.trim();
        if !text.is_empty() && !values.accepts(type_name, text) {
            diagnostics.push(Diagnostic::new(
                path,
                child.line(),
                &child.name,
                text,
                format!("invalid value for {}: {}", child.name, text),
            ));
        }
    }
}

fn bracket_mismatch(path: &Path, node: &XmlElementNode, condition: &str) -> Diagnostic {
    let condition = condition.replace("  ", "").replace('\t', "");
    Diagnostic::new(
        path,
        node.line(),
        &node.name,
        condition.as_str(),
        format!("Brackets do not match: {}", condition),
    )
}

fn check_repeated_tags(parent: &XmlElementNode, path: &Path, diagnostics: &mut Vec<Diagnostic>) {
    for child in parent.element_children() {
        if child.sibling_index > 1
            && SINGLE_TAGS.contains(&child.name.as_str())
            && !child.has_element_children()
        {
            diagnostics.push(Diagnostic::new(
                path,
                child.line(),
                &child.name,
                &child.name,
                format!("Invalid multiple tags for {}: <{}>", parent.name, child.name),
            ));
        }
        check_repeated_tags(child, path, diagnostics);
    }
}

fn number_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[+-]?[0-9]+(?:\.[0-9]+)?[r%]?$").expect("number regex"))
}

fn color_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[0-9A-Fa-f]{8}$").expect("color regex"))
}
