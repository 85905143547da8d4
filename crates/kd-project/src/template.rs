use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::str::FromStr;

use kd_core::KdError;
use kd_parser::{parse_xml_document, read_xml_file, XmlElementNode, XmlNode};

const BUILTIN_TEMPLATE: &str = include_str!("../data/controls.xml");
const MAX_FRAGMENT_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Color,
    Bool,
    /// A declared `<valuetype>` enumeration.
    Enum(String),
    String,
}

/// What one permitted child tag may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRule {
    /// Attribute name to value-type name.
    pub attributes: BTreeMap<String, String>,
    /// Value-type name of the element text.
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTemplate {
    controls: BTreeMap<String, BTreeMap<String, TagRule>>,
    value_types: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaTemplate {
    /// The template shipped with the crate.
    pub fn builtin() -> Result<Self, KdError> {
        BUILTIN_TEMPLATE.parse()
    }

    pub fn from_file(path: &Path) -> Result<Self, KdError> {
        let document = read_xml_file(path)?;
        Self::from_root(&document.root)
    }

    fn from_root(root: &XmlElementNode) -> Result<Self, KdError> {
        if root.name != "controls" {
            return Err(KdError::new(
                "TEMPLATE_INVALID",
                format!("template root must be <controls>, found <{}>", root.name),
            ));
        }

        let mut fragments: BTreeMap<String, Vec<XmlNode>> = BTreeMap::new();
        let mut value_types = BTreeMap::new();
        let mut control_nodes = Vec::new();
        for node in root.element_children() {
            match node.name.as_str() {
                "include" => match fragment_name(node) {
                    Some(name) => {
                        fragments.insert(name.to_string(), node.children.clone());
                    }
                    None => log::warn!("ignoring template include at line {}", node.line()),
                },
                "valuetype" => {
                    let Some(name) = node.attr("name") else {
                        continue;
                    };
                    let members = node
                        .text()
                        .unwrap_or_default()
                        .split('|')
                        .map(|member| member.trim().to_lowercase())
                        .filter(|member| !member.is_empty())
                        .collect();
                    value_types.insert(name.to_string(), members);
                }
                "control" => control_nodes.push(node),
                other => log::warn!("unexpected <{}> in template", other),
            }
        }

        let mut controls = BTreeMap::new();
        for node in control_nodes {
            let Some(control_type) = node.attr("type") else {
                continue;
            };
            let children = expand_fragments(&node.children, &fragments, 0);
            let rules = controls
                .entry(control_type.to_lowercase())
                .or_insert_with(BTreeMap::new);
            for child in children.iter().filter_map(|child| match child {
                XmlNode::Element(element) => Some(element),
                XmlNode::Text(_) => None,
            }) {
                let rule: &mut TagRule = rules.entry(child.name.clone()).or_default();
                for (key, value) in &child.attributes {
                    rule.attributes.entry(key.clone()).or_insert(value.clone());
                }
                if rule.text.is_none() {
                    rule.text = child
                        .text()
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .map(str::to_string);
                }
            }
        }

        Ok(Self {
            controls,
            value_types,
        })
    }

    pub fn known_control_types(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    pub fn is_known_control(&self, control_type: &str) -> bool {
        self.controls.contains_key(&control_type.to_lowercase())
    }

    pub fn allowed_children(&self, control_type: &str) -> Option<&BTreeMap<String, TagRule>> {
        self.controls.get(&control_type.to_lowercase())
    }

    pub fn value_type(&self, name: &str) -> ValueType {
        match name {
            "int" => ValueType::Int,
            "color" => ValueType::Color,
            "bool" => ValueType::Bool,
            _ if self.value_types.contains_key(name) => ValueType::Enum(name.to_string()),
            _ => ValueType::String,
        }
    }

    pub fn enum_members(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.value_types.get(name)
    }
}

impl FromStr for SchemaTemplate {
    type Err = KdError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let document = parse_xml_document(source).map_err(|error| KdError {
            code: "TEMPLATE_INVALID".to_string(),
            ..error
        })?;
        Self::from_root(&document.root)
    }
}

/// A fragment definition carries exactly one attribute, `name`.
fn fragment_name(node: &XmlElementNode) -> Option<&str> {
    if node.attributes.len() == 1 {
        node.attr("name")
    } else {
        None
    }
}

fn is_bare_reference(node: &XmlElementNode) -> bool {
    node.name == "include" && node.attributes.is_empty() && !node.has_element_children()
}

fn expand_fragments(
    children: &[XmlNode],
    fragments: &BTreeMap<String, Vec<XmlNode>>,
    depth: usize,
) -> Vec<XmlNode> {
    let mut out = Vec::new();
    for child in children {
        match child {
            XmlNode::Element(element) if is_bare_reference(element) => {
                let name = element.text_content();
                let name = name.trim();
                match fragments.get(name) {
                    Some(body) if depth < MAX_FRAGMENT_DEPTH => {
                        out.extend(expand_fragments(body, fragments, depth + 1));
                    }
                    Some(_) => log::warn!("template fragment {} nests too deeply", name),
                    None => log::warn!("unknown template fragment: {}", name),
                }
            }
            other => out.push(other.clone()),
        }
    }
    out
}
