use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use kd_core::{KdError, SourceLocation, SourceSpan};
use roxmltree::{Document, Node, NodeType};

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub root: XmlElementNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElementNode),
    Text(XmlTextNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElementNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
    pub location: SourceSpan,
    /// Tree path in the `/window/controls/control[2]` form. Positional
    /// suffixes only appear when the parent has several same-named children.
    pub path: String,
    /// 1-based index among same-named siblings.
    pub sibling_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlTextNode {
    pub value: String,
    pub location: SourceSpan,
}

impl XmlElementNode {
    pub fn line(&self) -> usize {
        self.location.start.line
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Text preceding the first child element, like `element.text` in a DOM.
    pub fn text(&self) -> Option<&str> {
        match self.children.first() {
            Some(XmlNode::Text(text)) => Some(text.value.as_str()),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|entry| match entry {
                XmlNode::Text(text) => Some(text.value.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn element_children(&self) -> impl Iterator<Item = &XmlElementNode> {
        self.children.iter().filter_map(|entry| match entry {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    pub fn has_element_children(&self) -> bool {
        self.element_children().next().is_some()
    }

    pub fn find_child(&self, name: &str) -> Option<&XmlElementNode> {
        self.element_children().find(|child| child.name == name)
    }

    pub fn find_children<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElementNode> + 'a {
        self.element_children().filter(move |child| child.name == name)
    }

    /// All descendant elements in document order, `self` excluded.
    pub fn descendants(&self) -> Vec<&XmlElementNode> {
        let mut out = Vec::new();
        collect_descendants(self, &mut out);
        out
    }

    pub fn descendants_named<'a>(&'a self, names: &[&str]) -> Vec<&'a XmlElementNode> {
        self.descendants()
            .into_iter()
            .filter(|node| names.contains(&node.name.as_str()))
            .collect()
    }

    /// Root-to-node chain for the first element (pre-order) matching
    /// `predicate`. The chain starts with `self`.
    pub fn find_path(
        &self,
        predicate: &dyn Fn(&XmlElementNode) -> bool,
    ) -> Option<Vec<&XmlElementNode>> {
        let mut chain = vec![self];
        if find_path_inner(self, predicate, &mut chain) {
            Some(chain)
        } else {
            None
        }
    }

    /// Serializes the subtree with tab indentation.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        write_element(self, 0, &mut out);
        out
    }
}

fn collect_descendants<'a>(node: &'a XmlElementNode, out: &mut Vec<&'a XmlElementNode>) {
    for child in node.element_children() {
        out.push(child);
        collect_descendants(child, out);
    }
}

fn find_path_inner<'a>(
    node: &'a XmlElementNode,
    predicate: &dyn Fn(&XmlElementNode) -> bool,
    chain: &mut Vec<&'a XmlElementNode>,
) -> bool {
    if predicate(node) {
        return true;
    }
    for child in node.element_children() {
        chain.push(child);
        if find_path_inner(child, predicate, chain) {
            return true;
        }
        chain.pop();
    }
    false
}

pub fn escape_xml(raw: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_element(node: &XmlElementNode, depth: usize, out: &mut String) {
    let indent = "\t".repeat(depth);
    out.push_str(&indent);
    out.push('<');
    out.push_str(&node.name);
    for (key, value) in &node.attributes {
        out.push_str(&format!(" {}=\"{}\"", key, escape_xml(value, true)));
    }

    if node.children.is_empty() {
        out.push_str(" />\n");
        return;
    }

    if !node.has_element_children() {
        out.push('>');
        out.push_str(&escape_xml(&node.text_content(), false));
        out.push_str(&format!("</{}>\n", node.name));
        return;
    }

    out.push_str(">\n");
    for child in &node.children {
        match child {
            XmlNode::Element(element) => write_element(element, depth + 1, out),
            XmlNode::Text(text) => {
                out.push_str(&"\t".repeat(depth + 1));
                out.push_str(&escape_xml(text.value.trim(), false));
                out.push('\n');
            }
        }
    }
    out.push_str(&indent);
    out.push_str(&format!("</{}>\n", node.name));
}

pub fn parse_xml_document(source: &str) -> Result<XmlDocument, KdError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let document = Document::parse(source)
        .map_err(|error| KdError::new("XML_PARSE_ERROR", error.to_string()))?;

    let Some(root) = document.root().children().find(|node| node.is_element()) else {
        return Err(KdError::new(
            "XML_PARSE_ERROR",
            "XML document must contain a root element.",
        ));
    };

    let path = format!("/{}", root.tag_name().name());
    Ok(XmlDocument {
        root: parse_element(&document, root, path, 1),
    })
}

/// Reads and parses an XML file, reporting why it could not be loaded.
pub fn read_xml_file(path: &Path) -> Result<XmlDocument, KdError> {
    let is_xml = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("xml"))
        .unwrap_or(false);
    if !is_xml {
        return Err(KdError::with_path(
            "XML_NOT_XML_FILE",
            format!("Tried to get root from non-xml file: {}", path.display()),
            path,
        ));
    }
    if !path.exists() {
        return Err(KdError::with_path(
            "XML_FILE_MISSING",
            format!("{} does not exist", path.display()),
            path,
        ));
    }
    let bytes = fs::read(path).map_err(|error| KdError::io(error, path))?;
    let source = String::from_utf8_lossy(&bytes);
    parse_xml_document(&source).map_err(|error| KdError {
        message: format!("Error in {}: {}", path.display(), error.message),
        path: Some(path.to_path_buf()),
        ..error
    })
}

/// Loader boundary: malformed or missing files become `None` plus a log line.
pub fn parse_xml_file(path: &Path) -> Option<XmlDocument> {
    match read_xml_file(path) {
        Ok(document) => Some(document),
        Err(error) if error.code == "XML_PARSE_ERROR" => {
            log::warn!("{}", error.message);
            None
        }
        Err(error) => {
            log::info!("{}", error.message);
            None
        }
    }
}

fn parse_element(
    document: &Document<'_>,
    node: Node<'_, '_>,
    path: String,
    sibling_index: usize,
) -> XmlElementNode {
    let mut attributes = BTreeMap::new();
    for attribute in node.attributes() {
        attributes.insert(attribute.name().to_string(), attribute.value().to_string());
    }

    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    for child in node.children().filter(|child| child.is_element()) {
        *name_counts.entry(child.tag_name().name()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut children = Vec::new();
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => {
                let name = child.tag_name().name();
                let index = seen.entry(name).or_default();
                *index += 1;
                let child_path = if name_counts.get(name).copied().unwrap_or(0) > 1 {
                    format!("{}/{}[{}]", path, name, index)
                } else {
                    format!("{}/{}", path, name)
                };
                children.push(XmlNode::Element(parse_element(
                    document, child, child_path, *index,
                )));
            }
            NodeType::Text => {
                let value = child.text().unwrap_or_default();
                if value.trim().is_empty() {
                    continue;
                }
                children.push(XmlNode::Text(XmlTextNode {
                    value: value.to_string(),
                    location: node_span(document, child.range().start, child.range().end),
                }));
            }
            _ => {}
        }
    }

    XmlElementNode {
        name: node.tag_name().name().to_string(),
        attributes,
        children,
        location: node_span(document, node.range().start, node.range().end),
        path,
        sibling_index,
    }
}

fn node_span(document: &Document<'_>, start: usize, end: usize) -> SourceSpan {
    let start_pos = document.text_pos_at(start);
    let end_pos = document.text_pos_at(end);
    SourceSpan {
        start: SourceLocation {
            line: start_pos.row as usize,
            column: start_pos.col as usize,
        },
        end: SourceLocation {
            line: end_pos.row as usize,
            column: end_pos.col as usize,
        },
    }
}
