mod cursor;
mod image_info;

use std::path::Path;

use kd_parser::{escape_xml, parse_xml_document, XmlElementNode};
use kd_project::{HostApp, IncludeKind, Project, ReferenceData};
use serde::{Deserialize, Serialize};

use cursor::{bracket_form_at, byte_offset, element_chain, open_tag_before, token_at, word_at};

pub use image_info::ImageInfo;

/// Previews longer than this are replaced by a notice.
pub const MAX_PREVIEW_CHARS: usize = 3000;

const CONDITION_TAGS: [&str; 2] = ["visible", "enable"];
const LABEL_TAGS: [&str; 6] = ["label", "label2", "altlabel", "hinttext", "property", "value"];
const IMAGE_TAGS: [&str; 8] = [
    "texture",
    "alttexture",
    "bordertexture",
    "texturefocus",
    "texturenofocus",
    "icon",
    "thumb",
    "imagepath",
];
const POSITION_TAGS: [&str; 4] = ["posx", "posy", "left", "top"];

/// Cursor position: 1-based line, 0-based character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationKind {
    Label,
    Variable,
    Expression,
    Info,
    Include,
    Font,
    Color,
    Image,
    Position,
    Condition,
    Window,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub kind: ExplanationKind,
    pub markup: String,
}

impl Explanation {
    fn new(kind: ExplanationKind, markup: impl Into<String>) -> Self {
        Self {
            kind,
            markup: markup.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub project: &'a Project,
    pub host: &'a HostApp,
    pub reference: &'a ReferenceData,
}

/// Explains what the text under `position` refers to. `text` is the current
/// buffer of `file`, which may be unsaved or not well-formed.
pub fn resolve(
    context: &ResolveContext<'_>,
    file: &Path,
    text: &str,
    position: Position,
) -> Option<Explanation> {
    let line = text.lines().nth(position.line.checked_sub(1)?)?;
    let offset = byte_offset(line, position.column);
    let folder = folder_of(context.project, file);

    if let Some(form) = bracket_form_at(line, offset) {
        let explained = match form.kind {
            "LOCALIZE" => label_explanation(context, form.argument.trim()),
            "ADDON" => form
                .argument
                .split_whitespace()
                .last()
                .and_then(|id| label_explanation(context, id)),
            "VAR" | "ESCVAR" => folder.as_deref().and_then(|folder| {
                include_explanation(context.project, form.argument, folder, IncludeKind::Variable)
            }),
            "EXP" => folder.as_deref().and_then(|folder| {
                include_explanation(context.project, form.argument, folder, IncludeKind::Expression)
            }),
            _ => help_explanation(context.reference, form.argument, ExplanationKind::Info),
        };
        if explained.is_some() {
            return explained;
        }
    }

    let token = token_at(line, offset);
    let explained = match parse_xml_document(text) {
        Ok(document) => {
            let chain = element_chain(&document.root, position.line, position.column);
            chain.last().and_then(|element| {
                explain_element(context, folder.as_deref(), element, &chain, token)
            })
        }
        Err(error) => {
            log::debug!("resolving {} without a tree: {}", file.display(), error);
            open_tag_before(line, offset)
                .and_then(|tag| explain_tag(context, folder.as_deref(), tag, None, token))
        }
    };
    explained.or_else(|| fallback(context, word_at(line, offset)))
}

/// XML folder of `file`, or its parent directory name outside the project.
fn folder_of(project: &Project, file: &Path) -> Option<String> {
    project.folder_for_file(file).map(str::to_string).or_else(|| {
        file.parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().to_string())
    })
}

fn explain_element(
    context: &ResolveContext<'_>,
    folder: Option<&str>,
    element: &XmlElementNode,
    chain: &[&XmlElementNode],
    token: &str,
) -> Option<Explanation> {
    if element.name == "control" {
        return position_explanation(chain);
    }
    explain_tag(context, folder, &element.name, Some(element), token)
}

fn explain_tag(
    context: &ResolveContext<'_>,
    folder: Option<&str>,
    tag: &str,
    element: Option<&XmlElementNode>,
    token: &str,
) -> Option<Explanation> {
    let body = element
        .and_then(XmlElementNode::text)
        .map(str::trim)
        .filter(|text| !text.is_empty());
    match tag {
        "include" => {
            let name = body
                .or_else(|| element.and_then(|node| node.attr("content")))
                .unwrap_or(token);
            include_preview(context.project, name, folder?)
        }
        "font" => font_explanation(context.project, body.unwrap_or(token), folder?),
        tag if CONDITION_TAGS.contains(&tag) => {
            help_explanation(context.reference, token, ExplanationKind::Condition)
        }
        tag if LABEL_TAGS.contains(&tag) => label_explanation(context, token),
        tag if IMAGE_TAGS.contains(&tag) => {
            let path = context.project.translate_path(body.unwrap_or(token));
            ImageInfo::read(&path).map(|info| Explanation::new(ExplanationKind::Image, info.markup()))
        }
        _ => None,
    }
}

fn fallback(context: &ResolveContext<'_>, word: &str) -> Option<Explanation> {
    if word.is_empty() {
        return None;
    }
    if let Some(color) = context.project.find_color(word) {
        return Some(Explanation::new(
            ExplanationKind::Color,
            format!("<b>{}:</b> {}", escape_xml(&color.name, false), color.content),
        ));
    }
    context.reference.window_by_name(word).map(|window| {
        Explanation::new(ExplanationKind::Window, window.filename.clone())
    })
}

/// `<b>folder:</b> text<br>` for every catalog defining the id.
fn label_explanation(context: &ResolveContext<'_>, id: &str) -> Option<Explanation> {
    let id = id.trim().parse::<u32>().ok()?;
    let catalogs = context.project.label_catalogs(&context.host.catalogs);
    let markup: String = catalogs
        .find_all(id)
        .into_iter()
        .map(|(catalog, entry)| {
            let text = if entry.msgstr.is_empty() {
                &entry.msgid
            } else {
                &entry.msgstr
            };
            format!(
                "<b>{}:</b> {}<br>",
                catalog.label_folder(),
                escape_xml(text, false)
            )
        })
        .collect();
    (!markup.is_empty()).then(|| Explanation::new(ExplanationKind::Label, markup))
}

fn include_explanation(
    project: &Project,
    argument: &str,
    folder: &str,
    kind: IncludeKind,
) -> Option<Explanation> {
    let name = argument.split(',').next().unwrap_or_default().trim();
    let entry = project.include_table(folder)?.find_kind(name, kind)?;
    let explanation_kind = match kind {
        IncludeKind::Expression => ExplanationKind::Expression,
        _ => ExplanationKind::Variable,
    };
    Some(Explanation::new(explanation_kind, preview(&entry.content)))
}

fn include_preview(project: &Project, name: &str, folder: &str) -> Option<Explanation> {
    let node = project.return_node(name, folder)?;
    let content = node.content();
    if content.trim().is_empty() {
        return None;
    }
    Some(Explanation::new(ExplanationKind::Include, preview(content)))
}

fn preview(content: &str) -> String {
    if content.chars().count() > MAX_PREVIEW_CHARS {
        return "include too big for preview".to_string();
    }
    format!("<pre>{}</pre>", escape_xml(content, false))
}

fn font_explanation(project: &Project, name: &str, folder: &str) -> Option<Explanation> {
    let font = project.fonts(folder).iter().find(|font| font.name == name)?;
    let document = parse_xml_document(&font.content).ok()?;
    let markup: String = document
        .root
        .element_children()
        .map(|field| {
            format!(
                "<b>{}:</b> {}<br>",
                field.name,
                escape_xml(field.text().unwrap_or_default().trim(), false)
            )
        })
        .collect();
    Some(Explanation::new(ExplanationKind::Font, markup))
}

/// Builtin or condition help for the function named by `token`.
fn help_explanation(
    reference: &ReferenceData,
    token: &str,
    kind: ExplanationKind,
) -> Option<Explanation> {
    let keyword = token
        .trim()
        .trim_start_matches('!')
        .split('(')
        .next()
        .unwrap_or_default();
    if keyword.is_empty() {
        return None;
    }
    let entry = reference.help_for(keyword)?;
    Some(Explanation::new(
        kind,
        format!(
            "<b>{}</b><br>{}",
            escape_xml(&entry.code, false),
            escape_xml(&entry.help, false)
        ),
    ))
}

/// Position values of the control and its ancestors, outermost first.
fn position_explanation(chain: &[&XmlElementNode]) -> Option<Explanation> {
    let mut markup = String::from("<b>Absolute position</b><br>");
    let mut found = false;
    for tag in POSITION_TAGS {
        let values: Vec<&str> = chain
            .iter()
            .filter_map(|node| node.find_child(tag))
            .filter_map(XmlElementNode::text)
            .map(str::trim)
            .collect();
        if values.is_empty() {
            continue;
        }
        found = true;
        let mut line = values.join(" + ");
        if values.len() > 1 {
            let total = values.iter().try_fold(0i64, |total, value| {
                value.parse::<i64>().ok().and_then(|value| total.checked_add(value))
            });
            if let Some(total) = total {
                line.push_str(&format!(" = {}", total));
            }
        }
        markup.push_str(&format!("<b>{}:</b> {}<br>", tag, line));
    }
    found.then(|| Explanation::new(ExplanationKind::Position, markup))
}
