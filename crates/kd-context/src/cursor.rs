use std::sync::OnceLock;

use kd_parser::XmlElementNode;
use regex::Regex;

const TOKEN_DELIMITERS: [char; 5] = ['<', '>', '"', '[', ']'];
/// Expression punctuation that also ends a bare word.
const WORD_DELIMITERS: [char; 7] = ['(', ')', ',', '!', '+', '|', '$'];

/// One `$TYPE[argument]` form on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BracketForm<'a> {
    pub kind: &'a str,
    pub argument: &'a str,
}

/// Byte offset of the 0-based character `column`, clamped to the line end.
pub(crate) fn byte_offset(line: &str, column: usize) -> usize {
    line.char_indices()
        .nth(column)
        .map(|(index, _)| index)
        .unwrap_or(line.len())
}

/// Innermost bracket form spanning `offset`. Unclosed forms run to the end
/// of the line.
pub(crate) fn bracket_form_at(line: &str, offset: usize) -> Option<BracketForm<'_>> {
    let mut innermost: Option<(usize, BracketForm<'_>)> = None;
    for captures in form_regex().captures_iter(line) {
        let (Some(whole), Some(kind)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let open = whole.end();
        let close = matching_close(line, open).unwrap_or(line.len());
        if offset < whole.start() || offset > close {
            continue;
        }
        let deeper = innermost
            .as_ref()
            .map(|(start, _)| whole.start() > *start)
            .unwrap_or(true);
        if deeper {
            innermost = Some((
                whole.start(),
                BracketForm {
                    kind: kind.as_str(),
                    argument: &line[open..close],
                },
            ));
        }
    }
    innermost.map(|(_, form)| form)
}

fn matching_close(line: &str, open: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (index, byte) in line.bytes().enumerate().skip(open) {
        match byte {
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Token under the cursor, delimited by markup punctuation and whitespace.
pub(crate) fn token_at(line: &str, offset: usize) -> &str {
    span_at(line, offset, |ch| {
        ch.is_whitespace() || TOKEN_DELIMITERS.contains(&ch)
    })
}

/// Like `token_at`, but also stops at call and operator punctuation.
pub(crate) fn word_at(line: &str, offset: usize) -> &str {
    span_at(line, offset, |ch| {
        ch.is_whitespace() || TOKEN_DELIMITERS.contains(&ch) || WORD_DELIMITERS.contains(&ch)
    })
}

fn span_at(line: &str, offset: usize, is_delimiter: impl Fn(char) -> bool) -> &str {
    let offset = offset.min(line.len());
    let start = line[..offset]
        .char_indices()
        .rev()
        .find(|(_, ch)| is_delimiter(*ch))
        .map(|(index, ch)| index + ch.len_utf8())
        .unwrap_or(0);
    let end = line[offset..]
        .char_indices()
        .find(|(_, ch)| is_delimiter(*ch))
        .map(|(index, _)| offset + index)
        .unwrap_or(line.len());
    &line[start..end]
}

/// Root-to-leaf chain of the elements covering the cursor. `column` is the
/// 0-based character column.
pub(crate) fn element_chain(
    root: &XmlElementNode,
    line: usize,
    column: usize,
) -> Vec<&XmlElementNode> {
    let mut chain = Vec::new();
    if !covers(root, line, column) {
        return chain;
    }
    let mut current = root;
    chain.push(root);
    while let Some(child) = current
        .element_children()
        .find(|child| covers(child, line, column))
    {
        chain.push(child);
        current = child;
    }
    chain
}

fn covers(node: &XmlElementNode, line: usize, column: usize) -> bool {
    let cursor = (line, column + 1);
    let start = (node.location.start.line, node.location.start.column);
    let end = (node.location.end.line, node.location.end.column);
    start <= cursor && cursor <= end
}

/// Name of the last tag opened on the line before the cursor; used when the
/// file does not parse.
pub(crate) fn open_tag_before(line: &str, offset: usize) -> Option<&str> {
    let offset = offset.min(line.len());
    open_tag_regex()
        .captures_iter(&line[..offset])
        .last()
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

fn form_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\$(INFO|ESCINFO|VAR|ESCVAR|LOCALIZE|EXP|ADDON)\[").expect("form regex")
    })
}

fn open_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"<([A-Za-z][A-Za-z0-9_]*)").expect("open tag regex"))
}
