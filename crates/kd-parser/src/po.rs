use std::fs;
use std::path::Path;

use kd_core::KdError;

/// A gettext message catalog as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoDocument {
    pub header_comments: Vec<String>,
    pub metadata: Vec<(String, String)>,
    pub entries: Vec<PoEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoEntry {
    pub msgctxt: Option<String>,
    pub msgid: String,
    pub msgstr: String,
    pub occurrences: Vec<PoOccurrence>,
    pub comments: Vec<String>,
    pub flags: Vec<String>,
    /// 1-based line where the entry starts (`msgctxt` or `msgid`).
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoOccurrence {
    pub path: String,
    pub line: Option<usize>,
}

impl PoDocument {
    /// Fresh catalog with a complete metadata header.
    pub fn with_header(project_id: &str) -> Self {
        let now = timestamp();
        let metadata = [
            ("Project-Id-Version", project_id.to_string()),
            ("Report-Msgid-Bugs-To", String::new()),
            ("POT-Creation-Date", now.clone()),
            ("PO-Revision-Date", now),
            ("Last-Translator", "Kodi Translation Team".to_string()),
            ("Language-Team", "English".to_string()),
            ("MIME-Version", "1.0".to_string()),
            ("Content-Type", "text/plain; charset=utf-8".to_string()),
            ("Content-Transfer-Encoding", "8bit".to_string()),
            ("Language", "en".to_string()),
        ];
        Self {
            header_comments: vec![format!("{} language file", project_id)],
            metadata: metadata
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            entries: Vec::new(),
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.metadata.iter_mut().find(|(name, _)| name == key) {
            slot.1 = value;
        } else {
            self.metadata.push((key.to_string(), value));
        }
    }

    pub fn touch_revision_date(&mut self) {
        self.set_metadata("PO-Revision-Date", timestamp());
        if self.metadata_value("Content-Type").is_none() {
            self.set_metadata("Content-Type", "text/plain; charset=utf-8");
        }
    }
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M%z").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    Msgstr,
    Ignored,
}

#[derive(Debug, Default)]
struct PendingEntry {
    entry: PoEntry,
    has_msgid: bool,
    has_content: bool,
}

impl PendingEntry {
    fn mark_line(&mut self, line: usize) {
        if self.entry.line == 0 {
            self.entry.line = line;
        }
    }
}

pub fn parse_po_file(path: &Path) -> Result<PoDocument, KdError> {
    let raw = fs::read_to_string(path).map_err(|error| KdError::io(error, path))?;
    parse_po_document(&raw).map_err(|error| KdError {
        message: format!("Error in {}: {}", path.display(), error.message),
        path: Some(path.to_path_buf()),
        ..error
    })
}

pub fn parse_po_document(source: &str) -> Result<PoDocument, KdError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut document = PoDocument::default();
    let mut pending = PendingEntry::default();
    let mut field = Field::Ignored;
    let mut leading_comments = Vec::new();

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            finish_entry(&mut document, &mut pending, &mut leading_comments);
            field = Field::Ignored;
            continue;
        }

        if line.starts_with("#~") {
            field = Field::Ignored;
            continue;
        }

        if let Some(rest) = line.strip_prefix("#:") {
            if pending.has_msgid {
                finish_entry(&mut document, &mut pending, &mut leading_comments);
            }
            pending.has_content = true;
            for token in rest.split_whitespace() {
                pending.entry.occurrences.push(parse_occurrence(token));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("#,") {
            if pending.has_msgid {
                finish_entry(&mut document, &mut pending, &mut leading_comments);
            }
            pending.has_content = true;
            pending.entry.flags.extend(
                rest.split(',')
                    .map(str::trim)
                    .filter(|flag| !flag.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        if let Some(rest) = line.strip_prefix('#') {
            if pending.has_msgid {
                finish_entry(&mut document, &mut pending, &mut leading_comments);
            }
            let comment = rest.strip_prefix('.').unwrap_or(rest).trim();
            if document.entries.is_empty() && document.metadata.is_empty() && !pending.has_content
            {
                leading_comments.push(comment.to_string());
            } else {
                pending.has_content = true;
                pending.entry.comments.push(comment.to_string());
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("msgctxt") {
            if pending.has_msgid {
                finish_entry(&mut document, &mut pending, &mut leading_comments);
            }
            pending.mark_line(line_number);
            pending.has_content = true;
            pending.entry.msgctxt = Some(parse_quoted(rest, line_number)?);
            field = Field::Msgctxt;
            continue;
        }

        if let Some(rest) = line.strip_prefix("msgid_plural") {
            parse_quoted(rest, line_number)?;
            field = Field::Ignored;
            continue;
        }

        if let Some(rest) = line.strip_prefix("msgid") {
            if pending.has_msgid {
                finish_entry(&mut document, &mut pending, &mut leading_comments);
            }
            pending.mark_line(line_number);
            pending.has_content = true;
            pending.has_msgid = true;
            pending.entry.msgid = parse_quoted(rest, line_number)?;
            field = Field::Msgid;
            continue;
        }

        if let Some(rest) = line.strip_prefix("msgstr") {
            if !pending.has_msgid {
                return Err(KdError::new(
                    "PO_PARSE_ERROR",
                    format!("msgstr without msgid at line {}", line_number),
                ));
            }
            let (plural_index, rest) = split_plural_index(rest);
            let value = parse_quoted(rest, line_number)?;
            if plural_index.unwrap_or(0) == 0 {
                pending.entry.msgstr = value;
                field = Field::Msgstr;
            } else {
                field = Field::Ignored;
            }
            continue;
        }

        if line.starts_with('"') {
            let value = parse_quoted(line, line_number)?;
            match field {
                Field::Msgctxt => {
                    if let Some(context) = pending.entry.msgctxt.as_mut() {
                        context.push_str(&value);
                    }
                }
                Field::Msgid => pending.entry.msgid.push_str(&value),
                Field::Msgstr => pending.entry.msgstr.push_str(&value),
                Field::Ignored => {}
            }
            continue;
        }

        return Err(KdError::new(
            "PO_PARSE_ERROR",
            format!("Unexpected content at line {}: {}", line_number, line),
        ));
    }

    finish_entry(&mut document, &mut pending, &mut leading_comments);
    if document.header_comments.is_empty() {
        document.header_comments = leading_comments;
    }
    Ok(document)
}

fn finish_entry(
    document: &mut PoDocument,
    pending: &mut PendingEntry,
    leading_comments: &mut Vec<String>,
) {
    let finished = std::mem::take(pending);
    if !finished.has_msgid {
        if finished.has_content {
            log::debug!("dropping catalog fragment without msgid near line {}", finished.entry.line);
        }
        return;
    }

    let entry = finished.entry;
    let is_header = entry.msgid.is_empty()
        && entry.msgctxt.is_none()
        && document.entries.is_empty()
        && document.metadata.is_empty();
    if is_header {
        document.header_comments = std::mem::take(leading_comments);
        document.header_comments.extend(entry.comments);
        for line in entry.msgstr.split('\n') {
            if let Some((key, value)) = line.split_once(':') {
                document
                    .metadata
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
        }
        return;
    }

    document.entries.push(entry);
}

fn parse_occurrence(token: &str) -> PoOccurrence {
    match token.rsplit_once(':') {
        Some((path, line)) if line.chars().all(|ch| ch.is_ascii_digit()) && !line.is_empty() => {
            PoOccurrence {
                path: path.to_string(),
                line: line.parse().ok(),
            }
        }
        _ => PoOccurrence {
            path: token.to_string(),
            line: None,
        },
    }
}

fn split_plural_index(rest: &str) -> (Option<usize>, &str) {
    let Some(inner) = rest.strip_prefix('[') else {
        return (None, rest);
    };
    match inner.split_once(']') {
        Some((index, tail)) => (index.trim().parse().ok(), tail),
        None => (None, rest),
    }
}

fn parse_quoted(raw: &str, line_number: usize) -> Result<String, KdError> {
    let raw = raw.trim();
    let inner = raw
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .ok_or_else(|| {
            KdError::new(
                "PO_PARSE_ERROR",
                format!("Expected quoted string at line {}: {}", line_number, raw),
            )
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                return Err(KdError::new(
                    "PO_PARSE_ERROR",
                    format!("Dangling escape at line {}", line_number),
                ))
            }
        }
    }
    Ok(out)
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

pub fn write_po_document(document: &PoDocument) -> String {
    let mut out = String::new();
    for comment in &document.header_comments {
        if comment.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str(&format!("# {}\n", comment));
        }
    }
    out.push_str("msgid \"\"\n");
    out.push_str("msgstr \"\"\n");
    for (key, value) in &document.metadata {
        out.push_str(&quote(&format!("{}: {}\n", key, value)));
        out.push('\n');
    }

    for entry in &document.entries {
        out.push('\n');
        for comment in &entry.comments {
            out.push_str(&format!("#. {}\n", comment));
        }
        if !entry.occurrences.is_empty() {
            let refs = entry
                .occurrences
                .iter()
                .map(|occurrence| match occurrence.line {
                    Some(line) => format!("{}:{}", occurrence.path, line),
                    None => occurrence.path.clone(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("#: {}\n", refs));
        }
        if !entry.flags.is_empty() {
            out.push_str(&format!("#, {}\n", entry.flags.join(", ")));
        }
        if let Some(context) = &entry.msgctxt {
            out.push_str(&format!("msgctxt {}\n", quote(context)));
        }
        out.push_str(&format!("msgid {}\n", quote(&entry.msgid)));
        out.push_str(&format!("msgstr {}\n", quote(&entry.msgstr)));
    }
    out
}

#[cfg(test)]
mod po_tests {
    use super::*;

    const SAMPLE: &str = r##"# Kodi Media Center language file
# Addon Name: Sample Skin
msgid ""
msgstr ""
"Project-Id-Version: skin.sample\n"
"Content-Type: text/plain; charset=UTF-8\n"

#: /1080i/Home.xml:12
msgctxt "#31000"
msgid "Recently added"
msgstr ""

#. shown in the settings dialog
#: /1080i/Settings.xml
msgctxt "#31001"
msgid "Line one "
"line two"
msgstr "Zeile \"eins\""
"##;

    #[test]
    fn parse_reads_header_entries_and_occurrences() {
        let document = parse_po_document(SAMPLE).expect("catalog should parse");
        assert_eq!(document.metadata_value("Project-Id-Version"), Some("skin.sample"));
        assert_eq!(document.header_comments.len(), 2);
        assert_eq!(document.entries.len(), 2);

        let first = &document.entries[0];
        assert_eq!(first.msgctxt.as_deref(), Some("#31000"));
        assert_eq!(first.msgid, "Recently added");
        assert_eq!(first.line, 9);
        assert_eq!(
            first.occurrences,
            vec![PoOccurrence {
                path: "/1080i/Home.xml".to_string(),
                line: Some(12)
            }]
        );

        let second = &document.entries[1];
        assert_eq!(second.msgid, "Line one line two");
        assert_eq!(second.msgstr, "Zeile \"eins\"");
        assert_eq!(second.comments, vec!["shown in the settings dialog".to_string()]);
        assert_eq!(second.occurrences[0].line, None);
    }

    #[test]
    fn written_catalog_parses_back_with_same_entries() {
        let document = parse_po_document(SAMPLE).expect("catalog should parse");
        let written = write_po_document(&document);
        let reparsed = parse_po_document(&written).expect("written catalog should parse");
        assert_eq!(reparsed.metadata, document.metadata);
        assert_eq!(reparsed.entries.len(), document.entries.len());
        for (left, right) in reparsed.entries.iter().zip(&document.entries) {
            assert_eq!(left.msgctxt, right.msgctxt);
            assert_eq!(left.msgid, right.msgid);
            assert_eq!(left.msgstr, right.msgstr);
            assert_eq!(left.occurrences, right.occurrences);
        }
    }

    #[test]
    fn new_header_carries_project_and_charset() {
        let mut document = PoDocument::with_header("skin.sample");
        assert_eq!(document.metadata_value("Project-Id-Version"), Some("skin.sample"));
        assert_eq!(
            document.metadata_value("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        document.touch_revision_date();
        assert!(document.metadata_value("PO-Revision-Date").is_some());
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let error = parse_po_document("msgid \"a\"\nbogus line\n").expect_err("should fail");
        assert_eq!(error.code, "PO_PARSE_ERROR");
        let error = parse_po_document("msgid \"unterminated\n").expect_err("should fail");
        assert_eq!(error.code, "PO_PARSE_ERROR");
    }
}
