use std::path::Path;

use kd_context::Explanation;
use kd_core::{Diagnostic, FileLocation, KdError};

use crate::{map_cli_output, OutputFormat};

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub(crate) fn diagnostic_lines(
    diagnostics: &[Diagnostic],
    root: &Path,
    format: OutputFormat,
) -> Result<Vec<String>, KdError> {
    if format == OutputFormat::Json {
        return Ok(vec![
            serde_json::to_string_pretty(diagnostics).map_err(map_cli_output)?
        ]);
    }
    let mut lines = vec!["RESULT:OK".to_string()];
    lines.extend(diagnostics.iter().map(|item| {
        format!(
            "DIAGNOSTIC:{}:{}|{}|{}",
            display_path(&item.file, root),
            item.line,
            item.kind,
            json_string(&item.message)
        )
    }));
    lines.push(format!("COUNT:{}", diagnostics.len()));
    Ok(lines)
}

pub(crate) fn explanation_lines(
    explanation: Option<&Explanation>,
    format: OutputFormat,
) -> Result<Vec<String>, KdError> {
    if format == OutputFormat::Json {
        return Ok(vec![serde_json::to_string(&explanation).map_err(map_cli_output)?]);
    }
    let mut lines = vec!["RESULT:OK".to_string()];
    match explanation {
        Some(explanation) => {
            let kind = serde_json::to_value(explanation.kind).map_err(map_cli_output)?;
            lines.push(format!("KIND:{}", kind.as_str().unwrap_or_default()));
            lines.push(format!("MARKUP_JSON:{}", json_string(&explanation.markup)));
        }
        None => lines.push("KIND:NONE".to_string()),
    }
    Ok(lines)
}

pub(crate) fn location_lines(location: Option<&FileLocation>) -> Vec<String> {
    let target = location
        .map(|location| format!("{}:{}", location.path.display(), location.line))
        .unwrap_or_else(|| "NONE".to_string());
    vec!["RESULT:OK".to_string(), format!("LOCATION:{}", target)]
}

pub(crate) fn label_lines(id: u32, reference: &str) -> Vec<String> {
    vec![
        "RESULT:OK".to_string(),
        format!("LABEL_ID:{}", id),
        format!("REFERENCE_JSON:{}", json_string(reference)),
    ]
}

pub(crate) fn missing_window_lines(missing: &[(String, Vec<String>)]) -> Vec<String> {
    let mut lines = vec!["RESULT:OK".to_string()];
    for (folder, files) in missing {
        lines.extend(files.iter().map(|file| format!("MISSING:{}|{}", folder, file)));
    }
    lines
}

pub(crate) fn emit(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
