use std::fs;
use std::path::Path;

use kd_core::Diagnostic;
use kd_project::Project;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

pub(crate) fn check_encoding(project: &Project) -> Vec<Diagnostic> {
    project
        .all_window_file_paths()
        .iter()
        .flat_map(|path| match fs::read(path) {
            Ok(bytes) => check_bytes(path, &bytes),
            Err(error) => {
                log::info!("skipping {}: {}", path.display(), error);
                Vec::new()
            }
        })
        .collect()
}

fn check_bytes(path: &Path, bytes: &[u8]) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if bytes.starts_with(&UTF8_BOM) {
        diagnostics.push(Diagnostic::new(
            path,
            1,
            "encoding",
            "BOM",
            "Found UTF-8 BOM",
        ));
    }
    if let Err(error) = std::str::from_utf8(bytes) {
        let line = line_at(bytes, error.valid_up_to());
        diagnostics.push(Diagnostic::new(
            path,
            line,
            "encoding",
            "UTF-8",
            "File is not valid UTF-8",
        ));
    }

    let mut windows = None;
    let mut mac = None;
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'\r' {
            continue;
        }
        if bytes.get(index + 1) == Some(&b'\n') {
            windows.get_or_insert(index);
        } else {
            mac.get_or_insert(index);
        }
    }
    if let Some(offset) = windows {
        diagnostics.push(Diagnostic::new(
            path,
            line_at(bytes, offset),
            "encoding",
            "CRLF",
            "Windows line endings detected",
        ));
    }
    if let Some(offset) = mac {
        diagnostics.push(Diagnostic::new(
            path,
            line_at(bytes, offset),
            "encoding",
            "CR",
            "Mac line endings detected",
        ));
    }
    diagnostics
}

/// 1-based line of byte `offset`, counting both `\n` and lone `\r` breaks.
fn line_at(bytes: &[u8], offset: usize) -> usize {
    let end = offset.min(bytes.len());
    1 + (0..end)
        .filter(|&index| match bytes[index] {
            b'\n' => true,
            b'\r' => bytes.get(index + 1) != Some(&b'\n'),
            _ => false,
        })
        .count()
}

#[cfg(test)]
mod encoding_tests {
    use super::*;
    use crate::{run_check, CheckKind};
    use kd_core::Settings;
    use kd_project::HostApp;
    use kd_test_fixture::TempProject;

    fn messages(bytes: &[u8]) -> Vec<(String, usize)> {
        check_bytes(Path::new("Home.xml"), bytes)
            .into_iter()
            .map(|item| (item.message, item.line))
            .collect()
    }

    #[test]
    fn clean_file_has_no_findings() {
        assert!(messages(b"<window>\n</window>\n").is_empty());
    }

    #[test]
    fn bom_and_line_endings() {
        assert_eq!(
            messages(b"\xEF\xBB\xBF<window>\r\n</window>\r\n"),
            vec![
                ("Found UTF-8 BOM".to_string(), 1),
                ("Windows line endings detected".to_string(), 1),
            ]
        );
        assert_eq!(
            messages(b"<window>\n<a/>\r<b/>\n</window>"),
            vec![("Mac line endings detected".to_string(), 2)]
        );
    }

    #[test]
    fn invalid_utf8_points_at_its_line() {
        assert_eq!(
            messages(b"<window>\n<label>caf\xE9</label>\n</window>"),
            vec![("File is not valid UTF-8".to_string(), 2)]
        );
    }

    #[test]
    fn pass_covers_every_window_file() {
        let skin = TempProject::skin("encoding", &["1080i"]);
        skin.write_bytes("1080i/Home.xml", b"<window>\r\n</window>\r\n");
        skin.write("1080i/DialogBusy.xml", "<window/>\n");
        skin.write_bytes("1080i/Font.xml", b"\xEF\xBB\xBF<fonts/>");
        let project = Project::open(skin.root(), &Settings::default()).expect("project");
        let findings = run_check(&project, &HostApp::default(), CheckKind::Encoding);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file_name(), "Home.xml");
        assert_eq!(findings[0].identifier, "CRLF");
    }
}
