use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use kd_core::Diagnostic;
use kd_parser::XmlElementNode;
use kd_project::{Project, ReferenceData};
use regex::Regex;

use crate::{parsed_window_files, Reference};

const EXPRESSION_TAGS: [&str; 6] = [
    "visible",
    "enable",
    "usealttexture",
    "selected",
    "onclick",
    "onback",
];
/// Window-scoped functions besides the `*Window` builtins.
const WINDOW_FUNCTIONS: [&str; 3] = ["dialog.close", "window.isactive", "window.isvisible"];
/// Numeric arguments of these are neither window nor control ids.
const NON_CONTROL_MARKERS: [&str; 10] = [
    "window",
    "isactive",
    "row",
    "column",
    "listitem",
    "position",
    "property",
    "idletime",
    "alarmclock",
    "playlist",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdScope {
    Window,
    Control,
}

/// Classifies one `Name(number)` call.
fn classify(function: &str) -> Option<IdScope> {
    let function = function.to_lowercase();
    if WINDOW_FUNCTIONS.contains(&function.as_str()) || function.ends_with("window") {
        return Some(IdScope::Window);
    }
    if NON_CONTROL_MARKERS
        .iter()
        .any(|marker| function.contains(marker))
    {
        return None;
    }
    Some(IdScope::Control)
}

pub(crate) fn check_ids(project: &Project, reference: &ReferenceData) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for folder in project.xml_folders() {
        let documents = parsed_window_files(project, folder);
        let window_ids: BTreeSet<&str> = documents
            .iter()
            .filter_map(|(_, document)| document.root.attr("id"))
            .map(str::trim)
            .collect();

        let mut window_refs = Vec::new();
        for (path, document) in &documents {
            let defined: BTreeSet<&str> = document
                .root
                .descendants()
                .into_iter()
                .filter_map(|node| node.attr("id"))
                .map(str::trim)
                .collect();
            let mut control_refs = Vec::new();
            for node in id_sources(&document.root) {
                for source in node
                    .attr("condition")
                    .into_iter()
                    .chain(expression_text(node))
                {
                    collect_calls(source, node, path, &mut window_refs, &mut control_refs);
                }
            }
            for item in control_refs {
                if !defined.contains(item.name.as_str()) {
                    let message = format!("Control / Item ID not defined: {}", item.name);
                    diagnostics.push(item.into_diagnostic(message));
                }
            }
        }

        for item in window_refs {
            if window_ids.contains(item.name.as_str()) {
                continue;
            }
            let known = item
                .name
                .parse::<u32>()
                .ok()
                .and_then(|id| reference.window_by_id(id));
            let message = match known {
                Some(window) => format!(
                    "Window id: Please use {} instead of {}",
                    window.name, item.name
                ),
                None => format!("Window ID not defined: {}", item.name),
            };
            diagnostics.push(item.into_diagnostic(message));
        }
    }
    diagnostics
}

/// Elements carrying a `condition` attribute or an expression body.
fn id_sources(root: &XmlElementNode) -> Vec<&XmlElementNode> {
    root.descendants()
        .into_iter()
        .filter(|node| node.has_attr("condition") || EXPRESSION_TAGS.contains(&node.name.as_str()))
        .collect()
}

fn expression_text(node: &XmlElementNode) -> Option<&str> {
    if EXPRESSION_TAGS.contains(&node.name.as_str()) {
        node.text()
    } else {
        None
    }
}

fn collect_calls(
    source: &str,
    node: &XmlElementNode,
    path: &Path,
    window_refs: &mut Vec<Reference>,
    control_refs: &mut Vec<Reference>,
) {
    for captures in call_regex().captures_iter(source) {
        let reference = Reference::new(&captures[2], &node.name, path, node.line());
        match classify(&captures[1]) {
            Some(IdScope::Window) => window_refs.push(reference),
            Some(IdScope::Control) => control_refs.push(reference),
            None => {}
        }
    }
}

fn call_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z][A-Za-z0-9_.]*)\(\s*([0-9]+)\s*(?:,[^)]*)?\)").expect("call regex")
    })
}

#[cfg(test)]
mod ids_tests {
    use super::*;
    use crate::{run_check, CheckKind};
    use kd_core::Settings;
    use kd_project::HostApp;
    use kd_test_fixture::TempProject;

    #[test]
    fn calls_are_classified_by_function_name() {
        assert_eq!(classify("Window"), Some(IdScope::Window));
        assert_eq!(classify("Window.IsActive"), Some(IdScope::Window));
        assert_eq!(classify("Dialog.Close"), Some(IdScope::Window));
        assert_eq!(classify("ActivateWindow"), Some(IdScope::Window));
        assert_eq!(classify("Control.IsVisible"), Some(IdScope::Control));
        assert_eq!(classify("SetFocus"), Some(IdScope::Control));
        assert_eq!(classify("Container.Row"), None);
        assert_eq!(classify("ListItem"), None);
        assert_eq!(classify("Window.Property"), None);
    }

    #[test]
    fn known_window_ids_get_a_symbolic_hint() {
        let skin = TempProject::skin("windows", &["1080i"]);
        skin.write(
            "1080i/Custom_1100.xml",
            "<window id=\"1100\">\n<controls/>\n</window>\n",
        );
        skin.write(
            "1080i/Home.xml",
            r#"<window>
	<controls>
		<control type="button" id="9000">
			<visible>Window(10000) | Window.IsVisible(1100)</visible>
			<onclick condition="Window.IsActive(4242)">ActivateWindow(1100)</onclick>
		</control>
	</controls>
</window>
"#,
        );
        let project = Project::open(skin.root(), &Settings::default()).expect("project");
        let findings = run_check(&project, &HostApp::default(), CheckKind::Id);
        let messages: Vec<&str> = findings.iter().map(|item| item.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Window id: Please use home instead of 10000",
                "Window ID not defined: 4242",
            ]
        );
        assert_eq!(findings[0].line, 4);
        assert_eq!(findings[0].identifier, "10000");
        assert_eq!(findings[1].kind, "onclick");
    }

    #[test]
    fn control_ids_resolve_within_the_same_file() {
        let skin = TempProject::skin("controls", &["1080i"]);
        skin.write(
            "1080i/Home.xml",
            r#"<window>
	<controls>
		<control type="list" id="50">
			<visible>Control.HasFocus(50) + Container(50).Row(3)</visible>
			<onclick>SetFocus(60)</onclick>
		</control>
		<control type="image" id="70">
			<visible condition="true">Control.IsVisible(51) + Container(50).ListItem(2).Label</visible>
		</control>
	</controls>
</window>
"#,
        );
        skin.write(
            "1080i/DialogBusy.xml",
            "<window>\n<controls>\n<control type=\"image\" id=\"60\"/>\n</controls>\n</window>\n",
        );
        let project = Project::open(skin.root(), &Settings::default()).expect("project");
        let findings = run_check(&project, &HostApp::default(), CheckKind::Id);
        let messages: Vec<&str> = findings.iter().map(|item| item.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Control / Item ID not defined: 60",
                "Control / Item ID not defined: 51",
            ]
        );
        assert_eq!(findings[0].line, 5);
        assert_eq!(findings[1].line, 8);
    }
}
