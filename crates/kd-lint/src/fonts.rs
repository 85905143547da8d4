use std::collections::BTreeSet;

use kd_core::Diagnostic;
use kd_project::{HostApp, Project};

pub(crate) fn check_fonts(project: &Project, host: &HostApp) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let font_refs = project.get_font_refs();
    let default_fonts: BTreeSet<&str> = host.default_fonts.iter().map(String::as_str).collect();

    for folder in project.xml_folders() {
        let fonts = project.fonts(folder);
        let refs = font_refs.get(folder).map(Vec::as_slice).unwrap_or_default();
        let mut defined: BTreeSet<&str> = fonts.iter().map(|font| font.name.as_str()).collect();
        defined.insert("-");
        defined.extend(default_fonts.iter().copied());

        for reference in refs {
            if reference.name.starts_with('$') || defined.contains(reference.name.as_str()) {
                continue;
            }
            diagnostics.push(Diagnostic::new(
                &reference.file,
                reference.line,
                "font",
                &reference.name,
                format!("Font not defined: {}", reference.name),
            ));
        }

        let used: BTreeSet<&str> = refs.iter().map(|reference| reference.name.as_str()).collect();
        for font in fonts {
            let name = font.name.as_str();
            if used.contains(name) || default_fonts.contains(name) {
                continue;
            }
            diagnostics.push(Diagnostic::new(
                &font.file,
                font.line,
                "font",
                name,
                format!("Unused font: {}", name),
            ));
        }
    }
    diagnostics
}

#[cfg(test)]
mod fonts_tests {
    use crate::{run_check, CheckKind};
    use kd_core::Settings;
    use kd_project::{HostApp, Project};
    use kd_test_fixture::TempProject;

    fn skin() -> TempProject {
        let skin = TempProject::skin("fonts", &["1080i"]);
        skin.write(
            "1080i/Font.xml",
            "<fonts>\n<fontset id=\"Default\">\n<font><name>font12</name><filename>a.ttf</filename><size>12</size></font>\n<font><name>font_unused</name><filename>a.ttf</filename><size>40</size></font>\n<font><name>font_clock</name><filename>a.ttf</filename><size>60</size></font>\n</fontset>\n</fonts>\n",
        );
        skin.write(
            "1080i/Home.xml",
            "<window>\n<controls>\n<control type=\"label\"><font>font12</font></control>\n<control type=\"label\"><font>font_missing</font></control>\n<control type=\"label\"><font>font13</font></control>\n<control type=\"label\"><font>$PARAM[font]</font></control>\n<control type=\"label\"><font>-</font></control>\n</controls>\n</window>\n",
        );
        skin
    }

    #[test]
    fn default_skin_fonts_are_an_implicit_pool() {
        let skin = skin();
        let project = Project::open(skin.root(), &Settings::default()).expect("project");
        let host = HostApp {
            default_fonts: vec!["font13".to_string(), "font_clock".to_string()],
            ..HostApp::default()
        };
        let findings = run_check(&project, &host, CheckKind::Font);
        let messages: Vec<&str> = findings.iter().map(|item| item.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Font not defined: font_missing", "Unused font: font_unused"]
        );
        assert_eq!(findings[0].line, 4);
        assert_eq!(findings[1].file_name(), "Font.xml");
    }

    #[test]
    fn without_host_fonts_everything_must_be_local() {
        let skin = skin();
        let project = Project::open(skin.root(), &Settings::default()).expect("project");
        let findings = run_check(&project, &HostApp::default(), CheckKind::Font);
        assert_eq!(findings.len(), 4);
        assert!(findings
            .iter()
            .any(|item| item.message == "Font not defined: font13"));
        assert!(findings
            .iter()
            .any(|item| item.message == "Unused font: font_clock"));
    }
}
