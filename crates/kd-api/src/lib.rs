use std::path::Path;

use kd_context::{resolve, Explanation, Position, ResolveContext};
use kd_core::{Diagnostic, FileLocation, KdError, Settings};
use kd_lint::{CheckKind, Checker};
use kd_project::{HostApp, Project, ReferenceData, ReloadOutcome, SchemaTemplate};

/// Explicit session state: settings, host data and at most one open project.
#[derive(Debug, Clone)]
pub struct DevKit {
    settings: Settings,
    host: HostApp,
    template: SchemaTemplate,
    reference: ReferenceData,
    project: Option<Project>,
}

impl DevKit {
    /// Loads host data for `settings` and the bundled reference documents.
    pub fn new(settings: Settings) -> Result<Self, KdError> {
        let host = HostApp::load(&settings);
        Ok(Self::with_data(
            settings,
            host,
            SchemaTemplate::builtin()?,
            ReferenceData::builtin()?,
        ))
    }

    pub fn with_data(
        settings: Settings,
        host: HostApp,
        template: SchemaTemplate,
        reference: ReferenceData,
    ) -> Self {
        Self {
            settings,
            host,
            template,
            reference,
            project: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn host(&self) -> &HostApp {
        &self.host
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Replaces the settings, reloads host data and reopens the current
    /// project so its catalogs follow the new language folders.
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), KdError> {
        self.host = HostApp::load(&settings);
        self.settings = settings;
        let root = self.project.as_ref().map(|project| project.root().to_path_buf());
        if let Some(root) = root {
            self.open_project(&root)?;
        }
        Ok(())
    }

    /// Drops any open project before indexing the new one.
    pub fn open_project(&mut self, path: &Path) -> Result<&Project, KdError> {
        self.project = None;
        let project = Project::open(path, &self.settings)?;
        log::info!(
            "opened {} ({} xml folders)",
            project.id(),
            project.xml_folders().len()
        );
        Ok(self.project.insert(project))
    }

    pub fn close_project(&mut self) {
        if let Some(project) = self.project.take() {
            log::info!("closed {}", project.id());
        }
    }

    pub fn project(&self) -> Result<&Project, KdError> {
        self.project.as_ref().ok_or_else(no_project_open)
    }

    /// Runs one validation pass against freshly listed window files.
    pub fn run_check(&mut self, kind: CheckKind) -> Result<Vec<Diagnostic>, KdError> {
        self.run_checks(&[kind])
    }

    pub fn run_checks(&mut self, kinds: &[CheckKind]) -> Result<Vec<Diagnostic>, KdError> {
        let project = self.project.as_mut().ok_or_else(no_project_open)?;
        project.update_xml_files();
        let checker = Checker::new(&*project, &self.host, &self.template, &self.reference);
        Ok(kinds.iter().flat_map(|kind| checker.run(*kind)).collect())
    }

    pub fn check_file(&self, path: &Path) -> Result<Vec<Diagnostic>, KdError> {
        Ok(self.checker()?.check_file(path))
    }

    pub fn resolve(
        &self,
        file: &Path,
        text: &str,
        position: Position,
    ) -> Result<Option<Explanation>, KdError> {
        let context = ResolveContext {
            project: self.project()?,
            host: &self.host,
            reference: &self.reference,
        };
        Ok(resolve(&context, file, text, position))
    }

    pub fn go_to_tag(&self, keyword: &str, folder: &str) -> Result<Option<FileLocation>, KdError> {
        Ok(self
            .project()?
            .go_to_tag(keyword, folder, &self.host.catalogs))
    }

    /// Adds `text` to the primary catalog and returns the id together with
    /// the reference to paste into `rel_path`.
    pub fn create_new_label(&mut self, text: &str, rel_path: &str) -> Result<(u32, String), KdError> {
        let project = self.project.as_mut().ok_or_else(no_project_open)?;
        let id = project.create_new_label(text, rel_path)?;
        Ok((id, project.translate_label_reference(id)))
    }

    pub fn reload(&mut self, changed: &Path) -> Result<ReloadOutcome, KdError> {
        let project = self.project.as_mut().ok_or_else(no_project_open)?;
        let outcome = project.reload(changed);
        log::debug!("reload {}: {:?}", changed.display(), outcome);
        Ok(outcome)
    }

    /// Core window files missing from every XML folder, per folder.
    pub fn missing_window_files(&self) -> Result<Vec<(String, Vec<String>)>, KdError> {
        let project = self.project()?;
        Ok(project
            .xml_folders()
            .iter()
            .map(|folder| {
                (
                    folder.clone(),
                    project.missing_window_files(folder, &self.reference),
                )
            })
            .collect())
    }

    fn checker(&self) -> Result<Checker<'_>, KdError> {
        Ok(Checker::new(
            self.project()?,
            &self.host,
            &self.template,
            &self.reference,
        ))
    }
}

fn no_project_open() -> KdError {
    KdError::new("NO_PROJECT_OPEN", "no project is open")
}

#[cfg(test)]
mod api_tests {
    use super::*;
    use kd_test_fixture::TempProject;

    fn devkit() -> DevKit {
        DevKit::new(Settings::default()).expect("devkit")
    }

    fn sample_skin(label: &str) -> TempProject {
        let skin = TempProject::skin(label, &["1080i"]);
        skin.write(
            "1080i/Includes.xml",
            "<includes>\n<include name=\"Background\"><control type=\"image\"/></include>\n</includes>\n",
        );
        skin.write(
            "1080i/Home.xml",
            "<window id=\"0\">\n<controls>\n<include>Background</include>\n<control type=\"label\"><label>31000</label></control>\n</controls>\n</window>\n",
        );
        skin.write(
            "language/resource.language.en_gb/strings.po",
            "msgid \"\"\nmsgstr \"\"\n\nmsgctxt \"#31000\"\nmsgid \"Home\"\nmsgstr \"\"\n",
        );
        skin
    }

    #[test]
    fn per_project_calls_need_an_open_project() {
        let mut kit = devkit();
        let code = |error: KdError| error.code;
        assert_eq!(kit.project().map(|_| ()).map_err(code), Err("NO_PROJECT_OPEN".to_string()));
        assert_eq!(
            kit.run_check(CheckKind::Label).map(|_| ()).map_err(code),
            Err("NO_PROJECT_OPEN".to_string())
        );
        assert_eq!(
            kit.go_to_tag("Background", "1080i").map(|_| ()).map_err(code),
            Err("NO_PROJECT_OPEN".to_string())
        );
        assert_eq!(
            kit.reload(Path::new("a.xml")).map(|_| ()).map_err(code),
            Err("NO_PROJECT_OPEN".to_string())
        );
    }

    #[test]
    fn directories_without_manifest_are_rejected() {
        let scratch = TempProject::new("no-manifest");
        let mut kit = devkit();
        let error = kit.open_project(scratch.root()).expect_err("not a project");
        assert_eq!(error.code, "NOT_A_PROJECT");
        assert!(kit.project().is_err());
    }

    #[test]
    fn clean_skin_checks_and_navigation() {
        let skin = sample_skin("api-clean");
        let mut kit = devkit();
        kit.open_project(skin.root()).expect("open");
        let findings = kit
            .run_checks(&[CheckKind::Include, CheckKind::Label, CheckKind::General])
            .expect("checks");
        assert!(findings.is_empty(), "{:?}", findings);

        let location = kit
            .go_to_tag("Background", "1080i")
            .expect("go to")
            .expect("location");
        assert_eq!(location.line, 2);
        assert!(location.path.ends_with("Includes.xml"));
        assert_eq!(kit.go_to_tag("Missing", "1080i").expect("go to"), None);
    }

    #[test]
    fn window_files_are_relisted_before_checks() {
        let skin = sample_skin("api-relist");
        let mut kit = devkit();
        kit.open_project(skin.root()).expect("open");
        skin.write(
            "1080i/DialogBusy.xml",
            "<window>\n<controls><control type=\"bogus\"/></controls>\n</window>\n",
        );
        let findings = kit.run_check(CheckKind::General).expect("general");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file_name(), "DialogBusy.xml");
        assert_eq!(
            kit.check_file(&skin.path("1080i/DialogBusy.xml"))
                .expect("file")
                .len(),
            1
        );
    }

    #[test]
    fn reopening_tears_down_the_previous_project() {
        let first = sample_skin("api-first");
        let second = sample_skin("api-second");
        let mut kit = devkit();
        kit.open_project(first.root()).expect("first");
        kit.open_project(second.root()).expect("second");
        assert_eq!(kit.project().expect("project").id(), "skin.api-second");
        kit.close_project();
        assert!(kit.project().is_err());
    }

    #[test]
    fn new_labels_and_reload() {
        let skin = sample_skin("api-labels");
        let mut kit = devkit();
        kit.open_project(skin.root()).expect("open");
        let (id, reference) = kit
            .create_new_label("Weather", "1080i/Home.xml")
            .expect("label");
        assert_eq!(id, 31001);
        assert_eq!(reference, "$LOCALIZE[31001]");
        let saved = std::fs::read_to_string(skin.path("language/resource.language.en_gb/strings.po"))
            .expect("catalog");
        assert!(saved.contains("msgctxt \"#31001\""));

        let outcome = kit
            .reload(&skin.path("1080i/Includes.xml"))
            .expect("reload");
        assert_eq!(outcome, ReloadOutcome::Includes("1080i".to_string()));
        let outcome = kit.reload(&skin.path("1080i/Home.xml")).expect("reload");
        assert_eq!(outcome, ReloadOutcome::WindowFiles);
    }

    #[test]
    fn resolve_goes_through_the_open_project() {
        let skin = sample_skin("api-resolve");
        let mut kit = devkit();
        let home = skin.path("1080i/Home.xml");
        let text = std::fs::read_to_string(&home).expect("home");
        let position = Position { line: 4, column: 30 };
        assert!(kit.resolve(&home, &text, position).is_err());
        kit.open_project(skin.root()).expect("open");
        let explanation = kit
            .resolve(&home, &text, position)
            .expect("resolve")
            .expect("explanation");
        assert_eq!(explanation.markup, "<b>resource.language.en_gb:</b> Home<br>");
    }

    #[test]
    fn missing_windows_are_listed_per_folder() {
        let skin = sample_skin("api-missing");
        let mut kit = devkit();
        kit.open_project(skin.root()).expect("open");
        let missing = kit.missing_window_files().expect("missing");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, "1080i");
        assert!(!missing[0].1.iter().any(|name| name == "Home.xml"));
        assert!(missing[0].1.iter().any(|name| name == "Settings.xml"));
    }
}
