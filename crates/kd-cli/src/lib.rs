use std::ffi::OsString;
use std::str::FromStr;

use clap::Parser;
use kd_api::DevKit;
use kd_context::Position;
use kd_core::KdError;
use kd_lint::CheckKind;

mod cli_args;
mod error_map;
mod report;
mod source_loader;

pub(crate) use cli_args::{
    CheckArgs, Cli, GlobalArgs, GotoArgs, Mode, NewLabelArgs, OutputFormat, ProjectArgs,
    ResolveArgs,
};
pub(crate) use error_map::{emit_error, map_cli_output, map_cli_source_path, map_cli_source_read};
pub(crate) use source_loader::{
    find_project_root, load_settings, read_source, resolve_input_path, resolve_project_dir,
};

/// Exit code when a check reported findings.
pub const EXIT_FINDINGS: i32 = 2;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    init_logging(cli.global.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn run(cli: Cli) -> Result<i32, KdError> {
    let mut devkit = DevKit::new(load_settings(&cli.global)?)?;
    match cli.command {
        Mode::Check(args) => run_check(&mut devkit, args),
        Mode::Resolve(args) => run_resolve(&mut devkit, args),
        Mode::Goto(args) => run_goto(&mut devkit, args),
        Mode::NewLabel(args) => run_new_label(&mut devkit, args),
        Mode::MissingWindows(args) => run_missing_windows(&mut devkit, args),
    }
}

fn run_check(devkit: &mut DevKit, args: CheckArgs) -> Result<i32, KdError> {
    let kinds = if args.kinds.is_empty() {
        CheckKind::ALL.to_vec()
    } else {
        args.kinds
            .iter()
            .map(|raw| CheckKind::from_str(raw))
            .collect::<Result<Vec<_>, _>>()?
    };
    let root = resolve_project_dir(&args.project)?;
    devkit.open_project(&root)?;

    let diagnostics = if args.files.is_empty() {
        devkit.run_checks(&kinds)?
    } else {
        let mut diagnostics = Vec::new();
        for file in &args.files {
            let path = resolve_input_path(&root.join(file))?;
            diagnostics.extend(devkit.check_file(&path)?);
        }
        diagnostics
    };
    log::info!("{} diagnostics", diagnostics.len());

    report::emit(&report::diagnostic_lines(&diagnostics, &root, args.format)?);
    Ok(if diagnostics.is_empty() { 0 } else { EXIT_FINDINGS })
}

fn run_resolve(devkit: &mut DevKit, args: ResolveArgs) -> Result<i32, KdError> {
    let file = resolve_input_path(&args.file)?;
    let root = match &args.project {
        Some(project) => resolve_project_dir(project)?,
        None => find_project_root(&file)?,
    };
    devkit.open_project(&root)?;
    let text = read_source(&file)?;
    let explanation = devkit.resolve(
        &file,
        &text,
        Position {
            line: args.line,
            column: args.column,
        },
    )?;
    report::emit(&report::explanation_lines(explanation.as_ref(), args.format)?);
    Ok(0)
}

fn run_goto(devkit: &mut DevKit, args: GotoArgs) -> Result<i32, KdError> {
    let root = resolve_project_dir(&args.project)?;
    let project = devkit.open_project(&root)?;
    let folder = match args.folder {
        Some(folder) => folder,
        None => project.xml_folders().first().cloned().unwrap_or_default(),
    };
    let location = devkit.go_to_tag(&args.keyword, &folder)?;
    report::emit(&report::location_lines(location.as_ref()));
    Ok(0)
}

fn run_new_label(devkit: &mut DevKit, args: NewLabelArgs) -> Result<i32, KdError> {
    let root = resolve_project_dir(&args.project)?;
    devkit.open_project(&root)?;
    let (id, reference) = devkit.create_new_label(&args.text, &args.file)?;
    report::emit(&report::label_lines(id, &reference));
    Ok(0)
}

fn run_missing_windows(devkit: &mut DevKit, args: ProjectArgs) -> Result<i32, KdError> {
    let root = resolve_project_dir(&args.project)?;
    devkit.open_project(&root)?;
    let missing = devkit.missing_window_files()?;
    report::emit(&report::missing_window_lines(&missing));
    Ok(0)
}
