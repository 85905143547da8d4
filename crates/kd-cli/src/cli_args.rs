use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "kodidevkit")]
#[command(about = "Kodi skin knowledge base and validator")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) global: GlobalArgs,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

/// Settings overrides shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct GlobalArgs {
    #[arg(long = "settings", global = true)]
    pub(crate) settings: Option<PathBuf>,
    #[arg(long = "kodi-path", global = true)]
    pub(crate) kodi_path: Option<PathBuf>,
    #[arg(long = "userdata-folder", global = true)]
    pub(crate) userdata_folder: Option<PathBuf>,
    #[arg(long = "language-folder", global = true)]
    pub(crate) language_folders: Vec<String>,
    #[arg(long = "portable", global = true)]
    pub(crate) portable: bool,
    #[arg(short = 'v', long = "verbose", global = true)]
    pub(crate) verbose: bool,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Run validation passes over a project.
    Check(CheckArgs),
    /// Explain the token at a cursor position.
    Resolve(ResolveArgs),
    /// Print the definition site of a label id, include, font or color.
    Goto(GotoArgs),
    /// Add a string to the primary catalog.
    NewLabel(NewLabelArgs),
    /// List core window files the skin does not ship.
    MissingWindows(ProjectArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    pub(crate) project: PathBuf,
    /// Pass to run; repeat for several. Defaults to every pass.
    #[arg(long = "kind")]
    pub(crate) kinds: Vec<String>,
    /// Limit the structural pass to these window files.
    #[arg(long = "file")]
    pub(crate) files: Vec<PathBuf>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Debug, Args)]
pub(crate) struct ResolveArgs {
    pub(crate) file: PathBuf,
    #[arg(long = "line")]
    pub(crate) line: usize,
    #[arg(long = "column")]
    pub(crate) column: usize,
    /// Project root; found by walking up from the file when omitted.
    #[arg(long = "project")]
    pub(crate) project: Option<PathBuf>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Debug, Args)]
pub(crate) struct GotoArgs {
    pub(crate) project: PathBuf,
    pub(crate) keyword: String,
    /// XML folder to search; the first declared folder by default.
    #[arg(long = "folder")]
    pub(crate) folder: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct NewLabelArgs {
    pub(crate) project: PathBuf,
    #[arg(long = "text")]
    pub(crate) text: String,
    /// Project-relative file the label is used in.
    #[arg(long = "file")]
    pub(crate) file: String,
}

#[derive(Debug, Args)]
pub(crate) struct ProjectArgs {
    pub(crate) project: PathBuf,
}
