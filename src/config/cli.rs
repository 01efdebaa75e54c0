use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::recurrence::parse_date;

/// Command-line arguments for the invoicer binary.
#[derive(Debug, Parser)]
#[command(
    name = "invoicer",
    version,
    about = "Render a markdown invoice and deliver it as HTML, PDF and email"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INVOICER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Dotenv file supplying placeholder values; `.env` is used when present.
    #[arg(
        long = "env-file",
        env = "INVOICER_ENV_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render the invoice and produce every enabled artifact.
    Run(RunArgs),
    /// Resolve values and assets and render without writing or sending anything.
    Check(CheckArgs),
    /// Print the cron expression for the configured recurrence.
    Schedule(ScheduleArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Run(RunArgs::default())
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: RunOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub template: TemplateOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct TemplateOverrides {
    /// Override the markdown template path.
    #[arg(long = "template", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub template: Option<PathBuf>,

    /// Override the directory holding referenced images.
    #[arg(long = "assets-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub assets_dir: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD).
    #[arg(long = "as-of", value_name = "DATE", value_parser = parse_as_of)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RunOverrides {
    #[command(flatten)]
    pub template: TemplateOverrides,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    /// Override the directory receiving HTML and PDF artifacts.
    #[arg(long = "output-dir", value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Write `<output-dir>/<date>.html`.
    #[arg(long = "html", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub html: Option<bool>,

    /// Write `<output-dir>/<date>.pdf`.
    #[arg(long = "pdf", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub pdf: Option<bool>,

    /// Send the invoice by email.
    #[arg(long = "email", value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub email: Option<bool>,

    /// Override the PDF converter executable.
    #[arg(long = "pdf-converter-path", value_name = "PATH")]
    pub pdf_converter_path: Option<PathBuf>,
}

impl Command {
    /// Date override supplied on the command line, if any.
    pub fn as_of(&self) -> Option<NaiveDate> {
        match self {
            Command::Run(args) => args.overrides.template.as_of,
            Command::Check(args) => args.template.as_of,
            Command::Schedule(_) => None,
        }
    }
}

fn parse_as_of(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|err| err.to_string())
}
