//! Configuration layer: typed settings with layered precedence (file → dotenv → env → CLI).
//!
//! This is the only place that reads process state. Everything downstream receives
//! [`Settings`] by reference.

mod cli;

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::{error::DomainError, recurrence::RecurrenceSpec, values::ValueSet};
use crate::infra::pdf::DEFAULT_PDF_CONVERTER_PATH;

pub use cli::{
    CheckArgs, CliArgs, Command, LoggingOverrides, RunArgs, RunOverrides, ScheduleArgs,
    TemplateOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "invoicer";
const DEFAULT_ENV_FILE: &str = ".env";
const ENV_PREFIX: &str = "INVOICER";
const DEFAULT_TEMPLATE_PATH: &str = "template/invoice_template.md";
const DEFAULT_ASSETS_DIR: &str = "template/assets";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

// Flat value names accepted in place of the structured sections.
const VALUE_START_DATE: &str = "start_date";
const VALUE_INTERVAL_UNIT: &str = "interval_unit";
const VALUE_INTERVAL_QUANTITY: &str = "interval_quantity";
const VALUE_EMAIL: &str = "email";
const VALUE_RECIPIENT_EMAIL: &str = "recipient_email";
const VALUE_EMAIL_SERVER: &str = "email_server";
const VALUE_EMAIL_USERNAME: &str = "email_username";
const VALUE_EMAIL_PASSWORD: &str = "email_password";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub template: TemplateSettings,
    pub output: OutputSettings,
    pub schedule: ScheduleSettings,
    pub email: EmailSettings,
    pub pdf: PdfSettings,
    pub logging: LoggingSettings,
    pub values: ValueSet,
}

#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub path: PathBuf,
    /// `None` when assets are disabled with an empty path.
    pub assets_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    pub html: bool,
    pub pdf: bool,
    pub email: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            html: false,
            pdf: false,
            email: true,
        }
    }
}

/// Recurrence fields as configured; validated only when a number is needed.
#[derive(Debug, Clone, Default)]
pub struct ScheduleSettings {
    pub start_date: Option<String>,
    pub interval_unit: Option<String>,
    pub interval_quantity: Option<String>,
}

impl ScheduleSettings {
    pub fn recurrence(&self) -> Result<RecurrenceSpec, DomainError> {
        let missing: Vec<&str> = [
            (VALUE_START_DATE, &self.start_date),
            (VALUE_INTERVAL_UNIT, &self.interval_unit),
            (VALUE_INTERVAL_QUANTITY, &self.interval_quantity),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect();

        match (&self.start_date, &self.interval_unit, &self.interval_quantity) {
            (Some(start), Some(unit), Some(quantity)) => {
                RecurrenceSpec::parse(start, unit, quantity)
            }
            _ => Err(DomainError::configuration(format!(
                "{} required to calculate invoice_number",
                missing.join(", ")
            ))),
        }
    }
}

/// Envelope and SMTP fields as configured; validated only when email is sent.
#[derive(Clone)]
pub struct EmailSettings {
    pub from: Option<String>,
    pub recipient: Option<String>,
    pub server: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl EmailSettings {
    /// Require every field needed for delivery, naming all absent keys at once.
    pub fn delivery(&self) -> Result<DeliverySettings, DomainError> {
        match (
            &self.from,
            &self.recipient,
            &self.server,
            &self.username,
            &self.password,
        ) {
            (Some(from), Some(recipient), Some(server), Some(username), Some(password)) => {
                Ok(DeliverySettings {
                    from: from.clone(),
                    recipient: recipient.clone(),
                    smtp: SmtpSettings {
                        server: server.clone(),
                        port: self.port,
                        username: username.clone(),
                        password: password.clone(),
                        timeout: self.timeout,
                    },
                })
            }
            _ => {
                let missing: Vec<&str> = [
                    (VALUE_EMAIL, self.from.is_none()),
                    (VALUE_RECIPIENT_EMAIL, self.recipient.is_none()),
                    (VALUE_EMAIL_SERVER, self.server.is_none()),
                    (VALUE_EMAIL_USERNAME, self.username.is_none()),
                    (VALUE_EMAIL_PASSWORD, self.password.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, absent)| absent.then_some(key))
                .collect();
                Err(DomainError::configuration(format!(
                    "{} required to send email",
                    missing.join(", ")
                )))
            }
        }
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub from: String,
    pub recipient: String,
    pub smtp: SmtpSettings,
}

#[derive(Clone)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PdfSettings {
    pub converter_path: PathBuf,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("failed to read dotenv file {path}: {source}")]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings from the process environment using the configured precedence.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    load_from(cli, std::env::vars().collect())
}

/// Load settings with an explicit environment snapshot.
pub fn load_from(cli: &CliArgs, env: HashMap<String, String>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .source(Some(env.clone())),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Run(args)) => raw.apply_run_overrides(&args.overrides),
        Some(Command::Check(args)) => {
            raw.apply_template_overrides(&args.template);
            raw.apply_logging_overrides(&args.logging);
        }
        Some(Command::Schedule(args)) => raw.apply_logging_overrides(&args.logging),
        None => raw.apply_run_overrides(&RunOverrides::default()),
    }

    let mut values: ValueSet = std::mem::take(&mut raw.values).into_iter().collect();
    values.merge(read_dotenv(cli.env_file.as_deref())?);
    values.merge(env.into_iter().collect());

    Settings::from_raw(raw, values)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

fn read_dotenv(explicit: Option<&Path>) -> Result<ValueSet, LoadError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_ENV_FILE);
            if !default.is_file() {
                return Ok(ValueSet::new());
            }
            default
        }
    };

    let to_error = |source: dotenvy::Error| LoadError::Dotenv {
        path: path.clone(),
        source,
    };
    let mut values = ValueSet::new();
    for entry in dotenvy::from_path_iter(&path).map_err(to_error)? {
        let (key, value) = entry.map_err(to_error)?;
        values.insert(key, value);
    }
    Ok(values)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    template: RawTemplateSettings,
    output: RawOutputSettings,
    schedule: RawScheduleSettings,
    email: RawEmailSettings,
    pdf: RawPdfSettings,
    logging: RawLoggingSettings,
    values: HashMap<String, String>,
}

impl RawSettings {
    fn apply_run_overrides(&mut self, overrides: &RunOverrides) {
        self.apply_template_overrides(&overrides.template);
        self.apply_logging_overrides(&overrides.logging);
        if let Some(dir) = overrides.output_dir.as_ref() {
            self.template.output_dir = Some(dir.clone());
        }
        if let Some(html) = overrides.html {
            self.output.html = Some(html);
        }
        if let Some(pdf) = overrides.pdf {
            self.output.pdf = Some(pdf);
        }
        if let Some(email) = overrides.email {
            self.output.email = Some(email);
        }
        if let Some(path) = overrides.pdf_converter_path.as_ref() {
            self.pdf.converter_path = Some(path.clone());
        }
    }

    fn apply_template_overrides(&mut self, overrides: &TemplateOverrides) {
        if let Some(path) = overrides.template.as_ref() {
            self.template.path = Some(path.clone());
        }
        if let Some(dir) = overrides.assets_dir.as_ref() {
            self.template.assets_dir = Some(dir.clone());
        }
    }

    fn apply_logging_overrides(&mut self, overrides: &LoggingOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings, values: ValueSet) -> Result<Self, LoadError> {
        let RawSettings {
            template,
            output,
            schedule,
            email,
            pdf,
            logging,
            values: _,
        } = raw;

        let template = build_template_settings(template)?;
        let output = build_output_settings(output);
        let schedule = build_schedule_settings(schedule, &values);
        let email = build_email_settings(email, &values)?;
        let pdf = build_pdf_settings(pdf)?;
        let logging = build_logging_settings(logging)?;

        Ok(Self {
            template,
            output,
            schedule,
            email,
            pdf,
            logging,
            values,
        })
    }
}

fn build_template_settings(template: RawTemplateSettings) -> Result<TemplateSettings, LoadError> {
    let path = template
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_PATH));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid("template.path", "path must not be empty"));
    }

    let assets_dir = match template.assets_dir {
        Some(dir) if dir.as_os_str().is_empty() => None,
        Some(dir) => Some(dir),
        None => Some(PathBuf::from(DEFAULT_ASSETS_DIR)),
    };

    let output_dir = template
        .output_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if output_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "template.output_dir",
            "path must not be empty",
        ));
    }

    Ok(TemplateSettings {
        path,
        assets_dir,
        output_dir,
    })
}

fn build_output_settings(output: RawOutputSettings) -> OutputSettings {
    let defaults = OutputSettings::default();
    OutputSettings {
        html: output.html.unwrap_or(defaults.html),
        pdf: output.pdf.unwrap_or(defaults.pdf),
        email: output.email.unwrap_or(defaults.email),
    }
}

fn build_schedule_settings(schedule: RawScheduleSettings, values: &ValueSet) -> ScheduleSettings {
    ScheduleSettings {
        start_date: non_empty(schedule.start_date).or_else(|| value_of(values, VALUE_START_DATE)),
        interval_unit: non_empty(schedule.interval_unit)
            .or_else(|| value_of(values, VALUE_INTERVAL_UNIT)),
        interval_quantity: non_empty(schedule.interval_quantity)
            .or_else(|| value_of(values, VALUE_INTERVAL_QUANTITY)),
    }
}

fn build_email_settings(
    email: RawEmailSettings,
    values: &ValueSet,
) -> Result<EmailSettings, LoadError> {
    let port = email.port.unwrap_or(DEFAULT_SMTP_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "email.port",
            "port must be greater than zero",
        ));
    }

    let timeout_secs = email.timeout_seconds.unwrap_or(DEFAULT_SMTP_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "email.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(EmailSettings {
        from: non_empty(email.from).or_else(|| value_of(values, VALUE_EMAIL)),
        recipient: non_empty(email.recipient).or_else(|| value_of(values, VALUE_RECIPIENT_EMAIL)),
        server: non_empty(email.server).or_else(|| value_of(values, VALUE_EMAIL_SERVER)),
        port,
        username: non_empty(email.username).or_else(|| value_of(values, VALUE_EMAIL_USERNAME)),
        password: email
            .password
            .filter(|value| !value.is_empty())
            .or_else(|| values.get(VALUE_EMAIL_PASSWORD).map(str::to_string)),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_pdf_settings(pdf: RawPdfSettings) -> Result<PdfSettings, LoadError> {
    let converter_path = pdf
        .converter_path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PDF_CONVERTER_PATH));
    if converter_path.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "pdf.converter_path",
            "path must not be empty",
        ));
    }

    Ok(PdfSettings {
        converter_path,
        extra_args: pdf.extra_args.unwrap_or_default(),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn value_of(values: &ValueSet, name: &str) -> Option<String> {
    non_empty(values.get(name).map(str::to_string))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTemplateSettings {
    path: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    html: Option<bool>,
    pdf: Option<bool>,
    email: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawScheduleSettings {
    start_date: Option<String>,
    interval_unit: Option<String>,
    interval_quantity: Option<String>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawEmailSettings {
    from: Option<String>,
    recipient: Option<String>,
    server: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    timeout_seconds: Option<u64>,
}

impl fmt::Debug for RawEmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawEmailSettings")
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPdfSettings {
    converter_path: Option<PathBuf>,
    extra_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[cfg(test)]
mod tests;
