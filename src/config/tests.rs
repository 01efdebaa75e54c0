use std::fs;

use tempfile::TempDir;

use super::*;

fn no_env() -> HashMap<String, String> {
    HashMap::new()
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.output.html = Some(false);
    raw.logging.level = Some("info".to_string());

    let overrides = RunOverrides {
        html: Some(true),
        logging: LoggingOverrides {
            log_level: Some("debug".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_run_overrides(&overrides);
    let settings = Settings::from_raw(raw, ValueSet::new()).expect("valid settings");

    assert!(settings.output.html);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_match_a_plain_email_run() {
    let settings = Settings::from_raw(RawSettings::default(), ValueSet::new()).expect("valid");

    assert_eq!(settings.output, OutputSettings::default());
    assert!(settings.output.email);
    assert_eq!(
        settings.template.path,
        PathBuf::from("template/invoice_template.md")
    );
    assert_eq!(
        settings.template.assets_dir,
        Some(PathBuf::from("template/assets"))
    );
    assert_eq!(settings.email.port, 587);
    assert_eq!(settings.email.timeout, Duration::from_secs(30));
}

#[test]
fn empty_assets_dir_disables_assets() {
    let mut raw = RawSettings::default();
    raw.template.assets_dir = Some(PathBuf::new());
    let settings = Settings::from_raw(raw, ValueSet::new()).expect("valid settings");
    assert_eq!(settings.template.assets_dir, None);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.apply_logging_overrides(&LoggingOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw, ValueSet::new()).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.email.port = Some(0);
    let err = Settings::from_raw(raw, ValueSet::new()).expect_err("invalid port");
    assert!(matches!(err, LoadError::Invalid { key: "email.port", .. }));
}

#[test]
fn flat_values_fill_schedule_and_email() {
    let values: ValueSet = [
        ("start_date", "2026-01-01"),
        ("interval_unit", "month"),
        ("interval_quantity", "1"),
        ("email", "billing@example.com"),
        ("recipient_email", "client@example.com"),
        ("email_server", "smtp.example.com"),
        ("email_username", "billing"),
        ("email_password", "hunter2"),
    ]
    .into_iter()
    .collect();

    let settings = Settings::from_raw(RawSettings::default(), values).expect("valid settings");

    let recurrence = settings.schedule.recurrence().expect("recurrence");
    assert_eq!(recurrence.quantity.get(), 1);

    let delivery = settings.email.delivery().expect("delivery settings");
    assert_eq!(delivery.from, "billing@example.com");
    assert_eq!(delivery.recipient, "client@example.com");
    assert_eq!(delivery.smtp.server, "smtp.example.com");
    assert_eq!(delivery.smtp.port, 587);
}

#[test]
fn structured_sections_win_over_flat_values() {
    let mut raw = RawSettings::default();
    raw.schedule.interval_unit = Some("week".to_string());
    let values: ValueSet = [
        ("start_date", "2026-01-01"),
        ("interval_unit", "month"),
        ("interval_quantity", "2"),
    ]
    .into_iter()
    .collect();

    let settings = Settings::from_raw(raw, values).expect("valid settings");
    assert_eq!(settings.schedule.interval_unit.as_deref(), Some("week"));
}

#[test]
fn missing_schedule_fields_are_all_named() {
    let settings = Settings::from_raw(RawSettings::default(), ValueSet::new()).expect("valid");
    let err = settings.schedule.recurrence().expect_err("missing schedule");
    assert!(matches!(err, DomainError::Configuration { .. }), "{err:?}");
    let message = err.to_string();
    for key in ["start_date", "interval_unit", "interval_quantity"] {
        assert!(message.contains(key), "{key} missing from: {message}");
    }
}

#[test]
fn missing_email_fields_are_all_named() {
    let values: ValueSet = [("email", "billing@example.com")].into_iter().collect();
    let settings = Settings::from_raw(RawSettings::default(), values).expect("valid");
    let message = settings
        .email
        .delivery()
        .expect_err("incomplete email settings")
        .to_string();
    assert!(message.starts_with("recipient_email"), "from was supplied: {message}");
    for key in [
        "recipient_email",
        "email_server",
        "email_username",
        "email_password",
    ] {
        assert!(message.contains(key), "{key} missing from: {message}");
    }
}

#[test]
fn debug_output_redacts_password() {
    let values: ValueSet = [("email_password", "hunter2")].into_iter().collect();
    let settings = Settings::from_raw(RawSettings::default(), values).expect("valid");
    let rendered = format!("{:?}", settings.email);
    assert!(!rendered.contains("hunter2"), "password leaked: {rendered}");
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn settings_debug_lists_value_names_only() {
    let values: ValueSet = [("email_password", "hunter2"), ("client", "ACME Corp")]
        .into_iter()
        .collect();
    let settings = Settings::from_raw(RawSettings::default(), values).expect("valid");
    let rendered = format!("{settings:?}");
    assert!(!rendered.contains("hunter2"), "password leaked: {rendered}");
    assert!(!rendered.contains("ACME Corp"), "value leaked: {rendered}");
    assert!(rendered.contains("email_password"), "{rendered}");
}

#[test]
fn load_layers_file_dotenv_and_environment() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("invoicer.toml");
    fs::write(
        &config_path,
        r#"
[output]
html = true
pdf = false

[values]
client = "From file"
total = "100"
"#,
    )
    .expect("write config");

    let env_path = dir.path().join("invoice.env");
    fs::write(&env_path, "total=250\nitem=Consulting\n").expect("write dotenv");

    let cli = CliArgs::parse_from([
        "invoicer",
        "--config-file",
        config_path.to_str().expect("utf-8 path"),
        "--env-file",
        env_path.to_str().expect("utf-8 path"),
        "run",
        "--pdf",
        "true",
    ]);

    let env: HashMap<String, String> = [
        ("item".to_string(), "Design".to_string()),
        ("INVOICER__OUTPUT__EMAIL".to_string(), "false".to_string()),
    ]
    .into_iter()
    .collect();

    let settings = load_from(&cli, env).expect("settings load");

    assert!(settings.output.html);
    assert!(settings.output.pdf, "CLI override applies");
    assert!(!settings.output.email, "environment override applies");
    assert_eq!(settings.values.get("client"), Some("From file"));
    assert_eq!(settings.values.get("total"), Some("250"), "dotenv beats file");
    assert_eq!(settings.values.get("item"), Some("Design"), "env beats dotenv");
}

#[test]
fn explicit_missing_env_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("absent.env");
    let cli = CliArgs::parse_from([
        "invoicer",
        "--env-file",
        missing.to_str().expect("utf-8 path"),
        "check",
    ]);
    let err = load_from(&cli, no_env()).expect_err("missing dotenv");
    assert!(matches!(err, LoadError::Dotenv { .. }));
}

#[test]
fn default_to_run_command() {
    let args = CliArgs::parse_from(["invoicer"]);
    let command = args.command.unwrap_or_default();
    assert!(matches!(command, Command::Run(_)));
}

#[test]
fn parse_run_arguments() {
    let args = CliArgs::parse_from([
        "invoicer",
        "run",
        "--template",
        "/tmp/template.md",
        "--output-dir",
        "/tmp/out",
        "--html",
        "yes",
        "--email",
        "off",
        "--as-of",
        "2026-03-01",
    ]);

    let command = args.command.expect("run command");
    assert_eq!(
        command.as_of(),
        chrono::NaiveDate::from_ymd_opt(2026, 3, 1)
    );
    match command {
        Command::Run(run) => {
            let overrides = run.overrides;
            assert_eq!(
                overrides.template.template.as_deref(),
                Some(std::path::Path::new("/tmp/template.md"))
            );
            assert_eq!(
                overrides.output_dir.as_deref(),
                Some(std::path::Path::new("/tmp/out"))
            );
            assert_eq!(overrides.html, Some(true));
            assert_eq!(overrides.email, Some(false));
            assert_eq!(overrides.pdf, None);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn invalid_as_of_is_rejected() {
    let result = CliArgs::try_parse_from(["invoicer", "check", "--as-of", "03/01/2026"]);
    assert!(result.is_err());
}

#[test]
fn parse_schedule_arguments() {
    let args = CliArgs::parse_from(["invoicer", "schedule", "--log-level", "warn"]);
    match args.command.expect("schedule command") {
        Command::Schedule(schedule) => {
            assert_eq!(schedule.logging.log_level.as_deref(), Some("warn"));
        }
        _ => panic!("wrong command parsed"),
    }
}
