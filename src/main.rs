use std::process;

use chrono::{Local, NaiveDate};
use invoicer::{
    application::{error::AppError, invoice::InvoiceRun},
    config::{self, Command, Settings},
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, error_kind = error.kind(), "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, error_kind = error.kind(), "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::configuration(format!("failed to load configuration: {err}")))?;

    let command = cli_args.command.unwrap_or_default();

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let today = command
        .as_of()
        .unwrap_or_else(|| Local::now().date_naive());

    match command {
        Command::Run(_) => run_invoice(&settings, today),
        Command::Check(_) => run_check(&settings, today),
        Command::Schedule(_) => run_schedule(&settings),
    }
}

fn run_invoice(settings: &Settings, today: NaiveDate) -> Result<(), AppError> {
    let report = InvoiceRun::new(settings).execute(today)?;

    if let Some(path) = report.artifacts.html.as_ref() {
        info!(path = %path.display(), "HTML invoice saved");
    }
    if let Some(path) = report.artifacts.pdf.as_ref() {
        info!(path = %path.display(), "PDF invoice saved");
    }
    if let Some(recipient) = report.emailed_to.as_ref() {
        info!(recipient = %recipient, "Invoice emailed");
    }
    Ok(())
}

fn run_check(settings: &Settings, today: NaiveDate) -> Result<(), AppError> {
    let report = InvoiceRun::new(settings).check(today)?;

    println!("placeholders: {}", report.placeholders.join(", "));
    if let Some(number) = report.invoice_number.as_ref() {
        println!("invoice_number: {number}");
    }
    println!("assets: {}", report.assets);
    Ok(())
}

fn run_schedule(settings: &Settings) -> Result<(), AppError> {
    let cron = InvoiceRun::new(settings).schedule()?;
    println!("{cron}");
    Ok(())
}
