//! One scheduled invoice run: values, render, artifacts, email.

use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{
    application::{
        email::{EmailAssembler, Envelope, subject_line},
        error::AppError,
        output::{Artifacts, AssetBundle, OutputCoordinator, OutputRequest},
        render::{RenderedDocument, Template, TemplateRenderer},
    },
    config::Settings,
    domain::{
        recurrence::DATE_FORMAT,
        values::{DATE_PLACEHOLDER, INVOICE_NUMBER_PLACEHOLDER},
    },
    infra::{
        assets::AssetResolver,
        pdf::{ChromiumPdfConverter, PdfConverter},
        smtp::{MailTransport, SmtpMailTransport},
    },
};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub invoice_number: Option<String>,
    pub artifacts: Artifacts,
    pub emailed_to: Option<String>,
}

/// Outcome of a dry run that renders and resolves without producing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub placeholders: Vec<String>,
    pub invoice_number: Option<String>,
    pub assets: usize,
}

struct Prepared {
    placeholders: Vec<String>,
    invoice_number: Option<String>,
    document: RenderedDocument,
    assets: Option<AssetBundle>,
}

pub struct InvoiceRun<'a> {
    settings: &'a Settings,
    renderer: TemplateRenderer,
    converter: Box<dyn PdfConverter + 'a>,
    transport: Option<Box<dyn MailTransport + 'a>>,
}

impl<'a> InvoiceRun<'a> {
    /// A run wired to the configured PDF converter and SMTP relay.
    pub fn new(settings: &'a Settings) -> Self {
        let converter = ChromiumPdfConverter::new(
            settings.pdf.converter_path.clone(),
            settings.pdf.extra_args.clone(),
        );
        Self {
            settings,
            renderer: TemplateRenderer::comrak(),
            converter: Box::new(converter),
            transport: None,
        }
    }

    pub fn with_converter(mut self, converter: impl PdfConverter + 'a) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Replace SMTP delivery with `transport`.
    pub fn with_transport(mut self, transport: impl MailTransport + 'a) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Render once, write the requested artifacts, then email when enabled.
    ///
    /// Every input (values, assets, delivery settings) is validated before the
    /// first artifact is written.
    pub fn execute(&self, today: NaiveDate) -> Result<RunReport, AppError> {
        let started_at = Instant::now();
        let result = self.execute_inner(today);
        match &result {
            Ok(report) => info!(
                target = "application::invoice",
                op = "invoice::run",
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                invoice_number = report.invoice_number.as_deref().unwrap_or("-"),
                html = report.artifacts.html.is_some(),
                pdf = report.artifacts.pdf.is_some(),
                emailed = report.emailed_to.is_some(),
                "Invoice run completed"
            ),
            Err(err) => warn!(
                target = "application::invoice",
                op = "invoice::run",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_kind = err.kind(),
                error = %err,
                "Invoice run failed"
            ),
        }
        result
    }

    fn execute_inner(&self, today: NaiveDate) -> Result<RunReport, AppError> {
        let settings = self.settings;
        let prepared = self.prepare(today)?;
        let delivery = if settings.output.email {
            Some(settings.email.delivery()?)
        } else {
            None
        };

        let artifacts = OutputCoordinator::new(
            &settings.template.output_dir,
            settings.output.html,
            settings.output.pdf,
            self.converter.as_ref(),
        )
        .produce(
            &prepared.document,
            OutputRequest {
                assets: prepared.assets.as_ref(),
                today,
            },
        )?;

        let emailed_to = match delivery {
            Some(delivery) => {
                let envelope = Envelope {
                    from: delivery.from,
                    to: delivery.recipient,
                    subject: subject_line(prepared.invoice_number.as_deref()),
                };
                let message = EmailAssembler::new(self.converter.as_ref()).assemble(
                    &envelope,
                    &prepared.document,
                    prepared.assets.as_ref(),
                    artifacts.pdf.as_deref(),
                    today,
                )?;
                match self.transport.as_deref() {
                    Some(transport) => transport.deliver(&message)?,
                    None => SmtpMailTransport::new(delivery.smtp).deliver(&message)?,
                }
                Some(envelope.to)
            }
            None => None,
        };

        Ok(RunReport {
            invoice_number: prepared.invoice_number,
            artifacts,
            emailed_to,
        })
    }

    /// Resolve values, render and locate every asset without writing or sending.
    pub fn check(&self, today: NaiveDate) -> Result<CheckReport, AppError> {
        let prepared = self.prepare(today)?;
        Ok(CheckReport {
            placeholders: prepared.placeholders,
            invoice_number: prepared.invoice_number,
            assets: prepared
                .assets
                .as_ref()
                .map_or(0, |bundle| bundle.resolved.len()),
        })
    }

    /// Cron expression that fires once per configured interval.
    pub fn schedule(&self) -> Result<String, AppError> {
        Ok(self.settings.schedule.recurrence()?.cron_expression())
    }

    fn prepare(&self, today: NaiveDate) -> Result<Prepared, AppError> {
        let settings = self.settings;
        let template_path = &settings.template.path;
        let template = Template::load(template_path).map_err(|err| {
            AppError::configuration(format!(
                "cannot read template {}: {err}",
                template_path.display()
            ))
        })?;
        let placeholders = template.placeholders();
        let references = |name: &str| placeholders.iter().any(|candidate| candidate == name);

        let mut values = settings.values.clone();
        if references(DATE_PLACEHOLDER) {
            values.insert(DATE_PLACEHOLDER, today.format(DATE_FORMAT).to_string());
        }
        let invoice_number = if references(INVOICE_NUMBER_PLACEHOLDER) {
            let number = settings.schedule.recurrence()?.invoice_number(today)?;
            values.insert(INVOICE_NUMBER_PLACEHOLDER, number.clone());
            Some(number)
        } else {
            None
        };

        let document = self.renderer.render(&template, &values)?;

        let assets = match settings.template.assets_dir.as_ref() {
            Some(dir) => {
                let resolver = AssetResolver::new(dir);
                Some(AssetBundle {
                    resolved: resolver.resolve(document.assets())?,
                    folder: resolver.dir_name(),
                })
            }
            None => None,
        };

        Ok(Prepared {
            placeholders,
            invoice_number,
            document,
            assets,
        })
    }
}
