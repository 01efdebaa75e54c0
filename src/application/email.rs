//! MIME assembly for the emailed invoice.

use std::{fs, path::Path, time::Instant};

use chrono::NaiveDate;
use lettre::{
    Message,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
};
use tracing::{debug, info};

use crate::{
    application::{
        error::AppError,
        output::{AssetBundle, render_staged_pdf},
        render::RenderedDocument,
    },
    domain::{assets::RenderContext, recurrence::DATE_FORMAT},
    infra::pdf::PdfConverter,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";
const SUBJECT_PREFIX: &str = "Invoice";

/// Sender, recipient and subject of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
    pub subject: String,
}

/// `Invoice <number>` when the template carries an invoice number, else `Invoice`.
pub fn subject_line(invoice_number: Option<&str>) -> String {
    match invoice_number {
        Some(number) => format!("{SUBJECT_PREFIX} {number}"),
        None => SUBJECT_PREFIX.to_string(),
    }
}

/// Builds a `multipart/related` message: an HTML alternative, one inline part
/// per distinct asset, and a PDF attachment.
pub struct EmailAssembler<'a> {
    converter: &'a dyn PdfConverter,
}

impl<'a> EmailAssembler<'a> {
    pub fn new(converter: &'a dyn PdfConverter) -> Self {
        Self { converter }
    }

    /// Assemble the message. `pdf` reuses an already written PDF; without it a
    /// PDF is rendered through a scoped staging directory.
    pub fn assemble(
        &self,
        envelope: &Envelope,
        document: &RenderedDocument,
        assets: Option<&AssetBundle>,
        pdf: Option<&Path>,
        today: NaiveDate,
    ) -> Result<Message, AppError> {
        let started_at = Instant::now();
        let from = parse_mailbox("sender", &envelope.from)?;
        let to = parse_mailbox("recipient", &envelope.to)?;

        let html = body_html(document, assets)?;
        let alternative = MultiPart::alternative().singlepart(SinglePart::html(html));
        let mut related = MultiPart::related().multipart(alternative);

        let mut inline_parts = 0usize;
        if let Some(bundle) = assets {
            for asset in bundle.resolved.unique() {
                let bytes = fs::read(&asset.path)?;
                let mime = mime_guess::from_path(&asset.path).first_or_octet_stream();
                let content_type = parse_content_type(mime.essence_str())?;
                debug!(
                    target = "application::email",
                    content_id = asset.basename(),
                    content_type = mime.essence_str(),
                    "Inline image attached"
                );
                related = related.singlepart(
                    Attachment::new_inline(asset.basename().to_string()).body(bytes, content_type),
                );
                inline_parts += 1;
            }
        }

        let (filename, bytes) = match pdf {
            Some(path) => (attachment_name(path), fs::read(path)?),
            None => {
                let stem = today.format(DATE_FORMAT).to_string();
                let bytes = render_staged_pdf(document, assets, &stem, self.converter)?;
                (format!("{stem}.pdf"), bytes)
            }
        };
        related = related.singlepart(
            Attachment::new(filename.clone()).body(bytes, parse_content_type(PDF_CONTENT_TYPE)?),
        );

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(envelope.subject.as_str())
            .multipart(related)
            .map_err(|err| AppError::Delivery(format!("failed to build email: {err}")))?;

        info!(
            target = "application::email",
            op = "email::assemble",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            inline_parts,
            attachment = %filename,
            "Email assembled"
        );
        Ok(message)
    }
}

/// Email body HTML with every asset addressed by content id.
pub(crate) fn body_html(
    document: &RenderedDocument,
    assets: Option<&AssetBundle>,
) -> Result<String, AppError> {
    match assets {
        Some(bundle) => Ok(document.variant(&bundle.resolved, &RenderContext::Email)?),
        None => Ok(document.html().to_string()),
    }
}

fn parse_mailbox(role: &str, address: &str) -> Result<Mailbox, AppError> {
    address.parse::<Mailbox>().map_err(|err| {
        AppError::configuration(format!("invalid {role} address `{address}`: {err}"))
    })
}

fn parse_content_type(value: &str) -> Result<ContentType, AppError> {
    ContentType::parse(value)
        .map_err(|err| AppError::unexpected(format!("invalid content type `{value}`: {err}")))
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "invoice.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, path::PathBuf};

    use tempfile::TempDir;

    use super::*;
    use crate::application::render::{Template, TemplateRenderer};
    use crate::domain::values::ValueSet;
    use crate::infra::{assets::AssetResolver, error::InfraError};

    #[derive(Default)]
    struct CountingConverter {
        calls: Cell<usize>,
    }

    impl PdfConverter for CountingConverter {
        fn convert(&self, html_path: &Path) -> Result<Vec<u8>, InfraError> {
            assert!(html_path.is_file());
            self.calls.set(self.calls.get() + 1);
            Ok(b"%PDF-staged".to_vec())
        }
    }

    fn envelope() -> Envelope {
        Envelope {
            from: "billing@example.com".to_string(),
            to: "client@example.org".to_string(),
            subject: subject_line(Some("003")),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).expect("date")
    }

    fn setup() -> (TempDir, RenderedDocument, AssetBundle) {
        let dir = TempDir::new().expect("temp dir");
        let assets_dir = dir.path().join("assets");
        fs::create_dir_all(&assets_dir).expect("assets dir");
        fs::write(assets_dir.join("logo.png"), b"png-bytes").expect("logo");

        let document = TemplateRenderer::comrak()
            .render(
                &Template::new("![Logo](images/logo.png)\n\nTotal: {total}\n"),
                &[("total", "100")].into_iter().collect::<ValueSet>(),
            )
            .expect("render");
        let resolver = AssetResolver::new(&assets_dir);
        let bundle = AssetBundle {
            resolved: resolver.resolve(document.assets()).expect("resolve"),
            folder: resolver.dir_name(),
        };
        (dir, document, bundle)
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[test]
    fn subject_carries_the_number_only_when_present() {
        assert_eq!(subject_line(Some("012")), "Invoice 012");
        assert_eq!(subject_line(None), "Invoice");
    }

    #[test]
    fn body_addresses_assets_by_content_id() {
        let (_dir, document, bundle) = setup();
        let html = body_html(&document, Some(&bundle)).expect("body");
        assert!(html.contains("src=\"cid:logo.png\""), "{html}");
        assert!(!html.contains("images/logo.png"));
        assert!(document.html().contains("images/logo.png"));
    }

    #[test]
    fn stages_a_pdf_when_none_is_supplied() {
        let (_dir, document, bundle) = setup();
        let converter = CountingConverter::default();
        let message = EmailAssembler::new(&converter)
            .assemble(&envelope(), &document, Some(&bundle), None, today())
            .expect("assemble");

        assert_eq!(converter.calls.get(), 1);
        let raw = formatted(&message);
        assert!(raw.contains("multipart/related"), "{raw}");
        assert!(raw.contains("multipart/alternative"), "{raw}");
        assert!(raw.contains("Content-ID: <logo.png>"), "{raw}");
        assert!(raw.contains("image/png"), "{raw}");
        assert!(raw.contains("filename=\"2026-03-01.pdf\""), "{raw}");
        assert!(raw.contains("application/pdf"), "{raw}");
        assert_eq!(
            message
                .headers()
                .get_raw("Subject")
                .map(|value| value.to_string()),
            Some("Invoice 003".to_string())
        );
    }

    #[test]
    fn attaches_an_existing_pdf_by_its_basename() {
        let (dir, document, bundle) = setup();
        let pdf_path: PathBuf = dir.path().join("2026-02-28.pdf");
        fs::write(&pdf_path, b"%PDF-existing").expect("pdf");
        let converter = CountingConverter::default();
        let message = EmailAssembler::new(&converter)
            .assemble(
                &envelope(),
                &document,
                Some(&bundle),
                Some(&pdf_path),
                today(),
            )
            .expect("assemble");

        assert_eq!(converter.calls.get(), 0);
        assert!(formatted(&message).contains("filename=\"2026-02-28.pdf\""));
    }

    #[test]
    fn invalid_addresses_are_configuration_errors() {
        let (_dir, document, bundle) = setup();
        let converter = CountingConverter::default();
        let mut envelope = envelope();
        envelope.to = "not an address".to_string();
        let err = EmailAssembler::new(&converter)
            .assemble(&envelope, &document, Some(&bundle), None, today())
            .expect_err("invalid recipient");
        assert_eq!(err.kind(), "configuration");
        assert_eq!(converter.calls.get(), 0);
    }
}
