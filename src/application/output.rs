//! On-disk artifacts derived from one canonical HTML string.

use std::{fs, path::PathBuf, time::Instant};

use chrono::NaiveDate;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::{
    application::{error::AppError, render::RenderedDocument},
    domain::{
        assets::{RenderContext, ResolvedAssets},
        recurrence::DATE_FORMAT,
    },
    infra::{assets::copy_assets, pdf::PdfConverter},
};

/// Resolved assets together with the folder name their copies live under.
#[derive(Debug, Clone)]
pub struct AssetBundle {
    pub resolved: ResolvedAssets,
    pub folder: PathBuf,
}

/// Paths of the artifacts written by [`OutputCoordinator::produce`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub html: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

/// Inputs that vary per run.
#[derive(Debug, Clone, Copy)]
pub struct OutputRequest<'a> {
    /// `None` when assets are disabled; references are then left as written.
    pub assets: Option<&'a AssetBundle>,
    pub today: NaiveDate,
}

/// Writes `<output_dir>/<date>.html` and/or `<output_dir>/<date>.pdf`.
pub struct OutputCoordinator<'a> {
    output_dir: PathBuf,
    html: bool,
    pdf: bool,
    converter: &'a dyn PdfConverter,
}

impl<'a> OutputCoordinator<'a> {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        html: bool,
        pdf: bool,
        converter: &'a dyn PdfConverter,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            html,
            pdf,
            converter,
        }
    }

    pub fn produce(
        &self,
        document: &RenderedDocument,
        request: OutputRequest<'_>,
    ) -> Result<Artifacts, AppError> {
        let mut artifacts = Artifacts::default();
        if !self.html && !self.pdf {
            return Ok(artifacts);
        }

        fs::create_dir_all(&self.output_dir)?;
        let stem = request.today.format(DATE_FORMAT).to_string();

        if self.html {
            artifacts.html = Some(self.write_html(document, request.assets, &stem)?);
        }

        if self.pdf {
            let started_at = Instant::now();
            let bytes = match artifacts.html.as_deref() {
                Some(html_path) => self.converter.convert(html_path)?,
                None => render_staged_pdf(document, request.assets, &stem, self.converter)?,
            };
            let pdf_path = self.output_dir.join(format!("{stem}.pdf"));
            fs::write(&pdf_path, bytes)?;
            info!(
                target = "application::output",
                op = "output::pdf",
                result = "ok",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                path = %pdf_path.display(),
                "PDF artifact written"
            );
            artifacts.pdf = Some(pdf_path);
        }

        Ok(artifacts)
    }

    fn write_html(
        &self,
        document: &RenderedDocument,
        assets: Option<&AssetBundle>,
        stem: &str,
    ) -> Result<PathBuf, AppError> {
        let started_at = Instant::now();
        let html = match assets {
            Some(bundle) => {
                let assets_dir = self.output_dir.join(&bundle.folder);
                if !bundle.resolved.is_empty() {
                    copy_assets(&bundle.resolved, &assets_dir)?;
                }
                let context = RenderContext::LocalFile {
                    root: self.output_dir.clone(),
                    assets_dir,
                };
                document.variant(&bundle.resolved, &context)?
            }
            None => document.html().to_string(),
        };

        let html_path = self.output_dir.join(format!("{stem}.html"));
        fs::write(&html_path, html)?;
        info!(
            target = "application::output",
            op = "output::html",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            path = %html_path.display(),
            "HTML artifact written"
        );
        Ok(html_path)
    }
}

/// Convert `document` to PDF through a scoped staging directory.
///
/// The staged HTML and asset copies share one [`TempDir`], removed on return
/// whether or not conversion succeeds.
pub(crate) fn render_staged_pdf(
    document: &RenderedDocument,
    assets: Option<&AssetBundle>,
    stem: &str,
    converter: &dyn PdfConverter,
) -> Result<Vec<u8>, AppError> {
    let stage = TempDir::new()?;
    let root = stage.path().to_path_buf();

    let html = match assets {
        Some(bundle) => {
            copy_assets(&bundle.resolved, &root)?;
            let context = RenderContext::PdfStaging {
                root: root.clone(),
                assets_dir: root.clone(),
            };
            document.variant(&bundle.resolved, &context)?
        }
        None => document.html().to_string(),
    };

    let html_path = root.join(format!("{stem}.html"));
    fs::write(&html_path, html)?;

    let result = converter.convert(&html_path);
    if let Err(err) = &result {
        warn!(
            target = "application::output",
            op = "output::stage",
            result = "error",
            error = %err,
            "Staged PDF conversion failed"
        );
    }
    result.map_err(AppError::from)
}
