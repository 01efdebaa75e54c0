//! HTML to PDF conversion through a headless browser CLI.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use tracing::{info, warn};
use url::Url;

use super::error::InfraError;

pub const DEFAULT_PDF_CONVERTER_PATH: &str = "chromium";

/// Converts an HTML file on disk into PDF bytes.
///
/// Relative references inside the document resolve against the file's directory.
pub trait PdfConverter {
    fn convert(&self, html_path: &Path) -> Result<Vec<u8>, InfraError>;
}

impl<T: PdfConverter + ?Sized> PdfConverter for &T {
    fn convert(&self, html_path: &Path) -> Result<Vec<u8>, InfraError> {
        (**self).convert(html_path)
    }
}

/// Prints pages to PDF with a Chromium-compatible browser in headless mode.
#[derive(Debug, Clone)]
pub struct ChromiumPdfConverter {
    binary: PathBuf,
    extra_args: Vec<String>,
}

impl ChromiumPdfConverter {
    pub fn new(binary: PathBuf, extra_args: Vec<String>) -> Self {
        Self { binary, extra_args }
    }
}

impl Default for ChromiumPdfConverter {
    fn default() -> Self {
        Self::new(PathBuf::from(DEFAULT_PDF_CONVERTER_PATH), Vec::new())
    }
}

impl PdfConverter for ChromiumPdfConverter {
    fn convert(&self, html_path: &Path) -> Result<Vec<u8>, InfraError> {
        let started_at = Instant::now();
        let absolute = fs::canonicalize(html_path).map_err(|err| {
            InfraError::conversion(format!(
                "cannot open {} for conversion: {err}",
                html_path.display()
            ))
        })?;
        let page_url = Url::from_file_path(&absolute).map_err(|_| {
            InfraError::conversion(format!("{} is not a valid file URL", absolute.display()))
        })?;

        let output_file = tempfile::Builder::new()
            .suffix(".pdf")
            .tempfile()
            .map_err(|err| InfraError::conversion(format!("failed to create output file: {err}")))?;
        let output_path = output_file.path().to_path_buf();

        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", output_path.display()))
            .args(&self.extra_args)
            .arg(page_url.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "infra::pdf",
                    op = "pdf::convert",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_cli",
                    error = %err,
                    "Failed to spawn PDF converter"
                );
                if err.kind() == ErrorKind::NotFound {
                    InfraError::conversion(format!(
                        "converter `{}` not found",
                        self.binary.display()
                    ))
                } else {
                    InfraError::conversion(format!("failed to spawn converter: {err}"))
                }
            })?;

        if !output.status.success() {
            let exit_code = output.status.code().map(i64::from).unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(
                target = "infra::pdf",
                op = "pdf::convert",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code,
                error_code = "converter_cli",
                stderr = %stderr,
                "PDF converter invocation failed"
            );
            return Err(InfraError::conversion(format!(
                "converter exited with {exit_code}: {}",
                stderr.trim()
            )));
        }

        let bytes = fs::read(&output_path)
            .map_err(|err| InfraError::conversion(format!("failed to read PDF output: {err}")))?;
        if bytes.is_empty() {
            return Err(InfraError::conversion("converter produced an empty PDF"));
        }

        info!(
            target = "infra::pdf",
            op = "pdf::convert",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            source = %absolute.display(),
            pdf_bytes = bytes.len(),
            "HTML converted to PDF"
        );

        Ok(bytes)
    }
}
