use std::{fs, io, path::Path};

use thiserror::Error;

use crate::domain::{
    assets::{AssetReferences, RenderContext, ResolvedAssets},
    placeholders::{extract_placeholders, unique_names},
};

use super::service::rewrite::rewrite_asset_paths;

/// Markdown source with `{name}` placeholders, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(Self::new)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names in first-appearance order.
    pub fn placeholders(&self) -> Vec<String> {
        unique_names(&extract_placeholders(&self.text))
    }
}

/// Canonical HTML for one run plus the asset references found in it.
///
/// The canonical string is never modified; [`RenderedDocument::variant`] derives
/// context-specific copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    html: String,
    assets: AssetReferences,
}

impl RenderedDocument {
    pub(crate) fn new(html: String, assets: AssetReferences) -> Self {
        Self { html, assets }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn assets(&self) -> &AssetReferences {
        &self.assets
    }

    /// HTML with every asset reference re-addressed for `context`.
    ///
    /// `resolved` must come from resolving [`RenderedDocument::assets`].
    pub fn variant(
        &self,
        resolved: &ResolvedAssets,
        context: &RenderContext,
    ) -> Result<String, RenderError> {
        if resolved.len() != self.assets.len() {
            return Err(RenderError::AssetMismatch {
                message: format!(
                    "{} references but {} resolved assets",
                    self.assets.len(),
                    resolved.len()
                ),
            });
        }
        rewrite_asset_paths(&self.html, resolved, context)
    }
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown conversion failed: {message}")]
    Markdown { message: String },
    #[error("no value supplied for placeholder(s): {}", names.join(", "))]
    MissingValues { names: Vec<String> },
    #[error("asset rewriting failed: {message}")]
    Rewrite { message: String },
    #[error("asset references out of step with resolved assets: {message}")]
    AssetMismatch { message: String },
}

/// Converts markdown text to HTML. Tables must be supported.
pub trait MarkdownConverter {
    fn to_html(&self, markdown: &str) -> Result<String, RenderError>;
}
