mod config;
pub(crate) mod rewrite;

use std::time::Instant;

use comrak::markdown_to_html;
use tracing::info;

use crate::application::render::types::{
    MarkdownConverter, RenderError, RenderedDocument, Template,
};
use crate::domain::{
    error::DomainError,
    values::{ResolvedValues, ValueSet},
};

use self::config::default_options;
use self::rewrite::extract_asset_references;

/// Comrak-based markdown conversion with the table extension enabled.
pub struct ComrakMarkdownConverter {
    options: comrak::Options<'static>,
}

impl ComrakMarkdownConverter {
    pub fn new() -> Self {
        Self {
            options: default_options(),
        }
    }
}

impl Default for ComrakMarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownConverter for ComrakMarkdownConverter {
    fn to_html(&self, markdown: &str) -> Result<String, RenderError> {
        Ok(markdown_to_html(markdown, &self.options))
    }
}

/// Substitutes values into a template and converts the result to canonical HTML.
pub struct TemplateRenderer<C = ComrakMarkdownConverter> {
    converter: C,
}

impl TemplateRenderer<ComrakMarkdownConverter> {
    pub fn comrak() -> Self {
        Self::new(ComrakMarkdownConverter::new())
    }
}

impl<C: MarkdownConverter> TemplateRenderer<C> {
    pub fn new(converter: C) -> Self {
        Self { converter }
    }

    /// Render `template` with `values`, failing with every placeholder that has no value.
    pub fn render(
        &self,
        template: &Template,
        values: &ValueSet,
    ) -> Result<RenderedDocument, RenderError> {
        let started_at = Instant::now();
        let placeholders = template.placeholders();
        let resolved = values.resolve(&placeholders).map_err(|err| match err {
            DomainError::MissingValues { names } => RenderError::MissingValues { names },
            other => RenderError::Markdown {
                message: other.to_string(),
            },
        })?;

        let markdown = substitute(template.text(), &resolved);
        let html = self.converter.to_html(&markdown)?;
        let assets = extract_asset_references(&html)?;

        info!(
            target = "application::render",
            op = "render::template",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            placeholders = placeholders.len(),
            assets = assets.len(),
            html_bytes = html.len(),
            "Template rendered"
        );

        Ok(RenderedDocument::new(html, assets))
    }
}

/// Replace every literal `{name}` with its value. Values are inserted verbatim.
pub fn substitute(text: &str, values: &ResolvedValues) -> String {
    values
        .iter()
        .fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), value)
        })
}
