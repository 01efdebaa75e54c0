//! Template rendering.
//!
//! Rendering is pure: placeholders are substituted, markdown becomes canonical
//! HTML, and asset references are collected. Context-specific HTML variants are
//! derived from the canonical string on demand.

mod service;
mod types;

pub use service::{ComrakMarkdownConverter, TemplateRenderer, substitute};
pub use types::{MarkdownConverter, RenderError, RenderedDocument, Template};
