//! Asset reference extraction and per-context re-addressing.
//!
//! Both passes walk the same selector in document order, so the n-th reference
//! extracted is the n-th attribute rewritten.

use std::{cell::RefCell, path::Path, rc::Rc};

use lol_html::{RewriteStrSettings, element, rewrite_str};
use tracing::debug;
use url::Url;

use crate::application::render::types::RenderError;
use crate::domain::assets::{
    AssetReference, AssetReferences, RenderContext, ResolvedAsset, ResolvedAssets,
};

const ASSET_SELECTOR: &str = "[src]";

pub(crate) fn extract_asset_references(html: &str) -> Result<AssetReferences, RenderError> {
    let references = Rc::new(RefCell::new(Vec::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(ASSET_SELECTOR, {
                let references = Rc::clone(&references);
                move |el| {
                    if let Some(src) = el.get_attribute("src") {
                        references.borrow_mut().push(AssetReference::new(src));
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Rewrite {
        message: err.to_string(),
    })?;

    let references = references.take();
    Ok(AssetReferences::new(references))
}

/// Replace each `src` value with the address `context` needs for the paired asset.
pub(crate) fn rewrite_asset_paths(
    html: &str,
    assets: &ResolvedAssets,
    context: &RenderContext,
) -> Result<String, RenderError> {
    if assets.is_empty() {
        return Ok(html.to_string());
    }

    let addresses: Rc<Vec<(String, String)>> = Rc::new(
        assets
            .iter()
            .map(|asset| (asset.reference.src().to_string(), address_for(asset, context)))
            .collect(),
    );
    let index = Rc::new(RefCell::new(0usize));
    let error_slot = Rc::new(RefCell::new(None));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!(ASSET_SELECTOR, {
                let addresses = Rc::clone(&addresses);
                let index = Rc::clone(&index);
                let error_slot = Rc::clone(&error_slot);
                move |el| {
                    let Some(src) = el.get_attribute("src") else {
                        return Ok(());
                    };
                    let mut idx = index.borrow_mut();
                    let Some((expected, address)) = addresses.get(*idx) else {
                        *error_slot.borrow_mut() = Some(RenderError::AssetMismatch {
                            message: format!("unexpected extra reference `{src}`"),
                        });
                        return Ok(());
                    };
                    *idx += 1;

                    if src != *expected {
                        *error_slot.borrow_mut() = Some(RenderError::AssetMismatch {
                            message: format!("expected `{expected}`, found `{src}`"),
                        });
                        return Ok(());
                    }

                    el.set_attribute("src", address)?;
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|err| RenderError::Rewrite {
        message: err.to_string(),
    })?;

    if let Some(err) = error_slot.borrow_mut().take() {
        return Err(err);
    }

    let consumed = *index.borrow();
    if consumed != addresses.len() {
        return Err(RenderError::AssetMismatch {
            message: format!(
                "{} of {} references rewritten",
                consumed,
                addresses.len()
            ),
        });
    }

    debug!(
        target = "application::render",
        context = context.name(),
        rewritten = consumed,
        "Asset references re-addressed"
    );
    Ok(rewritten)
}

fn address_for(asset: &ResolvedAsset, context: &RenderContext) -> String {
    let name = asset.reference.url_basename();
    match context {
        RenderContext::Email => format!("cid:{name}"),
        RenderContext::LocalFile { root, assets_dir }
        | RenderContext::PdfStaging { root, assets_dir } => {
            match relative_address(root, assets_dir) {
                dir if dir.is_empty() => name.to_string(),
                dir => format!("{dir}/{name}"),
            }
        }
    }
}

/// Forward-slash path of `target` relative to `root`, or a `file://` URL when
/// `target` lies outside it.
fn relative_address(root: &Path, target: &Path) -> String {
    match target.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => Url::from_file_path(target)
            .map(String::from)
            .unwrap_or_else(|_| target.display().to_string()),
    }
}
