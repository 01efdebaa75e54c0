//! Asset references embedded in rendered HTML and the contexts they are re-addressed for.

use std::path::PathBuf;

use url::Url;

/// A `src` attribute value found in the canonical HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    src: String,
    url_name: String,
    file_name: String,
}

impl AssetReference {
    pub fn new(src: impl Into<String>) -> Self {
        let src = src.into();
        let unescaped = decode_entities(&src);
        let url_name = unescaped
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(unescaped.as_str())
            .to_string();
        let file_name = percent_decode(&url_name).unwrap_or_else(|| url_name.clone());
        Self {
            src,
            url_name,
            file_name,
        }
    }

    /// The attribute value exactly as it appears in the canonical HTML.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// File name used to locate the asset on disk; directory components are ignored.
    ///
    /// HTML entities and percent escapes are decoded, so `my%20logo.png` names
    /// `my logo.png`.
    pub fn basename(&self) -> &str {
        &self.file_name
    }

    /// The last path segment in URL form, suitable for writing back into an attribute.
    pub fn url_basename(&self) -> &str {
        &self.url_name
    }
}

/// Decode the character references an HTML serializer emits inside attributes.
fn decode_entities(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('&') {
        decoded.push_str(&rest[..start]);
        rest = &rest[start..];
        let reference = rest
            .find(';')
            .and_then(|end| entity_char(&rest[1..end]).map(|ch| (ch, end)));
        match reference {
            Some((ch, end)) => {
                decoded.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

fn entity_char(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Percent-decode one path segment. `None` when the segment cannot be read as a
/// single file name.
fn percent_decode(segment: &str) -> Option<String> {
    if !segment.contains('%') {
        return Some(segment.to_string());
    }
    if segment.contains(['?', '#']) {
        return None;
    }
    let url = Url::parse(&format!("file:///{segment}")).ok()?;
    let path = url.to_file_path().ok()?;
    let name = path.to_str()?.strip_prefix('/')?;
    let single = !name.is_empty() && name != ".." && !name.contains(['/', '\\']);
    single.then(|| name.to_string())
}

/// Asset references in document order.
///
/// The order is the pairing key between extraction and rewriting, so the list is
/// built once from the canonical HTML and handed to every consumer unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReferences {
    references: Vec<AssetReference>,
}

impl AssetReferences {
    pub fn new(references: Vec<AssetReference>) -> Self {
        Self { references }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetReference> {
        self.references.iter()
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

impl<'a> IntoIterator for &'a AssetReferences {
    type Item = &'a AssetReference;
    type IntoIter = std::slice::Iter<'a, AssetReference>;

    fn into_iter(self) -> Self::IntoIter {
        self.references.iter()
    }
}

/// A reference paired with the verified file backing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub reference: AssetReference,
    pub path: PathBuf,
}

impl ResolvedAsset {
    pub fn basename(&self) -> &str {
        self.reference.basename()
    }
}

/// Resolved assets, positionally aligned with the [`AssetReferences`] they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedAssets {
    assets: Vec<ResolvedAsset>,
}

impl ResolvedAssets {
    pub fn new(assets: Vec<ResolvedAsset>) -> Self {
        Self { assets }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolvedAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets with distinct basenames, first occurrence wins.
    pub fn unique(&self) -> impl Iterator<Item = &ResolvedAsset> {
        self.assets.iter().enumerate().filter_map(|(index, asset)| {
            let first = self.assets[..index]
                .iter()
                .all(|earlier| earlier.basename() != asset.basename());
            first.then_some(asset)
        })
    }
}

impl<'a> IntoIterator for &'a ResolvedAssets {
    type Item = &'a ResolvedAsset;
    type IntoIter = std::slice::Iter<'a, ResolvedAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}

/// Where a derived HTML variant is going to be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderContext {
    /// HTML saved in `root`, with asset copies under `assets_dir`.
    LocalFile { root: PathBuf, assets_dir: PathBuf },
    /// HTML staged in the temporary directory `root` for PDF conversion, with
    /// asset copies under `assets_dir`.
    PdfStaging { root: PathBuf, assets_dir: PathBuf },
    /// HTML body of an email; images travel as inline parts.
    Email,
}

impl RenderContext {
    pub fn name(&self) -> &'static str {
        match self {
            RenderContext::LocalFile { .. } => "local_file",
            RenderContext::PdfStaging { .. } => "pdf_staging",
            RenderContext::Email => "email",
        }
    }
}
