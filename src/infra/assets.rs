//! Filesystem lookup and staging of template assets.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::domain::assets::{AssetReferences, ResolvedAsset, ResolvedAssets};

use super::error::InfraError;

const FALLBACK_ASSETS_DIR_NAME: &str = "assets";

/// Locates referenced assets inside a single directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    assets_dir: PathBuf,
}

impl AssetResolver {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    /// Final component of the assets directory, used as the folder name for copies.
    pub fn dir_name(&self) -> PathBuf {
        self.assets_dir
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_ASSETS_DIR_NAME))
    }

    /// Resolve every reference to `assets_dir/basename`, in the order given.
    ///
    /// Stops at the first reference whose file does not exist.
    pub fn resolve(&self, references: &AssetReferences) -> Result<ResolvedAssets, InfraError> {
        let mut resolved = Vec::with_capacity(references.len());

        for reference in references {
            let basename = reference.basename();
            let candidate = self.assets_dir.join(basename);
            if basename.is_empty() || !candidate.is_file() {
                return Err(InfraError::missing_asset(
                    basename,
                    self.assets_dir.display().to_string(),
                ));
            }

            let path = fs::canonicalize(&candidate)?;
            debug!(
                target = "infra::assets",
                src = reference.src(),
                path = %path.display(),
                "Resolved asset reference"
            );
            resolved.push(ResolvedAsset {
                reference: reference.clone(),
                path,
            });
        }

        Ok(ResolvedAssets::new(resolved))
    }
}

/// Copy each distinct asset into `target_dir`, creating it if needed.
///
/// A destination that already is the source file is left alone.
pub fn copy_assets(assets: &ResolvedAssets, target_dir: &Path) -> Result<Vec<PathBuf>, InfraError> {
    fs::create_dir_all(target_dir)?;

    let mut copies = Vec::new();
    for asset in assets.unique() {
        let destination = target_dir.join(asset.basename());
        if is_same_file(&asset.path, &destination) {
            debug!(
                target = "infra::assets",
                path = %destination.display(),
                "Asset already in place"
            );
        } else {
            fs::copy(&asset.path, &destination)?;
        }
        copies.push(destination);
    }

    Ok(copies)
}

fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(destination)) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    }
}
