//! Build-time asset manifest loading.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use keel_core::SiteConfig;

/// Entry in the build manifest: the assets a module needs at runtime.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestEntry {
    /// Primary asset emitted for the module.
    pub file: String,
    /// Stylesheets imported by the module.
    #[serde(default)]
    pub css: Vec<String>,
    /// Other static assets referenced by the module.
    #[serde(default)]
    pub assets: Vec<String>,
}

/// Opaque mapping from module identifier to physical asset paths, used to
/// compute preload hints during render.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: HashMap<String, ManifestEntry>,
}

impl AssetManifest {
    /// Number of modules in the manifest.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All asset paths for one module id.
    pub fn assets_for(&self, id: &str) -> Vec<&str> {
        let Some(entry) = self.entries.get(id) else {
            return Vec::new();
        };
        std::iter::once(entry.file.as_str())
            .chain(entry.css.iter().map(String::as_str))
            .chain(entry.assets.iter().map(String::as_str))
            .collect()
    }

    /// Every primary asset in the manifest, sorted, for preload hints.
    pub fn preload_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.values().map(|e| e.file.as_str()).collect();
        paths.sort_unstable();
        paths
    }
}

/// Ordered-candidate manifest loader.
///
/// Candidates are tried in order; an unreadable or unparsable candidate
/// moves the search along rather than aborting it. A missing manifest is a
/// degraded state, not an error: the handler skips rendering and serves the
/// client-only variant. The manifest is loaded per request and never cached
/// across requests.
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    candidates: Vec<PathBuf>,
}

impl ManifestLoader {
    /// Create a loader over an explicit candidate list.
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// Create a loader from the site configuration.
    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.manifest_paths())
    }

    /// Try each candidate in order; first parsable manifest wins.
    pub async fn load(&self) -> Option<AssetManifest> {
        for candidate in &self.candidates {
            let raw = match tokio::fs::read_to_string(candidate).await {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            match serde_json::from_str::<AssetManifest>(&raw) {
                Ok(manifest) => {
                    debug!(
                        path = %candidate.display(),
                        modules = manifest.len(),
                        "asset manifest loaded"
                    );
                    return Some(manifest);
                }
                Err(err) => {
                    warn!(
                        path = %candidate.display(),
                        error = %err,
                        "asset manifest candidate failed to parse, trying next"
                    );
                }
            }
        }
        None
    }
}
