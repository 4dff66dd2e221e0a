//! Site-wide configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Configuration for the site served by the origin handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site name used in structured data.
    pub site_name: String,
    /// Directory containing the published site tree (template + assets).
    pub site_root: PathBuf,
    /// Base HTML template, relative to the site root.
    pub template_file: PathBuf,
    /// Canonical origin for absolute URLs, no trailing slash.
    pub canonical_origin: String,
    /// Deployment environment label exposed by the status endpoint.
    pub environment: String,
    /// Routes listed in the sitemap.
    pub sitemap_routes: Vec<String>,
    /// Asset manifest candidates, tried in order, relative to the site root.
    pub manifest_candidates: Vec<PathBuf>,
    /// Render entry point candidates, tried in order, relative to the site root.
    pub entry_candidates: Vec<PathBuf>,
    /// Directory scanned for a render entry point as a last resort,
    /// relative to the site root.
    pub entry_scan_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "Keel".to_string(),
            site_root: PathBuf::from("dist"),
            template_file: PathBuf::from("index.html"),
            canonical_origin: "https://example.com".to_string(),
            environment: "development".to_string(),
            sitemap_routes: vec![
                "/".to_string(),
                "/pricing".to_string(),
                "/blog".to_string(),
                "/docs".to_string(),
                "/help".to_string(),
            ],
            manifest_candidates: vec![
                PathBuf::from(".vite/manifest.json"),
                PathBuf::from("manifest.json"),
                PathBuf::from("assets/manifest.json"),
            ],
            entry_candidates: vec![
                PathBuf::from("server/entry-server.mjs"),
                PathBuf::from("entry-server.mjs"),
            ],
            entry_scan_dir: PathBuf::from("assets"),
        }
    }
}

impl SiteConfig {
    /// Create a configuration with the given site name.
    pub fn new(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Set the site root directory.
    pub fn with_site_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.site_root = root.into();
        self
    }

    /// Set the canonical origin.
    pub fn with_canonical_origin(mut self, origin: impl Into<String>) -> Self {
        self.canonical_origin = origin.into();
        self
    }

    /// Set the environment label.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Add a sitemap route.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.sitemap_routes.push(route.into());
        self
    }

    /// Absolute path of the base HTML template.
    pub fn template_path(&self) -> PathBuf {
        self.site_root.join(&self.template_file)
    }

    /// Manifest candidate paths resolved against the site root.
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.manifest_candidates
            .iter()
            .map(|c| self.site_root.join(c))
            .collect()
    }

    /// Render entry candidate paths resolved against the site root.
    pub fn entry_paths(&self) -> Vec<PathBuf> {
        self.entry_candidates
            .iter()
            .map(|c| self.site_root.join(c))
            .collect()
    }

    /// Entry scan directory resolved against the site root.
    pub fn entry_scan_path(&self) -> PathBuf {
        self.site_root.join(&self.entry_scan_dir)
    }
}
