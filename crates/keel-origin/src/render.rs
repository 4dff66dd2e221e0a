//! Render capability seam and entry-point resolution.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

use keel_core::SiteConfig;

use crate::manifest::AssetManifest;
use crate::sink::{ResponseHead, ResponseSink};
use crate::template::{APP_ROOT_MARKER, BOOTSTRAP_MARKER};
use crate::OriginError;

/// Naming convention for render entry points found by directory scan.
const ENTRY_SCAN_PREFIX: &str = "render-";
const ENTRY_SCAN_SUFFIX: &str = ".mjs";

/// Everything the render capability needs for one request.
pub struct RenderContext<'a> {
    /// Normalized request path.
    pub path: &'a str,
    /// Full template with metadata already injected.
    pub template: &'a str,
    /// Build manifest for preload hints.
    pub manifest: &'a AssetManifest,
    /// Resolved render entry point.
    pub entry: &'a Path,
    /// Canonical URL for this page; rendered responses carry it as a
    /// `Link` header.
    pub canonical_url: &'a str,
    /// Whether only the head should be written (HEAD request).
    pub head_only: bool,
}

/// Failure from the render capability.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RenderFailure {
    /// Human-readable cause, recorded by the health tracker.
    pub message: String,
    /// Whether the response was already partially written when the failure
    /// hit. Once bytes are on the wire the handler can only log.
    pub bytes_written: bool,
}

impl RenderFailure {
    /// Failure before anything reached the wire; still recoverable.
    pub fn before_output(cause: impl Display) -> Self {
        Self {
            message: cause.to_string(),
            bytes_written: false,
        }
    }

    /// Failure after bytes were flushed; the connection is committed.
    pub fn mid_stream(cause: impl Display) -> Self {
        Self {
            message: cause.to_string(),
            bytes_written: true,
        }
    }
}

/// The opaque server-render capability.
///
/// On success the implementation has written the complete response through
/// the sink, including the canonical `Link` header from the context. The
/// origin handler treats rendering as a black box and only cares whether
/// bytes reached the wire before a failure.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        ctx: RenderContext<'_>,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), RenderFailure>;
}

/// Ordered-candidate resolver for the render entry point.
///
/// Checks a small list of known build output paths first, then scans the
/// assets directory for the `render-*.mjs` naming convention as a last
/// resort. No hit means render cannot proceed for this request.
#[derive(Debug, Clone)]
pub struct RenderEntryResolver {
    candidates: Vec<PathBuf>,
    scan_dir: PathBuf,
}

impl RenderEntryResolver {
    /// Create a resolver over explicit candidates and a scan directory.
    pub fn new(candidates: Vec<PathBuf>, scan_dir: PathBuf) -> Self {
        Self {
            candidates,
            scan_dir,
        }
    }

    /// Create a resolver from the site configuration.
    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(config.entry_paths(), config.entry_scan_path())
    }

    /// Resolve the entry point; first existing candidate wins.
    pub async fn resolve(&self) -> Result<PathBuf, OriginError> {
        for candidate in &self.candidates {
            if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
                return Ok(candidate.clone());
            }
        }

        let mut dir = tokio::fs::read_dir(&self.scan_dir)
            .await
            .map_err(|_| OriginError::EntryNotFound)?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|_| OriginError::EntryNotFound)?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(ENTRY_SCAN_PREFIX) && name.ends_with(ENTRY_SCAN_SUFFIX) {
                return Ok(entry.path());
            }
        }
        Err(OriginError::EntryNotFound)
    }
}

/// Default render capability: emits the prepared template with
/// manifest-derived modulepreload hints and an empty, hydration-ready app
/// root. Deployments with a real view renderer replace this through the
/// `Renderer` seam.
#[derive(Debug, Default)]
pub struct ShellRenderer;

#[async_trait]
impl Renderer for ShellRenderer {
    async fn render(
        &self,
        ctx: RenderContext<'_>,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), RenderFailure> {
        let mut hints = String::new();
        for path in ctx.manifest.preload_paths() {
            hints.push_str(&format!(
                "<link rel=\"modulepreload\" href=\"/{path}\">\n"
            ));
        }

        let html = ctx
            .template
            .replace(APP_ROOT_MARKER, r#"<div id="app" data-server-rendered="true"></div>"#)
            .replace(
                BOOTSTRAP_MARKER,
                r#"<script>window.__CLIENT_ONLY__ = false;</script>"#,
            );
        let html = match html.find("</head>") {
            Some(idx) => format!("{}{}{}", &html[..idx], hints, &html[idx..]),
            None => html,
        };

        let head = ResponseHead::new(StatusCode::OK)
            .header("content-type", "text/html; charset=utf-8")
            .header("cache-control", "no-cache")
            .header("link", format!("<{}>; rel=\"canonical\"", ctx.canonical_url));
        sink.send_head(head).await.map_err(RenderFailure::before_output)?;
        if !ctx.head_only {
            sink.send_chunk(Bytes::from(html))
                .await
                .map_err(RenderFailure::mid_stream)?;
        }
        sink.finish().await.map_err(RenderFailure::mid_stream)?;
        Ok(())
    }
}
