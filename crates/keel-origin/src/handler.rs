//! Origin request handling.
//!
//! Classifies each incoming request (SEO endpoint, static asset, page) and,
//! for pages, attempts a server render that degrades to a client-only shell
//! on any failure. Exactly one response is produced per request; render
//! failures are caught at the narrowest point that still has a fallback to
//! offer, and the top level only backstops failures that happen before a
//! fallback template exists.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use tracing::{debug, error, info, warn};

use keel_core::{RequestId, SiteConfig};

use crate::assets::serve_static;
use crate::health::HealthTracker;
use crate::manifest::ManifestLoader;
use crate::path::{is_asset_path, normalize_request_path};
use crate::render::{RenderContext, RenderEntryResolver, Renderer};
use crate::seo::{is_seo_path, serve_seo};
use crate::sink::{ResponseHead, ResponseSink};
use crate::template::{client_only_variant, inject_metadata, load_template, structured_data};
use crate::OriginError;

/// Marker header set on responses produced by the client-only fallback.
pub const FALLBACK_HEADER: &str = "x-ssr-fallback";

/// An incoming request, reduced to what the origin handler needs.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    /// HTTP method.
    pub method: Method,
    /// Raw request target, possibly encoded, possibly carrying a query.
    pub target: String,
}

impl OriginRequest {
    /// Create a request from a method and raw target.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
        }
    }

    /// Convenience GET constructor.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }
}

/// Template pair prepared for a page request.
///
/// The client-only variant is derived before any rendering is attempted so
/// that every later failure still has a usable document to fall back to.
struct PreparedPage {
    template: String,
    client_only: String,
    canonical_url: Option<String>,
}

/// How the render pipeline ended.
enum RenderOutcome {
    /// Renderer wrote the complete response.
    Rendered,
    /// Render could not complete; serve the client-only variant.
    Fallback(String),
    /// Render failed after bytes reached the wire; nothing can be sent.
    Committed(String),
}

/// The origin request handler.
///
/// Holds the injected collaborators: site configuration, the opaque render
/// capability, and the shared health tracker.
pub struct OriginHandler {
    config: SiteConfig,
    health: HealthTracker,
    renderer: Arc<dyn Renderer>,
    manifests: ManifestLoader,
    entries: RenderEntryResolver,
}

impl OriginHandler {
    /// Create a handler over the given configuration and collaborators.
    pub fn new(config: SiteConfig, renderer: Arc<dyn Renderer>, health: HealthTracker) -> Self {
        let manifests = ManifestLoader::from_config(&config);
        let entries = RenderEntryResolver::from_config(&config);
        Self {
            config,
            health,
            renderer,
            manifests,
            entries,
        }
    }

    /// The shared health tracker.
    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// The site configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Answer one request. Every branch resolves the connection with
    /// exactly one response.
    pub async fn handle(
        &self,
        request: OriginRequest,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), OriginError> {
        let id = RequestId::generate();
        let path = normalize_request_path(&request.target);
        let head_only = request.method == Method::HEAD;
        debug!(
            request_id = %id,
            method = %request.method,
            path = %path,
            "request received"
        );

        if is_seo_path(&path) && (request.method == Method::GET || head_only) {
            return serve_seo(&path, head_only, &self.config, &self.health, sink).await;
        }

        if is_asset_path(&path) {
            return serve_static(&self.config.site_root, &path, head_only, sink).await;
        }

        self.render_page(&id, &path, head_only, sink).await
    }

    /// Page render path: prepare the fallback first, then try to render.
    async fn render_page(
        &self,
        id: &RequestId,
        path: &str,
        head_only: bool,
        sink: &mut dyn ResponseSink,
    ) -> Result<(), OriginError> {
        let mut prepared = match self.prepare_page().await {
            Ok(prepared) => prepared,
            Err(err) => {
                // No template means no fallback is derivable either.
                error!(request_id = %id, path = %path, error = %err, "page template unavailable");
                return serve_error(sink, head_only).await;
            }
        };

        match self.try_render(path, head_only, &mut prepared, sink).await {
            RenderOutcome::Rendered => {
                self.health.mark_success();
                info!(request_id = %id, path = %path, "server render succeeded");
                Ok(())
            }
            RenderOutcome::Fallback(reason) => {
                self.health.mark_fallback(&reason);
                warn!(
                    request_id = %id,
                    path = %path,
                    reason = %reason,
                    "serving client-only fallback"
                );
                serve_client_only(
                    sink,
                    &prepared.client_only,
                    prepared.canonical_url.as_deref(),
                    head_only,
                )
                .await
            }
            RenderOutcome::Committed(reason) => {
                // Bytes already reached the wire; the response is whatever
                // was sent. Accepted limitation: log, no retry.
                error!(
                    request_id = %id,
                    path = %path,
                    reason = %reason,
                    "render failed after bytes were written"
                );
                Ok(())
            }
        }
    }

    async fn prepare_page(&self) -> Result<PreparedPage, OriginError> {
        let template = load_template(&self.config.template_path()).await?;
        let client_only = client_only_variant(&template);
        Ok(PreparedPage {
            template,
            client_only,
            canonical_url: None,
        })
    }

    /// Attempt the render pipeline. Every early exit is a fallback; only a
    /// renderer failure with bytes on the wire is unrecoverable.
    async fn try_render(
        &self,
        path: &str,
        head_only: bool,
        prepared: &mut PreparedPage,
        sink: &mut dyn ResponseSink,
    ) -> RenderOutcome {
        let entry = match self.entries.resolve().await {
            Ok(entry) => entry,
            Err(err) => {
                return RenderOutcome::Fallback(format!("render entry point unavailable: {err}"))
            }
        };

        let Some(manifest) = self.manifests.load().await else {
            return RenderOutcome::Fallback("manifest missing".to_string());
        };

        let canonical_url = format!("{}{}", self.config.canonical_origin, path);
        let data = structured_data(&self.config.site_name, &canonical_url);
        prepared.template = inject_metadata(&prepared.template, &canonical_url, &data);
        prepared.client_only = inject_metadata(&prepared.client_only, &canonical_url, &data);
        prepared.canonical_url = Some(canonical_url.clone());

        let ctx = RenderContext {
            path,
            template: &prepared.template,
            manifest: &manifest,
            entry: &entry,
            canonical_url: &canonical_url,
            head_only,
        };
        match self.renderer.render(ctx, sink).await {
            Ok(()) => RenderOutcome::Rendered,
            Err(failure) if failure.bytes_written || sink.headers_sent() => {
                RenderOutcome::Committed(failure.message)
            }
            Err(failure) => RenderOutcome::Fallback(failure.message),
        }
    }
}

/// Serve the client-only variant with the fallback marker header.
async fn serve_client_only(
    sink: &mut dyn ResponseSink,
    html: &str,
    canonical_url: Option<&str>,
    head_only: bool,
) -> Result<(), OriginError> {
    let mut head = ResponseHead::new(StatusCode::OK)
        .header("content-type", "text/html; charset=utf-8")
        .header("cache-control", "no-cache")
        .header(FALLBACK_HEADER, "true");
    if let Some(url) = canonical_url {
        head = head.header("link", format!("<{url}>; rel=\"canonical\""));
    }
    sink.send_head(head).await?;
    if !head_only {
        sink.send_chunk(Bytes::from(html.to_owned())).await?;
    }
    sink.finish().await
}

/// Last line of defense: a generic 500 when no fallback document exists.
async fn serve_error(sink: &mut dyn ResponseSink, head_only: bool) -> Result<(), OriginError> {
    let head = ResponseHead::new(StatusCode::INTERNAL_SERVER_ERROR)
        .header("content-type", "text/plain; charset=utf-8");
    sink.send_head(head).await?;
    if !head_only {
        sink.send_chunk(Bytes::from_static(b"Internal Server Error"))
            .await?;
    }
    sink.finish().await
}
