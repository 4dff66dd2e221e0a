//! SEO and diagnostics endpoints.
//!
//! These are answered before any file I/O and only for GET/HEAD; a HEAD
//! request gets identical headers and no body.

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;

use keel_core::SiteConfig;

use crate::health::{HealthTracker, RenderHealth};
use crate::sink::{send_full, ResponseHead, ResponseSink};
use crate::OriginError;

/// Robots endpoint path.
pub const ROBOTS_PATH: &str = "/robots.txt";
/// Sitemap endpoint path.
pub const SITEMAP_PATH: &str = "/sitemap.xml";
/// Render health status endpoint path.
pub const STATUS_PATH: &str = "/__ssr-status";

/// Whether a normalized path is handled by this module.
pub fn is_seo_path(path: &str) -> bool {
    matches!(path, ROBOTS_PATH | SITEMAP_PATH | STATUS_PATH)
}

/// Body of the robots endpoint.
pub fn robots_body(canonical_origin: &str) -> String {
    format!(
        "User-agent: *\nAllow: /\n\nSitemap: {canonical_origin}{SITEMAP_PATH}\n"
    )
}

/// Body of the sitemap endpoint, built from the configured routes.
pub fn sitemap_body(canonical_origin: &str, routes: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for route in routes {
        xml.push_str(&format!(
            "  <url><loc>{canonical_origin}{route}</loc></url>\n"
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Status payload: the render health snapshot plus the environment label.
#[derive(Debug, Serialize)]
struct StatusBody {
    #[serde(flatten)]
    health: RenderHealth,
    environment: String,
}

/// Answer one SEO endpoint. The caller has already verified the method.
pub async fn serve_seo(
    path: &str,
    head_only: bool,
    config: &SiteConfig,
    health: &HealthTracker,
    sink: &mut dyn ResponseSink,
) -> Result<(), OriginError> {
    let (head, body) = match path {
        ROBOTS_PATH => (
            ResponseHead::new(StatusCode::OK)
                .header("content-type", "text/plain; charset=utf-8")
                .header("cache-control", "public, max-age=86400"),
            robots_body(&config.canonical_origin),
        ),
        SITEMAP_PATH => (
            ResponseHead::new(StatusCode::OK)
                .header("content-type", "application/xml; charset=utf-8")
                .header("cache-control", "public, max-age=900"),
            sitemap_body(&config.canonical_origin, &config.sitemap_routes),
        ),
        STATUS_PATH => {
            let body = StatusBody {
                health: health.snapshot(),
                environment: config.environment.clone(),
            };
            (
                ResponseHead::new(StatusCode::OK)
                    .header("content-type", "application/json")
                    .header("cache-control", "no-store"),
                serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string()),
            )
        }
        other => {
            return Err(OriginError::Sink(format!(
                "not an SEO endpoint: {other}"
            )))
        }
    };

    send_full(sink, head, Bytes::from(body), head_only).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seo_path_set() {
        assert!(is_seo_path("/robots.txt"));
        assert!(is_seo_path("/sitemap.xml"));
        assert!(is_seo_path("/__ssr-status"));
        assert!(!is_seo_path("/pricing"));
        assert!(!is_seo_path("/robots.txt2"));
    }

    #[test]
    fn test_robots_references_sitemap() {
        let body = robots_body("https://example.com");

        assert!(body.starts_with("User-agent: *"));
        assert!(body.contains("Sitemap: https://example.com/sitemap.xml"));
    }

    #[test]
    fn test_sitemap_lists_routes() {
        let routes = vec!["/".to_string(), "/pricing".to_string()];

        let xml = sitemap_body("https://example.com", &routes);

        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/pricing</loc>"));
        assert!(xml.ends_with("</urlset>\n"));
    }
}
