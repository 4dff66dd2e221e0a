//! Page template handling.

use std::path::Path;

use crate::OriginError;

/// Marker replaced with server-rendered markup, or with a loading indicator
/// in the client-only variant.
pub const APP_ROOT_MARKER: &str = "<!--app-html-->";

/// Marker replaced with the hydration bootstrap state.
pub const BOOTSTRAP_MARKER: &str = "<!--app-state-->";

const LOADING_FRAGMENT: &str = r#"<div class="page-loading" aria-busy="true"></div>"#;
const CLIENT_ONLY_BOOTSTRAP: &str = r#"<script>window.__CLIENT_ONLY__ = true;</script>"#;

/// Load the base HTML template from disk.
pub async fn load_template(path: &Path) -> Result<String, OriginError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| OriginError::Template(format!("{}: {}", path.display(), err)))
}

/// Derive the client-only variant of the template.
///
/// The app-root marker becomes a loading indicator and the bootstrap marker
/// becomes a flag that disables the render-aware hydration path. The variant
/// must be computable before any rendering is attempted: it is the handler's
/// ultimate fallback, including for failures that happen mid-pipeline.
pub fn client_only_variant(template: &str) -> String {
    template
        .replace(APP_ROOT_MARKER, LOADING_FRAGMENT)
        .replace(BOOTSTRAP_MARKER, CLIENT_ONLY_BOOTSTRAP)
}

/// Inject canonical-URL and structured-data metadata before `</head>`.
///
/// Applied to both the full template and the client-only variant, since
/// either may end up being served.
pub fn inject_metadata(
    html: &str,
    canonical_url: &str,
    structured_data: &serde_json::Value,
) -> String {
    let tags = format!(
        "<link rel=\"canonical\" href=\"{canonical_url}\">\n\
         <script type=\"application/ld+json\">{structured_data}</script>\n"
    );
    match html.find("</head>") {
        Some(idx) => format!("{}{}{}", &html[..idx], tags, &html[idx..]),
        None => format!("{tags}{html}"),
    }
}

/// JSON-LD structured data payload for a page.
pub fn structured_data(site_name: &str, canonical_url: &str) -> serde_json::Value {
    serde_json::json!({
        "@context": "https://schema.org",
        "@type": "WebPage",
        "name": site_name,
        "url": canonical_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<html><head><title>t</title></head>\
                            <body><!--app-html--><!--app-state--></body></html>";

    #[test]
    fn test_client_only_variant_replaces_both_markers() {
        let variant = client_only_variant(TEMPLATE);

        assert!(!variant.contains(APP_ROOT_MARKER));
        assert!(!variant.contains(BOOTSTRAP_MARKER));
        assert!(variant.contains("page-loading"));
        assert!(variant.contains("window.__CLIENT_ONLY__ = true"));
    }

    #[test]
    fn test_metadata_lands_before_head_close() {
        let data = structured_data("Keel", "https://example.com/pricing");

        let html = inject_metadata(TEMPLATE, "https://example.com/pricing", &data);

        let canonical_at = html.find("rel=\"canonical\"").unwrap();
        let head_close_at = html.find("</head>").unwrap();
        assert!(canonical_at < head_close_at);
        assert!(html.contains("application/ld+json"));
    }

    #[test]
    fn test_metadata_without_head_is_prepended() {
        let data = structured_data("Keel", "https://example.com/");

        let html = inject_metadata("<body></body>", "https://example.com/", &data);

        assert!(html.starts_with("<link rel=\"canonical\""));
        assert!(html.ends_with("<body></body>"));
    }

    #[test]
    fn test_structured_data_shape() {
        let data = structured_data("Keel", "https://example.com/docs");

        assert_eq!(data["@type"], "WebPage");
        assert_eq!(data["url"], "https://example.com/docs");
    }
}
