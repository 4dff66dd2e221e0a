//! Static asset serving.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use http::StatusCode;
use tokio::io::AsyncReadExt;
use tracing::{debug, error};

use crate::path::file_extension;
use crate::sink::{ResponseHead, ResponseSink};
use crate::OriginError;

const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Content type for a file extension.
pub fn content_type_for(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml; charset=utf-8",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Cache policy for an asset path: hashed build output never changes,
/// everything else must revalidate.
fn cache_control_for(path: &str) -> &'static str {
    if path.starts_with("/assets/") {
        "public, max-age=31536000, immutable"
    } else {
        "no-cache"
    }
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

/// Stream a static asset through the sink.
///
/// The path must already be normalized (traversal segments collapsed).
/// Missing files yield 404. Read failures before the head is sent yield 500;
/// after the head is sent the status line is already on the wire, so the
/// failure is only logged and the response ends truncated.
pub async fn serve_static(
    root: &Path,
    path: &str,
    head_only: bool,
    sink: &mut dyn ResponseSink,
) -> Result<(), OriginError> {
    let file_path = resolve(root, path);

    let mut file = match tokio::fs::File::open(&file_path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return send_not_found(sink, head_only).await;
        }
        Err(err) => {
            error!(path = %path, error = %err, "static asset open failed");
            return send_server_error(sink, head_only).await;
        }
    };

    let metadata = match file.metadata().await {
        Ok(metadata) => metadata,
        Err(err) => {
            error!(path = %path, error = %err, "static asset metadata failed");
            return send_server_error(sink, head_only).await;
        }
    };
    if metadata.is_dir() {
        return send_not_found(sink, head_only).await;
    }

    let content_type = file_extension(path)
        .map(content_type_for)
        .unwrap_or("application/octet-stream");
    let head = ResponseHead::new(StatusCode::OK)
        .header("content-type", content_type)
        .header("content-length", metadata.len().to_string())
        .header("cache-control", cache_control_for(path));
    sink.send_head(head).await?;

    if head_only {
        return sink.finish().await;
    }

    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => sink.send_chunk(Bytes::copy_from_slice(&buf[..n])).await?,
            Err(err) => {
                // The head is already on the wire; the status cannot be amended.
                error!(path = %path, error = %err, "static asset stream failed mid-body");
                return sink.finish().await;
            }
        }
    }

    debug!(path = %path, bytes = metadata.len(), "static asset served");
    sink.finish().await
}

async fn send_not_found(
    sink: &mut dyn ResponseSink,
    head_only: bool,
) -> Result<(), OriginError> {
    let head = ResponseHead::new(StatusCode::NOT_FOUND)
        .header("content-type", "text/plain; charset=utf-8");
    sink.send_head(head).await?;
    if !head_only {
        sink.send_chunk(Bytes::from_static(b"Not Found")).await?;
    }
    sink.finish().await
}

async fn send_server_error(
    sink: &mut dyn ResponseSink,
    head_only: bool,
) -> Result<(), OriginError> {
    let head = ResponseHead::new(StatusCode::INTERNAL_SERVER_ERROR)
        .header("content-type", "text/plain; charset=utf-8");
    sink.send_head(head).await?;
    if !head_only {
        sink.send_chunk(Bytes::from_static(b"Internal Server Error"))
            .await?;
    }
    sink.finish().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::BufferedSink;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("css"), "text/css; charset=utf-8");
        assert_eq!(content_type_for("WOFF2"), "font/woff2");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }

    #[test]
    fn test_cache_control_immutable_for_hashed_assets() {
        assert_eq!(
            cache_control_for("/assets/app-abc123.js"),
            "public, max-age=31536000, immutable"
        );
        assert_eq!(cache_control_for("/logo.svg"), "no-cache");
    }

    #[tokio::test]
    async fn test_missing_file_yields_404() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = BufferedSink::new();

        serve_static(dir.path(), "/nonexistent.png", false, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(sink.body_string(), "Not Found");
    }

    #[tokio::test]
    async fn test_existing_file_streams_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        let mut sink = BufferedSink::new();

        serve_static(dir.path(), "/style.css", false, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert_eq!(sink.header("content-type"), Some("text/css; charset=utf-8"));
        assert_eq!(sink.header("content-length"), Some("6"));
        assert_eq!(sink.body_string(), "body{}");
    }

    #[tokio::test]
    async fn test_head_only_sends_no_body() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body{}").unwrap();
        let mut sink = BufferedSink::new();

        serve_static(dir.path(), "/style.css", true, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert_eq!(sink.header("content-length"), Some("6"));
        assert!(sink.body().is_empty());
    }
}
