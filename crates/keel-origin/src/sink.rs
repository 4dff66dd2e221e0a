//! Streaming response sink.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

use crate::OriginError;

/// Response head: status line plus headers.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers, in insertion order.
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Create a head with the given status and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Streaming response writer handed to the origin handler.
///
/// The head may be sent exactly once; chunks may only follow it. Callers
/// consult `headers_sent` to decide whether a mid-response failure is still
/// recoverable: once the head is on the wire the status line cannot be
/// amended.
#[async_trait]
pub trait ResponseSink: Send {
    /// Send the status line and headers. Fails if already sent.
    async fn send_head(&mut self, head: ResponseHead) -> Result<(), OriginError>;

    /// Send a body chunk. Fails if the head has not been sent.
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), OriginError>;

    /// Complete the response.
    async fn finish(&mut self) -> Result<(), OriginError>;

    /// Whether the head has already been written.
    fn headers_sent(&self) -> bool;
}

/// Send a complete response in one call, omitting the body for HEAD requests.
pub async fn send_full(
    sink: &mut dyn ResponseSink,
    head: ResponseHead,
    body: Bytes,
    head_only: bool,
) -> Result<(), OriginError> {
    sink.send_head(head).await?;
    if !head_only {
        sink.send_chunk(body).await?;
    }
    sink.finish().await
}

/// In-memory sink for tests and buffered responses.
#[derive(Debug, Default)]
pub struct BufferedSink {
    head: Option<ResponseHead>,
    body: Vec<u8>,
    finished: bool,
}

impl BufferedSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded status, if the head was sent.
    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|h| h.status)
    }

    /// Recorded head, if sent.
    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Recorded header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.as_ref().and_then(|h| h.get(name))
    }

    /// Accumulated body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Accumulated body as UTF-8 (lossy).
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether `finish` was called.
    pub fn finished(&self) -> bool {
        self.finished
    }
}

#[async_trait]
impl ResponseSink for BufferedSink {
    async fn send_head(&mut self, head: ResponseHead) -> Result<(), OriginError> {
        if self.head.is_some() {
            return Err(OriginError::Sink("head already sent".to_string()));
        }
        self.head = Some(head);
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), OriginError> {
        if self.head.is_none() {
            return Err(OriginError::Sink("body chunk before head".to_string()));
        }
        if self.finished {
            return Err(OriginError::Sink("sink already finished".to_string()));
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), OriginError> {
        self.finished = true;
        Ok(())
    }

    fn headers_sent(&self) -> bool {
        self.head.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_head_sent_once() {
        let mut sink = BufferedSink::new();

        sink.send_head(ResponseHead::new(StatusCode::OK)).await.unwrap();
        let second = sink.send_head(ResponseHead::new(StatusCode::OK)).await;

        assert!(second.is_err());
        assert!(sink.headers_sent());
    }

    #[tokio::test]
    async fn test_chunk_requires_head() {
        let mut sink = BufferedSink::new();

        let result = sink.send_chunk(Bytes::from_static(b"hi")).await;

        assert!(result.is_err());
        assert!(!sink.headers_sent());
    }

    #[tokio::test]
    async fn test_send_full_head_only_omits_body() {
        let mut sink = BufferedSink::new();
        let head = ResponseHead::new(StatusCode::OK).header("content-type", "text/plain");

        send_full(&mut sink, head, Bytes::from_static(b"body"), true)
            .await
            .unwrap();

        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert!(sink.body().is_empty());
        assert!(sink.finished());
    }
}
