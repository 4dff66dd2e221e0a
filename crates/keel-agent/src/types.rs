//! Request/response vocabulary for the caching agent.

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Method, StatusCode};

/// How the platform issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    /// Subresource or programmatic fetch.
    #[default]
    Subresource,
}

/// An outgoing request intercepted by the agent.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URL, absolute or path-absolute. Cache entries are keyed by
    /// this exact string.
    pub url: String,
    /// Request mode.
    pub mode: RequestMode,
}

impl FetchRequest {
    /// Create a GET subresource request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            mode: RequestMode::Subresource,
        }
    }

    /// Create a GET navigation request.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    /// Set the HTTP method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Whether this is a top-level document navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Path component used for classification: scheme/host, query and
    /// fragment stripped.
    pub fn path(&self) -> &str {
        let after_scheme = match self.url.find("://") {
            Some(idx) => {
                let rest = &self.url[idx + 3..];
                match rest.find('/') {
                    Some(slash) => &rest[slash..],
                    None => "/",
                }
            }
            None => self.url.as_str(),
        };
        after_scheme.split(['?', '#']).next().unwrap_or("/")
    }
}

/// A response held by the agent or produced by the network.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Full response body.
    pub body: Bytes,
}

impl FetchResponse {
    /// Create an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Create a 200 response with a body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this response may be persisted.
    ///
    /// Only 200-class responses are stored; persisting an error response
    /// would make a transient failure permanent.
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success()
    }
}

/// A fetch interception delivered by the platform.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    /// The intercepted request.
    pub request: FetchRequest,
    /// Navigation preload response, when the platform issued one.
    pub preload: Option<FetchResponse>,
}

impl FetchEvent {
    /// Create an event with no preload.
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            preload: None,
        }
    }

    /// Attach a navigation preload response.
    pub fn with_preload(mut self, preload: FetchResponse) -> Self {
        self.preload = Some(preload);
        self
    }
}

/// The agent's answer to a fetch event.
///
/// `deferred` carries background work (cache revalidation) that the
/// platform should keep the agent alive for; drivers either await it after
/// delivering the response or detach it onto the runtime.
pub struct FetchOutcome {
    /// The response delivered to the page.
    pub response: FetchResponse,
    /// Background work to run after the response is delivered.
    pub deferred: Option<BoxFuture<'static, ()>>,
}

impl FetchOutcome {
    /// An outcome with no background work.
    pub fn immediate(response: FetchResponse) -> Self {
        Self {
            response,
            deferred: None,
        }
    }

    /// An outcome with deferred background work.
    pub fn with_deferred(response: FetchResponse, deferred: BoxFuture<'static, ()>) -> Self {
        Self {
            response,
            deferred: Some(deferred),
        }
    }

    /// Run any deferred work to completion and return the response.
    pub async fn settle(self) -> FetchResponse {
        if let Some(deferred) = self.deferred {
            deferred.await;
        }
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_strips_origin_query_and_fragment() {
        assert_eq!(FetchRequest::get("/api/posts?page=2").path(), "/api/posts");
        assert_eq!(
            FetchRequest::get("https://keel.test/assets/app.js#x").path(),
            "/assets/app.js"
        );
        assert_eq!(FetchRequest::get("https://keel.test").path(), "/");
        assert_eq!(FetchRequest::navigate("/pricing").path(), "/pricing");
    }

    #[test]
    fn test_cacheable_statuses() {
        assert!(FetchResponse::ok("hi").is_cacheable());
        assert!(FetchResponse::new(StatusCode::NO_CONTENT).is_cacheable());
        assert!(!FetchResponse::new(StatusCode::NOT_FOUND).is_cacheable());
        assert!(!FetchResponse::new(StatusCode::BAD_GATEWAY).is_cacheable());
        assert!(!FetchResponse::new(StatusCode::FOUND).is_cacheable());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = FetchResponse::ok("x").with_header("Content-Type", "text/html");

        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("x-missing"), None);
    }
}
