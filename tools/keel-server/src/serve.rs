//! Axum bridge for the origin handler.
//!
//! The origin handler writes through a [`ResponseSink`]; this module adapts
//! that to an axum response by forwarding the head over a oneshot channel
//! and body chunks over an mpsc channel feeding the response stream.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use keel_origin::{OriginError, OriginHandler, OriginRequest, ResponseHead, ResponseSink};

/// Sink that forwards the response into an axum body stream.
struct ChannelSink {
    head: Option<oneshot::Sender<ResponseHead>>,
    chunks: mpsc::Sender<Bytes>,
    sent: bool,
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn send_head(&mut self, head: ResponseHead) -> Result<(), OriginError> {
        match self.head.take() {
            Some(tx) => {
                self.sent = true;
                tx.send(head)
                    .map_err(|_| OriginError::Sink("response head receiver dropped".to_string()))
            }
            None => Err(OriginError::Sink("head already sent".to_string())),
        }
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), OriginError> {
        if !self.sent {
            return Err(OriginError::Sink("body chunk before head".to_string()));
        }
        self.chunks
            .send(chunk)
            .await
            .map_err(|_| OriginError::Sink("client disconnected".to_string()))
    }

    async fn finish(&mut self) -> Result<(), OriginError> {
        Ok(())
    }

    fn headers_sent(&self) -> bool {
        self.sent
    }
}

/// Run the server until ctrl-c.
pub async fn run(listen: SocketAddr, handler: Arc<OriginHandler>) -> Result<()> {
    let app = Router::new().fallback(dispatch).with_state(handler);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("keel-server stopped");
    Ok(())
}

async fn dispatch(State(handler): State<Arc<OriginHandler>>, request: Request) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let origin_request = OriginRequest::new(request.method().clone(), target);

    let (head_tx, head_rx) = oneshot::channel();
    let (chunk_tx, chunk_rx) = mpsc::channel::<Bytes>(16);
    let mut sink = ChannelSink {
        head: Some(head_tx),
        chunks: chunk_tx,
        sent: false,
    };

    tokio::spawn(async move {
        if let Err(err) = handler.handle(origin_request, &mut sink).await {
            // Usually a disconnected client; the response cannot be amended.
            debug!(error = %err, "origin handler did not complete");
        }
    });

    match head_rx.await {
        Ok(head) => into_axum_response(head, chunk_rx),
        Err(_) => {
            error!("origin handler dropped without sending a head");
            internal_error()
        }
    }
}

fn into_axum_response(head: ResponseHead, chunk_rx: mpsc::Receiver<Bytes>) -> Response {
    let stream = futures::stream::unfold(chunk_rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<Bytes, std::io::Error>(chunk), rx))
    });

    let mut builder = Response::builder().status(head.status);
    for (name, value) in &head.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    match builder.body(Body::from_stream(stream)) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "response head could not be materialized");
            internal_error()
        }
    }
}

fn internal_error() -> Response {
    Response::builder()
        .status(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::from("Internal Server Error"))
        .unwrap_or_default()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
