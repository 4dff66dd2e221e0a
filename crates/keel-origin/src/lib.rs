//! Origin request handler for the Keel site resilience layer.
//!
//! Every request that reaches the origin gets exactly one response, and a
//! navigable page is always answered with a usable document: a full server
//! render when possible, a client-only shell when not.
//!
//! This crate provides:
//! - `OriginHandler` - request classification and dispatch
//! - `HealthTracker` - process-wide render health record
//! - `ManifestLoader` - tolerant, ordered-candidate asset manifest loading
//! - `Renderer` / `RenderEntryResolver` - the opaque render capability seam
//! - `ResponseSink` - streaming response writer abstraction

mod assets;
mod error;
mod handler;
mod health;
mod manifest;
mod path;
mod render;
mod seo;
mod sink;
mod template;

pub use assets::*;
pub use error::*;
pub use handler::*;
pub use health::*;
pub use manifest::*;
pub use path::*;
pub use render::*;
pub use seo::*;
pub use sink::*;
pub use template::*;
