//! Browser-resident caching agent for the Keel site resilience layer.
//!
//! The agent intercepts every outgoing GET request from an already-loaded
//! page, chooses a caching strategy per request class, maintains versioned
//! cache generations, and serves an offline fallback when the network is
//! unreachable.
//!
//! The lifecycle (install / activate / fetch) is modeled as an explicit
//! state machine over a pluggable [`CacheStore`], so the whole agent is
//! testable against an in-memory store without a browser runtime.
//!
//! This crate provides:
//! - `CachingAgent` - the lifecycle state machine
//! - `GenerationManager` - named, versioned cache partitions
//! - `Strategies` - network-first and stale-while-revalidate execution
//! - `OfflineFallback` - the last-resort offline document policy
//! - `CacheStore` / `NetworkClient` - platform seams with in-memory doubles

mod error;
mod fallback;
mod generation;
mod lifecycle;
mod network;
mod store;
mod strategy;
mod types;

pub use error::*;
pub use fallback::*;
pub use generation::*;
pub use lifecycle::*;
pub use network::*;
pub use store::*;
pub use strategy::*;
pub use types::*;
