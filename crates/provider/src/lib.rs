//! LLM provider integration layer.
//!
//! Defines the [`adapter::ProviderAdapter`] seam the rest of the
//! system calls through, an HTTP-backed implementation, per-provider
//! sliding-window rate limiting, and the failover router that tries
//! providers in priority order.

pub mod adapter;
pub mod error;
pub mod http;
pub mod limiter;
pub mod router;
pub mod testing;

pub use adapter::ProviderAdapter;
pub use error::ProviderError;
pub use router::{ProviderRouter, Routed, RouterError};
