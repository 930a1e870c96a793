//! Infrastructure and cross-cutting concerns
//!
//! This module contains infrastructure components:
//! - Key-value cache backends (Redis, in-process)
//! - Cancellation token threaded through core operations

pub mod cache;
pub mod cancel;

// Re-export main types
pub use cache::{open_cache, KeyValueCache, MemoryCache};
pub use cancel::CancelToken;
