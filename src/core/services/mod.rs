//! Catalog services
//!
//! - `provider`: HTTP lyrics provider client
//! - `enrichment`: retry-protected song creation
//! - `verses`: cache-aside paginated verse reads
//! - `library`: filtered library listing
//! - `catalog`: facade over all of the above

pub mod catalog;
pub mod enrichment;
pub mod library;
pub mod provider;
pub mod verses;

// Re-export main types
pub use catalog::{Catalog, CatalogOptions};
pub use enrichment::RetryPolicy;
pub use provider::{HttpLyricsProvider, LyricsProvider};
