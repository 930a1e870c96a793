//! Core functionality modules
//!
//! This module contains all core business logic organized into logical layers:
//! - `data`: Repository capability and its SQLite implementation
//! - `services`: Lyrics provider, enrichment, verse and library services
//! - `infrastructure`: Cross-cutting concerns (cache, cancellation)
//! - `lyrics`: Stanza splitting and lyrics normalization
//! - `models`: Domain types shared across layers

pub mod data;
pub mod infrastructure;
pub mod lyrics;
pub mod models;
pub mod services;
