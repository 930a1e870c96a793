//! Service wiring
//!
//! - `ServiceFactory`: builds the catalog and its collaborators from configuration

pub mod factory;

pub use factory::ServiceFactory;
