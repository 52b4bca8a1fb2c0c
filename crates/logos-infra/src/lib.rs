//! LOGOS Infrastructure
//!
//! Concrete adapters behind the core's ports: in-memory repositories
//! with an atomic scoring transaction, the bounded task cache, the
//! content-oracle client stack (rate limiting, timeout, template
//! fallback, offline retry queue), the process-wide threshold registry,
//! and configuration loading.

pub mod config;
pub mod oracle;
pub mod registry;
pub mod repositories;
pub mod task_cache;

pub use config::*;
pub use oracle::*;
pub use registry::*;
pub use repositories::*;
pub use task_cache::*;
