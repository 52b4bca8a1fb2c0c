//! Shared types for the LOGOS learning core
//!
//! This crate contains the closed-set vocabulary (linguistic components,
//! mastery stages, task types, modalities), the common error type, and
//! cross-crate configuration shared by all LOGOS crates.

pub mod common;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use common::*;
pub use config::*;
pub use error::*;
