//! LOGOS - adaptive language-learning core
//!
//! The learning-science engine behind LOGOS: Item-Response-Theory
//! ability estimation, free spaced repetition (FSRS), mastery-stage
//! transitions, bottleneck/cascade detection, z(w)-driven task matching,
//! FRE priority queues and multi-goal Pareto allocation, orchestrated
//! per response by a session actor.
//!
//! This crate is a facade: the implementation lives in the workspace
//! crates and is re-exported here for applications and integration
//! tests.
//!
//! - [`logos_types`] - shared vocabulary, errors, configuration
//! - [`logos_core`] - numeric kernels, analyzers, IRT, FSRS, entities,
//!   repository ports
//! - [`logos_cognitive`] - task matching, stages, bottlenecks, priority,
//!   encounters, allocation, timing, the session orchestrator
//! - [`logos_infra`] - in-memory repositories, task cache, oracle stack,
//!   threshold registry, configuration loading

pub use logos_cognitive as cognitive;
pub use logos_core as core;
pub use logos_infra as infra;
pub use logos_types as types;

pub use logos_types::{LogosError, Result};
