//! LOGOS Cognitive Layer
//!
//! The decision layer of the learning engine: z(w)-driven task matching,
//! the mastery stage machine, bottleneck/cascade detection, priority and
//! queue building, encounter aggregation, the multi-curriculum Pareto
//! allocator, response-timing classification, and the session
//! orchestrator that wires everything into the per-response pipeline.

pub mod allocator;
pub mod bottleneck;
pub mod encounter;
pub mod features;
pub mod orchestrator;
pub mod priority;
pub mod stages;
pub mod timing;

pub use allocator::*;
pub use bottleneck::*;
pub use encounter::*;
pub use features::*;
pub use orchestrator::*;
pub use priority::*;
pub use stages::*;
pub use timing::*;
