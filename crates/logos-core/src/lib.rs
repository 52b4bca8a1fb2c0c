//! LOGOS Core Domain
//!
//! Pure domain layer of the LOGOS learning engine: numeric kernels,
//! linguistic analyzers, the IRT and FSRS engines, corpus statistics,
//! the L1 transfer model, the entity model, and the repository ports.
//! No I/O happens in this crate; infrastructure implementations are
//! provided through the repository traits.

pub mod analyzers;
pub mod corpus;
pub mod entities;
pub mod fsrs;
pub mod irt;
pub mod numerics;
pub mod repository;
pub mod transfer;

pub use corpus::*;
pub use entities::*;
pub use fsrs::*;
pub use irt::*;
pub use numerics::*;
pub use repository::*;
pub use transfer::*;
