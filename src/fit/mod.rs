//! Staged fitting control logic.
//!
//! Responsibilities:
//!
//! - bulk freeze/thaw of source parameters (`activation`)
//! - strategy-to-optimizer dispatch (`strategy`)
//! - the fixed five-stage convergence sequence (`schedule`)
//! - the source-removal comparison cascade (`cascade`)

pub mod activation;
pub mod cascade;
pub mod schedule;
pub mod strategy;

pub use activation::*;
pub use cascade::*;
pub use schedule::*;
pub use strategy::*;
