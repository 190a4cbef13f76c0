//! Domain types used throughout the cascade driver.
//!
//! This module defines:
//!
//! - the analysis template enum (`Template`) and optimizer enums
//!   (`Strategy`, `Optimizer`)
//! - ordered, duplicate-free source-name sets (`SourceSet`)
//! - per-round outputs (`RoundRecord`, `ScheduleTrace`, `RunSummary`)

pub mod types;

pub use types::*;
