//! Shared data structures for the earthquake decision-support pipeline
//!
//! This module defines the core types for the advisory pipeline:
//! - Situation: uncertainty-tagged canonical state (`EarthquakeSituation`)
//! - Phase: ordered time phases, time slices, and experience units
//! - Snapshot: narrative decision snapshots for the live HTTP path
//! - Advisory: projection, intervention, confidence, and response types

mod advisory;
mod phase;
mod situation;
mod snapshot;

pub use advisory::*;
pub use phase::*;
pub use situation::*;
pub use snapshot::*;
