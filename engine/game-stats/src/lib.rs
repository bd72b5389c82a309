//! # Game Stats
//!
//! Shared data model for the performance-projection engine: per-game player stat lines,
//! schedule and venue metadata, injury reports, and the contextual factors
//! (home/away, opponent defense, surface, roof) derived from them.
//!
//! Everything here is read-only input supplied by the data layer. The helpers are pure
//! functions over explicit collections.

pub mod context;
pub mod stats;
pub mod types;

pub use context::{
    opponent_defensive_factor, ContextualFactors, DefenseTable, MAX_OPPONENT_FACTOR,
    MIN_OPPONENT_FACTOR,
};
pub use types::*;
