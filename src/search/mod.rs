//! Search engine: plan state, guided penalties and the search driver.
//!
//! - [`WorkingPlan`] — routes with cached loads and start minutes
//! - [`GuidedPenalties`] — arc penalties of guided local search
//! - [`SearchEngine`] — INITIAL → LOCAL_SEARCH → TERMINATED driver

mod engine;
mod penalty;
mod plan;

pub use engine::{SearchEngine, SearchOutcome, SearchState, Termination};
pub use penalty::GuidedPenalties;
pub use plan::{RouteState, WorkingPlan};
