//! Constraint checking and plan scoring.
//!
//! [`RoutingModel`] decides whether a node sequence is feasible for a robot
//! and what it costs to travel; [`CostEvaluator`] scores a finished
//! [`Solution`](crate::models::Solution) on the three reporting axes.

mod constraints;
mod cost;

pub use constraints::{ArcPenalty, NoPenalty, RoutingModel, SequenceCost, WindowMode};
pub use cost::{Cost, CostEvaluator};
