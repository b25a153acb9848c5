//! Domain model types for robot pickup-and-delivery planning.
//!
//! Provides robots with capacities, orders with pickup/delivery coordinates
//! and delivery windows, the node indexing of the routing graph, the
//! normalized problem instance, and the per-robot solution.

pub mod node;
mod order;
mod problem;
mod robot;
mod solution;

pub use node::NodeKind;
pub use order::{Coordinate, Order, TimeWindow};
pub use problem::Problem;
pub use robot::Robot;
pub use solution::{Solution, Violation, ViolationType};
