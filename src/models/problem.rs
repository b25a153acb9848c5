//! Planning problem instance.

use crate::distance::DistanceMatrix;
use crate::error::{PlanError, Result};

use super::node::depot_node;
use super::TimeWindow;

/// A normalized pickup-and-delivery instance.
///
/// Holds per-robot capacities, per-order delivery windows in elapsed
/// minutes, and node×node distance and duration matrices over
/// `2 * order_count + 1` nodes whose depot row and column are zero.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::{Problem, TimeWindow};
/// use u_pdptw::distance::DistanceMatrix;
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
///
/// assert_eq!(problem.robot_count(), 1);
/// assert_eq!(problem.order_count(), 1);
/// assert_eq!(problem.depot(), 2);
/// assert_eq!(problem.duration(0, 1), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Problem {
    capacities: Vec<i32>,
    windows: Vec<TimeWindow>,
    distances: DistanceMatrix,
    durations: DistanceMatrix,
}

impl Problem {
    /// Creates a problem, checking that all dimensions agree.
    pub fn new(
        capacities: Vec<i32>,
        windows: Vec<TimeWindow>,
        distances: DistanceMatrix,
        durations: DistanceMatrix,
    ) -> Result<Self> {
        let nodes = 2 * windows.len() + 1;
        if distances.size() != nodes || durations.size() != nodes {
            return Err(PlanError::Configuration(format!(
                "matrices must be {nodes}x{nodes}, got {} and {}",
                distances.size(),
                durations.size()
            )));
        }
        Ok(Self {
            capacities,
            windows,
            distances,
            durations,
        })
    }

    /// Number of robots.
    pub fn robot_count(&self) -> usize {
        self.capacities.len()
    }

    /// Number of planned orders.
    pub fn order_count(&self) -> usize {
        self.windows.len()
    }

    /// Number of graph nodes, depot included.
    pub fn node_count(&self) -> usize {
        2 * self.order_count() + 1
    }

    /// Depot node index.
    pub fn depot(&self) -> usize {
        depot_node(self.order_count())
    }

    /// Capacity per robot.
    pub fn capacities(&self) -> &[i32] {
        &self.capacities
    }

    /// Capacity of one robot.
    pub fn capacity(&self, robot: usize) -> i32 {
        self.capacities[robot]
    }

    /// Delivery window per order.
    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    /// Delivery window of one order.
    pub fn window(&self, order: usize) -> TimeWindow {
        self.windows[order]
    }

    /// Travel distance between two nodes.
    pub fn distance(&self, from: usize, to: usize) -> i64 {
        self.distances.get(from, to)
    }

    /// Travel minutes between two nodes.
    pub fn duration(&self, from: usize, to: usize) -> i64 {
        self.durations.get(from, to)
    }

    /// Distance matrix.
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Duration matrix.
    pub fn durations(&self) -> &DistanceMatrix {
        &self.durations
    }
}
