//! Capacity and time dimensions of the pickup-delivery graph.
//!
//! The model walks a node sequence (depot excluded at both ends) and
//! propagates two cumulative quantities:
//!
//! - **load**: +1 at a pickup, −1 at a delivery, kept within `[0, capacity]`;
//! - **time**: transit minutes accumulate, waiting is allowed, every node is
//!   bounded by `[0, horizon_end]` and every delivery additionally by its
//!   order's window intersected with `[earliest_delivery, horizon_end]`.
//!
//! Arcs touching the depot cost nothing in distance and in time.

use crate::config::ModelConfig;
use crate::models::node::{is_pickup, order_of};
use crate::models::{Problem, TimeWindow};

/// How delivery windows constrain the time dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowMode {
    /// Deliveries must fall inside their order's window.
    #[default]
    Strict,
    /// Deliveries only need `[earliest_delivery, horizon_end]`; the robot
    /// still waits for the window to open when that is reachable.
    Relaxed,
}

/// Extra cost per arc, added on top of travel distance.
///
/// The search uses this seam to add guided local search penalties.
pub trait ArcPenalty: Sync {
    /// Penalty cost of travelling `from → to`.
    fn penalty(&self, from: usize, to: usize) -> i64;
}

/// Arc penalty that is always zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPenalty;

impl ArcPenalty for NoPenalty {
    fn penalty(&self, _from: usize, _to: usize) -> i64 {
        0
    }
}

/// Distance of a feasible sequence, raw and with arc penalties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCost {
    /// Sum of raw arc distances.
    pub distance: i64,
    /// Distance plus arc penalties.
    pub augmented: i64,
}

/// Constraint model over a [`Problem`].
///
/// # Examples
///
/// ```
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::{NoPenalty, RoutingModel};
/// use u_pdptw::models::{Problem, TimeWindow};
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
/// let model = RoutingModel::new(&problem, &ModelConfig::default());
///
/// assert_eq!(model.schedule(2, &[0, 1]), Some(vec![27, 30]));
/// assert_eq!(model.evaluate(2, [0, 1], &NoPenalty).unwrap().distance, 5);
/// assert!(model.evaluate(2, [1, 0], &NoPenalty).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RoutingModel<'a> {
    problem: &'a Problem,
    horizon_end: i64,
    earliest_delivery: i64,
    exclusion_penalty: i64,
    delivery_bounds: Vec<TimeWindow>,
    mode: WindowMode,
}

impl<'a> RoutingModel<'a> {
    /// Builds the model with strict delivery windows.
    pub fn new(problem: &'a Problem, config: &ModelConfig) -> Self {
        let horizon_end = config.horizon_end();
        let earliest_delivery = config.earliest_delivery;
        let delivery_bounds = problem
            .windows()
            .iter()
            .map(|w| {
                w.clamp(0, horizon_end)
                    .clamp(earliest_delivery, horizon_end)
            })
            .collect();
        let exclusion_penalty = config
            .exclusion_penalty
            .unwrap_or_else(|| problem.distances().max_value())
            .max(1);

        Self {
            problem,
            horizon_end,
            earliest_delivery,
            exclusion_penalty,
            delivery_bounds,
            mode: WindowMode::Strict,
        }
    }

    /// Switches the delivery window mode.
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Underlying problem.
    pub fn problem(&self) -> &'a Problem {
        self.problem
    }

    /// Active window mode.
    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    /// Last minute any node may be served.
    pub fn horizon_end(&self) -> i64 {
        self.horizon_end
    }

    /// Cost of leaving one node unvisited.
    pub fn exclusion_penalty(&self) -> i64 {
        self.exclusion_penalty
    }

    /// Cost of leaving an order (both of its nodes) unplanned.
    pub fn pair_penalty(&self) -> i64 {
        2 * self.exclusion_penalty
    }

    /// Strict arrival bound of an order's delivery node.
    pub fn delivery_bound(&self, order: usize) -> TimeWindow {
        self.delivery_bounds[order]
    }

    /// Returns `true` if some arrival minute can satisfy the order's delivery.
    pub fn is_servable(&self, order: usize) -> bool {
        match self.mode {
            WindowMode::Strict => !self.delivery_bounds[order].is_empty(),
            WindowMode::Relaxed => self.earliest_delivery <= self.horizon_end,
        }
    }

    /// Travel distance of an arc, zero across the depot.
    pub fn arc_distance(&self, from: usize, to: usize) -> i64 {
        self.problem.distance(from, to)
    }

    /// Travel minutes of an arc, zero across the depot.
    pub fn arc_duration(&self, from: usize, to: usize) -> i64 {
        self.problem.duration(from, to)
    }

    /// Service bounds `(lower, upper)` of a node: service starts at
    /// `max(arrival, lower)` and must not pass `upper`.
    pub fn service_bounds(&self, node: usize) -> (i64, i64) {
        if is_pickup(node) {
            return (0, self.horizon_end);
        }
        let order = order_of(node);
        match self.mode {
            WindowMode::Strict => {
                let bound = self.delivery_bounds[order];
                (bound.lower(), bound.upper().min(self.horizon_end))
            }
            WindowMode::Relaxed => {
                let opens = self
                    .problem
                    .window(order)
                    .lower()
                    .max(self.earliest_delivery);
                if opens <= self.horizon_end {
                    (opens, self.horizon_end)
                } else {
                    (self.earliest_delivery, self.horizon_end)
                }
            }
        }
    }

    /// Earliest service minute at `node` when arriving at `arrival`, or
    /// `None` if the node can no longer be served.
    pub fn service_start(&self, node: usize, arrival: i64) -> Option<i64> {
        let (lower, upper) = self.service_bounds(node);
        let start = arrival.max(lower);
        (start <= upper).then_some(start)
    }

    /// Latest arrival minute at each position from which the rest of the
    /// sequence can still be served in time.
    ///
    /// A position that can never be served gets [`i64::MIN`]. Arriving at
    /// `nodes[k]` no later than `latest[k]` keeps `nodes[k..]` feasible in
    /// the time dimension.
    ///
    /// # Complexity
    ///
    /// O(n), one backward pass.
    pub fn latest_arrivals(&self, nodes: &[usize]) -> Vec<i64> {
        let mut latest = vec![i64::MIN; nodes.len()];
        let mut next: Option<i64> = None;
        for k in (0..nodes.len()).rev() {
            let (lower, upper) = self.service_bounds(nodes[k]);
            let bound = match next {
                None => upper,
                Some(i64::MIN) => i64::MIN,
                Some(limit) => upper.min(limit - self.arc_duration(nodes[k], nodes[k + 1])),
            };
            latest[k] = if bound == i64::MIN || lower > bound {
                i64::MIN
            } else {
                bound
            };
            next = Some(latest[k]);
        }
        latest
    }

    /// Checks both dimensions along `nodes` and returns the sequence cost.
    ///
    /// Returns `None` as soon as the load leaves `[0, capacity]` or a node
    /// cannot be served in time. Pairing is not checked here; callers only
    /// build sequences that keep pickups before their deliveries.
    pub fn evaluate<I, P>(&self, capacity: i32, nodes: I, penalty: &P) -> Option<SequenceCost>
    where
        I: IntoIterator<Item = usize>,
        P: ArcPenalty + ?Sized,
    {
        let mut cost = SequenceCost::default();
        let mut prev: Option<usize> = None;
        let mut time = 0;
        let mut load = 0;

        for node in nodes {
            if let Some(p) = prev {
                let d = self.arc_distance(p, node);
                cost.distance += d;
                cost.augmented += d + penalty.penalty(p, node);
                time += self.arc_duration(p, node);
            }
            time = self.service_start(node, time)?;
            load += if is_pickup(node) { 1 } else { -1 };
            if load < 0 || load > capacity {
                return None;
            }
            prev = Some(node);
        }

        Some(cost)
    }

    /// Service minutes along a feasible sequence.
    ///
    /// Deliveries are served at their earliest feasible minute; every pickup
    /// is then pushed to the latest minute that still reaches its successor
    /// on time.
    pub fn schedule(&self, capacity: i32, nodes: &[usize]) -> Option<Vec<i64>> {
        let mut times = Vec::with_capacity(nodes.len());
        let mut time = 0;
        let mut load = 0;

        for (k, &node) in nodes.iter().enumerate() {
            if k > 0 {
                time += self.arc_duration(nodes[k - 1], node);
            }
            time = self.service_start(node, time)?;
            load += if is_pickup(node) { 1 } else { -1 };
            if load < 0 || load > capacity {
                return None;
            }
            times.push(time);
        }

        for k in (0..nodes.len().saturating_sub(1)).rev() {
            if is_pickup(nodes[k]) {
                let latest = times[k + 1] - self.arc_duration(nodes[k], nodes[k + 1]);
                times[k] = times[k].max(latest.min(self.horizon_end));
            }
        }

        Some(times)
    }

    /// Total minutes orders spend on board along a feasible sequence.
    ///
    /// This is the secondary cost used to break ties between moves of equal
    /// primary cost: smaller means earlier deliveries and later pickups.
    pub fn carried_minutes(&self, capacity: i32, nodes: &[usize]) -> Option<i64> {
        let times = self.schedule(capacity, nodes)?;
        Some(
            nodes
                .iter()
                .zip(&times)
                .map(|(&n, &t)| if is_pickup(n) { -t } else { t })
                .sum(),
        )
    }
}
