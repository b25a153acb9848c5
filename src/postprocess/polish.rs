//! Carried-time polishing.
//!
//! # Algorithm
//!
//! Repeats until the deadline or the attempt limit:
//!
//! 1. Pick a random robot with a non-empty route and a random order on it.
//! 2. Take the order's pair off the route and reinsert it at random
//!    positions, pickup first.
//! 3. Re-time the route under strict windows. Keep the candidate if it is
//!    feasible and its (efficiency, distance) is not worse than before.
//!
//! Equal-cost candidates are accepted, so the walk drifts across plateaus.
//! Adherence cannot change: every delivery stays inside its window.

use std::time::Instant;

use rand::Rng;
use tracing::debug;

use crate::evaluation::{CostEvaluator, RoutingModel, WindowMode};
use crate::local_search::{spliced, without_pair};
use crate::models::node::{is_pickup, order_of};
use crate::models::Solution;

/// Counters of one polishing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PolishStats {
    /// Reinsertions tried.
    pub attempts: u64,
    /// Reinsertions kept.
    pub accepted: u64,
}

/// Random within-route reinsertion that shortens carried time.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::RoutingModel;
/// use u_pdptw::models::{Problem, Solution, TimeWindow};
/// use u_pdptw::postprocess::CarriedTimePolisher;
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
/// let model = RoutingModel::new(&problem, &ModelConfig::default());
///
/// let mut solution = Solution::new(vec![vec![0, 1]], vec![vec![27, 30]]);
/// let mut rng = StdRng::seed_from_u64(0);
/// let deadline = Instant::now() + Duration::from_secs(1);
/// let stats = CarriedTimePolisher::new(&model, 10).polish(&mut solution, &mut rng, deadline);
///
/// assert_eq!(stats.attempts, 10);
/// assert_eq!(solution.routes()[0], vec![0, 1]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CarriedTimePolisher<'a> {
    model: &'a RoutingModel<'a>,
    evaluator: CostEvaluator<'a>,
    max_attempts: u64,
}

impl<'a> CarriedTimePolisher<'a> {
    /// Creates a polisher; the model should be in strict window mode.
    pub fn new(model: &'a RoutingModel<'a>, max_attempts: u64) -> Self {
        Self {
            model,
            evaluator: CostEvaluator::new(model.problem()),
            max_attempts,
        }
    }

    /// Polishes `solution` in place.
    ///
    /// The set of served orders and the route each order is on never change.
    pub fn polish<R: Rng>(&self, solution: &mut Solution, rng: &mut R, deadline: Instant) -> PolishStats {
        let mut stats = PolishStats::default();
        if self.model.mode() != WindowMode::Strict {
            return stats;
        }

        let busy: Vec<usize> = (0..solution.num_routes())
            .filter(|&r| !solution.routes()[r].is_empty())
            .collect();
        if busy.is_empty() {
            return stats;
        }

        let problem = self.model.problem();
        while stats.attempts < self.max_attempts && Instant::now() < deadline {
            stats.attempts += 1;

            let robot = busy[rng.random_range(0..busy.len())];
            let route = &solution.routes()[robot];
            let pickups: Vec<usize> = route.iter().copied().filter(|&n| is_pickup(n)).collect();
            if pickups.is_empty() {
                continue;
            }
            let order = order_of(pickups[rng.random_range(0..pickups.len())]);

            let base = without_pair(route, order);
            let pickup_pos = rng.random_range(0..=base.len());
            let delivery_pos = rng.random_range(pickup_pos..=base.len());
            let candidate = spliced(&base, order, pickup_pos, delivery_pos);
            if candidate == *route {
                continue;
            }

            let Some(times) = self.model.schedule(problem.capacity(robot), &candidate) else {
                continue;
            };
            let current = self
                .evaluator
                .route_cost(route, &solution.timetables()[robot]);
            let polished = self.evaluator.route_cost(&candidate, &times);
            if polished.secondary() <= current.secondary() {
                stats.accepted += 1;
                solution.replace_route(robot, candidate, times);
            }
        }

        debug!(
            event = "polish_end",
            attempts = stats.attempts,
            accepted = stats.accepted,
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::local_search::tests::{far_deadline, line_problem};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn timed(model: &RoutingModel<'_>, routes: Vec<Vec<usize>>) -> Solution {
        let problem = model.problem();
        let times = routes
            .iter()
            .enumerate()
            .map(|(r, route)| model.schedule(problem.capacity(r), route).unwrap())
            .collect();
        Solution::new(routes, times)
    }

    #[test]
    fn test_polish_untangles_route() {
        // p0 p1 d0 d1 zig-zags; p0 d0 p1 d1 is shorter and carries less
        let problem = line_problem(&[(0, 10), (20, 30)], &[2]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let evaluator = CostEvaluator::new(&problem);
        let mut solution = timed(&model, vec![vec![0, 2, 1, 3]]);
        let before = evaluator.evaluate(&solution);

        let mut rng = StdRng::seed_from_u64(0);
        let stats = CarriedTimePolisher::new(&model, 2000).polish(&mut solution, &mut rng, far_deadline());
        let after = evaluator.evaluate(&solution);

        assert!(stats.accepted > 0);
        assert_eq!(solution.routes()[0], vec![0, 1, 2, 3]);
        assert_eq!(after.distance, 30);
        assert!(after.secondary() < before.secondary());
        assert_eq!(after.adherence, before.adherence);
    }

    #[test]
    fn test_polish_keeps_served_orders() {
        let problem = line_problem(&[(0, 10), (5, 15), (40, 50), (45, 0)], &[2, 2]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let evaluator = CostEvaluator::new(&problem);
        let mut solution = timed(&model, vec![vec![0, 2, 3, 1], vec![4, 5, 6, 7]]);
        let before = evaluator.evaluate(&solution);
        let robot_of: Vec<Vec<usize>> = solution
            .routes()
            .iter()
            .map(|r| {
                let mut orders: Vec<usize> = r.iter().map(|&n| order_of(n)).collect();
                orders.sort_unstable();
                orders.dedup();
                orders
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(42);
        CarriedTimePolisher::new(&model, 500).polish(&mut solution, &mut rng, far_deadline());

        assert!(solution.validate(&problem).is_empty());
        assert_eq!(solution.served_orders(), vec![0, 1, 2, 3]);
        for (r, orders) in robot_of.iter().enumerate() {
            let mut now: Vec<usize> = solution.routes()[r].iter().map(|&n| order_of(n)).collect();
            now.sort_unstable();
            now.dedup();
            assert_eq!(&now, orders);
        }
        assert!(evaluator.evaluate(&solution).secondary() <= before.secondary());
    }

    #[test]
    fn test_polish_respects_deadline_and_empty_routes() {
        let problem = line_problem(&[(0, 10)], &[2]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let polisher = CarriedTimePolisher::new(&model, 100);
        let mut rng = StdRng::seed_from_u64(0);

        let mut solution = timed(&model, vec![vec![0, 1]]);
        let stats = polisher.polish(&mut solution, &mut rng, Instant::now());
        assert_eq!(stats.attempts, 0);

        let mut empty = Solution::new(vec![vec![]], vec![vec![]]);
        let stats = polisher.polish(&mut empty, &mut rng, far_deadline());
        assert_eq!(stats, PolishStats::default());
    }

    #[test]
    fn test_polish_is_seeded() {
        let problem = line_problem(&[(0, 10), (20, 30), (5, 25)], &[3]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let polisher = CarriedTimePolisher::new(&model, 300);
        let start = timed(&model, vec![vec![0, 2, 4, 1, 5, 3]]);

        let run = |seed| {
            let mut solution = start.clone();
            let mut rng = StdRng::seed_from_u64(seed);
            polisher.polish(&mut solution, &mut rng, far_deadline());
            solution
        };
        assert_eq!(run(7), run(7));
    }
}
