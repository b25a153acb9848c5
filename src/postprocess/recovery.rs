//! Late-order recovery.
//!
//! # Algorithm
//!
//! Re-times every route under relaxed windows, then repeats until the
//! deadline or until nothing improves:
//!
//! 1. For every excluded order, every robot and every pickup/delivery
//!    position pair, re-time the route with the order spliced in.
//! 2. Keep the insertion with the lexicographically smallest
//!    (adherence, efficiency, distance) delta, if that delta is negative.
//!
//! A late delivery still earns a partial award of 20 to 80, so almost every
//! feasible insertion lowers the adherence term.
//!
//! # Complexity
//!
//! O(U × n³) per step, where U = excluded orders and n = planned nodes.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::evaluation::{Cost, CostEvaluator, RoutingModel, WindowMode};
use crate::extract::{extract_solution, Assignment};
use crate::local_search::spliced;
use crate::models::Solution;

/// Result of [`LateOrderRecovery::recover`].
#[derive(Debug, Clone)]
pub struct Recovery {
    /// Solution timed under relaxed windows.
    pub solution: Solution,
    /// Orders that were excluded before and are served now.
    pub recovered: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Placement {
    delta: Cost,
    order: usize,
    robot: usize,
    route: Vec<usize>,
}

/// Greedy insertion of excluded orders under relaxed windows.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::RoutingModel;
/// use u_pdptw::models::{Problem, Solution, TimeWindow};
/// use u_pdptw::postprocess::LateOrderRecovery;
///
/// // the window opens after the horizon: strictly unservable
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(160, 170)], distances, durations).unwrap();
/// let model = RoutingModel::new(&problem, &ModelConfig::default());
///
/// let deadline = Instant::now() + Duration::from_secs(1);
/// let empty = Solution::new(vec![vec![]], vec![vec![]]);
/// let recovery = LateOrderRecovery::new(&model).recover(&empty, deadline).unwrap();
///
/// assert_eq!(recovery.recovered, vec![0]);
/// assert_eq!(recovery.solution.timetables()[0], vec![27, 30]);
/// ```
#[derive(Debug, Clone)]
pub struct LateOrderRecovery<'a> {
    model: RoutingModel<'a>,
    evaluator: CostEvaluator<'a>,
}

impl<'a> LateOrderRecovery<'a> {
    /// Creates a recovery phase over a relaxed copy of `model`.
    pub fn new(model: &RoutingModel<'a>) -> Self {
        Self {
            model: model.clone().with_mode(WindowMode::Relaxed),
            evaluator: CostEvaluator::new(model.problem()),
        }
    }

    /// Inserts excluded orders into `solution` until the deadline.
    ///
    /// Every route is re-timed under relaxed windows, including routes that
    /// receive no order.
    ///
    /// # Errors
    ///
    /// [`PlanError::Infeasible`](crate::error::PlanError::Infeasible) if a
    /// route of `solution` is infeasible even with relaxed windows.
    pub fn recover(&self, solution: &Solution, deadline: Instant) -> Result<Recovery> {
        let problem = self.model.problem();
        let mut routes: Vec<Vec<usize>> = solution.routes().to_vec();
        let current = extract_solution(
            &self.model,
            &Assignment::from_routes(routes.clone(), problem.depot()),
        )?;
        let mut costs: Vec<Cost> = routes
            .iter()
            .zip(current.timetables())
            .map(|(route, times)| self.evaluator.route_cost(route, times))
            .collect();

        let served = solution.served_orders();
        let mut excluded: Vec<usize> = (0..problem.order_count())
            .filter(|o| served.binary_search(o).is_err())
            .collect();
        let mut recovered = Vec::new();

        while !excluded.is_empty() && Instant::now() < deadline {
            let Some(best) = self.best_placement(&routes, &costs, &excluded, deadline) else {
                break;
            };
            debug!(
                event = "order_recovered",
                order = best.order,
                robot = best.robot,
                delta = %best.delta,
            );
            costs[best.robot] = costs[best.robot] + best.delta;
            routes[best.robot] = best.route;
            excluded.retain(|&o| o != best.order);
            recovered.push(best.order);
        }

        let solution = extract_solution(
            &self.model,
            &Assignment::from_routes(routes, problem.depot()),
        )?;
        recovered.sort_unstable();
        Ok(Recovery {
            solution,
            recovered,
        })
    }

    fn best_placement(
        &self,
        routes: &[Vec<usize>],
        costs: &[Cost],
        excluded: &[usize],
        deadline: Instant,
    ) -> Option<Placement> {
        let found: Vec<Option<Placement>> = excluded
            .par_iter()
            .map(|&order| {
                if Instant::now() >= deadline {
                    return None;
                }
                self.best_for(order, routes, costs)
            })
            .collect();

        found.into_iter().flatten().fold(None, |best, p| match best {
            Some(b) if b.delta <= p.delta => Some(b),
            _ => Some(p),
        })
    }

    fn best_for(&self, order: usize, routes: &[Vec<usize>], costs: &[Cost]) -> Option<Placement> {
        let problem = self.model.problem();
        let mut best: Option<Placement> = None;

        for (robot, base) in routes.iter().enumerate() {
            let capacity = problem.capacity(robot);
            for i in 0..=base.len() {
                for j in i..=base.len() {
                    let route = spliced(base, order, i, j);
                    let Some(times) = self.model.schedule(capacity, &route) else {
                        continue;
                    };
                    let delta = self.evaluator.route_cost(&route, &times) - costs[robot];
                    if delta >= Cost::default() {
                        continue;
                    }
                    if best.as_ref().is_some_and(|b| b.delta <= delta) {
                        continue;
                    }
                    best = Some(Placement {
                        delta,
                        order,
                        robot,
                        route,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProblemBuilder;
    use crate::clock::ClockEpoch;
    use crate::config::ModelConfig;
    use crate::local_search::tests::{far_deadline, line_problem};
    use crate::models::{Coordinate, Order, Problem, Robot};

    fn late_problem() -> Problem {
        // order 1 wants 12:55-13:00, after the strict horizon
        let orders = vec![
            Order::new(10, Coordinate::new(0, 0), Coordinate::new(0, 10), 1100, 1200),
            Order::new(11, Coordinate::new(0, 10), Coordinate::new(0, 20), 1310, 1320),
        ];
        ProblemBuilder::new(&ModelConfig::default(), ClockEpoch::default())
            .build(&[Robot::new(0, 2)], &orders)
            .unwrap()
    }

    #[test]
    fn test_recovers_late_order() {
        let problem = late_problem();
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        assert!(!model.is_servable(1));

        let times = model.schedule(2, &[0, 1]).unwrap();
        let solution = Solution::new(vec![vec![0, 1]], vec![times]);
        let recovery = LateOrderRecovery::new(&model).recover(&solution, far_deadline()).unwrap();

        assert_eq!(recovery.recovered, vec![1]);
        assert_eq!(recovery.solution.served_orders(), vec![0, 1]);
        assert!(recovery.solution.validate(&problem).is_empty());

        let cost = CostEvaluator::new(&problem).evaluate(&recovery.solution);
        // order 0 on time, order 1 late with a partial award
        assert!(cost.adherence < -100 - 19);
        assert!(cost.adherence > -200);
    }

    #[test]
    fn test_nothing_to_recover() {
        let problem = line_problem(&[(0, 10)], &[2]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let times = model.schedule(2, &[0, 1]).unwrap();
        let solution = Solution::new(vec![vec![0, 1]], vec![times]);

        let recovery = LateOrderRecovery::new(&model).recover(&solution, far_deadline()).unwrap();
        assert!(recovery.recovered.is_empty());
        assert_eq!(recovery.solution, solution);
    }

    #[test]
    fn test_capacity_still_binds() {
        let problem = line_problem(&[(0, 10), (0, 10)], &[0]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let solution = Solution::new(vec![vec![]], vec![vec![]]);

        let recovery = LateOrderRecovery::new(&model).recover(&solution, far_deadline()).unwrap();
        assert!(recovery.recovered.is_empty());
        assert_eq!(recovery.solution.num_served(), 0);
    }

    #[test]
    fn test_expired_deadline_only_retimes() {
        let problem = late_problem();
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let solution = Solution::new(vec![vec![]], vec![vec![]]);
        let recovery = LateOrderRecovery::new(&model).recover(&solution, Instant::now()).unwrap();
        assert!(recovery.recovered.is_empty());
    }

    #[test]
    fn test_rejects_infeasible_input() {
        let problem = line_problem(&[(0, 10), (0, 10)], &[1]);
        let model = RoutingModel::new(&problem, &ModelConfig::default());
        let solution = Solution::new(vec![vec![0, 2, 1, 3]], vec![vec![0, 0, 30, 30]]);
        assert!(LateOrderRecovery::new(&model).recover(&solution, far_deadline()).is_err());
    }
}
