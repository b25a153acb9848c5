//! Pair relocation operator.
//!
//! # Algorithm
//!
//! Takes a planned order off its route and reinserts its pickup and
//! delivery at the cheapest feasible positions of any route, its own route
//! included. The delta combines the removal on the source route with the
//! insertion on the target route:
//!
//! ```text
//! delta = (c(src - pair) - c(src)) + (c(dst + pair) - c(dst))
//! ```
//!
//! # Complexity
//!
//! O(P × R × n³) per scan, where P = planned orders, R = robots and
//! n = nodes per route (n² position pairs, each simulated in O(n)).
//!
//! # Reference
//!
//! Or, I. (1976). "Traveling Salesman-Type Combinatorial Problems and Their
//! Relation to the Logistics of Blood Banking". PhD thesis.

use crate::evaluation::ArcPenalty;

use super::{best_insertion, best_of, spliced, without_pair, BestMove, Candidate, Move, SearchContext};

/// Best improving pair relocation.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use u_pdptw::builder::ProblemBuilder;
/// use u_pdptw::clock::ClockEpoch;
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::evaluation::{NoPenalty, RoutingModel};
/// use u_pdptw::local_search::{find_best_relocate, Move, SearchContext};
/// use u_pdptw::models::{Coordinate, Order, Robot};
/// use u_pdptw::search::WorkingPlan;
///
/// let orders = vec![
///     Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1230),
///     Order::new(1, Coordinate::new(0, 50), Coordinate::new(0, 55), 1100, 1230),
/// ];
/// let config = ModelConfig::default();
/// let problem = ProblemBuilder::new(&config, ClockEpoch::default())
///     .build(&[Robot::new(0, 2), Robot::new(1, 2)], &orders)
///     .unwrap();
/// let model = RoutingModel::new(&problem, &config);
///
/// // both orders on robot 0, far apart, while robot 1 idles
/// let mut plan = WorkingPlan::new(&model);
/// let insert = |order, pickup_pos, delivery_pos| Move::Insert { order, route: 0, pickup_pos, delivery_pos };
/// plan.apply(&insert(0, 0, 0), &model, &NoPenalty).unwrap();
/// plan.apply(&insert(1, 0, 0), &model, &NoPenalty).unwrap();
///
/// let ctx = SearchContext { model: &model, plan: &plan, penalty: &NoPenalty, deadline: Instant::now() + Duration::from_secs(10), insertions: None };
/// let best = find_best_relocate(&ctx).unwrap();
/// assert!(best.objective_delta < 0);
/// ```
pub fn find_best_relocate<P: ArcPenalty + ?Sized>(ctx: &SearchContext<'_, P>) -> Option<Candidate> {
    let sources: Vec<(usize, usize)> = ctx.plan.assigned().collect();

    best_of(&sources, ctx.deadline, |&(order, from)| {
        let source = ctx.plan.route(from);
        let base = without_pair(source.nodes(), order);
        let removed = ctx.evaluate(from, &base)?;
        let mut best = BestMove::default();

        for (to, target) in ctx.plan.routes().iter().enumerate() {
            let same = to == from;
            let into = if same { base.as_slice() } else { target.nodes() };
            let Some(ins) = best_insertion(ctx.model, ctx.capacity(to), into, order, ctx.penalty)
            else {
                continue;
            };

            let (augmented_delta, objective_delta) = if same {
                (
                    ins.cost.augmented - source.cost().augmented,
                    ins.cost.distance - source.cost().distance,
                )
            } else {
                (
                    removed.augmented - source.cost().augmented + ins.cost.augmented
                        - target.cost().augmented,
                    removed.distance - source.cost().distance + ins.cost.distance
                        - target.cost().distance,
                )
            };

            let mv = Move::Relocate {
                order,
                from,
                to,
                pickup_pos: ins.pickup_pos,
                delivery_pos: ins.delivery_pos,
            };
            best.offer(mv, augmented_delta, objective_delta, || {
                let placed = spliced(into, order, ins.pickup_pos, ins.delivery_pos);
                if same {
                    ctx.tie_delta(&[(from, &placed)])
                } else {
                    ctx.tie_delta(&[(from, &base), (to, &placed)])
                }
            });
        }
        best.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::evaluation::{NoPenalty, RoutingModel};
    use crate::local_search::tests::{far_deadline, line_problem};
    use crate::search::WorkingPlan;

    fn insert(order: usize, route: usize, pickup_pos: usize, delivery_pos: usize) -> Move {
        Move::Insert {
            order,
            route,
            pickup_pos,
            delivery_pos,
        }
    }

    #[test]
    fn test_relocate_to_other_route() {
        // two far-apart orders on one robot: moving one to the idle robot
        // removes the long connecting arc
        let p = line_problem(&[(0, 5), (100, 105)], &[2, 2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0, 2, 2), &model, &NoPenalty).unwrap();
        assert_eq!(plan.distance(), 105);

        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        let c = find_best_relocate(&ctx).unwrap();
        assert_eq!(c.objective_delta, -95);
        plan.apply(&c.mv, &model, &NoPenalty).unwrap();
        assert_eq!(plan.distance(), 10);
        assert_eq!(plan.unassigned_count(), 0);
    }

    #[test]
    fn test_relocate_within_route() {
        let p = line_problem(&[(0, 5), (5, 10)], &[2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        // [p1, d1, p0, d0]: 5 + 10 + 5
        plan.apply(&insert(1, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(0, 0, 2, 2), &model, &NoPenalty).unwrap();
        assert_eq!(plan.distance(), 20);

        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        let c = find_best_relocate(&ctx).unwrap();
        plan.apply(&c.mv, &model, &NoPenalty).unwrap();
        assert_eq!(plan.distance(), 10);
    }

    #[test]
    fn test_no_move_at_optimum() {
        let p = line_problem(&[(0, 5)], &[2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        assert!(find_best_relocate(&ctx).is_none());
    }
}
