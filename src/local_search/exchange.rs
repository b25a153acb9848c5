//! Inter-route pair exchange operator.
//!
//! # Algorithm
//!
//! For two orders `a` on route A and `b` on route B (A ≠ B), takes both off
//! their routes and reinserts `a` at its cheapest positions in B and `b` at
//! its cheapest positions in A:
//!
//! ```text
//! delta = c(A - a + b) + c(B - b + a) - c(A) - c(B)
//! ```
//!
//! Escapes local optima where neither order can be relocated alone because
//! both robots are full.
//!
//! # Complexity
//!
//! O(P² × n³) per scan, where P = planned orders and n = nodes per route.
//!
//! # Reference
//!
//! Potvin, J.-Y. & Rousseau, J.-M. (1995). "An Exchange Heuristic for
//! Routeing Problems with Time Windows", *Journal of the Operational Research
//! Society* 46(12), 1433-1446.

use crate::evaluation::ArcPenalty;

use super::{best_insertion, best_of, spliced, without_pair, BestMove, Candidate, Move, SearchContext};

/// Best improving exchange of two planned orders between routes.
pub fn find_best_exchange<P: ArcPenalty + ?Sized>(ctx: &SearchContext<'_, P>) -> Option<Candidate> {
    let assigned: Vec<(usize, usize)> = ctx.plan.assigned().collect();
    if ctx.plan.routes().len() < 2 {
        return None;
    }

    best_of(&assigned, ctx.deadline, |&(first, first_route)| {
        let route_a = ctx.plan.route(first_route);
        let base_a = without_pair(route_a.nodes(), first);
        let mut best = BestMove::default();

        for &(second, second_route) in &assigned {
            if second <= first || second_route == first_route {
                continue;
            }
            let route_b = ctx.plan.route(second_route);
            let base_b = without_pair(route_b.nodes(), second);

            let Some(b_in_a) = best_insertion(
                ctx.model,
                ctx.capacity(first_route),
                &base_a,
                second,
                ctx.penalty,
            ) else {
                continue;
            };
            let Some(a_in_b) = best_insertion(
                ctx.model,
                ctx.capacity(second_route),
                &base_b,
                first,
                ctx.penalty,
            ) else {
                continue;
            };

            let augmented_delta = b_in_a.cost.augmented + a_in_b.cost.augmented
                - route_a.cost().augmented
                - route_b.cost().augmented;
            let objective_delta = b_in_a.cost.distance + a_in_b.cost.distance
                - route_a.cost().distance
                - route_b.cost().distance;

            let mv = Move::Exchange {
                first,
                first_route,
                first_at: (a_in_b.pickup_pos, a_in_b.delivery_pos),
                second,
                second_route,
                second_at: (b_in_a.pickup_pos, b_in_a.delivery_pos),
            };
            best.offer(mv, augmented_delta, objective_delta, || {
                let new_a = spliced(&base_a, second, b_in_a.pickup_pos, b_in_a.delivery_pos);
                let new_b = spliced(&base_b, first, a_in_b.pickup_pos, a_in_b.delivery_pos);
                ctx.tie_delta(&[(first_route, &new_a), (second_route, &new_b)])
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

    fn insert(order: usize, route: usize) -> Move {
        Move::Insert {
            order,
            route,
            pickup_pos: 0,
            delivery_pos: 0,
        }
    }

    #[test]
    fn test_exchange_between_full_routes() {
        // each robot serves one near and one far order; with capacity 1
        // swapping a far order for a near one removes both long arcs
        let p = line_problem(&[(0, 5), (100, 105), (0, 5), (100, 105)], &[1, 1]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(2, 1), &model, &NoPenalty).unwrap();
        plan.apply(&insert(3, 1), &model, &NoPenalty).unwrap();
        let before = plan.distance();

        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        let c = find_best_exchange(&ctx).unwrap();
        assert!(matches!(c.mv, Move::Exchange { .. }));
        plan.apply(&c.mv, &model, &NoPenalty).unwrap();
        assert_eq!(plan.distance(), before + c.objective_delta);
        assert!(plan.distance() < before);
        assert_eq!(plan.unassigned_count(), 0);
    }

    #[test]
    fn test_exchange_needs_two_routes() {
        let p = line_problem(&[(0, 5), (100, 105)], &[2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0), &model, &NoPenalty).unwrap();
        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        assert!(find_best_exchange(&ctx).is_none());
    }
}
