//! Intra-route segment reversal (2-opt).
//!
//! # Algorithm
//!
//! For each segment `r[i..=j]` of a route, evaluates the route with the
//! segment reversed. A segment that contains both nodes of some order is
//! skipped: reversing it would put that delivery before its pickup. Since
//! growing `j` only adds nodes, the scan over `j` stops at the first such
//! delivery.
//!
//! ```text
//! delta = d(r[i-1], r[j]) + d(r[i], r[j+1]) - d(r[i-1], r[i]) - d(r[j], r[j+1])
//! ```
//!
//! The delta above holds for symmetric distances; the time dimension is
//! re-simulated for every candidate.
//!
//! # Complexity
//!
//! O(n³) per route and scan.
//!
//! # Reference
//!
//! Croes, G.A. (1958). "A method for solving traveling salesman problems",
//! *Operations Research* 6(6), 791-812.

use rustc_hash::FxHashSet;

use crate::evaluation::ArcPenalty;
use crate::models::node::{is_pickup, order_of};

use super::{best_of, BestMove, Candidate, Move, SearchContext};

/// Best improving segment reversal over all routes.
pub fn find_best_reverse<P: ArcPenalty + ?Sized>(ctx: &SearchContext<'_, P>) -> Option<Candidate> {
    let sources: Vec<usize> = (0..ctx.plan.routes().len())
        .filter(|&r| ctx.plan.route(r).len() >= 2)
        .collect();

    best_of(&sources, ctx.deadline, |&robot| {
        let route = ctx.plan.route(robot);
        let nodes = route.nodes();
        let capacity = ctx.capacity(robot);
        let mut best = BestMove::default();

        for start in 0..nodes.len() - 1 {
            let mut open = FxHashSet::default();
            if is_pickup(nodes[start]) {
                open.insert(order_of(nodes[start]));
            }
            for end in start + 1..nodes.len() {
                let node = nodes[end];
                if is_pickup(node) {
                    open.insert(order_of(node));
                } else if open.contains(&order_of(node)) {
                    break;
                }

                let Some(cost) = ctx
                    .model
                    .evaluate(capacity, reversed(nodes, start, end), ctx.penalty)
                else {
                    continue;
                };
                best.offer(
                    Move::Reverse {
                        route: robot,
                        start,
                        end,
                    },
                    cost.augmented - route.cost().augmented,
                    cost.distance - route.cost().distance,
                    || {
                        let new: Vec<usize> = reversed(nodes, start, end).collect();
                        ctx.tie_delta(&[(robot, &new)])
                    },
                );
            }
        }
        best.into_inner()
    })
}

fn reversed(nodes: &[usize], start: usize, end: usize) -> impl Iterator<Item = usize> + '_ {
    nodes[..start]
        .iter()
        .chain(nodes[start..=end].iter().rev())
        .chain(&nodes[end + 1..])
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::evaluation::{NoPenalty, RoutingModel};
    use crate::local_search::tests::{far_deadline, line_problem};
    use crate::search::WorkingPlan;

    #[test]
    fn test_reversed() {
        let nodes = [0, 2, 4, 1, 3, 5];
        assert_eq!(
            reversed(&nodes, 1, 2).collect::<Vec<_>>(),
            vec![0, 4, 2, 1, 3, 5]
        );
        assert_eq!(
            reversed(&nodes, 0, 5).collect::<Vec<_>>(),
            vec![5, 3, 1, 4, 2, 0]
        );
    }

    #[test]
    fn test_reverse_pickups() {
        // pickups visited far-near, deliveries near-far: swapping the two
        // pickups shortens the route
        let p = line_problem(&[(10, 20), (0, 20)], &[2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        let insert = |order, pickup_pos, delivery_pos| Move::Insert {
            order,
            route: 0,
            pickup_pos,
            delivery_pos,
        };
        plan.apply(&insert(0, 0, 0), &model, &NoPenalty).unwrap();
        // [p0, p1, d1, d0]
        plan.apply(&insert(1, 1, 1), &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(0).nodes(), &[0, 2, 3, 1]);
        assert_eq!(plan.distance(), 30);

        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        let c = find_best_reverse(&ctx).unwrap();
        assert_eq!(
            c.mv,
            Move::Reverse {
                route: 0,
                start: 0,
                end: 1
            }
        );
        plan.apply(&c.mv, &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(0).nodes(), &[2, 0, 3, 1]);
        assert_eq!(plan.distance(), 20);
    }

    #[test]
    fn test_never_reverses_a_pair() {
        let p = line_problem(&[(10, 0)], &[1]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        let mv = Move::Insert {
            order: 0,
            route: 0,
            pickup_pos: 0,
            delivery_pos: 0,
        };
        plan.apply(&mv, &model, &NoPenalty).unwrap();
        let ctx = SearchContext {
            model: &model,
            plan: &plan,
            penalty: &NoPenalty,
            deadline: far_deadline(),
            insertions: None,
        };
        assert!(find_best_reverse(&ctx).is_none());
    }
}
