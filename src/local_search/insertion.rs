//! Pair insertion and removal.
//!
//! # Operators
//!
//! - [`find_best_insert`] — plans an excluded order at its cheapest positions
//! - [`find_best_remove`] — excludes a planned order
//! - [`cheapest_insertion`] — greedy first solution serving every order that
//!   still fits somewhere
//!
//! [`InsertionCache`] keeps the best placement of every excluded order in
//! every route between search steps.
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::evaluation::{ArcPenalty, NoPenalty, RoutingModel, SequenceCost};
use crate::search::{RouteState, WorkingPlan};

use super::{best_insertion, best_of, spliced, without_pair, BestMove, Candidate, Move, SearchContext};

/// Insertion of an excluded order into one route, priced at a route version.
///
/// Field order is the heap order: penalized delta, carried-minutes delta,
/// then the lower route index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Priced {
    augmented: i64,
    tie: i64,
    route: usize,
    version: u64,
    pickup_pos: usize,
    delivery_pos: usize,
    distance: i64,
}

/// Cheapest placement of an excluded order, as kept by [`InsertionCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedInsertion {
    /// Order index.
    pub order: usize,
    /// Target robot.
    pub route: usize,
    /// Pickup position in the route.
    pub pickup_pos: usize,
    /// Delivery position in the route.
    pub delivery_pos: usize,
    /// Change of the route's distance and penalized distance.
    pub delta: SequenceCost,
    /// Change of the route's carried minutes.
    pub tie_delta: i64,
}

impl CachedInsertion {
    /// The insertion as a plan move.
    pub fn to_move(&self) -> Move {
        Move::Insert {
            order: self.order,
            route: self.route,
            pickup_pos: self.pickup_pos,
            delivery_pos: self.delivery_pos,
        }
    }

    fn key(&self) -> (i64, i64) {
        (self.delta.augmented, self.tie_delta)
    }
}

/// Best insertion of every excluded order into every route, kept across
/// search steps.
///
/// Each order holds a min-heap of its per-route insertions. An entry goes
/// stale once its route's [`RouteState::version`] moves on and is dropped
/// when it reaches the top. [`InsertionCache::refresh`] prices only the
/// routes changed since the previous refresh, so a step that edits one
/// route costs one insertion scan per excluded order.
///
/// A cache follows one [`WorkingPlan`] and must be refreshed with the
/// penalties that plan was last priced with.
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
/// use u_pdptw::local_search::InsertionCache;
/// use u_pdptw::models::{Coordinate, Order, Robot};
/// use u_pdptw::search::WorkingPlan;
///
/// let config = ModelConfig::default();
/// let orders = vec![
///     Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1200),
///     Order::new(1, Coordinate::new(0, 5), Coordinate::new(0, 9), 1100, 1200),
/// ];
/// let problem = ProblemBuilder::new(&config, ClockEpoch::default())
///     .build(&[Robot::new(0, 2), Robot::new(1, 2)], &orders)
///     .unwrap();
/// let model = RoutingModel::new(&problem, &config);
/// let mut plan = WorkingPlan::new(&model);
///
/// let deadline = Instant::now() + Duration::from_secs(10);
/// let mut cache = InsertionCache::new(problem.order_count());
/// assert_eq!(cache.refresh(&plan, &model, &NoPenalty, deadline), 4);
///
/// let first = cache.cheapest().unwrap();
/// assert_eq!((first.order, first.route), (1, 0));
/// plan.apply(&first.to_move(), &model, &NoPenalty).unwrap();
///
/// // only route 0 changed, and only order 0 is still excluded
/// assert_eq!(cache.refresh(&plan, &model, &NoPenalty, deadline), 1);
/// assert!(cache.best(1).is_none());
/// assert_eq!(cache.best(0).unwrap().route, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InsertionCache {
    heaps: Vec<Option<BinaryHeap<Reverse<Priced>>>>,
    seen: Vec<u64>,
}

impl InsertionCache {
    /// An empty cache for `order_count` orders.
    pub fn new(order_count: usize) -> Self {
        Self {
            heaps: vec![None; order_count],
            seen: Vec::new(),
        }
    }

    /// Brings every excluded servable order up to date with `plan`.
    ///
    /// Returns the number of route insertions priced. Orders reached after
    /// `deadline` are dropped and priced in full on a later refresh.
    pub fn refresh<P: ArcPenalty + ?Sized>(
        &mut self,
        plan: &WorkingPlan,
        model: &RoutingModel<'_>,
        penalty: &P,
        deadline: Instant,
    ) -> usize {
        let versions: Vec<u64> = plan.routes().iter().map(RouteState::version).collect();
        let changed: Vec<usize> = versions
            .iter()
            .enumerate()
            .filter(|&(robot, v)| self.seen.get(robot) != Some(v))
            .map(|(robot, _)| robot)
            .collect();
        let robots = versions.len();
        let stale = |e: &Priced| e.version != versions[e.route];

        let priced = self
            .heaps
            .par_iter_mut()
            .enumerate()
            .map(|(order, slot)| {
                if plan.route_of(order).is_some()
                    || !model.is_servable(order)
                    || Instant::now() >= deadline
                {
                    *slot = None;
                    return 0;
                }
                let price_in = |robot: usize| {
                    price(plan, model, penalty, order, robot, versions[robot]).map(Reverse)
                };
                let (mut heap, priced) = match slot.take() {
                    None => ((0..robots).filter_map(price_in).collect::<BinaryHeap<_>>(), robots),
                    Some(mut heap) => {
                        heap.extend(changed.iter().filter_map(|&robot| price_in(robot)));
                        (heap, changed.len())
                    }
                };
                while heap.peek().is_some_and(|Reverse(top)| stale(top)) {
                    heap.pop();
                }
                if heap.len() > 2 * robots {
                    heap.retain(|Reverse(e)| !stale(e));
                }
                *slot = Some(heap);
                priced
            })
            .sum::<usize>();

        self.seen = versions;
        priced
    }

    /// Cheapest insertion of `order` as of the last refresh.
    pub fn best(&self, order: usize) -> Option<CachedInsertion> {
        let Reverse(e) = self.heaps.get(order)?.as_ref()?.peek()?;
        Some(CachedInsertion {
            order,
            route: e.route,
            pickup_pos: e.pickup_pos,
            delivery_pos: e.delivery_pos,
            delta: SequenceCost {
                distance: e.distance,
                augmented: e.augmented,
            },
            tie_delta: e.tie,
        })
    }

    /// Cheapest insertion of every excluded order, ascending by order.
    pub fn bests(&self) -> impl Iterator<Item = CachedInsertion> + '_ {
        (0..self.heaps.len()).filter_map(|order| self.best(order))
    }

    /// Overall cheapest insertion, lowest order first on ties.
    pub fn cheapest(&self) -> Option<CachedInsertion> {
        self.bests().fold(None, |best, c| match best {
            Some(b) if b.key() <= c.key() => Some(b),
            _ => Some(c),
        })
    }
}

fn price<P: ArcPenalty + ?Sized>(
    plan: &WorkingPlan,
    model: &RoutingModel<'_>,
    penalty: &P,
    order: usize,
    robot: usize,
    version: u64,
) -> Option<Priced> {
    let route = plan.route(robot);
    let capacity = model.problem().capacity(robot);
    let ins = best_insertion(model, capacity, route.nodes(), order, penalty)?;
    let nodes = spliced(route.nodes(), order, ins.pickup_pos, ins.delivery_pos);
    let carried = model.carried_minutes(capacity, &nodes)?;
    Some(Priced {
        augmented: ins.cost.augmented - route.cost().augmented,
        tie: carried - route.carried(),
        route: robot,
        version,
        pickup_pos: ins.pickup_pos,
        delivery_pos: ins.delivery_pos,
        distance: ins.cost.distance - route.cost().distance,
    })
}

/// Best improving insertion of an excluded order.
///
/// Reads [`SearchContext::insertions`] when present; otherwise every order
/// is priced against every route.
pub fn find_best_insert<P: ArcPenalty + ?Sized>(ctx: &SearchContext<'_, P>) -> Option<Candidate> {
    let model = ctx.model;
    let pair_penalty = model.pair_penalty();

    if let Some(cache) = ctx.insertions {
        let mut best = BestMove::default();
        for c in cache.bests() {
            best.offer(
                c.to_move(),
                c.delta.augmented - pair_penalty,
                c.delta.distance - pair_penalty,
                || Some(c.tie_delta),
            );
        }
        return best.into_inner();
    }

    let sources: Vec<usize> = ctx
        .plan
        .unassigned()
        .filter(|&o| model.is_servable(o))
        .collect();

    best_of(&sources, ctx.deadline, |&order| {
        let mut best = BestMove::default();
        for (robot, route) in ctx.plan.routes().iter().enumerate() {
            let capacity = ctx.capacity(robot);
            let Some(ins) = best_insertion(model, capacity, route.nodes(), order, ctx.penalty)
            else {
                continue;
            };
            let mv = Move::Insert {
                order,
                route: robot,
                pickup_pos: ins.pickup_pos,
                delivery_pos: ins.delivery_pos,
            };
            best.offer(
                mv,
                ins.cost.augmented - route.cost().augmented - pair_penalty,
                ins.cost.distance - route.cost().distance - pair_penalty,
                || {
                    let nodes = spliced(route.nodes(), order, ins.pickup_pos, ins.delivery_pos);
                    ctx.tie_delta(&[(robot, &nodes)])
                },
            );
        }
        best.into_inner()
    })
}

/// Best improving exclusion of a planned order.
///
/// Only improves once guided penalties make the order's arcs costlier than
/// its exclusion penalty.
pub fn find_best_remove<P: ArcPenalty + ?Sized>(ctx: &SearchContext<'_, P>) -> Option<Candidate> {
    let sources: Vec<(usize, usize)> = ctx.plan.assigned().collect();
    let pair_penalty = ctx.model.pair_penalty();

    best_of(&sources, ctx.deadline, |&(order, robot)| {
        let route = ctx.plan.route(robot);
        let nodes = without_pair(route.nodes(), order);
        let cost = ctx.evaluate(robot, &nodes)?;
        let mut best = BestMove::default();
        best.offer(
            Move::Remove {
                order,
                route: robot,
            },
            cost.augmented - route.cost().augmented + pair_penalty,
            cost.distance - route.cost().distance + pair_penalty,
            || ctx.tie_delta(&[(robot, &nodes)]),
        );
        best.into_inner()
    })
}

/// Greedily plans every order that fits, cheapest distance increase first.
///
/// Unlike [`find_best_insert`] an insertion is taken even when it costs more
/// than leaving the order out; the local search may remove it later. Ties go
/// to fewer carried minutes, then to the lower order and route index.
/// Returns the number of orders planned.
///
/// # Complexity
///
/// The first step prices every order in every route; later steps reprice
/// only the route edited by the previous step ([`InsertionCache`]).
///
/// # Errors
///
/// Propagates [`WorkingPlan::apply`] failures.
pub fn cheapest_insertion(
    plan: &mut WorkingPlan,
    model: &RoutingModel<'_>,
    deadline: Instant,
) -> Result<usize> {
    let mut cache = InsertionCache::new(model.problem().order_count());
    let mut planned = 0;

    while Instant::now() < deadline {
        cache.refresh(plan, model, &NoPenalty, deadline);
        if Instant::now() >= deadline {
            break;
        }
        let Some(best) = cache.cheapest() else {
            break;
        };

        let mv = best.to_move();
        plan.apply(&mv, model, &NoPenalty)?;
        planned += 1;
        debug!(event = "cheapest_insertion", mv = ?mv, delta = best.delta.distance);
    }

    Ok(planned)
}
