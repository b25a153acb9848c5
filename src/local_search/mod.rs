//! Feasibility-preserving neighborhoods over a [`WorkingPlan`].
//!
//! - [`insertion`] — insert an excluded pair, remove a planned pair, greedy
//!   cheapest insertion, and the per-route insertion cache
//! - [`relocate`] — move a pair to its best positions in any route
//! - [`exchange`] — swap two pairs between routes
//! - [`two_opt`] — reverse a route segment that holds no complete pair
//!
//! Every scan returns the best improving [`Candidate`]: one that lowers the
//! penalized objective, or keeps it and lowers the carried-minutes tie-break.
//! Source items (orders or routes) are scanned in parallel and reduced in
//! source order, so the chosen move does not depend on thread scheduling.

mod exchange;
mod insertion;
mod relocate;
mod two_opt;

use std::time::Instant;

use rayon::prelude::*;

use crate::evaluation::{ArcPenalty, RoutingModel, SequenceCost};
use crate::models::node::{delivery_node, is_pickup, pickup_node};
use crate::search::WorkingPlan;

pub use exchange::find_best_exchange;
pub use insertion::{
    cheapest_insertion, find_best_insert, find_best_remove, CachedInsertion, InsertionCache,
};
pub use relocate::find_best_relocate;
pub use two_opt::find_best_reverse;

/// A change to a [`WorkingPlan`].
///
/// Pair positions follow one convention: for a base sequence `b`, inserting
/// at `(i, j)` with `i <= j` yields `b[..i] + [pickup] + b[i..j] + [delivery]
/// + b[j..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Plan an excluded order.
    Insert {
        /// Order index.
        order: usize,
        /// Target robot.
        route: usize,
        /// Pickup position in the route.
        pickup_pos: usize,
        /// Delivery position in the route.
        delivery_pos: usize,
    },
    /// Exclude a planned order.
    Remove {
        /// Order index.
        order: usize,
        /// Robot currently serving it.
        route: usize,
    },
    /// Move a planned order; positions refer to the target route after the
    /// order was taken off its current route.
    Relocate {
        /// Order index.
        order: usize,
        /// Robot currently serving it.
        from: usize,
        /// Target robot, possibly `from`.
        to: usize,
        /// Pickup position in the target route.
        pickup_pos: usize,
        /// Delivery position in the target route.
        delivery_pos: usize,
    },
    /// Swap two orders between routes; each position pair refers to the
    /// other route after its own order was taken off.
    Exchange {
        /// First order.
        first: usize,
        /// Robot serving the first order.
        first_route: usize,
        /// Positions of the first order in the second route.
        first_at: (usize, usize),
        /// Second order.
        second: usize,
        /// Robot serving the second order.
        second_route: usize,
        /// Positions of the second order in the first route.
        second_at: (usize, usize),
    },
    /// Reverse `nodes[start..=end]` of a route.
    Reverse {
        /// Robot.
        route: usize,
        /// First reversed position.
        start: usize,
        /// Last reversed position.
        end: usize,
    },
}

/// A scored move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The move.
    pub mv: Move,
    /// Change of the penalized objective.
    pub augmented_delta: i64,
    /// Change of distance plus exclusion penalties.
    pub objective_delta: i64,
    /// Change of carried minutes on the touched routes.
    pub tie_delta: i64,
}

impl Candidate {
    fn beats(&self, other: &Candidate) -> bool {
        (self.augmented_delta, self.tie_delta) < (other.augmented_delta, other.tie_delta)
    }
}

/// Keeps the best improving candidate offered so far.
#[derive(Debug, Default)]
pub(crate) struct BestMove {
    best: Option<Candidate>,
}

impl BestMove {
    /// Offers a move; `tie` computes its tie-break delta and is only called
    /// when the move could still win.
    pub(crate) fn offer(
        &mut self,
        mv: Move,
        augmented_delta: i64,
        objective_delta: i64,
        tie: impl FnOnce() -> Option<i64>,
    ) {
        if augmented_delta > 0 {
            return;
        }
        if self
            .best
            .is_some_and(|b| augmented_delta > b.augmented_delta)
        {
            return;
        }
        let Some(tie_delta) = tie() else {
            return;
        };
        let candidate = Candidate {
            mv,
            augmented_delta,
            objective_delta,
            tie_delta,
        };
        if augmented_delta == 0 && tie_delta >= 0 {
            return;
        }
        if self.best.is_none_or(|b| candidate.beats(&b)) {
            self.best = Some(candidate);
        }
    }

    pub(crate) fn into_inner(self) -> Option<Candidate> {
        self.best
    }
}

/// Read-only view shared by all scans of one search step.
pub struct SearchContext<'a, P: ?Sized> {
    /// Constraint model.
    pub model: &'a RoutingModel<'a>,
    /// Current plan.
    pub plan: &'a WorkingPlan,
    /// Arc penalties added to distance.
    pub penalty: &'a P,
    /// Scans stop picking up new source items after this instant.
    pub deadline: Instant,
    /// Insertions refreshed against `plan` and `penalty`; without it
    /// [`find_best_insert`] prices every order and route itself.
    pub insertions: Option<&'a InsertionCache>,
}

impl<P: ArcPenalty + ?Sized> SearchContext<'_, P> {
    /// Capacity of a robot.
    pub fn capacity(&self, robot: usize) -> i32 {
        self.model.problem().capacity(robot)
    }

    /// Penalized cost of an arbitrary sequence on `robot`.
    pub fn evaluate(&self, robot: usize, nodes: &[usize]) -> Option<SequenceCost> {
        self.model
            .evaluate(self.capacity(robot), nodes.iter().copied(), self.penalty)
    }

    /// Carried-minutes change when the given routes take the new sequences.
    pub fn tie_delta(&self, changed: &[(usize, &[usize])]) -> Option<i64> {
        changed.iter().try_fold(0, |acc, &(robot, nodes)| {
            let after = self.model.carried_minutes(self.capacity(robot), nodes)?;
            Some(acc + after - self.plan.route(robot).carried())
        })
    }
}

/// Neighborhoods in the order the search tries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// [`find_best_insert`].
    InsertPair,
    /// [`find_best_relocate`].
    RelocatePair,
    /// [`find_best_exchange`].
    ExchangePairs,
    /// [`find_best_reverse`].
    ReverseSegment,
    /// [`find_best_remove`].
    RemovePair,
}

impl Neighborhood {
    /// All neighborhoods, in search order.
    pub const ALL: [Neighborhood; 5] = [
        Neighborhood::InsertPair,
        Neighborhood::RelocatePair,
        Neighborhood::ExchangePairs,
        Neighborhood::ReverseSegment,
        Neighborhood::RemovePair,
    ];

    /// Best improving move of this neighborhood.
    pub fn find_best<P: ArcPenalty + ?Sized>(self, ctx: &SearchContext<'_, P>) -> Option<Candidate> {
        match self {
            Neighborhood::InsertPair => find_best_insert(ctx),
            Neighborhood::RelocatePair => find_best_relocate(ctx),
            Neighborhood::ExchangePairs => find_best_exchange(ctx),
            Neighborhood::ReverseSegment => find_best_reverse(ctx),
            Neighborhood::RemovePair => find_best_remove(ctx),
        }
    }
}

/// Best placement of a pair into a base sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Pickup position.
    pub pickup_pos: usize,
    /// Delivery position.
    pub delivery_pos: usize,
    /// Cost of the resulting sequence.
    pub cost: SequenceCost,
}

/// `base` with `order` inserted at `(i, j)`.
pub fn splice(base: &[usize], order: usize, i: usize, j: usize) -> impl Iterator<Item = usize> + '_ {
    base[..i]
        .iter()
        .copied()
        .chain(std::iter::once(pickup_node(order)))
        .chain(base[i..j].iter().copied())
        .chain(std::iter::once(delivery_node(order)))
        .chain(base[j..].iter().copied())
}

/// [`splice`], collected.
pub fn spliced(base: &[usize], order: usize, i: usize, j: usize) -> Vec<usize> {
    splice(base, order, i, j).collect()
}

/// `nodes` without the pickup and delivery of `order`.
pub fn without_pair(nodes: &[usize], order: usize) -> Vec<usize> {
    let (p, d) = (pickup_node(order), delivery_node(order));
    nodes.iter().copied().filter(|&n| n != p && n != d).collect()
}

/// Cheapest feasible placement of `order` into `base` on a robot.
///
/// Ranks by penalized distance, then by carried minutes. Positions whose
/// nodes between pickup and delivery would exceed the capacity are pruned
/// without simulating the time dimension.
///
/// # Algorithm
///
/// Earliest starts along `base` and latest feasible arrivals
/// ([`RoutingModel::latest_arrivals`]) are computed once. For each pickup
/// position the nodes between pickup and delivery are re-timed one step at a
/// time as the delivery position advances; a placement is feasible when the
/// node after the delivery is reached by its latest arrival. Distances are
/// updated from the replaced arcs only.
///
/// # Complexity
///
/// O(n²) for a base of n nodes, plus O(n) per placement tied on distance.
///
/// # Examples
///
/// ```
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::{NoPenalty, RoutingModel};
/// use u_pdptw::local_search::best_insertion;
/// use u_pdptw::models::{Problem, TimeWindow};
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
/// let model = RoutingModel::new(&problem, &ModelConfig::default());
///
/// let best = best_insertion(&model, 2, &[], 0, &NoPenalty).unwrap();
/// assert_eq!((best.pickup_pos, best.delivery_pos), (0, 0));
/// assert_eq!(best.cost.distance, 5);
/// assert!(best_insertion(&model, 0, &[], 0, &NoPenalty).is_none());
/// ```
pub fn best_insertion<P: ArcPenalty + ?Sized>(
    model: &RoutingModel<'_>,
    capacity: i32,
    base: &[usize],
    order: usize,
    penalty: &P,
) -> Option<Insertion> {
    let n = base.len();
    let (p, d) = (pickup_node(order), delivery_node(order));
    let arc = |from: usize, to: usize| {
        let distance = model.arc_distance(from, to);
        SequenceCost {
            distance,
            augmented: distance + penalty.penalty(from, to),
        }
    };

    let mut loads = Vec::with_capacity(n);
    let mut starts = Vec::with_capacity(n);
    let mut base_cost = SequenceCost::default();
    let mut load = 0;
    for (k, &node) in base.iter().enumerate() {
        load += if is_pickup(node) { 1 } else { -1 };
        if !(0..=capacity).contains(&load) {
            return None;
        }
        loads.push(load);
        let arrival = match k {
            0 => 0,
            _ => {
                let a = arc(base[k - 1], node);
                base_cost.distance += a.distance;
                base_cost.augmented += a.augmented;
                starts[k - 1] + model.arc_duration(base[k - 1], node)
            }
        };
        starts.push(model.service_start(node, arrival)?);
    }
    let latest = model.latest_arrivals(base);

    let mut best: Option<(Insertion, Option<i64>)> = None;
    for i in 0..=n {
        let before = if i == 0 { 0 } else { loads[i - 1] };
        if before + 1 > capacity {
            continue;
        }
        let pickup_arrival = match i {
            0 => 0,
            _ => starts[i - 1] + model.arc_duration(base[i - 1], p),
        };
        let Some(pickup_start) = model.service_start(p, pickup_arrival) else {
            continue;
        };

        // cost of the sequence with only the pickup placed at i
        let mut with_pickup = base_cost;
        if i > 0 {
            with_pickup = add(with_pickup, arc(base[i - 1], p));
        }
        if i > 0 && i < n {
            with_pickup = sub(with_pickup, arc(base[i - 1], base[i]));
        }

        // service minute and node of the position just before the delivery
        let (mut prev, mut prev_start) = (p, pickup_start);
        for j in i..=n {
            if j > i {
                if loads[j - 1] + 1 > capacity {
                    break;
                }
                let node = base[j - 1];
                let arrival = prev_start + model.arc_duration(prev, node);
                let Some(start) = model.service_start(node, arrival) else {
                    break;
                };
                prev = node;
                prev_start = start;
            }

            let Some(delivery_start) =
                model.service_start(d, prev_start + model.arc_duration(prev, d))
            else {
                continue;
            };
            if j < n && delivery_start + model.arc_duration(d, base[j]) > latest[j] {
                continue;
            }

            let mut cost = add(with_pickup, arc(prev, d));
            if j > i {
                cost = add(cost, arc(p, base[i]));
            }
            if j < n {
                cost = add(cost, arc(d, base[j]));
                if j > i {
                    cost = sub(cost, arc(base[j - 1], base[j]));
                }
            }

            let candidate = Insertion {
                pickup_pos: i,
                delivery_pos: j,
                cost,
            };
            best = match best {
                None => Some((candidate, None)),
                Some((b, _)) if cost.augmented < b.cost.augmented => Some((candidate, None)),
                Some((b, tie)) if cost.augmented == b.cost.augmented => {
                    let carried = |ins: &Insertion| {
                        model.carried_minutes(
                            capacity,
                            &spliced(base, order, ins.pickup_pos, ins.delivery_pos),
                        )
                    };
                    let held = tie.or_else(|| carried(&b));
                    let challenger = carried(&candidate);
                    match (challenger, held) {
                        (Some(c), Some(h)) if c < h => Some((candidate, Some(c))),
                        _ => Some((b, held)),
                    }
                }
                keep => keep,
            };
        }
    }
    best.map(|(ins, _)| ins)
}

fn add(a: SequenceCost, b: SequenceCost) -> SequenceCost {
    SequenceCost {
        distance: a.distance + b.distance,
        augmented: a.augmented + b.augmented,
    }
}

fn sub(a: SequenceCost, b: SequenceCost) -> SequenceCost {
    SequenceCost {
        distance: a.distance - b.distance,
        augmented: a.augmented - b.augmented,
    }
}

/// Runs `scan` on every source in parallel and keeps the best candidate,
/// earliest source first on ties.
pub(crate) fn best_of<T, F>(sources: &[T], deadline: Instant, scan: F) -> Option<Candidate>
where
    T: Sync,
    F: Fn(&T) -> Option<Candidate> + Sync,
{
    let found: Vec<Option<Candidate>> = sources
        .par_iter()
        .map(|s| {
            if Instant::now() >= deadline {
                None
            } else {
                scan(s)
            }
        })
        .collect();

    found.into_iter().flatten().fold(None, |best, c| match best {
        Some(b) if !c.beats(&b) => Some(b),
        _ => Some(c),
    })
}
