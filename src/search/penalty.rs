//! Guided local search arc penalties.
//!
//! Features are directed arcs between consecutive visits. At a local optimum
//! the arcs of the current plan with maximal utility
//!
//! ```text
//! utility(a) = distance(a) / (1 + penalty(a))
//! ```
//!
//! get their penalty incremented, and the search continues on the augmented
//! objective `objective + λ · Σ penalty(a)` over the arcs in use.
//!
//! # Reference
//!
//! Voudouris, C. & Tsang, E. (1999). "Guided local search and its application
//! to the traveling salesman problem", *European Journal of Operational
//! Research* 113(2), 469-499.

use rustc_hash::FxHashMap;

use crate::evaluation::{ArcPenalty, RoutingModel};

use super::WorkingPlan;

/// Penalty counts per arc, scaled by λ.
///
/// λ is zero until [`GuidedPenalties::calibrate`] fixes it at the first local
/// optimum, so the search starts on the plain objective.
///
/// # Examples
///
/// ```
/// use u_pdptw::evaluation::ArcPenalty;
/// use u_pdptw::search::GuidedPenalties;
///
/// let mut penalties = GuidedPenalties::new();
/// assert_eq!(penalties.penalty(0, 1), 0);
/// penalties.calibrate(0.1, 1000, 10);
/// assert_eq!(penalties.lambda(), 10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GuidedPenalties {
    counts: FxHashMap<(usize, usize), i64>,
    lambda: i64,
}

impl GuidedPenalties {
    /// No penalties, λ = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current λ.
    pub fn lambda(&self) -> i64 {
        self.lambda
    }

    /// Returns `true` once λ has been fixed.
    pub fn is_calibrated(&self) -> bool {
        self.lambda > 0
    }

    /// Fixes λ = max(1, round(factor · distance / arcs)).
    pub fn calibrate(&mut self, factor: f64, distance: i64, arcs: usize) {
        let per_arc = if arcs == 0 {
            0.0
        } else {
            factor * distance as f64 / arcs as f64
        };
        self.lambda = (per_arc.round() as i64).max(1);
    }

    /// Times `from → to` has been penalized.
    pub fn count(&self, from: usize, to: usize) -> i64 {
        self.counts.get(&(from, to)).copied().unwrap_or(0)
    }

    /// Penalizes the maximal-utility arcs of `plan`; returns how many.
    ///
    /// Arcs of zero distance have zero utility and are never penalized, so a
    /// return of zero means guided search has nothing left to push on.
    pub fn penalize(&mut self, plan: &WorkingPlan, model: &RoutingModel<'_>) -> usize {
        // utility compared exactly: d1 / (1 + p1) > d2 / (1 + p2)
        let mut best: Option<(i64, i64)> = None;
        let mut arcs: Vec<(usize, usize)> = Vec::new();

        for (from, to) in plan.arcs() {
            let distance = model.arc_distance(from, to);
            if distance == 0 {
                continue;
            }
            let denom = 1 + self.count(from, to);
            match best {
                Some((d, p)) if distance * p < d * denom => continue,
                Some((d, p)) if distance * p == d * denom => arcs.push((from, to)),
                _ => {
                    best = Some((distance, denom));
                    arcs.clear();
                    arcs.push((from, to));
                }
            }
        }

        arcs.sort_unstable();
        arcs.dedup();
        for &arc in &arcs {
            *self.counts.entry(arc).or_insert(0) += 1;
        }
        arcs.len()
    }
}

impl ArcPenalty for GuidedPenalties {
    fn penalty(&self, from: usize, to: usize) -> i64 {
        if self.lambda == 0 {
            0
        } else {
            self.lambda * self.count(from, to)
        }
    }
}
