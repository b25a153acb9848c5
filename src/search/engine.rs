//! Guided local search driver.
//!
//! # Algorithm
//!
//! ```text
//! INITIAL ──► LOCAL_SEARCH ──► TERMINATED
//!                 │   ▲
//!                 ▼   │  no improving move: penalize max-utility arcs
//!              local optimum
//! ```
//!
//! 1. INITIAL: every robot at the depot, every order excluded; optionally
//!    followed by greedy cheapest insertion.
//! 2. LOCAL_SEARCH: apply the best improving move of the first neighborhood
//!    that has one. At a local optimum, penalize arcs and continue on the
//!    augmented objective.
//! 3. TERMINATED: deadline reached, or guided search stagnated.
//!
//! The best plan is tracked on the unpenalized objective (distance plus
//! exclusion penalties) and returned as an [`Assignment`].

use std::time::Instant;

use tracing::{debug, info, trace};

use crate::config::{FirstSolution, SearchConfig};
use crate::error::{PlanError, Result};
use crate::evaluation::RoutingModel;
use crate::extract::{pairs_complete, Assignment};
use crate::local_search::{
    cheapest_insertion, Candidate, InsertionCache, Neighborhood, SearchContext,
};

use super::{GuidedPenalties, WorkingPlan};

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The deadline passed; the best plan so far is returned.
    BudgetElapsed,
    /// No improving move and guided penalties no longer help.
    NoImprovingMove,
}

/// Lifecycle of one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// Building the first plan.
    Initial,
    /// Improving with guided local search.
    LocalSearch,
    /// Finished.
    Terminated(Termination),
}

/// Result of [`SearchEngine::run`].
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best plan found, one depot-to-depot path per robot.
    pub assignment: Assignment,
    /// Why the search stopped.
    pub termination: Termination,
    /// Distance of the best plan.
    pub distance: i64,
    /// Orders left out of the best plan.
    pub unassigned: usize,
    /// Moves applied.
    pub moves: u64,
    /// Penalization rounds.
    pub penalizations: u32,
}

/// Guided local search over a [`RoutingModel`].
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use u_pdptw::builder::ProblemBuilder;
/// use u_pdptw::clock::ClockEpoch;
/// use u_pdptw::config::{ModelConfig, SearchConfig};
/// use u_pdptw::evaluation::RoutingModel;
/// use u_pdptw::models::{Coordinate, Order, Robot};
/// use u_pdptw::search::SearchEngine;
///
/// let orders = vec![Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1102)];
/// let config = ModelConfig::default();
/// let problem = ProblemBuilder::new(&config, ClockEpoch::default())
///     .build(&[Robot::new(0, 2)], &orders)
///     .unwrap();
/// let model = RoutingModel::new(&problem, &config);
///
/// let search = SearchConfig::default();
/// let outcome = SearchEngine::new(&model, &search)
///     .run(Instant::now() + Duration::from_secs(1))
///     .unwrap();
/// assert_eq!(outcome.assignment.paths()[0], vec![2, 0, 1, 2]);
/// assert_eq!(outcome.unassigned, 0);
/// ```
pub struct SearchEngine<'a> {
    model: &'a RoutingModel<'a>,
    config: &'a SearchConfig,
    first_solution: FirstSolution,
}

impl<'a> SearchEngine<'a> {
    /// Creates an engine using the configured first-solution strategy.
    pub fn new(model: &'a RoutingModel<'a>, config: &'a SearchConfig) -> Self {
        Self {
            model,
            config,
            first_solution: config.first_solution,
        }
    }

    /// Overrides the first-solution strategy.
    pub fn with_first_solution(mut self, first_solution: FirstSolution) -> Self {
        self.first_solution = first_solution;
        self
    }

    /// Runs until `deadline` or until guided search stagnates.
    ///
    /// # Errors
    ///
    /// [`PlanError::Infeasible`] if the best plan breaks a hard constraint.
    pub fn run(&self, deadline: Instant) -> Result<SearchOutcome> {
        let model = self.model;
        let started = Instant::now();
        info!(
            event = "search_start",
            strategy = ?self.first_solution,
            robots = model.problem().robot_count(),
            orders = model.problem().order_count(),
        );

        let mut plan = WorkingPlan::new(model);
        let mut best = plan.clone();
        let mut insertions = InsertionCache::new(model.problem().order_count());
        let mut penalties = GuidedPenalties::new();
        let mut moves = 0u64;
        let mut penalizations = 0u32;
        let mut stagnation = 0u32;
        let mut state = SearchState::Initial;

        let termination = loop {
            state = match state {
                SearchState::Initial => {
                    if self.first_solution == FirstSolution::CheapestInsertion {
                        let planned = cheapest_insertion(&mut plan, model, deadline)?;
                        debug!(event = "first_solution", planned, objective = plan.objective());
                    }
                    best = plan.clone();
                    SearchState::LocalSearch
                }
                SearchState::LocalSearch => {
                    if Instant::now() >= deadline {
                        SearchState::Terminated(Termination::BudgetElapsed)
                    } else if let Some((neighborhood, candidate)) =
                        self.best_move(&plan, &penalties, &mut insertions, deadline)
                    {
                        plan.apply(&candidate.mv, model, &penalties)?;
                        moves += 1;
                        trace!(
                            event = "move",
                            ?neighborhood,
                            mv = ?candidate.mv,
                            augmented_delta = candidate.augmented_delta,
                            objective_delta = candidate.objective_delta,
                        );
                        if plan.objective() < best.objective() {
                            best = plan.clone();
                            stagnation = 0;
                            debug!(
                                event = "new_best",
                                objective = best.objective(),
                                distance = best.distance(),
                                unassigned = best.unassigned_count(),
                            );
                        }
                        SearchState::LocalSearch
                    } else if Instant::now() >= deadline {
                        SearchState::Terminated(Termination::BudgetElapsed)
                    } else {
                        self.escape(&mut plan, &mut penalties, &mut stagnation, &mut penalizations)
                    }
                }
                SearchState::Terminated(termination) => break termination,
            };
        };

        verify(&best, model)?;

        info!(
            event = "search_end",
            strategy = ?self.first_solution,
            termination = ?termination,
            duration_ms = started.elapsed().as_millis() as u64,
            moves,
            penalizations,
            distance = best.distance(),
            unassigned = best.unassigned_count(),
        );

        Ok(SearchOutcome {
            assignment: best.to_assignment(model.problem().depot()),
            termination,
            distance: best.distance(),
            unassigned: best.unassigned_count(),
            moves,
            penalizations,
        })
    }

    /// Best improving move of the first neighborhood that has one.
    fn best_move(
        &self,
        plan: &WorkingPlan,
        penalties: &GuidedPenalties,
        insertions: &mut InsertionCache,
        deadline: Instant,
    ) -> Option<(Neighborhood, Candidate)> {
        insertions.refresh(plan, self.model, penalties, deadline);
        let ctx = SearchContext {
            model: self.model,
            plan,
            penalty: penalties,
            deadline,
            insertions: Some(&*insertions),
        };
        Neighborhood::ALL
            .iter()
            .find_map(|&n| n.find_best(&ctx).map(|c| (n, c)))
    }

    /// Handles a local optimum: fixes λ on first use, then penalizes arcs.
    fn escape(
        &self,
        plan: &mut WorkingPlan,
        penalties: &mut GuidedPenalties,
        stagnation: &mut u32,
        penalizations: &mut u32,
    ) -> SearchState {
        if *stagnation >= self.config.stagnation_limit {
            return SearchState::Terminated(Termination::NoImprovingMove);
        }
        if !penalties.is_calibrated() {
            penalties.calibrate(self.config.penalty_factor, plan.distance(), plan.arc_count());
        }
        let penalized = penalties.penalize(plan, self.model);
        if penalized == 0 {
            return SearchState::Terminated(Termination::NoImprovingMove);
        }
        plan.reprice(self.model, penalties);
        *stagnation += 1;
        *penalizations += 1;
        debug!(
            event = "penalize",
            round = *penalizations,
            arcs = penalized,
            lambda = penalties.lambda(),
            stagnation = *stagnation,
        );
        SearchState::LocalSearch
    }
}

/// Rejects plans that break pairing, capacity or time bounds.
fn verify(plan: &WorkingPlan, model: &RoutingModel<'_>) -> Result<()> {
    for (robot, route) in plan.routes().iter().enumerate() {
        let capacity = model.problem().capacity(robot);
        if !pairs_complete(route.nodes()) || model.schedule(capacity, route.nodes()).is_none() {
            return Err(PlanError::Infeasible(format!(
                "route of robot {robot} breaks a hard constraint"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::builder::ProblemBuilder;
    use crate::clock::ClockEpoch;
    use crate::config::ModelConfig;
    use crate::extract::extract_solution;
    use crate::local_search::tests::line_problem;
    use crate::models::node::{delivery_node, pickup_node};
    use crate::models::{Coordinate, Order, Robot};

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    fn quick() -> SearchConfig {
        SearchConfig {
            stagnation_limit: 8,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_both_strategies_serve_everything() {
        let p = line_problem(&[(0, 5), (5, 10), (50, 55), (55, 60)], &[2, 2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let config = quick();
        for first in [FirstSolution::Empty, FirstSolution::CheapestInsertion] {
            let outcome = SearchEngine::new(&model, &config)
                .with_first_solution(first)
                .run(deadline())
                .unwrap();
            assert_eq!(outcome.unassigned, 0);
            let sol = extract_solution(&model, &outcome.assignment).unwrap();
            assert!(sol.validate(&p).is_empty());
            assert_eq!(sol.num_served(), 4);
            // one robot per cluster
            assert_eq!(outcome.distance, 20);
        }
    }

    #[test]
    fn test_unservable_order_stays_excluded() {
        let orders = vec![
            Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1130),
            // opens after the 13:00 cutoff
            Order::new(1, Coordinate::new(0, 0), Coordinate::new(0, 5), 1310, 1330),
        ];
        let config = ModelConfig::default();
        let p = ProblemBuilder::new(&config, ClockEpoch::default())
            .build(&[Robot::new(0, 2)], &orders)
            .unwrap();
        let model = RoutingModel::new(&p, &config);
        let outcome = SearchEngine::new(&model, &quick()).run(deadline()).unwrap();
        assert_eq!(outcome.unassigned, 1);
        let path = &outcome.assignment.paths()[0];
        assert!(!path.contains(&pickup_node(1)));
        assert!(!path.contains(&delivery_node(1)));
        assert!(path.contains(&pickup_node(0)));
    }

    #[test]
    fn test_capacity_one_never_stacks() {
        let p = line_problem(&[(0, 10), (1, 11), (2, 12)], &[1]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let outcome = SearchEngine::new(&model, &quick()).run(deadline()).unwrap();
        let sol = extract_solution(&model, &outcome.assignment).unwrap();
        let mut load = 0;
        for &n in &sol.routes()[0] {
            load += if n % 2 == 0 { 1 } else { -1 };
            assert!((0..=1).contains(&load));
        }
    }

    #[test]
    fn test_expired_deadline_returns_start() {
        let p = line_problem(&[(0, 5), (5, 10)], &[2]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let outcome = SearchEngine::new(&model, &quick())
            .with_first_solution(FirstSolution::Empty)
            .run(Instant::now())
            .unwrap();
        assert_eq!(outcome.termination, Termination::BudgetElapsed);
        assert_eq!(outcome.unassigned, 2);
        assert_eq!(outcome.moves, 0);
    }

    #[test]
    fn test_stagnation_terminates() {
        let p = line_problem(&[(0, 5)], &[1]);
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let config = SearchConfig {
            stagnation_limit: 0,
            ..SearchConfig::default()
        };
        let outcome = SearchEngine::new(&model, &config).run(deadline()).unwrap();
        assert_eq!(outcome.termination, Termination::NoImprovingMove);
        assert_eq!(outcome.penalizations, 0);
        assert_eq!(outcome.unassigned, 0);
    }

    #[test]
    fn test_penalties_escape_local_optimum() {
        // Order 0 is the cheapest to plan but blocks orders 1 and 2 in time;
        // serving 1 and 2 instead saves one exclusion penalty.
        let orders = vec![
            Order::new(0, Coordinate::new(0, 200), Coordinate::new(0, 210), 1120, 1132),
            Order::new(1, Coordinate::new(0, 0), Coordinate::new(0, 20), 1100, 1102),
            Order::new(2, Coordinate::new(0, 20), Coordinate::new(0, 40), 1150, 1152),
        ];
        let config = ModelConfig {
            exclusion_penalty: Some(25),
            ..ModelConfig::default()
        };
        let p = ProblemBuilder::new(&config, ClockEpoch::default())
            .build(&[Robot::new(0, 2)], &orders)
            .unwrap();
        let model = RoutingModel::new(&p, &config);
        let objective = |o: &SearchOutcome| o.distance + model.pair_penalty() * o.unassigned as i64;

        let descent = SearchConfig {
            stagnation_limit: 0,
            ..SearchConfig::default()
        };
        let stuck = SearchEngine::new(&model, &descent).run(deadline()).unwrap();
        assert_eq!(stuck.penalizations, 0);
        assert_eq!((stuck.distance, stuck.unassigned), (10, 2));

        let guided = SearchConfig::default();
        let escaped = SearchEngine::new(&model, &guided).run(deadline()).unwrap();
        assert_eq!(escaped.termination, Termination::NoImprovingMove);
        assert!(escaped.penalizations > 0);
        assert!(objective(&escaped) < objective(&stuck));
        assert_eq!((escaped.distance, escaped.unassigned), (40, 1));

        let path = &escaped.assignment.paths()[0];
        assert!(!path.contains(&pickup_node(0)));
        let sol = extract_solution(&model, &escaped.assignment).unwrap();
        assert!(sol.validate(&p).is_empty());
    }
}
