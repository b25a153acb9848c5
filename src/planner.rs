//! Planning pipeline: build, search, extract, post-optimize, score.
//!
//! ```text
//! robots, orders ─► ProblemBuilder ─► RoutingModel ─► SearchEngine (×2 in portfolio)
//!                                                          │
//!                     Cost ◄─ CostEvaluator ◄─ postprocess ◄─ extract_solution
//! ```
//!
//! The whole run honors [`SearchConfig::time_limit`](crate::config::SearchConfig::time_limit).
//! The tail of the budget given by
//! [`PostprocessConfig::polish_window`](crate::config::PostprocessConfig::polish_window)
//! is reserved for post-optimization: polishing when every order is served,
//! late-order recovery (if enabled) when some are not.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::builder::ProblemBuilder;
use crate::config::{FirstSolution, PlannerConfig};
use crate::error::{PlanError, Result};
use crate::evaluation::{Cost, CostEvaluator, RoutingModel};
use crate::extract::extract_solution;
use crate::models::{Order, Problem, Robot, Solution};
use crate::postprocess::{CarriedTimePolisher, LateOrderRecovery, PolishStats};
use crate::search::{SearchEngine, Termination};

/// Which post-optimization phase ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postprocess {
    /// Nothing ran.
    Skipped,
    /// Carried-time polishing.
    Polished(PolishStats),
    /// Late-order recovery; lists the orders it added.
    Recovered(Vec<usize>),
}

/// Outcome of a planning run.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// Routes and arrival minutes, one route per robot.
    pub solution: Solution,
    /// Score of `solution`.
    pub cost: Cost,
    /// First-solution strategy of the winning search.
    pub strategy: FirstSolution,
    /// Why the winning search stopped.
    pub termination: Termination,
    /// Post-optimization applied after the search.
    pub postprocess: Postprocess,
    /// Orders considered after truncation.
    pub planned_orders: usize,
}

struct Candidate {
    strategy: FirstSolution,
    termination: Termination,
    solution: Solution,
    cost: Cost,
}

/// Runs the planning pipeline under a [`PlannerConfig`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use u_pdptw::config::PlannerConfig;
/// use u_pdptw::models::{Coordinate, Order, Robot};
/// use u_pdptw::planner::Planner;
///
/// let config = PlannerConfig::new()
///     .with_time_limit(Duration::from_millis(400))
///     .with_polish_window(Duration::from_millis(100));
/// let robots = vec![Robot::new(0, 2)];
/// let orders = vec![Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1102)];
///
/// let result = Planner::new(config).plan(&robots, &orders).unwrap();
/// assert_eq!(result.solution.routes()[0], vec![0, 1]);
/// assert_eq!(result.solution.timetables()[0], vec![27, 30]);
/// assert_eq!(result.cost.adherence, -100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    /// Creates a planner.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans routes for `robots` serving `orders`.
    ///
    /// # Errors
    ///
    /// [`PlanError::Configuration`] for empty or malformed input,
    /// [`PlanError::Infeasible`] if no plan satisfies the hard constraints.
    pub fn plan(&self, robots: &[Robot], orders: &[Order]) -> Result<PlanResult> {
        let started = Instant::now();
        let problem = ProblemBuilder::new(&self.config.model, self.config.epoch).build(robots, orders)?;
        self.solve_from(&problem, started)
    }

    /// Plans routes for an already built problem.
    ///
    /// # Errors
    ///
    /// [`PlanError::Infeasible`] if no plan satisfies the hard constraints.
    pub fn solve(&self, problem: &Problem) -> Result<PlanResult> {
        self.solve_from(problem, Instant::now())
    }

    fn solve_from(&self, problem: &Problem, started: Instant) -> Result<PlanResult> {
        let config = &self.config;
        let model = RoutingModel::new(problem, &config.model);
        let evaluator = CostEvaluator::new(problem);

        let budget = config.search.time_limit();
        let reserved = if config.postprocess.polish || config.postprocess.recover_late_orders {
            config.postprocess.polish_window().min(budget)
        } else {
            Duration::ZERO
        };
        let run_deadline = started + budget;
        let search_deadline = started + (budget - reserved);

        let winner = if config.search.portfolio {
            let (cheapest, empty) = rayon::join(
                || self.search(&model, &evaluator, FirstSolution::CheapestInsertion, search_deadline),
                || self.search(&model, &evaluator, FirstSolution::Empty, search_deadline),
            );
            better(cheapest, empty)?
        } else {
            self.search(&model, &evaluator, config.search.first_solution, search_deadline)?
        };

        let mut solution = winner.solution;
        let unserved = problem.order_count() - solution.num_served();
        let postprocess = if unserved > 0 && config.postprocess.recover_late_orders {
            let recovery = LateOrderRecovery::new(&model).recover(&solution, run_deadline)?;
            solution = recovery.solution;
            Postprocess::Recovered(recovery.recovered)
        } else if config.postprocess.polish {
            let mut rng = StdRng::seed_from_u64(config.search.seed);
            let stats = CarriedTimePolisher::new(&model, config.postprocess.polish_max_attempts)
                .polish(&mut solution, &mut rng, run_deadline);
            Postprocess::Polished(stats)
        } else {
            Postprocess::Skipped
        };

        let violations = solution.validate(problem);
        if let Some(v) = violations.first() {
            return Err(PlanError::Infeasible(format!(
                "final plan breaks a hard constraint: {:?}",
                v.kind
            )));
        }

        let cost = evaluator.evaluate(&solution);
        let served = solution.num_served();
        if served < problem.order_count() {
            warn!(
                event = "orders_excluded",
                excluded = problem.order_count() - served,
            );
        }
        info!(
            event = "plan_complete",
            strategy = ?winner.strategy,
            adherence = cost.adherence,
            efficiency = cost.efficiency,
            distance = cost.distance,
            served,
            orders = problem.order_count(),
            duration_ms = started.elapsed().as_millis() as u64,
        );

        Ok(PlanResult {
            solution,
            cost,
            strategy: winner.strategy,
            termination: winner.termination,
            postprocess,
            planned_orders: problem.order_count(),
        })
    }

    fn search(
        &self,
        model: &RoutingModel<'_>,
        evaluator: &CostEvaluator<'_>,
        strategy: FirstSolution,
        deadline: Instant,
    ) -> Result<Candidate> {
        let outcome = SearchEngine::new(model, &self.config.search)
            .with_first_solution(strategy)
            .run(deadline)?;
        let solution = extract_solution(model, &outcome.assignment)?;
        let cost = evaluator.evaluate(&solution);
        Ok(Candidate {
            strategy,
            termination: outcome.termination,
            solution,
            cost,
        })
    }
}

/// Lexicographically smaller cost wins; ties keep `first`.
fn better(first: Result<Candidate>, second: Result<Candidate>) -> Result<Candidate> {
    match (first, second) {
        (Ok(a), Ok(b)) => Ok(if b.cost < a.cost { b } else { a }),
        (Ok(a), Err(_)) => Ok(a),
        (Err(_), Ok(b)) => Ok(b),
        (Err(e), Err(_)) => Err(e),
    }
}
