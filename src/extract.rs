//! Raw per-robot paths to a timed [`Solution`].

use crate::error::{PlanError, Result};
use crate::evaluation::RoutingModel;
use crate::models::node::{delivery_node, is_pickup, order_of};
use crate::models::Solution;

/// Search output: one depot-to-depot path per robot.
///
/// # Examples
///
/// ```
/// use u_pdptw::extract::Assignment;
///
/// let a = Assignment::from_routes(vec![vec![0, 1], vec![]], 4);
/// assert_eq!(a.paths()[0], vec![4, 0, 1, 4]);
/// assert_eq!(a.paths()[1], vec![4, 4]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    paths: Vec<Vec<usize>>,
}

impl Assignment {
    /// Wraps full paths, depot included at both ends.
    pub fn new(paths: Vec<Vec<usize>>) -> Self {
        Self { paths }
    }

    /// Builds paths from depot-free routes.
    pub fn from_routes(routes: Vec<Vec<usize>>, depot: usize) -> Self {
        let paths = routes
            .into_iter()
            .map(|route| {
                let mut path = Vec::with_capacity(route.len() + 2);
                path.push(depot);
                path.extend(route);
                path.push(depot);
                path
            })
            .collect();
        Self { paths }
    }

    /// Paths per robot.
    pub fn paths(&self) -> &[Vec<usize>] {
        &self.paths
    }
}

/// Converts an assignment into routes with arrival minutes.
///
/// Deliveries get their earliest feasible minute and pickups are then moved
/// as late as their successor allows. Window checks follow the model's
/// [`WindowMode`](crate::evaluation::WindowMode).
///
/// # Errors
///
/// [`PlanError::Infeasible`] if a path does not start and end at the depot,
/// breaks a pickup/delivery pair, or violates the capacity or time dimension.
///
/// # Examples
///
/// ```
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::RoutingModel;
/// use u_pdptw::extract::{extract_solution, Assignment};
/// use u_pdptw::models::{Problem, TimeWindow};
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
/// let model = RoutingModel::new(&problem, &ModelConfig::default());
///
/// let solution = extract_solution(&model, &Assignment::new(vec![vec![2, 0, 1, 2]])).unwrap();
/// assert_eq!(solution.routes()[0], vec![0, 1]);
/// assert_eq!(solution.timetables()[0], vec![27, 30]);
/// ```
pub fn extract_solution(model: &RoutingModel<'_>, assignment: &Assignment) -> Result<Solution> {
    let problem = model.problem();
    if assignment.paths.len() != problem.robot_count() {
        return Err(PlanError::Infeasible(format!(
            "{} paths for {} robots",
            assignment.paths.len(),
            problem.robot_count()
        )));
    }

    let depot = problem.depot();
    let mut routes = Vec::with_capacity(assignment.paths.len());
    let mut timetables = Vec::with_capacity(assignment.paths.len());

    for (robot, path) in assignment.paths.iter().enumerate() {
        let route = match path.as_slice() {
            [first, inner @ .., last] if *first == depot && *last == depot => inner,
            _ => {
                return Err(PlanError::Infeasible(format!(
                    "path of robot {robot} does not start and end at the depot"
                )))
            }
        };
        if route.iter().any(|&n| n >= depot) {
            return Err(PlanError::Infeasible(format!(
                "path of robot {robot} revisits the depot or leaves the graph"
            )));
        }
        if !pairs_complete(route) {
            return Err(PlanError::Infeasible(format!(
                "path of robot {robot} breaks a pickup/delivery pair"
            )));
        }
        let times = model
            .schedule(problem.capacity(robot), route)
            .ok_or_else(|| {
                PlanError::Infeasible(format!(
                    "path of robot {robot} violates capacity or time bounds"
                ))
            })?;

        routes.push(route.to_vec());
        timetables.push(times);
    }

    Ok(Solution::new(routes, timetables))
}

/// Returns `true` if every pickup on `route` is followed by its delivery and
/// every delivery is preceded by its pickup, each exactly once.
pub(crate) fn pairs_complete(route: &[usize]) -> bool {
    let mut open = Vec::new();
    let mut seen = rustc_hash::FxHashSet::default();
    for &node in route {
        if !seen.insert(node) {
            return false;
        }
        if is_pickup(node) {
            open.push(order_of(node));
        } else if let Some(pos) = open.iter().position(|&o| delivery_node(o) == node) {
            open.swap_remove(pos);
        } else {
            return false;
        }
    }
    open.is_empty()
}
