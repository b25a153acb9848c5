//! Solution and violation types.

use rustc_hash::FxHashMap;

use super::node::{is_pickup, order_of, NodeKind};
use super::Problem;

/// A type of invariant violation in a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationType {
    /// The solution does not hold exactly one route per robot.
    RouteCountMismatch {
        /// Routes present.
        routes: usize,
        /// Robots in the problem.
        robots: usize,
    },
    /// A route and its timetable differ in length.
    TimetableLength {
        /// Robot index.
        robot: usize,
    },
    /// A route visits the depot or a node outside the graph.
    InvalidNode {
        /// Robot index.
        robot: usize,
        /// Offending node.
        node: usize,
    },
    /// Carried orders exceed the robot's capacity.
    CapacityExceeded {
        /// Robot index.
        robot: usize,
        /// Position in the route.
        position: usize,
        /// Load after that position.
        load: i32,
        /// Robot capacity.
        capacity: i32,
    },
    /// Carried orders drop below zero.
    NegativeLoad {
        /// Robot index.
        robot: usize,
        /// Position in the route.
        position: usize,
    },
    /// A delivery is not preceded by its pickup on the same route, or only
    /// one node of the pair is planned, or a node is planned twice.
    PairingBroken {
        /// Order index.
        order: usize,
    },
    /// Arrival minutes go backwards along a route.
    TimeReversed {
        /// Robot index.
        robot: usize,
        /// Position in the route.
        position: usize,
    },
}

/// An invariant violation in a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The type of violation.
    pub kind: ViolationType,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

/// Per-robot visiting orders with their arrival minutes.
///
/// Routes exclude the depot; `timetables[r][k]` is the minute at which robot
/// `r` serves `routes[r][k]`.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::Solution;
///
/// let sol = Solution::new(vec![vec![0, 1], vec![]], vec![vec![27, 30], vec![]]);
/// assert_eq!(sol.num_routes(), 2);
/// assert_eq!(sol.num_served(), 1);
/// assert_eq!(sol.served_orders(), vec![0]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    routes: Vec<Vec<usize>>,
    timetables: Vec<Vec<i64>>,
}

impl Solution {
    /// Creates a solution from routes and matching timetables.
    pub fn new(routes: Vec<Vec<usize>>, timetables: Vec<Vec<i64>>) -> Self {
        Self { routes, timetables }
    }

    /// Node sequence per robot.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// Arrival minutes per robot.
    pub fn timetables(&self) -> &[Vec<i64>] {
        &self.timetables
    }

    /// Replaces the route of `robot` and its timetable.
    pub fn replace_route(&mut self, robot: usize, route: Vec<usize>, times: Vec<i64>) {
        self.routes[robot] = route;
        self.timetables[robot] = times;
    }

    /// Number of routes.
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Number of orders with both nodes planned.
    pub fn num_served(&self) -> usize {
        self.routes
            .iter()
            .flatten()
            .filter(|&&n| is_pickup(n))
            .count()
    }

    /// Served order indices in ascending order.
    pub fn served_orders(&self) -> Vec<usize> {
        let mut orders: Vec<usize> = self
            .routes
            .iter()
            .flatten()
            .filter(|&&n| is_pickup(n))
            .map(|&n| order_of(n))
            .collect();
        orders.sort_unstable();
        orders
    }

    /// Checks the structural invariants against `problem`.
    ///
    /// An empty result means: one route per robot, timetables aligned with
    /// routes and non-decreasing, loads within `[0, capacity]` at every
    /// prefix, and every planned pickup followed by its delivery on the same
    /// route.
    pub fn validate(&self, problem: &Problem) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.routes.len() != problem.robot_count() || self.timetables.len() != self.routes.len()
        {
            violations.push(Violation::new(ViolationType::RouteCountMismatch {
                routes: self.routes.len(),
                robots: problem.robot_count(),
            }));
            return violations;
        }

        // order -> (robot, pickup position, delivery position)
        let mut seen: FxHashMap<usize, (usize, Option<usize>, Option<usize>)> =
            FxHashMap::default();

        for (robot, route) in self.routes.iter().enumerate() {
            let timetable = &self.timetables[robot];
            if timetable.len() != route.len() {
                violations.push(Violation::new(ViolationType::TimetableLength { robot }));
            }
            if timetable.windows(2).any(|w| w[1] < w[0]) {
                let position = timetable
                    .windows(2)
                    .position(|w| w[1] < w[0])
                    .map_or(0, |p| p + 1);
                violations.push(Violation::new(ViolationType::TimeReversed { robot, position }));
            }

            let capacity = problem.capacity(robot);
            let mut load = 0;
            for (position, &node) in route.iter().enumerate() {
                let kind = NodeKind::of(node, problem.order_count());
                let Some(order) = kind.order() else {
                    violations.push(Violation::new(ViolationType::InvalidNode { robot, node }));
                    continue;
                };
                let entry = seen.entry(order).or_insert((robot, None, None));
                let slot = match kind {
                    NodeKind::Pickup(_) => &mut entry.1,
                    _ => &mut entry.2,
                };
                if slot.is_some() || entry.0 != robot {
                    violations.push(Violation::new(ViolationType::PairingBroken { order }));
                }
                *slot = Some(position);

                load += kind.load_delta();
                if load > capacity {
                    violations.push(Violation::new(ViolationType::CapacityExceeded {
                        robot,
                        position,
                        load,
                        capacity,
                    }));
                }
                if load < 0 {
                    violations.push(Violation::new(ViolationType::NegativeLoad {
                        robot,
                        position,
                    }));
                }
            }
        }

        let mut broken: Vec<usize> = seen
            .iter()
            .filter(|(_, (_, p, d))| match (p, d) {
                (Some(p), Some(d)) => p >= d,
                _ => true,
            })
            .map(|(&order, _)| order)
            .collect();
        broken.sort_unstable();
        violations.extend(
            broken
                .into_iter()
                .map(|order| Violation::new(ViolationType::PairingBroken { order })),
        );

        violations
    }
}
