//! Three-component plan score.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::models::node::{is_pickup, order_of};
use crate::models::{Problem, Solution};

const ON_TIME_AWARD: i64 = 100;
const LATE_AWARD_BASE: i64 = 80;
const LATE_AWARD_FLOOR: i64 = 20;
const DELIVERY_CREDIT: i64 = 2;

/// Score of a plan; smaller is better on every axis.
///
/// Field order is significance order, so the derived `Ord` ranks plans
/// lexicographically: adherence first, then efficiency, then distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cost {
    /// Negated window adherence awards.
    pub adherence: i64,
    /// Carried order-minutes minus delivery credits.
    pub efficiency: i64,
    /// Travelled distance.
    pub distance: i64,
}

impl Cost {
    /// Creates a cost.
    pub fn new(adherence: i64, efficiency: i64, distance: i64) -> Self {
        Self {
            adherence,
            efficiency,
            distance,
        }
    }

    /// Efficiency and distance only, for comparisons that keep adherence fixed.
    pub fn secondary(&self) -> (i64, i64) {
        (self.efficiency, self.distance)
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        Cost::new(
            self.adherence + rhs.adherence,
            self.efficiency + rhs.efficiency,
            self.distance + rhs.distance,
        )
    }
}

impl Sub for Cost {
    type Output = Cost;

    fn sub(self, rhs: Cost) -> Cost {
        Cost::new(
            self.adherence - rhs.adherence,
            self.efficiency - rhs.efficiency,
            self.distance - rhs.distance,
        )
    }
}

impl std::iter::Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::default(), Add::add)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.adherence, self.efficiency, self.distance)
    }
}

/// Scores solutions against a problem.
///
/// # Examples
///
/// ```
/// use u_pdptw::distance::DistanceMatrix;
/// use u_pdptw::evaluation::{Cost, CostEvaluator};
/// use u_pdptw::models::{Problem, Solution, TimeWindow};
///
/// let distances = DistanceMatrix::from_data(3, vec![0, 5, 0, 5, 0, 0, 0, 0, 0]).unwrap();
/// let durations = DistanceMatrix::from_data(3, vec![2, 3, 0, 3, 2, 0, 0, 0, 0]).unwrap();
/// let problem = Problem::new(vec![2], vec![TimeWindow::new(30, 30)], distances, durations).unwrap();
///
/// let solution = Solution::new(vec![vec![0, 1]], vec![vec![27, 30]]);
/// let cost = CostEvaluator::new(&problem).evaluate(&solution);
/// assert_eq!(cost, Cost::new(-100, 1, 5));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CostEvaluator<'a> {
    problem: &'a Problem,
}

impl<'a> CostEvaluator<'a> {
    /// Creates an evaluator.
    pub fn new(problem: &'a Problem) -> Self {
        Self { problem }
    }

    /// Total cost over all routes.
    pub fn evaluate(&self, solution: &Solution) -> Cost {
        solution
            .routes()
            .iter()
            .zip(solution.timetables())
            .map(|(route, times)| self.route_cost(route, times))
            .sum()
    }

    /// Cost of a single route with its arrival minutes.
    pub fn route_cost(&self, route: &[usize], times: &[i64]) -> Cost {
        let mut cost = Cost::default();
        let mut carried = 0;

        for (k, (&node, &time)) in route.iter().zip(times).enumerate() {
            if k > 0 {
                cost.efficiency += (time - times[k - 1]) * carried;
                cost.distance += self.problem.distance(route[k - 1], node);
            }
            if is_pickup(node) {
                carried += 1;
            } else {
                carried -= 1;
                cost.efficiency -= DELIVERY_CREDIT;
                cost.adherence -= self.adherence_award(order_of(node), time);
            }
        }

        cost
    }

    fn adherence_award(&self, order: usize, time: i64) -> i64 {
        let window = self.problem.window(order);
        if window.contains(time) {
            ON_TIME_AWARD
        } else {
            (LATE_AWARD_BASE - window.outside_by(time)).max(LATE_AWARD_FLOOR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::DistanceMatrix;
    use crate::models::TimeWindow;

    fn problem() -> Problem {
        // two orders on a line: p0=0, d0=10, p1=10, d1=20
        let xs = [0i64, 10, 10, 20];
        let mut dist = DistanceMatrix::new(5);
        for i in 0..4 {
            for j in 0..4 {
                dist.set(i, j, (xs[i] - xs[j]).abs());
            }
        }
        Problem::new(
            vec![2],
            vec![TimeWindow::new(30, 40), TimeWindow::new(50, 60)],
            dist.clone(),
            dist,
        )
        .unwrap()
    }

    #[test]
    fn test_on_time_and_late_awards() {
        let p = problem();
        let eval = CostEvaluator::new(&p);
        let on_time = Solution::new(vec![vec![0, 1, 2, 3]], vec![vec![20, 30, 40, 50]]);
        assert_eq!(eval.evaluate(&on_time).adherence, -200);

        // d1 15 minutes late: 80 - 15
        let late = Solution::new(vec![vec![0, 1, 2, 3]], vec![vec![20, 30, 40, 75]]);
        assert_eq!(eval.evaluate(&late).adherence, -165);

        // very late deliveries are floored at 20
        let very_late = Solution::new(vec![vec![0, 1, 2, 3]], vec![vec![20, 30, 40, 200]]);
        assert_eq!(eval.evaluate(&very_late).adherence, -120);

        // early is also outside
        let early = Solution::new(vec![vec![0, 1]], vec![vec![0, 20]]);
        assert_eq!(eval.evaluate(&early).adherence, -70);
    }

    #[test]
    fn test_efficiency_counts_carried_minutes() {
        let p = problem();
        let eval = CostEvaluator::new(&p);
        // carried: 1 on [20,30], 0 on [30,40], 1 on [40,50]
        let sequential = Solution::new(vec![vec![0, 1, 2, 3]], vec![vec![20, 30, 40, 50]]);
        assert_eq!(eval.evaluate(&sequential).efficiency, 10 + 10 - 4);

        // carried: 1 on [20,30], 2 on [30,40], 1 on [40,50]
        let stacked = Solution::new(vec![vec![0, 2, 1, 3]], vec![vec![20, 30, 40, 50]]);
        assert_eq!(eval.evaluate(&stacked).efficiency, 10 + 20 + 10 - 4);
    }

    #[test]
    fn test_distance_excludes_depot() {
        let p = problem();
        let eval = CostEvaluator::new(&p);
        let sol = Solution::new(vec![vec![0, 1, 2, 3]], vec![vec![20, 30, 40, 50]]);
        assert_eq!(eval.evaluate(&sol).distance, 20);
        assert_eq!(eval.evaluate(&Solution::new(vec![vec![]], vec![vec![]])), Cost::default());
    }

    #[test]
    fn test_routes_sum_and_deterministic() {
        let p = problem();
        let eval = CostEvaluator::new(&p);
        let sol = Solution::new(
            vec![vec![0, 1], vec![2, 3]],
            vec![vec![20, 30], vec![40, 50]],
        );
        let total = eval.evaluate(&sol);
        let parts = eval.route_cost(&[0, 1], &[20, 30]) + eval.route_cost(&[2, 3], &[40, 50]);
        assert_eq!(total, parts);
        assert_eq!(total, eval.evaluate(&sol.clone()));
    }

    #[test]
    fn test_lexicographic_order() {
        let better_adherence = Cost::new(-200, 500, 900);
        let better_rest = Cost::new(-100, 0, 0);
        assert!(better_adherence < better_rest);
        assert!(Cost::new(-100, 5, 900) < Cost::new(-100, 6, 0));
        assert_eq!(Cost::new(-100, 6, 7) - Cost::new(-50, 1, 2), Cost::new(-50, 5, 5));
        assert_eq!(Cost::new(-100, 6, 7).to_string(), "-100 6 7");
    }
}
