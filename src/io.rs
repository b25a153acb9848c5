//! JSON question and answer framing.
//!
//! A question lists robots and orders in clock encoding:
//!
//! ```json
//! {
//!   "robots": [{"id": 0, "capacity": 2}],
//!   "orders": [{"id": 5, "r_address": [0, 0], "u_address": [0, 5],
//!               "start_time": 1100, "end_time": 1102}]
//! }
//! ```
//!
//! The answer lists, per robot, its visits with the caller's ids:
//!
//! ```json
//! {"plans": [{"robot": 0, "detail_plans": [
//!   {"id": 0, "order_id": 5, "action": "load", "start_time": 1057},
//!   {"id": 1, "order_id": 5, "action": "deliver", "start_time": 1100}
//! ]}]}
//! ```

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::clock::ClockEpoch;
use crate::error::{PlanError, Result};
use crate::models::node::NodeKind;
use crate::models::{Coordinate, Order, Robot, Solution};

/// An order as it appears in a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Caller's order id.
    pub id: usize,
    /// Pickup coordinate.
    pub r_address: [i64; 2],
    /// Delivery coordinate.
    pub u_address: [i64; 2],
    /// Window start, clock encoding.
    pub start_time: i64,
    /// Window end, clock encoding.
    pub end_time: i64,
}

impl From<OrderRecord> for Order {
    fn from(r: OrderRecord) -> Self {
        Order::new(
            r.id,
            Coordinate::new(r.r_address[0], r.r_address[1]),
            Coordinate::new(r.u_address[0], r.u_address[1]),
            r.start_time,
            r.end_time,
        )
    }
}

/// Planning request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Available robots.
    pub robots: Vec<Robot>,
    /// Orders to plan.
    pub orders: Vec<OrderRecord>,
}

impl Question {
    /// Orders as domain values, in question order.
    pub fn orders(&self) -> Vec<Order> {
        self.orders.iter().copied().map(Order::from).collect()
    }
}

/// What a robot does at a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Pick the order up.
    Load,
    /// Hand the order over.
    Deliver,
}

/// One visit of a robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailPlan {
    /// Position in the robot's route.
    pub id: usize,
    /// Caller's order id.
    pub order_id: usize,
    /// Load or deliver.
    pub action: Action,
    /// Service time, clock encoding.
    pub start_time: i64,
}

/// Route of one robot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPlan {
    /// Caller's robot id.
    pub robot: usize,
    /// Visits in order.
    pub detail_plans: Vec<DetailPlan>,
}

/// Planning response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// One plan per robot, in question order.
    pub plans: Vec<RobotPlan>,
}

/// Parses a question.
pub fn read_question<R: Read>(reader: R) -> Result<Question> {
    Ok(serde_json::from_reader(reader)?)
}

/// Writes an answer followed by a newline.
pub fn write_answer<W: Write>(mut writer: W, answer: &Answer) -> Result<()> {
    serde_json::to_writer(&mut writer, answer)?;
    writeln!(writer)?;
    Ok(())
}

/// Converts a solution into an answer with the caller's ids.
///
/// `robots` and `orders` must be the inputs the solution was planned for;
/// route `r` belongs to `robots[r]` and node `n` to `orders[n / 2]`.
///
/// # Examples
///
/// ```
/// use u_pdptw::clock::ClockEpoch;
/// use u_pdptw::io::{to_answer, Action};
/// use u_pdptw::models::{Coordinate, Order, Robot, Solution};
///
/// let robots = vec![Robot::new(4, 2)];
/// let orders = vec![Order::new(9, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1102)];
/// let solution = Solution::new(vec![vec![0, 1]], vec![vec![27, 30]]);
///
/// let answer = to_answer(&robots, &orders, &solution, &ClockEpoch::default()).unwrap();
/// assert_eq!(answer.plans[0].robot, 4);
/// assert_eq!(answer.plans[0].detail_plans[0].order_id, 9);
/// assert_eq!(answer.plans[0].detail_plans[0].action, Action::Load);
/// assert_eq!(answer.plans[0].detail_plans[0].start_time, 1057);
/// assert_eq!(answer.plans[0].detail_plans[1].start_time, 1100);
/// ```
pub fn to_answer(
    robots: &[Robot],
    orders: &[Order],
    solution: &Solution,
    epoch: &ClockEpoch,
) -> Result<Answer> {
    if solution.num_routes() != robots.len() {
        return Err(PlanError::Configuration(format!(
            "{} routes for {} robots",
            solution.num_routes(),
            robots.len()
        )));
    }

    let plans = robots
        .iter()
        .zip(solution.routes().iter().zip(solution.timetables()))
        .map(|(robot, (route, times))| -> Result<RobotPlan> {
            let detail_plans = route
                .iter()
                .zip(times)
                .enumerate()
                .map(|(id, (&node, &minute))| -> Result<DetailPlan> {
                    let (order, action) = match NodeKind::of(node, orders.len()) {
                        NodeKind::Pickup(o) => (&orders[o], Action::Load),
                        NodeKind::Delivery(o) => (&orders[o], Action::Deliver),
                        NodeKind::Depot => {
                            return Err(PlanError::Configuration(format!(
                                "node {node} has no order"
                            )))
                        }
                    };
                    Ok(DetailPlan {
                        id,
                        order_id: order.id(),
                        action,
                        start_time: epoch.to_clock(minute)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RobotPlan {
                robot: robot.id(),
                detail_plans,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Answer { plans })
}
