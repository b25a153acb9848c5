//! Problem builder: raw robots and orders to a normalized [`Problem`].

use tracing::warn;

use crate::clock::ClockEpoch;
use crate::config::ModelConfig;
use crate::distance::{travel_minutes, DistanceMatrix};
use crate::error::{PlanError, Result};
use crate::models::{Order, Problem, Robot, TimeWindow};

/// Normalizes robots and orders into matrices and minute windows.
///
/// Orders beyond [`ModelConfig::max_orders`] are left out; the caller decides
/// what to do with them.
///
/// # Examples
///
/// ```
/// use u_pdptw::builder::ProblemBuilder;
/// use u_pdptw::clock::ClockEpoch;
/// use u_pdptw::config::ModelConfig;
/// use u_pdptw::models::{Coordinate, Order, Robot};
///
/// let robots = vec![Robot::new(0, 2)];
/// let orders = vec![Order::new(0, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1102)];
///
/// let config = ModelConfig::default();
/// let problem = ProblemBuilder::new(&config, ClockEpoch::default())
///     .build(&robots, &orders)
///     .unwrap();
///
/// assert_eq!(problem.distance(0, 1), 5);
/// assert_eq!(problem.duration(0, 1), 3);
/// assert_eq!(problem.window(0).lower(), 30);
/// assert_eq!(problem.window(0).upper(), 30);
/// ```
pub struct ProblemBuilder<'a> {
    config: &'a ModelConfig,
    epoch: ClockEpoch,
}

impl<'a> ProblemBuilder<'a> {
    /// Creates a builder for the given model constants.
    pub fn new(config: &'a ModelConfig, epoch: ClockEpoch) -> Self {
        Self { config, epoch }
    }

    /// Builds the problem.
    ///
    /// # Errors
    ///
    /// [`PlanError::Configuration`] if there are no robots or no orders, a
    /// capacity is negative, a clock value is malformed, or the model
    /// constants are out of range (see [`ProblemBuilder::check_constants`]).
    pub fn build(&self, robots: &[Robot], orders: &[Order]) -> Result<Problem> {
        self.check_constants()?;
        if robots.is_empty() {
            return Err(PlanError::Configuration("no robots".to_string()));
        }
        if orders.is_empty() || self.config.max_orders == 0 {
            return Err(PlanError::Configuration("no orders".to_string()));
        }
        if let Some(robot) = robots.iter().find(|r| r.capacity() < 0) {
            return Err(PlanError::Configuration(format!(
                "robot {} has negative capacity {}",
                robot.id(),
                robot.capacity()
            )));
        }

        if orders.len() > self.config.max_orders {
            warn!(
                event = "orders_truncated",
                received = orders.len(),
                planned = self.config.max_orders,
            );
        }
        let orders = &orders[..orders.len().min(self.config.max_orders)];

        let capacities = robots.iter().map(Robot::capacity).collect();
        let windows = orders
            .iter()
            .map(|o| self.window(o))
            .collect::<Result<Vec<_>>>()?;

        let points: Vec<_> = orders
            .iter()
            .flat_map(|o| [o.pickup(), o.delivery()])
            .collect();
        let distances = DistanceMatrix::with_depot(&points);
        let (speed, service) = (self.config.speed, self.config.service_minutes);
        let durations = distances.map_except_depot(|d| travel_minutes(d, speed, service));

        Problem::new(capacities, windows, distances, durations)
    }

    /// Rejects model constants no horizon can be built from: a speed that
    /// is not positive, negative service or margin minutes, or a horizon
    /// that closes before deliveries may start.
    ///
    /// # Errors
    ///
    /// [`PlanError::Configuration`] naming the offending constant.
    pub fn check_constants(&self) -> Result<()> {
        let c = self.config;
        if c.speed <= 0 {
            return Err(PlanError::Configuration(format!(
                "speed must be positive, got {}",
                c.speed
            )));
        }
        if c.service_minutes < 0 {
            return Err(PlanError::Configuration(format!(
                "service_minutes must not be negative, got {}",
                c.service_minutes
            )));
        }
        if c.margin_minutes < 0 {
            return Err(PlanError::Configuration(format!(
                "margin_minutes must not be negative, got {}",
                c.margin_minutes
            )));
        }
        if c.earliest_delivery < 0 || c.horizon_end() <= c.earliest_delivery {
            return Err(PlanError::Configuration(format!(
                "horizon ends at minute {} (cutoff {} minus margin {}), \
                 not after the earliest delivery at minute {}",
                c.horizon_end(),
                c.cutoff_minute,
                c.margin_minutes,
                c.earliest_delivery
            )));
        }
        Ok(())
    }

    fn window(&self, order: &Order) -> Result<TimeWindow> {
        let lower = self.epoch.to_minutes(order.start_time())?;
        let upper = self.epoch.to_minutes(order.end_time())? - self.config.margin_minutes;
        Ok(TimeWindow::new(lower, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn order(id: usize, p: (i64, i64), d: (i64, i64)) -> Order {
        Order::new(
            id,
            Coordinate::new(p.0, p.1),
            Coordinate::new(d.0, d.1),
            1100,
            1200,
        )
    }

    #[test]
    fn test_build_matrices() {
        let config = ModelConfig::default();
        let robots = vec![Robot::new(0, 3), Robot::new(1, 5)];
        let orders = vec![order(0, (0, 0), (3, 4)), order(1, (10, 0), (0, 0))];
        let problem = ProblemBuilder::new(&config, ClockEpoch::default())
            .build(&robots, &orders)
            .unwrap();

        assert_eq!(problem.robot_count(), 2);
        assert_eq!(problem.order_count(), 2);
        assert_eq!(problem.capacities(), &[3, 5]);
        assert_eq!(problem.node_count(), 5);
        assert_eq!(problem.distance(0, 1), 7);
        assert_eq!(problem.distance(1, 2), 11);
        assert_eq!(problem.distance(0, 3), 0);
        assert_eq!(problem.duration(0, 1), 4);
        assert_eq!(problem.duration(0, 3), 2);
        assert_eq!(problem.window(0), TimeWindow::new(30, 88));
        assert!(problem.distances().is_symmetric());

        let depot = problem.depot();
        for node in 0..problem.node_count() {
            assert_eq!(problem.distance(depot, node), 0);
            assert_eq!(problem.duration(node, depot), 0);
        }
    }

    #[test]
    fn test_duration_lower_bound() {
        let config = ModelConfig::default();
        let robots = vec![Robot::new(0, 3)];
        let orders = vec![order(0, (0, 0), (13, 4)), order(1, (7, 7), (1, 0))];
        let problem = ProblemBuilder::new(&config, ClockEpoch::default())
            .build(&robots, &orders)
            .unwrap();
        for i in 0..4 {
            for j in 0..4 {
                let d = problem.distance(i, j);
                assert!(problem.duration(i, j) >= (d + 4) / 5 + 2);
            }
        }
    }

    #[test]
    fn test_truncation() {
        let config = ModelConfig {
            max_orders: 2,
            ..ModelConfig::default()
        };
        let robots = vec![Robot::new(0, 3)];
        let orders: Vec<_> = (0..5).map(|i| order(i, (0, 0), (1, 1))).collect();
        let problem = ProblemBuilder::new(&config, ClockEpoch::default())
            .build(&robots, &orders)
            .unwrap();
        assert_eq!(problem.order_count(), 2);
        assert_eq!(problem.node_count(), 5);
    }

    #[test]
    fn test_empty_input_rejected() {
        let config = ModelConfig::default();
        let builder = ProblemBuilder::new(&config, ClockEpoch::default());
        let robots = vec![Robot::new(0, 3)];
        let orders = vec![order(0, (0, 0), (1, 1))];

        assert!(matches!(
            builder.build(&[], &orders),
            Err(PlanError::Configuration(_))
        ));
        assert!(matches!(
            builder.build(&robots, &[]),
            Err(PlanError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ModelConfig::default();
        let builder = ProblemBuilder::new(&config, ClockEpoch::default());
        let orders = vec![order(0, (0, 0), (1, 1))];
        assert!(builder.build(&[Robot::new(0, -1)], &orders).is_err());

        let bad_clock = vec![Order::new(
            0,
            Coordinate::new(0, 0),
            Coordinate::new(1, 1),
            1175,
            1200,
        )];
        assert!(builder.build(&[Robot::new(0, 1)], &bad_clock).is_err());

        let zero_speed = ModelConfig {
            speed: 0,
            ..ModelConfig::default()
        };
        assert!(ProblemBuilder::new(&zero_speed, ClockEpoch::default())
            .build(&[Robot::new(0, 1)], &orders)
            .is_err());
    }

    #[test]
    fn test_inconsistent_constants_rejected() {
        let robots = vec![Robot::new(0, 3)];
        let orders = vec![order(0, (0, 0), (1, 1))];
        let rejects = |config: ModelConfig| {
            matches!(
                ProblemBuilder::new(&config, ClockEpoch::default()).build(&robots, &orders),
                Err(PlanError::Configuration(_))
            )
        };
        let base = ModelConfig::default();

        assert!(rejects(ModelConfig { speed: 0, ..base.clone() }));
        assert!(rejects(ModelConfig { service_minutes: -1, ..base.clone() }));
        assert!(rejects(ModelConfig { margin_minutes: -2, ..base.clone() }));
        assert!(rejects(ModelConfig { cutoff_minute: 30, ..base.clone() }));
        assert!(rejects(ModelConfig { cutoff_minute: 32, ..base.clone() }));
        assert!(rejects(ModelConfig { earliest_delivery: -1, ..base.clone() }));
        assert!(rejects(ModelConfig {
            earliest_delivery: 148,
            ..base.clone()
        }));

        // zero service and margin are allowed
        assert!(!rejects(ModelConfig {
            service_minutes: 0,
            margin_minutes: 0,
            ..base.clone()
        }));
        assert!(!rejects(ModelConfig { cutoff_minute: 33, ..base }));
    }
}
