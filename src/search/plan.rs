//! Mutable plan state manipulated by the local search.

use crate::error::{PlanError, Result};
use crate::evaluation::{ArcPenalty, RoutingModel, SequenceCost};
use crate::extract::Assignment;
use crate::local_search::Move;
use crate::models::node::{delivery_node, is_pickup, pickup_node};

/// One robot's route with cached dimension values.
///
/// `loads[k]` and `starts[k]` are the load after and the earliest service
/// minute at `nodes[k]`. Edits recompute these caches from the first changed
/// position onward and bump the route's version.
#[derive(Debug, Clone, Default)]
pub struct RouteState {
    nodes: Vec<usize>,
    loads: Vec<i32>,
    starts: Vec<i64>,
    cost: SequenceCost,
    carried: i64,
    version: u64,
}

impl RouteState {
    /// Node sequence, depot excluded.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Load after each node.
    pub fn loads(&self) -> &[i32] {
        &self.loads
    }

    /// Earliest service minute at each node.
    pub fn starts(&self) -> &[i64] {
        &self.starts
    }

    /// Distance and penalized distance of the route.
    pub fn cost(&self) -> SequenceCost {
        self.cost
    }

    /// Tie-break cost: minutes orders spend on board.
    pub fn carried(&self) -> i64 {
        self.carried
    }

    /// Changes with every edit or repricing of the route.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the route visits nothing.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of `node`, if visited.
    pub fn position(&self, node: usize) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    fn refresh_from<P: ArcPenalty + ?Sized>(
        &mut self,
        from: usize,
        model: &RoutingModel<'_>,
        capacity: i32,
        penalty: &P,
    ) -> Option<()> {
        self.version = self.version.wrapping_add(1);
        self.loads.truncate(from);
        self.starts.truncate(from);

        for k in from..self.nodes.len() {
            let node = self.nodes[k];
            let (load, arrival) = match k {
                0 => (0, 0),
                _ => (
                    self.loads[k - 1],
                    self.starts[k - 1] + model.arc_duration(self.nodes[k - 1], node),
                ),
            };
            let load = load + if is_pickup(node) { 1 } else { -1 };
            if !(0..=capacity).contains(&load) {
                return None;
            }
            self.loads.push(load);
            self.starts.push(model.service_start(node, arrival)?);
        }

        self.reprice(model, penalty);
        self.carried = model.carried_minutes(capacity, &self.nodes)?;
        Some(())
    }

    fn reprice<P: ArcPenalty + ?Sized>(&mut self, model: &RoutingModel<'_>, penalty: &P) {
        self.version = self.version.wrapping_add(1);
        let mut cost = SequenceCost::default();
        for w in self.nodes.windows(2) {
            let d = model.arc_distance(w[0], w[1]);
            cost.distance += d;
            cost.augmented += d + penalty.penalty(w[0], w[1]);
        }
        self.cost = cost;
    }
}

/// Routes of all robots plus the order-to-route map.
///
/// Orders without a route are excluded and cost the model's pair penalty.
#[derive(Debug, Clone)]
pub struct WorkingPlan {
    routes: Vec<RouteState>,
    route_of: Vec<Option<usize>>,
    pair_penalty: i64,
}

impl WorkingPlan {
    /// The trivial plan: every robot stays at the depot.
    pub fn new(model: &RoutingModel<'_>) -> Self {
        let problem = model.problem();
        Self {
            routes: vec![RouteState::default(); problem.robot_count()],
            route_of: vec![None; problem.order_count()],
            pair_penalty: model.pair_penalty(),
        }
    }

    /// Routes per robot.
    pub fn routes(&self) -> &[RouteState] {
        &self.routes
    }

    /// Route of one robot.
    pub fn route(&self, robot: usize) -> &RouteState {
        &self.routes[robot]
    }

    /// Robot serving `order`, if any.
    pub fn route_of(&self, order: usize) -> Option<usize> {
        self.route_of[order]
    }

    /// Orders not on any route, ascending.
    pub fn unassigned(&self) -> impl Iterator<Item = usize> + '_ {
        self.route_of
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_none())
            .map(|(o, _)| o)
    }

    /// `(order, robot)` for every planned order, ascending by order.
    pub fn assigned(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.route_of
            .iter()
            .enumerate()
            .filter_map(|(o, r)| r.map(|r| (o, r)))
    }

    /// Number of excluded orders.
    pub fn unassigned_count(&self) -> usize {
        self.route_of.iter().filter(|r| r.is_none()).count()
    }

    /// Raw travelled distance.
    pub fn distance(&self) -> i64 {
        self.routes.iter().map(|r| r.cost.distance).sum()
    }

    /// Distance plus exclusion penalties.
    pub fn objective(&self) -> i64 {
        self.distance() + self.pair_penalty * self.unassigned_count() as i64
    }

    /// Objective plus guided arc penalties.
    pub fn augmented(&self) -> i64 {
        self.routes.iter().map(|r| r.cost.augmented).sum::<i64>()
            + self.pair_penalty * self.unassigned_count() as i64
    }

    /// Number of arcs between consecutive visits.
    pub fn arc_count(&self) -> usize {
        self.routes.iter().map(|r| r.len().saturating_sub(1)).sum()
    }

    /// Arcs between consecutive visits on every route.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.routes
            .iter()
            .flat_map(|r| r.nodes.windows(2).map(|w| (w[0], w[1])))
    }

    /// Recomputes penalized costs after the penalties changed.
    pub fn reprice<P: ArcPenalty + ?Sized>(&mut self, model: &RoutingModel<'_>, penalty: &P) {
        for route in &mut self.routes {
            route.reprice(model, penalty);
        }
    }

    /// Applies a move produced by a neighborhood scan.
    ///
    /// # Errors
    ///
    /// [`PlanError::Infeasible`] if the move leaves a route infeasible, which
    /// means the move did not come from a scan of this plan.
    pub fn apply<P: ArcPenalty + ?Sized>(
        &mut self,
        mv: &Move,
        model: &RoutingModel<'_>,
        penalty: &P,
    ) -> Result<()> {
        match *mv {
            Move::Insert {
                order,
                route,
                pickup_pos,
                delivery_pos,
            } => {
                self.insert_pair(order, route, pickup_pos, delivery_pos);
                self.refresh(route, pickup_pos, model, penalty)
            }
            Move::Remove { order, route } => {
                let from = self.remove_pair(order, route);
                self.refresh(route, from, model, penalty)
            }
            Move::Relocate {
                order,
                from,
                to,
                pickup_pos,
                delivery_pos,
            } => {
                let removed_at = self.remove_pair(order, from);
                self.insert_pair(order, to, pickup_pos, delivery_pos);
                if from == to {
                    self.refresh(to, removed_at.min(pickup_pos), model, penalty)
                } else {
                    self.refresh(from, removed_at, model, penalty)?;
                    self.refresh(to, pickup_pos, model, penalty)
                }
            }
            Move::Exchange {
                first,
                first_route,
                first_at,
                second,
                second_route,
                second_at,
            } => {
                let a = self.remove_pair(first, first_route);
                let b = self.remove_pair(second, second_route);
                self.insert_pair(first, second_route, first_at.0, first_at.1);
                self.insert_pair(second, first_route, second_at.0, second_at.1);
                self.refresh(first_route, a.min(second_at.0), model, penalty)?;
                self.refresh(second_route, b.min(first_at.0), model, penalty)
            }
            Move::Reverse { route, start, end } => {
                self.routes[route].nodes[start..=end].reverse();
                self.refresh(route, start, model, penalty)
            }
        }
    }

    /// Puts `order` into `route` so that the pickup lands before the node now
    /// at `pickup_pos` and the delivery before the node now at `delivery_pos`.
    fn insert_pair(&mut self, order: usize, route: usize, pickup_pos: usize, delivery_pos: usize) {
        let nodes = &mut self.routes[route].nodes;
        nodes.insert(delivery_pos, delivery_node(order));
        nodes.insert(pickup_pos, pickup_node(order));
        self.route_of[order] = Some(route);
    }

    /// Takes `order` off `route` and returns the former pickup position.
    fn remove_pair(&mut self, order: usize, route: usize) -> usize {
        let nodes = &mut self.routes[route].nodes;
        let (p, d) = (pickup_node(order), delivery_node(order));
        let at = nodes.iter().position(|&n| n == p).unwrap_or(nodes.len());
        nodes.retain(|&n| n != p && n != d);
        self.route_of[order] = None;
        at.min(nodes.len())
    }

    fn refresh<P: ArcPenalty + ?Sized>(
        &mut self,
        route: usize,
        from: usize,
        model: &RoutingModel<'_>,
        penalty: &P,
    ) -> Result<()> {
        let capacity = model.problem().capacity(route);
        self.routes[route]
            .refresh_from(from, model, capacity, penalty)
            .ok_or_else(|| {
                PlanError::Infeasible(format!("move left route {route} infeasible"))
            })
    }

    /// Depot-to-depot paths of the plan.
    pub fn to_assignment(&self, depot: usize) -> Assignment {
        Assignment::from_routes(self.routes.iter().map(|r| r.nodes.clone()).collect(), depot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProblemBuilder;
    use crate::clock::ClockEpoch;
    use crate::config::ModelConfig;
    use crate::evaluation::NoPenalty;
    use crate::models::{Coordinate, Order, Problem, Robot};

    fn problem() -> Problem {
        let orders: Vec<_> = (0..3)
            .map(|i| {
                Order::new(
                    i,
                    Coordinate::new(0, 5 * i as i64),
                    Coordinate::new(0, 5 * i as i64 + 5),
                    1100,
                    1230,
                )
            })
            .collect();
        ProblemBuilder::new(&ModelConfig::default(), ClockEpoch::default())
            .build(&[Robot::new(0, 2), Robot::new(1, 2)], &orders)
            .unwrap()
    }

    fn insert(order: usize, route: usize, i: usize, j: usize) -> Move {
        Move::Insert {
            order,
            route,
            pickup_pos: i,
            delivery_pos: j,
        }
    }

    #[test]
    fn test_empty_plan() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let plan = WorkingPlan::new(&model);
        assert_eq!(plan.unassigned_count(), 3);
        assert_eq!(plan.distance(), 0);
        assert_eq!(plan.objective(), 3 * model.pair_penalty());
        assert_eq!(plan.augmented(), plan.objective());
        assert_eq!(plan.to_assignment(p.depot()).paths()[0], vec![6, 6]);
    }

    #[test]
    fn test_insert_updates_caches() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0, 2, 2), &model, &NoPenalty).unwrap();

        let route = plan.route(0);
        assert_eq!(route.nodes(), &[0, 1, 2, 3]);
        assert_eq!(route.loads(), &[1, 0, 1, 0]);
        assert_eq!(route.starts(), &[0, 30, 32, 35]);
        assert_eq!(route.cost().distance, 10);
        assert_eq!(plan.route_of(1), Some(0));
        assert_eq!(plan.unassigned().collect::<Vec<_>>(), vec![2]);
        assert_eq!(plan.assigned().collect::<Vec<_>>(), vec![(0, 0), (1, 0)]);
        assert_eq!(plan.arc_count(), 3);
    }

    #[test]
    fn test_versions_follow_edits() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        let untouched = plan.route(1).version();
        let before = plan.route(0).version();

        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        let after_insert = plan.route(0).version();
        assert_ne!(after_insert, before);
        assert_eq!(plan.route(1).version(), untouched);

        plan.reprice(&model, &NoPenalty);
        assert_ne!(plan.route(0).version(), after_insert);
        assert_ne!(plan.route(1).version(), untouched);
    }

    #[test]
    fn test_nested_insert_positions() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        // pickup before node 0, delivery before node 1: [2, 0, 3, 1]
        plan.apply(&insert(1, 0, 0, 1), &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(0).nodes(), &[2, 0, 3, 1]);
        assert_eq!(plan.route(0).loads(), &[1, 2, 1, 0]);
    }

    #[test]
    fn test_relocate_remove_and_reverse() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0, 2, 2), &model, &NoPenalty).unwrap();

        let relocate = Move::Relocate {
            order: 1,
            from: 0,
            to: 1,
            pickup_pos: 0,
            delivery_pos: 0,
        };
        plan.apply(&relocate, &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(0).nodes(), &[0, 1]);
        assert_eq!(plan.route(1).nodes(), &[2, 3]);
        assert_eq!(plan.route_of(1), Some(1));

        plan.apply(&Move::Remove { order: 0, route: 0 }, &model, &NoPenalty)
            .unwrap();
        assert!(plan.route(0).is_empty());
        assert_eq!(plan.unassigned_count(), 2);

        plan.apply(&insert(2, 1, 0, 0), &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(1).nodes(), &[4, 5, 2, 3]);
        plan.apply(&Move::Reverse { route: 1, start: 1, end: 2 }, &model, &NoPenalty)
            .unwrap();
        assert_eq!(plan.route(1).nodes(), &[4, 2, 5, 3]);
    }

    #[test]
    fn test_exchange() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 1, 0, 0), &model, &NoPenalty).unwrap();
        let exchange = Move::Exchange {
            first: 0,
            first_route: 0,
            first_at: (0, 0),
            second: 1,
            second_route: 1,
            second_at: (0, 0),
        };
        plan.apply(&exchange, &model, &NoPenalty).unwrap();
        assert_eq!(plan.route(0).nodes(), &[2, 3]);
        assert_eq!(plan.route(1).nodes(), &[0, 1]);
        assert_eq!(plan.route_of(0), Some(1));
        assert_eq!(plan.route_of(1), Some(0));
    }

    #[test]
    fn test_infeasible_move_is_error() {
        let p = problem();
        let model = RoutingModel::new(&p, &ModelConfig::default());
        let mut plan = WorkingPlan::new(&model);
        plan.apply(&insert(0, 0, 0, 0), &model, &NoPenalty).unwrap();
        plan.apply(&insert(1, 0, 0, 1), &model, &NoPenalty).unwrap();
        // a third nested pickup exceeds capacity 2
        assert!(plan
            .apply(&insert(2, 0, 0, 2), &model, &NoPenalty)
            .is_err());
    }
}
