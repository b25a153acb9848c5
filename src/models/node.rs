//! Node indexing of the pickup-delivery graph.
//!
//! Order `i` owns two nodes: its pickup at `2i` and its delivery at `2i + 1`.
//! The depot follows the last delivery at `2 * order_count`.

/// What a node of the routing graph stands for.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::NodeKind;
///
/// assert_eq!(NodeKind::of(4, 3), NodeKind::Pickup(2));
/// assert_eq!(NodeKind::of(5, 3), NodeKind::Delivery(2));
/// assert_eq!(NodeKind::of(6, 3), NodeKind::Depot);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Loading point of the given order.
    Pickup(usize),
    /// Unloading point of the given order.
    Delivery(usize),
    /// Shared start and end of every route.
    Depot,
}

impl NodeKind {
    /// Classifies `node` in a graph built for `order_count` orders.
    pub fn of(node: usize, order_count: usize) -> Self {
        if node >= 2 * order_count {
            NodeKind::Depot
        } else if node % 2 == 0 {
            NodeKind::Pickup(node / 2)
        } else {
            NodeKind::Delivery(node / 2)
        }
    }

    /// Change of the carried-order count when visiting this node.
    pub fn load_delta(&self) -> i32 {
        match self {
            NodeKind::Pickup(_) => 1,
            NodeKind::Delivery(_) => -1,
            NodeKind::Depot => 0,
        }
    }

    /// Order served at this node, if any.
    pub fn order(&self) -> Option<usize> {
        match *self {
            NodeKind::Pickup(o) | NodeKind::Delivery(o) => Some(o),
            NodeKind::Depot => None,
        }
    }
}

/// Pickup node of `order`.
pub fn pickup_node(order: usize) -> usize {
    2 * order
}

/// Delivery node of `order`.
pub fn delivery_node(order: usize) -> usize {
    2 * order + 1
}

/// Depot node of a graph with `order_count` orders.
pub fn depot_node(order_count: usize) -> usize {
    2 * order_count
}

/// Order owning a pickup or delivery node.
pub fn order_of(node: usize) -> usize {
    node / 2
}

/// Returns `true` for pickup nodes (the depot is never passed here).
pub fn is_pickup(node: usize) -> bool {
    node % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing() {
        for order in 0..5 {
            let p = pickup_node(order);
            let d = delivery_node(order);
            assert_eq!(order_of(p), order);
            assert_eq!(order_of(d), order);
            assert!(is_pickup(p));
            assert!(!is_pickup(d));
            assert_eq!(NodeKind::of(p, 5), NodeKind::Pickup(order));
            assert_eq!(NodeKind::of(d, 5), NodeKind::Delivery(order));
        }
        assert_eq!(depot_node(5), 10);
        assert_eq!(NodeKind::of(10, 5), NodeKind::Depot);
    }

    #[test]
    fn test_load_delta() {
        assert_eq!(NodeKind::Pickup(0).load_delta(), 1);
        assert_eq!(NodeKind::Delivery(0).load_delta(), -1);
        assert_eq!(NodeKind::Depot.load_delta(), 0);
        assert_eq!(NodeKind::Depot.order(), None);
        assert_eq!(NodeKind::Delivery(3).order(), Some(3));
    }
}
