//! Robot type with a carrying capacity.

use serde::{Deserialize, Serialize};

/// A mobile unit that carries orders from pickup to delivery.
///
/// Capacity counts orders carried at the same time, not weight.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::Robot;
///
/// let r = Robot::new(7, 30);
/// assert_eq!(r.id(), 7);
/// assert_eq!(r.capacity(), 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    id: usize,
    capacity: i32,
}

impl Robot {
    /// Creates a robot with the given ID and capacity.
    pub fn new(id: usize, capacity: i32) -> Self {
        Self { id, capacity }
    }

    /// Robot ID as given by the caller.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Maximum number of orders carried at once.
    pub fn capacity(&self) -> i32 {
        self.capacity
    }
}
