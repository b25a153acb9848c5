//! Order, coordinate and time window types.

use serde::{Deserialize, Serialize};

/// A point on the integer grid.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::Coordinate;
///
/// let a = Coordinate::new(0, 0);
/// let b = Coordinate::new(3, -4);
/// assert_eq!(a.manhattan(&b), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// X-coordinate.
    pub x: i64,
    /// Y-coordinate.
    pub y: i64,
}

impl Coordinate {
    /// Creates a coordinate.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate.
    pub fn manhattan(&self, other: &Coordinate) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// A delivery window in elapsed minutes, both ends inclusive.
///
/// Unlike a validated interval, `lower > upper` is representable: such a
/// window simply admits no arrival, which makes the order unservable.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::TimeWindow;
///
/// let tw = TimeWindow::new(30, 60);
/// assert!(tw.contains(45));
/// assert_eq!(tw.outside_by(70), 10);
/// assert_eq!(tw.outside_by(20), 10);
/// assert_eq!(tw.outside_by(45), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    lower: i64,
    upper: i64,
}

impl TimeWindow {
    /// Creates a window `[lower, upper]`.
    pub fn new(lower: i64, upper: i64) -> Self {
        Self { lower, upper }
    }

    /// Earliest on-time minute.
    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// Latest on-time minute.
    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// Returns `true` if the window admits no minute at all.
    pub fn is_empty(&self) -> bool {
        self.lower > self.upper
    }

    /// Returns `true` if `minute` lies inside the window.
    pub fn contains(&self, minute: i64) -> bool {
        self.lower <= minute && minute <= self.upper
    }

    /// Minutes by which `minute` misses the window (zero when inside).
    pub fn outside_by(&self, minute: i64) -> i64 {
        (self.lower - minute).max(minute - self.upper).max(0)
    }

    /// Intersection with `[lower, upper]`.
    pub fn clamp(&self, lower: i64, upper: i64) -> Self {
        Self::new(self.lower.max(lower), self.upper.min(upper))
    }
}

/// A paired pickup-and-delivery task.
///
/// Windows are kept in clock encoding as received; the problem builder
/// converts them to elapsed minutes.
///
/// # Examples
///
/// ```
/// use u_pdptw::models::{Coordinate, Order};
///
/// let o = Order::new(1, Coordinate::new(0, 0), Coordinate::new(0, 5), 1100, 1130);
/// assert_eq!(o.id(), 1);
/// assert_eq!(o.pickup().manhattan(&o.delivery()), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: usize,
    pickup: Coordinate,
    delivery: Coordinate,
    start_time: i64,
    end_time: i64,
}

impl Order {
    /// Creates an order; `start_time` and `end_time` are in clock encoding.
    pub fn new(
        id: usize,
        pickup: Coordinate,
        delivery: Coordinate,
        start_time: i64,
        end_time: i64,
    ) -> Self {
        Self {
            id,
            pickup,
            delivery,
            start_time,
            end_time,
        }
    }

    /// Order ID as given by the caller.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Where the order is loaded.
    pub fn pickup(&self) -> Coordinate {
        self.pickup
    }

    /// Where the order is delivered.
    pub fn delivery(&self) -> Coordinate {
        self.delivery
    }

    /// Earliest deliverable time, clock encoding.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Latest deliverable time, clock encoding.
    pub fn end_time(&self) -> i64 {
        self.end_time
    }
}
