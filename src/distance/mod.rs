//! Distance and travel duration matrices.
//!
//! Provides a dense integer matrix over the pickup/delivery nodes with a
//! trailing depot row and column.

mod matrix;

pub use matrix::DistanceMatrix;

/// Travel minutes for a distance: `ceil(distance / speed) + service_minutes`.
///
/// # Examples
///
/// ```
/// use u_pdptw::distance::travel_minutes;
///
/// assert_eq!(travel_minutes(0, 5, 2), 2);
/// assert_eq!(travel_minutes(5, 5, 2), 3);
/// assert_eq!(travel_minutes(6, 5, 2), 4);
/// ```
pub fn travel_minutes(distance: i64, speed: i64, service_minutes: i64) -> i64 {
    (distance + speed - 1) / speed + service_minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_duration_monotone(a in 0i64..10_000, b in 0i64..10_000, speed in 1i64..20) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(travel_minutes(lo, speed, 2) <= travel_minutes(hi, speed, 2));
        }

        #[test]
        fn prop_duration_lower_bound(d in 0i64..10_000, speed in 1i64..20) {
            let minutes = travel_minutes(d, speed, 2);
            prop_assert!(minutes * speed >= d + 2 * speed);
            prop_assert_eq!(travel_minutes(d, speed, 2), minutes);
        }
    }
}
