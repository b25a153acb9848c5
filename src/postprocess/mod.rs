//! Post-optimization of an extracted [`Solution`](crate::models::Solution).
//!
//! - [`CarriedTimePolisher`] — random pair reinsertion within a route that
//!   keeps strict windows and never worsens (efficiency, distance)
//! - [`LateOrderRecovery`] — greedy insertion of excluded orders under
//!   relaxed windows, trading full adherence for partial awards
//!
//! Both phases run against a deadline and leave the input untouched on
//! failure.

mod polish;
mod recovery;

pub use polish::{CarriedTimePolisher, PolishStats};
pub use recovery::{LateOrderRecovery, Recovery};
