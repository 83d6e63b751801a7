//! Core domain entities.
//!
//! - [`Link`] - A shortened URL mapping, the unit of the link store and cache
//! - [`StatsRecord`] - Aggregated click counters for one code
//! - [`HourlyClicks`] - Time-bucketed click counts
//!
//! Creation inputs live in separate structs (`NewLink`) so store-assigned
//! fields never have to be invented by callers.

pub mod link;
pub mod stats;

pub use link::{Link, NewLink};
pub use stats::{HourlyClicks, StatsRecord, hour_bucket};
