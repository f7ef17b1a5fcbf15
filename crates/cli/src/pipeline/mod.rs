//! Shipping pipeline: input parsing, router construction, statistics.

mod input;
mod shipper;
mod stats;

pub use input::KindTable;
pub use shipper::{build_router, Shipper};
pub use stats::ShipStats;
