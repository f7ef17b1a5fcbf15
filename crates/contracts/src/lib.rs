//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall-clock `DateTime<Utc>` from a [`Clock`] stamps buffered entries and
//!   drives every output schedule
//! - Entry ids are store-assigned and only used for ordering/deletion

mod blueprint;
mod clock;
mod entry;
mod error;
mod event;
mod filter;
mod lifecycle;
mod output_config;
mod sink;
mod store;

pub use blueprint::*;
pub use clock::*;
pub use entry::*;
pub use error::*;
pub use event::*;
pub use filter::*;
pub use lifecycle::*;
pub use output_config::*;
pub use sink::*;
pub use store::*;
