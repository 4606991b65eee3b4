//! Append-only, hash-chained chart history.

mod hash;
mod log;
mod query;

pub use hash::*;
pub use log::*;
pub use query::*;
