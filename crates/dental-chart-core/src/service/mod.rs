//! Caller-facing chart operations: authorization, validation and atomic
//! state + history writes.

mod access;
mod mutation;
mod queries;
mod requests;

pub use access::{ClinicAccess, OpenAccess};
pub use mutation::MutationService;
pub use queries::ChartQueries;
pub use requests::*;

pub(crate) use requests::non_blank;
