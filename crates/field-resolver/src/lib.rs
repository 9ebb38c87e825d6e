//! Field resolution
//!
//! Joins the wizard structure with caller data on `field_id` and produces a
//! concrete, page-ordered action list before any session is opened.

pub mod errors;
pub mod resolver;
pub mod types;
pub mod values;

pub use errors::{DriftFault, ResolveError};
pub use resolver::resolve;
pub use types::{PageActionSet, ResolvedAction, ResolvedPlan};
