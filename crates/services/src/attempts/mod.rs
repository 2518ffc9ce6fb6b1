mod view;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::{AttemptError, QueryError};
pub use view::{SubmissionListItem, SubmissionQueryService};
pub use workflow::{AttemptService, AttemptTick, Delivered};
