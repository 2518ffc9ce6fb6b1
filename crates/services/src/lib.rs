#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempts;
pub mod error;

pub use assess_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, AttemptError, QueryError};

pub use attempts::{
    AttemptService, AttemptTick, Delivered, SubmissionListItem, SubmissionQueryService,
};
