#![forbid(unsafe_code)]

pub mod model;
pub mod session;
pub mod time;

pub use session::{Session, SessionError, SessionProgress, SessionStatus};
pub use time::Clock;
