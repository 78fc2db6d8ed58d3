//! Resource clients: one method per API operation.
//!
//! Each client owns a [`Gateway`](crate::gateway::Gateway) handle and maps a
//! domain intent to exactly one request with its success checks.

mod course;
mod topics;
mod user;

pub use course::{CourseClient, Enrollment, ProgressUpdate};
pub use topics::TopicsClient;
pub use user::{LoginForm, NewUser, UserClient};

/// Identifier type used by the API for users and courses.
pub type Id = i64;

pub(crate) fn json_headers() -> Vec<(String, String)> {
    vec![("Content-Type".to_string(), "application/json".to_string())]
}
