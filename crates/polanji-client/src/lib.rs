//! Client for the Polanji course API.
//!
//! This crate provides:
//! - A [`Gateway`] that sends one request, runs its named checks, and reports
//!   failures to an injected [`ErrorSink`]
//! - Resource clients ([`UserClient`], [`CourseClient`], [`TopicsClient`])
//!   covering every endpoint the load tests exercise
//! - A [`Transport`] seam with a reqwest-backed implementation

pub mod check;
pub mod clients;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod sink;
pub mod transport;

pub use check::{CheckReport, Checks};
pub use clients::{CourseClient, Enrollment, Id, LoginForm, NewUser, ProgressUpdate, TopicsClient, UserClient};
pub use error::{ClientError, ClientResult};
pub use gateway::{ApiRequest, Gateway};
pub use operation::Operation;
pub use sink::{CountingErrorSink, ErrorRecord, ErrorSink, NoopObserver, RequestObserver, RequestSample};
pub use transport::{Body, HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Timings, Transport};
