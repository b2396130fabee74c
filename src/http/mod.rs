//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/cors.rs (preflight short-circuit when enabled)
//!     → request.rs (normalize method, URL, headers, body)
//!     → mocking (preferences + merge) → engine
//!     → validation (diagnostics, strict errors)
//!     → response.rs (engine output, or problem document on failure)
//!     → Send to client
//! ```

pub mod middleware;
pub mod problem;
pub mod request;
pub mod response;
pub mod server;

pub use problem::ProblemError;
pub use request::{normalize, HttpMethod, NormalizedRequest, QueryValue};
pub use response::Reply;
pub use server::{AppState, MockServer, ServerError};
