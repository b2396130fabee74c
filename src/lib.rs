//! HTTP adapter in front of a mock/validation engine.

pub mod config;
pub mod engine;
pub mod http;
pub mod lifecycle;
pub mod mocking;
pub mod observability;
pub mod validation;

pub use config::AdapterConfig;
pub use engine::Engine;
pub use http::{MockServer, ProblemError};
pub use lifecycle::Shutdown;
