//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline on response headers per attempt)
//!     → On failure: retries.rs (classify, back off, try again)
//!     → backoff.rs (capped exponential delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a header deadline
//! - 4xx answers are final; 5xx and transport failures are retried
//! - No state survives the request: no budgets, no circuit breakers

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{ForwardRequest, RetryController, Sleeper, TokioSleeper};
