//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (buffer body up to the configured size)
//!     → headers.rs (drop edge/forwarding headers, seed player identity)
//!     → Forward upstream
//!
//! Upstream response:
//!     → headers.rs (strip caching headers, add CORS)
//! ```
//!
//! # Design Decisions
//! - No trust in client forwarding headers; they never reach upstream
//! - The relay itself is unauthenticated; client auth headers pass through

pub mod headers;
pub mod limits;
