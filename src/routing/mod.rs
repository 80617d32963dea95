//! Request routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → target.rs (strip leading '/', percent-decode, validate)
//!     → matcher.rs (URL shape + Content-Type → streaming flag)
//!     → flag and target handed to the retry controller
//! ```
//!
//! # Design Decisions
//! - The target is carried in the path, not a query parameter
//! - Classification happens once per inbound request, before any attempt

pub mod matcher;
pub mod target;

pub use matcher::{is_streaming, is_streaming_request, is_streaming_target};
pub use target::{extract_target, TargetError, TargetUrl};
