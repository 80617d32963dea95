//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID)
//!     → landing.rs when the path carries no target
//!     → [routing: target + streaming flag] → [resilience: attempts]
//!     → response.rs (finish ordinary/streaming, error bodies)
//!     → Send to client
//! ```

pub mod landing;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState, HttpServer};
