//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → copied into request-handling state at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable for the lifetime of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_overrides, load_config, parse_config, ConfigError, ConfigOverrides};
pub use schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, RetryConfig, SecurityConfig,
    TimeoutConfig, UpstreamConfig,
};
