//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, delays ordered, ratios bounded)
//! - Check addresses and header values are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::ProxyConfig;
use crate::observability::logging::default_filter;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid {field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("retries.max_attempts must be at least 1")]
    NoAttempts,

    #[error("retries.initial_delay_ms ({initial}) exceeds retries.max_delay_ms ({max})")]
    DelayOrder { initial: u64, max: u64 },

    #[error("retries.backoff_multiplier must be >= 1.0, got {0}")]
    Multiplier(f64),

    #[error("retries.jitter_ratio must be within [0, 1], got {0}")]
    Jitter(f64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("upstream.user_agent is not a valid header value")]
    UserAgent,

    #[error("observability.log_level {0:?} is not a log level")]
    LogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let retries = &config.retries;
    if retries.max_attempts == 0 {
        errors.push(ValidationError::NoAttempts);
    }
    if retries.initial_delay_ms > retries.max_delay_ms {
        errors.push(ValidationError::DelayOrder {
            initial: retries.initial_delay_ms,
            max: retries.max_delay_ms,
        });
    }
    if !(retries.backoff_multiplier >= 1.0) {
        errors.push(ValidationError::Multiplier(retries.backoff_multiplier));
    }
    if !(0.0..=1.0).contains(&retries.jitter_ratio) {
        errors.push(ValidationError::Jitter(retries.jitter_ratio));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.response_secs", timeouts.response_secs),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if HeaderValue::from_str(&config.upstream.user_agent).is_err() {
        errors.push(ValidationError::UserAgent);
    }

    let observability = &config.observability;
    if EnvFilter::try_new(default_filter(&observability.log_level)).is_err() {
        errors.push(ValidationError::LogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.retries.max_attempts = 0;
        config.retries.initial_delay_ms = 5000;
        config.retries.backoff_multiplier = 0.5;
        config.timeouts.response_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::NoAttempts));
        assert!(errors.contains(&ValidationError::Zero("timeouts.response_secs")));
        assert!(errors.contains(&ValidationError::DelayOrder { initial: 5000, max: 3000 }));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_user_agent() {
        let mut config = ProxyConfig::default();
        config.upstream.user_agent = "bad\nagent".into();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::UserAgent]));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = ProxyConfig::default();
        config.observability.log_level = "loud".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::LogLevel("loud".into())])
        );

        config.observability.log_level = "warn".into();
        assert!(validate_config(&config).is_ok());
    }
}
