//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::BouncerConfig;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &BouncerConfig) -> ConfigResult<()> {
    validate_server(config)?;
    validate_approval(config)?;
    validate_rate_limit(config)?;
    validate_trust(config)?;
    validate_risk(config)?;
    Ok(())
}

fn validate_server(config: &BouncerConfig) -> ConfigResult<()> {
    if config.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::ValidationError {
            field: "server.bind_addr".to_owned(),
            message: format!("'{}' is not a valid socket address", config.server.bind_addr),
        });
    }
    Ok(())
}

fn validate_approval(config: &BouncerConfig) -> ConfigResult<()> {
    if config.approval.timeout_secs <= 0 {
        return Err(ConfigError::ValidationError {
            field: "approval.timeout_secs".to_owned(),
            message: "must be positive".to_owned(),
        });
    }
    if config.approval.ttl_buffer_secs < 0 {
        return Err(ConfigError::ValidationError {
            field: "approval.ttl_buffer_secs".to_owned(),
            message: "must not be negative".to_owned(),
        });
    }
    Ok(())
}

fn validate_rate_limit(config: &BouncerConfig) -> ConfigResult<()> {
    if config.rate_limit.window_secs <= 0 {
        return Err(ConfigError::ValidationError {
            field: "rate_limit.window_secs".to_owned(),
            message: "must be positive".to_owned(),
        });
    }
    if config.rate_limit.max_per_window == 0 {
        return Err(ConfigError::ValidationError {
            field: "rate_limit.max_per_window".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }
    Ok(())
}

fn validate_trust(config: &BouncerConfig) -> ConfigResult<()> {
    if config.trust.default_duration_secs <= 0 {
        return Err(ConfigError::ValidationError {
            field: "trust.default_duration_secs".to_owned(),
            message: "must be positive".to_owned(),
        });
    }
    if config.trust.default_max_commands == 0 {
        return Err(ConfigError::ValidationError {
            field: "trust.default_max_commands".to_owned(),
            message: "must be at least 1".to_owned(),
        });
    }
    Ok(())
}

fn validate_risk(config: &BouncerConfig) -> ConfigResult<()> {
    if config.risk.block_threshold > 100 {
        return Err(ConfigError::ValidationError {
            field: "risk.block_threshold".to_owned(),
            message: "must be between 0 and 100".to_owned(),
        });
    }
    for (verb, score) in &config.risk.verb_scores {
        if !(0.0..=100.0).contains(score) {
            return Err(ConfigError::ValidationError {
                field: format!("risk.verb_scores.{verb}"),
                message: format!("score {score} out of range 0-100"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&BouncerConfig::default()).is_ok());
    }

    #[test]
    fn rejects_invalid_bind_addr() {
        let mut config = BouncerConfig::default();
        config.server.bind_addr = "not-an-addr".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = BouncerConfig::default();
        config.approval.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}
