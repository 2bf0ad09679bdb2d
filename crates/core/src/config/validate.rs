use super::{types::Config, ConfigError, MAX_SESSION_TTL_SECS};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Resolver poll interval is non-zero and fits inside the timeout
/// - Session TTL is not 0 and at most ten years
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.resolver.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "resolver.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.resolver.poll_interval_ms > config.resolver.timeout_ms {
        return Err(ConfigError::ValidationError(format!(
            "resolver.poll_interval_ms ({}) exceeds resolver.timeout_ms ({})",
            config.resolver.poll_interval_ms, config.resolver.timeout_ms
        )));
    }

    if config.sessions.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "sessions.ttl_secs cannot be 0".to_string(),
        ));
    }

    if config.sessions.ttl_secs > MAX_SESSION_TTL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "sessions.ttl_secs ({}) exceeds the maximum of {}",
            config.sessions.ttl_secs, MAX_SESSION_TTL_SECS
        )));
    }

    Ok(())
}
