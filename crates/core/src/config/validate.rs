use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - API prefix is an absolute path other than `/`
/// - Channel capacities are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let prefix = &config.server.api_prefix;
    if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
        return Err(ConfigError::ValidationError(format!(
            "server.api_prefix must look like \"/api\", got {:?}",
            prefix
        )));
    }

    if config.queue.notify_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "queue.notify_capacity cannot be 0".to_string(),
        ));
    }

    if config.audit.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "audit.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
