use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Provider access key is present
/// - Retry attempts, rate limit and concurrency are non-zero
/// - Input columns are distinct
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.provider.access_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "provider.access_key cannot be empty".to_string(),
        ));
    }

    if config.retry.attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.attempts must be at least 1".to_string(),
        ));
    }

    if config.rate_limit.calls == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.calls must be at least 1".to_string(),
        ));
    }

    if config.rate_limit.period_secs == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.period_secs cannot be 0".to_string(),
        ));
    }

    if config.tiles.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "tiles.concurrency must be at least 1".to_string(),
        ));
    }

    let input = &config.input;
    if input.fid_column == input.x_column
        || input.fid_column == input.y_column
        || input.x_column == input.y_column
    {
        return Err(ConfigError::ValidationError(format!(
            "input columns must be distinct (fid={}, x={}, y={})",
            input.fid_column, input.x_column, input.y_column
        )));
    }

    if config.stitcher.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "stitcher.program cannot be empty".to_string(),
        ));
    }

    Ok(())
}
