use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides; nested keys use `__`
/// (`STREETPANO_PATHS__ROOT` sets `paths.root`).
pub const ENV_PREFIX: &str = "STREETPANO_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_minimal() {
        let toml = r#"
[provider]
access_key = "secret"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.provider.access_key, "secret");
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.rate_limit.calls, 30);
        assert_eq!(config.paths.root, PathBuf::from("."));
    }

    #[test]
    fn test_load_config_from_str_missing_provider() {
        let toml = r#"
[retry]
attempts = 2
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/streetpano.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[paths]
root = "/data/streetview"

[provider]
access_key = "secret"

[tiles]
policy = "degraded"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/data/streetview"));
        assert_eq!(
            config.tiles.policy,
            crate::tiles::SufficiencyPolicy::Degraded
        );
    }

    #[test]
    fn test_env_override_uses_double_underscore() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "streetpano.toml",
                r#"
[provider]
access_key = "from-file"

[retry]
attempts = 3
"#,
            )?;
            jail.set_env("STREETPANO_RETRY__ATTEMPTS", "7");
            jail.set_env("STREETPANO_PROVIDER__ACCESS_KEY", "from-env");

            let config = load_config(Path::new("streetpano.toml"))
                .map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.retry.attempts, 7);
            assert_eq!(config.provider.access_key, "from-env");
            Ok(())
        });
    }
}
