//! Configuration for the stitching engine.

use serde::{Deserialize, Serialize};

/// External stitching program and its backend switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitcherConfig {
    /// Program name or path (OpenCV `stitching_detailed` sample by default).
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments selecting the accelerated backend.
    #[serde(default = "default_accelerated_args")]
    pub accelerated_args: Vec<String>,

    /// Arguments selecting the CPU backend.
    #[serde(default = "default_cpu_args")]
    pub cpu_args: Vec<String>,

    /// Flag preceding the output path.
    #[serde(default = "default_output_flag")]
    pub output_flag: String,

    /// Arguments added to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Timeout for a single stitch in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Try the accelerated backend first. When false only the CPU runs.
    #[serde(default = "default_prefer_accelerated")]
    pub prefer_accelerated: bool,
}

fn default_program() -> String {
    "stitching_detailed".to_string()
}

fn default_accelerated_args() -> Vec<String> {
    vec!["--try_cuda".to_string(), "yes".to_string()]
}

fn default_cpu_args() -> Vec<String> {
    vec!["--try_cuda".to_string(), "no".to_string()]
}

fn default_output_flag() -> String {
    "--output".to_string()
}

fn default_timeout() -> u64 {
    600
}

fn default_prefer_accelerated() -> bool {
    true
}

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            accelerated_args: default_accelerated_args(),
            cpu_args: default_cpu_args(),
            output_flag: default_output_flag(),
            extra_args: Vec::new(),
            timeout_secs: default_timeout(),
            prefer_accelerated: default_prefer_accelerated(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StitcherConfig::default();
        assert_eq!(config.program, "stitching_detailed");
        assert_eq!(config.accelerated_args, vec!["--try_cuda", "yes"]);
        assert_eq!(config.cpu_args, vec!["--try_cuda", "no"]);
        assert!(config.prefer_accelerated);
    }

    #[test]
    fn test_partial_deserialize() {
        let config: StitcherConfig = toml::from_str(
            r#"
program = "/opt/opencv/bin/stitching_detailed"
timeout_secs = 60
extra_args = ["--warp", "cylindrical"]
"#,
        )
        .unwrap();
        assert_eq!(config.program, "/opt/opencv/bin/stitching_detailed");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.extra_args, vec!["--warp", "cylindrical"]);
        assert_eq!(config.output_flag, "--output");
    }
}
