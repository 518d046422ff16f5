//! Stitching through an external program.
//!
//! The program is invoked as
//! `<program> <extra_args..> <images..> <backend args..> <output_flag> <output>`
//! Exit code 0 with an output file is success. On failure the tool exits -1
//! and prints what went wrong, so the [`StitchStatus`] comes from that
//! message and only falls back to the exit code.

use std::ffi::OsString;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::StitcherConfig;
use super::error::StitchError;
use super::traits::StitchEngine;
use super::types::{ExecutionBackend, StitchRequest, StitchStatus};

/// [`StitchEngine`] backed by OpenCV's stitching command-line tool.
pub struct CommandStitchEngine {
    config: StitcherConfig,
}

impl CommandStitchEngine {
    pub fn new(config: StitcherConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(StitcherConfig::default())
    }

    pub fn config(&self) -> &StitcherConfig {
        &self.config
    }

    fn build_args(&self, request: &StitchRequest) -> Vec<OsString> {
        let backend_args = match request.backend {
            ExecutionBackend::Accelerated => &self.config.accelerated_args,
            ExecutionBackend::Cpu => &self.config.cpu_args,
        };

        let mut args: Vec<OsString> = Vec::new();
        args.extend(self.config.extra_args.iter().map(OsString::from));
        args.extend(request.images.iter().map(|p| p.as_os_str().to_os_string()));
        args.extend(backend_args.iter().map(OsString::from));
        args.push(OsString::from(&self.config.output_flag));
        args.push(request.output.as_os_str().to_os_string());
        args
    }

    fn spawn_error(&self, e: std::io::Error) -> StitchError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StitchError::EngineNotFound {
                program: self.config.program.clone(),
            }
        } else {
            StitchError::Io(e)
        }
    }
}

#[async_trait]
impl StitchEngine for CommandStitchEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn stitch(&self, request: &StitchRequest) -> Result<StitchStatus, StitchError> {
        let args = self.build_args(request);
        debug!(
            "running {} with {} images on {}",
            self.config.program,
            request.images.len(),
            request.backend
        );

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = match timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(output) => output?,
            // Dropping the child kills it
            Err(_) => {
                return Err(StitchError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        let by_exit_code = output
            .status
            .code()
            .map(StitchStatus::from_exit_code)
            .unwrap_or(StitchStatus::OtherFailure);

        if !by_exit_code.is_ok() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            // The tool exits -1 for every failure; the message names it
            let status = StitchStatus::from_message(&stdout)
                .or_else(|| StitchStatus::from_message(&stderr))
                .unwrap_or(by_exit_code);
            debug!(
                "{} exited with {:?} ({}): {} {}",
                self.config.program,
                output.status.code(),
                status,
                stdout.trim(),
                stderr.trim()
            );
            return Ok(status);
        }

        let status = by_exit_code;

        if tokio::fs::metadata(&request.output).await.is_err() {
            return Err(StitchError::OutputMissing {
                path: request.output.clone(),
            });
        }

        Ok(status)
    }

    async fn validate(&self) -> Result<(), StitchError> {
        // The tool prints its usage and exits non-zero; only spawning matters
        Command::new(&self.config.program)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn request(backend: ExecutionBackend, output: PathBuf) -> StitchRequest {
        StitchRequest {
            images: vec![PathBuf::from("/t/a_0.png"), PathBuf::from("/t/a_45.png")],
            output,
            backend,
        }
    }

    #[test]
    fn test_build_args_per_backend() {
        let engine = CommandStitchEngine::with_defaults();

        let args = engine.build_args(&request(
            ExecutionBackend::Accelerated,
            PathBuf::from("/p/a.png"),
        ));
        assert_eq!(
            args,
            vec!["/t/a_0.png", "/t/a_45.png", "--try_cuda", "yes", "--output", "/p/a.png"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );

        let args = engine.build_args(&request(ExecutionBackend::Cpu, PathBuf::from("/p/a.png")));
        assert!(args.contains(&OsString::from("no")));
    }

    fn shell_engine(script: &str, timeout_secs: u64) -> CommandStitchEngine {
        CommandStitchEngine::new(StitcherConfig {
            program: "sh".to_string(),
            extra_args: vec!["-c".to_string(), script.to_string(), "stitch".to_string()],
            timeout_secs,
            ..StitcherConfig::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_becomes_status() {
        let temp = TempDir::new().unwrap();
        let engine = shell_engine("exit 2", 10);

        let status = engine
            .stitch(&request(ExecutionBackend::Cpu, temp.path().join("out.png")))
            .await
            .unwrap();
        assert_eq!(status, StitchStatus::HomographyEstimationFailed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_printed_failure_message_becomes_status() {
        let temp = TempDir::new().unwrap();
        let cases = [
            ("echo 'Need more images'", StitchStatus::NeedMoreImages),
            (
                "echo 'Homography estimation failed.'",
                StitchStatus::HomographyEstimationFailed,
            ),
            (
                "echo 'Camera parameters adjusting failed.' >&2",
                StitchStatus::CameraParameterAdjustmentFailed,
            ),
            ("echo 'out of memory'", StitchStatus::OtherFailure),
        ];

        for (print, expected) in cases {
            let engine = shell_engine(&format!("{}; exit 255", print), 10);
            let status = engine
                .stitch(&request(ExecutionBackend::Cpu, temp.path().join("out.png")))
                .await
                .unwrap();
            assert_eq!(status, expected, "script: {}", print);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_requires_output() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out.png");

        let writes = shell_engine(r#"for a; do out="$a"; done; printf png > "$out""#, 10);
        let status = writes
            .stitch(&request(ExecutionBackend::Cpu, output.clone()))
            .await
            .unwrap();
        assert_eq!(status, StitchStatus::Ok);
        assert!(output.exists());

        let silent = shell_engine("exit 0", 10);
        let err = silent
            .stitch(&request(ExecutionBackend::Cpu, temp.path().join("none.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::OutputMissing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let temp = TempDir::new().unwrap();
        let engine = shell_engine("sleep 5", 1);

        let err = engine
            .stitch(&request(ExecutionBackend::Cpu, temp.path().join("out.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::Timeout { timeout_secs: 1 }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let engine = CommandStitchEngine::new(StitcherConfig {
            program: "/nonexistent/stitching_detailed".to_string(),
            ..StitcherConfig::default()
        });

        let err = engine
            .stitch(&request(ExecutionBackend::Cpu, PathBuf::from("/tmp/x.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, StitchError::EngineNotFound { .. }));
        assert!(matches!(
            engine.validate().await,
            Err(StitchError::EngineNotFound { .. })
        ));
    }
}
