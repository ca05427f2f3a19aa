//! Subprocess-backed toolkit implementation.
//!
//! Executables are resolved under an explicit bin directory when one is
//! configured, otherwise by name through the ambient search path. The bin
//! directory is threaded in from the resolved settings rather than mutated
//! into the process environment.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{tools, ParamSet, Toolkit};
use crate::error::PipelineError;

pub struct ExternalToolkit {
    /// Directory holding the toolkit executables, if overridden.
    bin_dir: Option<PathBuf>,
}

impl ExternalToolkit {
    pub fn new(bin_dir: Option<PathBuf>) -> Self {
        Self { bin_dir }
    }

    fn command_for(&self, tool: &str) -> Command {
        match &self.bin_dir {
            Some(dir) => Command::new(dir.join(tool)),
            None => Command::new(tool),
        }
    }

    /// Check that the toolkit is reachable by probing the optimizer binary.
    /// The probe must both spawn and exit cleanly.
    pub async fn check(&self) -> Result<(), PipelineError> {
        if let Some(dir) = &self.bin_dir {
            let probe = dir.join(tools::OPTIMIZE_SINGLE);
            if !probe.exists() {
                return Err(PipelineError::Spawn {
                    tool: tools::OPTIMIZE_SINGLE.to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("not found under {}", dir.display()),
                    ),
                });
            }
        }

        let status = self
            .command_for(tools::OPTIMIZE_SINGLE)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| PipelineError::Spawn {
                tool: tools::OPTIMIZE_SINGLE.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(PipelineError::ToolFailed {
                tool: tools::OPTIMIZE_SINGLE.to_string(),
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Toolkit for ExternalToolkit {
    async fn run(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError> {
        debug!(%tool, %params, "invoking toolkit executable");
        let start = Instant::now();

        let output = self
            .command_for(tool)
            .args(params.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| PipelineError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::ToolFailed {
                tool: tool.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        info!(
            %tool,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "toolkit executable completed"
        );
        Ok(())
    }

    async fn launch(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError> {
        info!(%tool, "launching interactive tool");

        // Inherit stdio so the viewer owns the terminal; block until exit.
        let status = self
            .command_for(tool)
            .args(params.to_args())
            .status()
            .await
            .map_err(|source| PipelineError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(PipelineError::ToolFailed {
                tool: tool.to_string(),
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_failure_is_not_tool_failure() {
        let toolkit = ExternalToolkit::new(Some(PathBuf::from("/nonexistent/bin")));
        let err = toolkit
            .run("NoSuchTool", &ParamSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_check_reports_missing_bin_dir() {
        let toolkit = ExternalToolkit::new(Some(PathBuf::from("/nonexistent/bin")));
        assert!(toolkit.check().await.is_err());
    }

    #[cfg(unix)]
    fn fake_optimizer(dir: &std::path::Path, exit_code: i32) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(tools::OPTIMIZE_SINGLE);
        std::fs::write(&path, format!("#!/bin/sh\nexit {}\n", exit_code)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_rejects_failing_probe() {
        let temp = tempfile::tempdir().unwrap();
        fake_optimizer(temp.path(), 3);

        let toolkit = ExternalToolkit::new(Some(temp.path().to_path_buf()));
        let err = toolkit.check().await.unwrap_err();
        assert!(matches!(err, PipelineError::ToolFailed { code: 3, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_check_accepts_clean_probe() {
        let temp = tempfile::tempdir().unwrap();
        fake_optimizer(temp.path(), 0);

        let toolkit = ExternalToolkit::new(Some(temp.path().to_path_buf()));
        toolkit.check().await.unwrap();
    }
}
