use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::RenderError;
use crate::domain::repositories::ThumbnailRenderer;
use crate::domain::requests::RenderOptions;

pub const DEFAULT_RENDER_COMMAND: &str = "fits2image";
const RENDER_TIMEOUT: Duration = Duration::from_secs(120);
/// Longest stderr excerpt carried into a render error.
const STDERR_EXCERPT: usize = 512;

/// Renders thumbnails by running an external FITS-to-JPEG converter.
///
/// The program is invoked as
/// `<program> [args..] --width W --height H --quality Q --percentile P
/// [--median] [--color] [--label TEXT] --output OUT INPUT...`
/// and must write a JPEG to `OUT`, exiting zero on success.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandRenderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: RENDER_TIMEOUT,
        }
    }

    /// Fixed arguments placed before the generated ones.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command_args(&self, inputs: &[PathBuf], output: &Path, options: &RenderOptions) -> Vec<String> {
        let mut args = self.args.clone();
        args.extend([
            "--width".to_string(),
            options.width.to_string(),
            "--height".to_string(),
            options.height.to_string(),
            "--quality".to_string(),
            options.quality.to_string(),
            "--percentile".to_string(),
            options.percentile.to_string(),
        ]);
        if options.median {
            args.push("--median".to_string());
        }
        if options.color {
            args.push("--color".to_string());
        }
        if let Some(label) = &options.label {
            args.push("--label".to_string());
            args.push(label.clone());
        }
        args.push("--output".to_string());
        args.push(output.display().to_string());
        args.extend(inputs.iter().map(|p| p.display().to_string()));
        args
    }
}

#[async_trait]
impl ThumbnailRenderer for CommandRenderer {
    async fn render(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        options: &RenderOptions,
    ) -> Result<(), RenderError> {
        let args = self.command_args(inputs, output, options);
        debug!(program = %self.program.display(), ?args, "invoking renderer");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RenderError(format!(
                    "failed to start renderer {}: {e}",
                    self.program.display()
                ))
            })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError(format!("renderer timed out after {:?}", self.timeout)))?
            .map_err(|e| RenderError(format!("renderer did not finish: {e}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            warn!(status = %result.status, stderr = %excerpt, "renderer failed");
            return Err(RenderError(format!(
                "renderer exited with {}: {excerpt}",
                result.status
            )));
        }

        Ok(())
    }
}
