// src/transform/lint.rs

use tracing::{debug, info, warn};

use super::command::{capture_shell, quote_arg};
use super::{Transform, TransformEnv, TransformError, TransformFuture, TransformInvocation};

/// Runs the configured linter on each script. Produces no files.
#[derive(Debug, Clone)]
pub struct LintScripts {
    linter: String,
}

impl LintScripts {
    pub fn new(linter: impl Into<String>) -> Self {
        Self {
            linter: linter.into(),
        }
    }
}

impl Transform for LintScripts {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let inputs = env.expand(&invocation.inputs)?;
            if inputs.is_empty() {
                debug!(patterns = ?invocation.inputs, "no scripts to lint");
                return Ok(Vec::new());
            }

            let mut report = String::new();
            let mut failed = 0;
            for path in &inputs {
                let cmd = format!("{} {}", self.linter, quote_arg(&path.to_string_lossy()));
                let output = capture_shell(&cmd, env.root(), None).await?;
                if output.success {
                    debug!(path = ?path, "lint clean");
                    continue;
                }

                failed += 1;
                let stdout = String::from_utf8_lossy(&output.stdout);
                warn!(path = ?path, exit_code = output.code, "lint problems");
                for text in [stdout.trim(), output.stderr.as_str()] {
                    if !text.is_empty() {
                        report.push_str(text);
                        report.push('\n');
                    }
                }
            }

            if failed > 0 {
                return Err(TransformError::Lint {
                    files: failed,
                    report: report.trim_end().to_string(),
                });
            }

            info!(files = inputs.len(), "lint passed");
            Ok(Vec::new())
        })
    }
}
