// src/transform/stylesheet.rs

//! Sass compilation through an external compiler (`sass` by default).

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::command::{quote_arg, run_shell};
use super::{
    Transform, TransformEnv, TransformError, TransformFuture, TransformInvocation,
    TransformOptions,
};

#[derive(Debug, Clone)]
pub struct CompileStylesheets {
    compiler: String,
}

impl CompileStylesheets {
    pub fn new(compiler: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }

    /// Full command line for one entry file.
    pub fn command_line(&self, input: &Path, options: &TransformOptions) -> String {
        let style = if options.minify {
            "--style=compressed"
        } else {
            "--style=expanded"
        };
        let maps = if options.source_maps {
            "--embed-source-map"
        } else {
            "--no-source-map"
        };
        format!(
            "{} {} {} {}",
            self.compiler,
            style,
            maps,
            quote_arg(&input.to_string_lossy())
        )
    }
}

/// `all.scss` -> `all.css`, unless the invocation names a single output.
fn output_for(invocation: &TransformInvocation, input: &Path, inputs: usize) -> PathBuf {
    match (&invocation.output_name, inputs) {
        (Some(name), 1) => invocation.output_dir.join(name),
        _ => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "out".to_string());
            invocation.output_dir.join(format!("{stem}.css"))
        }
    }
}

impl Transform for CompileStylesheets {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let inputs = env.expand(&invocation.inputs)?;
            if inputs.is_empty() {
                debug!(patterns = ?invocation.inputs, "no stylesheets to compile");
                return Ok(Vec::new());
            }

            let mut produced = Vec::with_capacity(inputs.len());
            for input in &inputs {
                let cmd = self.command_line(input, &invocation.options);
                let output = match run_shell(&cmd, env.root(), None).await {
                    Ok(output) => output,
                    Err(err) => {
                        error!(path = ?input, error = %err, "stylesheet compilation failed");
                        return Err(err);
                    }
                };

                let target = output_for(invocation, input, inputs.len());
                env.fs.write(&target, &output.stdout)?;
                info!(path = ?input, output = ?target, "compiled stylesheet");
                produced.push(target);
            }
            Ok(produced)
        })
    }
}
