// src/transform/script.rs

use tracing::{debug, info};

use super::command::run_shell;
use super::sourcemap::{SourceFile, SourceMap};
use super::{Transform, TransformEnv, TransformError, TransformFuture, TransformInvocation};
use crate::fs::walk::relative_to;

/// Concatenates scripts into a single bundle.
///
/// Inputs are joined with a newline in pattern order. With `minify` the bundle
/// is piped through the configured minifier (stdin to stdout); otherwise, with
/// `source_maps`, an inline source map is appended.
#[derive(Debug, Clone)]
pub struct BundleScripts {
    minifier: String,
}

impl BundleScripts {
    pub fn new(minifier: impl Into<String>) -> Self {
        Self {
            minifier: minifier.into(),
        }
    }
}

impl Transform for BundleScripts {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let inputs = env.expand(&invocation.inputs)?;
            if inputs.is_empty() {
                debug!(patterns = ?invocation.inputs, "no scripts to bundle");
                return Ok(Vec::new());
            }

            let mut sources = Vec::with_capacity(inputs.len());
            for path in &inputs {
                let content = env.fs.read_to_string(path)?;
                let name = relative_to(env.root(), path)
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());
                sources.push(SourceFile { name, content });
            }

            let bundle = sources
                .iter()
                .map(|s| s.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");

            let target = invocation.output_path("bundle.js");
            let contents = if invocation.options.minify {
                run_shell(&self.minifier, env.root(), Some(bundle.as_bytes()))
                    .await?
                    .stdout
            } else if invocation.options.source_maps {
                let file = target
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let comment = SourceMap::for_concatenation(file, &sources)
                    .inline_comment()
                    .map_err(|e| TransformError::FileSystem(e.into()))?;
                format!("{bundle}\n{comment}\n").into_bytes()
            } else {
                bundle.into_bytes()
            };

            env.fs.write(&target, &contents)?;
            info!(files = inputs.len(), output = ?target, "bundled scripts");
            Ok(vec![target])
        })
    }
}
