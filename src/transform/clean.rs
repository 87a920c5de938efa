// src/transform/clean.rs

use tracing::{debug, info};

use super::{Transform, TransformEnv, TransformError, TransformFuture, TransformInvocation};

/// Deletes every file matched by the invocation inputs, except the ones named
/// in `keep`.
///
/// A build's own output is kept so that it is only ever replaced by a
/// successful build. Returns the removed paths. Nothing to delete is not an
/// error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clean;

impl Transform for Clean {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let targets: Vec<_> = env
                .expand(&invocation.inputs)?
                .into_iter()
                .filter(|path| !invocation.is_kept(path))
                .collect();
            if targets.is_empty() {
                debug!(patterns = ?invocation.inputs, "nothing to clean");
                return Ok(Vec::new());
            }

            for path in &targets {
                env.fs.remove_file(path)?;
                debug!(path = ?path, "removed");
            }
            info!(removed = targets.len(), "cleaned build output");
            Ok(targets)
        })
    }
}
