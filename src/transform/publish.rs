// src/transform/publish.rs

use std::path::PathBuf;

use tracing::{debug, info};

use super::kraken::relative_to_base;
use super::{Transform, TransformEnv, TransformFuture, TransformInvocation};
use crate::fs::walk::{literal_base, normalize_pattern};

/// Clears compressed sources out of the transient compression directory.
///
/// A source is removed only when its counterpart under `output_dir` exists
/// and is at least as new as the source, so images whose compression failed
/// are left in place for the next attempt. Returns the removed sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublishCompressed;

impl Transform for PublishCompressed {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let sources = env.expand(&invocation.inputs)?;
            let bases: Vec<PathBuf> = invocation
                .inputs
                .iter()
                .map(|p| env.root().join(literal_base(normalize_pattern(p))))
                .collect();

            let mut removed = Vec::new();
            for source in sources {
                let target = invocation.output_dir.join(relative_to_base(&bases, &source));
                if !env.fs.is_file(&target) {
                    debug!(path = ?source, "no compressed counterpart yet; keeping");
                    continue;
                }
                if env.fs.modified(&target)? < env.fs.modified(&source)? {
                    debug!(path = ?source, "compressed counterpart is stale; keeping");
                    continue;
                }

                env.fs.remove_file(&source)?;
                debug!(path = ?source, output = ?target, "published");
                removed.push(source);
            }

            info!(removed = removed.len(), "cleared compression directory");
            Ok(removed)
        })
    }
}
