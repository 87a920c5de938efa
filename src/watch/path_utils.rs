// src/watch/path_utils.rs

use std::path::Path;

/// Convert an event path into a forward-slash string relative to `root`.
///
/// Falls back to comparing canonicalized paths, since some platforms report
/// events under a different absolute prefix (macOS `/private/var/...`). A
/// removed file can no longer be canonicalized, so its parent is used then.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}
