// src/fs/walk.rs

//! Glob expansion over a [`FileSystem`].
//!
//! Relative patterns are evaluated against a project root with forward
//! slashes; absolute patterns are matched against the full path. `*` never
//! crosses a directory separator (`**` does).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use super::FileSystem;

/// Whether `pattern` contains glob syntax (as opposed to a literal path).
pub fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(|c| matches!(c, '*' | '?' | '[' | '{'))
}

/// Strip a leading `./` so config paths like `./source/x` match relative
/// watcher paths like `source/x`.
pub fn normalize_pattern(pattern: &str) -> &str {
    let mut p = pattern;
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p
}

pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(normalize_pattern(pattern))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(normalize_pattern(pat))
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Convert `path` into a forward-slash string relative to `root`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Collect all files under `root` whose relative path satisfies `matches`.
///
/// A missing `root` yields an empty list. The result is sorted.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matches: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Some(rel) = relative_to(root, &path) {
                    if matches(&rel) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Expand an ordered list of input patterns into concrete files.
///
/// Order follows the pattern list (files matched by one glob are sorted);
/// a file matched by several patterns is kept at its first position.
/// Literal paths that do not exist are skipped. Absolute patterns may point
/// outside `root`.
pub fn expand_inputs(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();

    for pattern in patterns {
        let normalized = normalize_pattern(pattern);

        let matched = if has_glob_meta(normalized) {
            let matcher = compile_glob(normalized)?;
            let absolute = Path::new(normalized).is_absolute();
            let base = literal_base(normalized);
            collect_matching_files(fs, &root.join(base), |_| true)?
                .into_iter()
                .filter(|p| {
                    let key = if absolute {
                        Some(p.to_string_lossy().replace('\\', "/"))
                    } else {
                        relative_to(root, p)
                    };
                    key.is_some_and(|k| matcher.is_match(k.as_str()))
                })
                .collect::<Vec<_>>()
        } else {
            let path = root.join(normalized);
            if fs.is_file(&path) {
                vec![path]
            } else {
                Vec::new()
            }
        };

        for path in matched {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }

    Ok(out)
}

/// Leading directory components of a glob that contain no glob syntax.
pub(crate) fn literal_base(pattern: &str) -> PathBuf {
    let (mut base, rest) = match pattern.strip_prefix('/') {
        Some(rest) => (PathBuf::from("/"), rest),
        None => (PathBuf::new(), pattern),
    };
    let mut parts = rest.split('/').peekable();
    while let Some(part) = parts.next() {
        // The last component is a file pattern, never a directory to descend.
        if parts.peek().is_none() || has_glob_meta(part) {
            break;
        }
        base.push(part);
    }
    base
}
