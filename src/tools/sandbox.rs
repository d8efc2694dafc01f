//! Path confinement to a base directory.
//!
//! Checks run on the resolved path, never on the raw string, so `..`
//! segments, absolute paths and symlinks that point outside the base are
//! all caught.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::tools::tool::ToolError;

/// Normalize a path by resolving `.` and `..` components lexically (no filesystem access).
pub(crate) fn normalize_lexical(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if components
                    .last()
                    .is_some_and(|c| matches!(c, Component::Normal(_)))
                {
                    components.pop();
                }
            }
            Component::CurDir => {}
            other => components.push(other),
        }
    }
    components.iter().collect()
}

/// Canonicalize through the nearest existing ancestor, re-appending the missing tail.
fn canonicalize_via_ancestors(path: &Path) -> PathBuf {
    let mut ancestor = path;
    let mut tail: Vec<&OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = ancestor.canonicalize() {
            return tail
                .into_iter()
                .rev()
                .fold(canonical, |acc, part| acc.join(part));
        }
        if let Some(name) = ancestor.file_name() {
            tail.push(name);
        }
        match ancestor.parent() {
            Some(parent) if parent != ancestor => ancestor = parent,
            _ => return path.to_path_buf(),
        }
    }
}

/// Canonical form of a base directory (lexical fallback when it does not exist).
pub fn canonical_base(base: &Path) -> PathBuf {
    base.canonicalize()
        .unwrap_or_else(|_| normalize_lexical(base))
}

/// Resolve `candidate` against `base` and require the result to stay inside `base`.
///
/// Absolute candidates are accepted only when they already point inside `base`.
pub fn resolve_confined(base: &Path, candidate: &str) -> Result<PathBuf, ToolError> {
    let base_canonical = canonical_base(base);
    let joined = base_canonical.join(candidate);
    let resolved = canonicalize_via_ancestors(&normalize_lexical(&joined));

    if !resolved.starts_with(&base_canonical) {
        return Err(ToolError::PathTraversal(format!(
            "{} resolves outside {}",
            candidate,
            base_canonical.display()
        )));
    }
    Ok(resolved)
}
