//! Path resolution for the per-team workspace sandbox.
//!
//! Every store operation goes through [`resolve`], which maps a team name and
//! a user-supplied relative path to an absolute location under the team's
//! root directory. Rejection happens before any filesystem access: traversal
//! segments, absolute prefixes, and empty segments never reach the store.

use std::path::{Path, PathBuf};

/// Error from resolving a user-supplied path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("absolute paths are not allowed: {0}")]
    Absolute(String),
    #[error("invalid path segment {segment:?} in {path:?}")]
    InvalidSegment { path: String, segment: String },
    #[error("path escapes the team root: {0}")]
    Escape(String),
}

/// Sanitize a team name into the directory key for its workspace root.
///
/// Deterministic: lowercase, keep `[a-z0-9-_]`, replace everything else
/// with `-`, so "Code Warriors" and "code warriors" share one root.
pub fn sanitize_team_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// The root directory for a team's workspace under the data root.
pub fn team_root(data_root: &Path, team_name: &str) -> PathBuf {
    data_root.join(sanitize_team_name(team_name))
}

/// Split a relative path into its segments, rejecting anything that could
/// address outside the team root.
pub fn validate_segments(relative_path: &str) -> Result<Vec<&str>, PathError> {
    if relative_path.is_empty() {
        return Err(PathError::Empty);
    }
    if relative_path.starts_with('/') || relative_path.starts_with('\\') {
        return Err(PathError::Absolute(relative_path.to_string()));
    }

    let segments: Vec<&str> = relative_path.split('/').collect();
    for segment in &segments {
        let trimmed = segment.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == ".." || trimmed.contains('\\') {
            return Err(PathError::InvalidSegment {
                path: relative_path.to_string(),
                segment: segment.to_string(),
            });
        }
    }
    Ok(segments)
}

/// Resolve a team name and relative path to an absolute path under the
/// team's root. The resolved path is verified to still have the team root
/// as a prefix; this is a second line of defense behind segment validation.
pub fn resolve(
    data_root: &Path,
    team_name: &str,
    relative_path: &str,
) -> Result<PathBuf, PathError> {
    let root = team_root(data_root, team_name);
    let segments = validate_segments(relative_path)?;

    let mut resolved = root.clone();
    for segment in segments {
        resolved.push(segment);
    }

    if !resolved.starts_with(&root) {
        return Err(PathError::Escape(relative_path.to_string()));
    }
    Ok(resolved)
}
