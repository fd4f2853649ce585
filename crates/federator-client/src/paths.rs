//! Destination-path validation for the file-exchange job (§4.7). An empty
//! `destination_path`, or one that escapes the configured root via `..` traversal, is a
//! fatal configuration error raised before any streaming begins.

use std::path::{Path, PathBuf};

use federator_common::FederatorError;

/// Resolves `destination_path` against `root`, rejecting an empty path or any path whose
/// components would climb out of `root` (a literal `..` segment, checked lexically since
/// the destination file may not exist yet for `canonicalize` to resolve).
pub fn validate_path(root: &Path, destination_path: &str) -> Result<PathBuf, FederatorError> {
    if destination_path.trim().is_empty() {
        return Err(FederatorError::Configuration(
            "destination_path must not be empty".to_string(),
        ));
    }

    let candidate = Path::new(destination_path);
    if candidate.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(FederatorError::Configuration(format!(
            "destination_path '{destination_path}' must not contain '..' traversal"
        )));
    }

    Ok(root.join(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(validate_path(Path::new("/data"), "").is_err());
        assert!(validate_path(Path::new("/data"), "   ").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_path(Path::new("/data"), "../etc/passwd").is_err());
        assert!(validate_path(Path::new("/data"), "sub/../../escape").is_err());
    }

    #[test]
    fn resolves_within_root() {
        let resolved = validate_path(Path::new("/data"), "sub/file.bin").unwrap();
        assert_eq!(resolved, Path::new("/data/sub/file.bin"));
    }
}
