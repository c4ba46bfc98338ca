// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};

pub use covreport::logging::{format_command, log_command, log_step};

/// Resolves `path` against `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn relative_paths_are_anchored() {
        let base = Path::new("/work/project");
        assert_eq!(
            resolve_path(base, Path::new("coverage.profdata")),
            PathBuf::from("/work/project/coverage.profdata")
        );
        assert_eq!(
            resolve_path(base, Path::new("/tmp/merged.profdata")),
            PathBuf::from("/tmp/merged.profdata")
        );
    }
}
