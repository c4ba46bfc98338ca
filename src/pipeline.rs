// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use crate::artifacts::{extract_artifacts, ArtifactFilter};
use crate::driver::{AmbientFlags, BuildDriver, BuildOptions};
use crate::error::{CoverageError, Result};
use crate::report::check_profile;

/// Where the build metadata stream comes from.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    /// Run the instrumented test build.
    Build(BuildOptions),
    /// Replay a stream saved from an earlier `cargo test --message-format=json`.
    File(PathBuf),
    Stdin,
}

impl MetadataSource {
    /// `-` selects stdin.
    pub fn from_path(path: &Path) -> Self {
        if path == Path::new("-") {
            MetadataSource::Stdin
        } else {
            MetadataSource::File(path.to_path_buf())
        }
    }

    /// Runs stages one and two and returns the filtered artifacts.
    pub fn collect(&self, directory: &Path, filter: &ArtifactFilter) -> Result<Vec<String>> {
        match self {
            MetadataSource::Build(options) => BuildDriver::new(options.clone())
                .with_directory(directory)
                .run(filter),
            MetadataSource::File(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    directory.join(path)
                };
                let file = File::open(&path).map_err(CoverageError::MetadataIo)?;
                extract_artifacts(BufReader::new(file), filter)
            }
            MetadataSource::Stdin => extract_artifacts(io::stdin().lock(), filter),
        }
    }

    fn build_options(&self) -> Option<&BuildOptions> {
        match self {
            MetadataSource::Build(options) => Some(options),
            _ => None,
        }
    }
}

/// Checks run before the build when early failures are requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preflight {
    pub enabled: bool,
}

impl Preflight {
    /// Verifies the profile data and the instrumentation flag. Without
    /// `enabled`, a missing instrumentation flag is only logged.
    pub fn check(
        &self,
        source: &MetadataSource,
        profile: Option<&Path>,
        ambient: &AmbientFlags,
    ) -> Result<()> {
        if let Some(options) = source.build_options() {
            if !options.is_instrumented(ambient) {
                if self.enabled {
                    return Err(CoverageError::NotInstrumented);
                }
                tracing::warn!(
                    "neither RUSTFLAGS nor CARGO_ENCODED_RUSTFLAGS contains -C instrument-coverage; the test binaries may carry no coverage counters"
                );
            }
        }

        if self.enabled {
            if let Some(profile) = profile {
                check_profile(profile)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        assert!(matches!(
            MetadataSource::from_path(Path::new("-")),
            MetadataSource::Stdin
        ));
        assert!(matches!(
            MetadataSource::from_path(Path::new("messages.jsonl")),
            MetadataSource::File(_)
        ));
    }

    #[test]
    fn disabled_preflight_never_fails() {
        let source = MetadataSource::Build(BuildOptions::default());
        let preflight = Preflight::default();
        assert!(preflight
            .check(&source, Some(Path::new("missing.profdata")), &AmbientFlags::default())
            .is_ok());
    }

    #[test]
    fn enabled_preflight_requires_instrumentation() {
        let source = MetadataSource::Build(BuildOptions::default());
        let preflight = Preflight { enabled: true };
        let err = preflight.check(&source, None, &AmbientFlags::default()).unwrap_err();
        assert!(matches!(err, CoverageError::NotInstrumented));

        let injected = MetadataSource::Build(BuildOptions {
            instrument: true,
            ..BuildOptions::default()
        });
        assert!(preflight.check(&injected, None, &AmbientFlags::default()).is_ok());
    }

    #[test]
    fn replayed_metadata_skips_the_instrumentation_check() {
        let source = MetadataSource::File(PathBuf::from("messages.jsonl"));
        let preflight = Preflight { enabled: true };
        assert!(preflight.check(&source, None, &AmbientFlags::default()).is_ok());
    }

    #[test]
    fn enabled_preflight_requires_profile() {
        let source = MetadataSource::Build(BuildOptions::default());
        let preflight = Preflight { enabled: true };
        let err = preflight
            .check(
                &source,
                Some(Path::new("missing.profdata")),
                &AmbientFlags {
                    rustflags: Some("-C instrument-coverage".into()),
                    encoded: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoverageError::MissingProfile { .. }));
    }
}
