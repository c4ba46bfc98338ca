// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Selects the test binaries `llvm-cov` should load as objects.
//!
//! Records are consumed one line at a time so that a malformed line stops the
//! pipeline as soon as it is seen. Surviving paths keep the order in which
//! cargo first reported them.

use std::collections::HashSet;
use std::io::BufRead;

use crate::error::{CoverageError, Result};
use crate::metadata::{parse_record, BuildRecord};

/// Directory marker of macOS debug-symbol bundles. Those paths are
/// directories, not loadable objects.
pub const DSYM_MARKER: &str = "dSYM";

/// Substring-based exclusion of artifact paths.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    marker: String,
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        Self::new(DSYM_MARKER)
    }
}

impl ArtifactFilter {
    /// An empty marker disables exclusion.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        !self.marker.is_empty() && path.contains(&self.marker)
    }
}

/// Accumulates artifact paths from a metadata stream.
#[derive(Debug, Default)]
pub struct ArtifactCollector {
    filter: ArtifactFilter,
    artifacts: Vec<String>,
    seen: HashSet<String>,
    lines: usize,
    test_records: usize,
}

impl ArtifactCollector {
    pub fn new(filter: ArtifactFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Parses and applies one line of the stream. Blank lines are ignored;
    /// anything else that is not a JSON record is fatal.
    pub fn push_line(&mut self, text: &str) -> Result<()> {
        self.lines += 1;
        if text.trim().is_empty() {
            return Ok(());
        }
        let record = parse_record(text, self.lines)?;
        self.push_record(record);
        Ok(())
    }

    pub fn push_record(&mut self, record: BuildRecord) {
        if !record.is_test() {
            tracing::trace!(
                reason = %record.reason,
                name = record.label(),
                "skipping non-test record"
            );
            return;
        }
        self.test_records += 1;
        tracing::debug!(
            name = record.label(),
            kind = %record.kinds(),
            executable = record.executable.as_deref().unwrap_or("-"),
            files = record.filenames.len(),
            "test artifact record"
        );

        for path in record.filenames {
            if self.filter.is_excluded(&path) {
                tracing::debug!(%path, marker = self.filter.marker(), "excluding artifact");
                continue;
            }
            if !self.seen.insert(path.clone()) {
                tracing::trace!(%path, "artifact already listed");
                continue;
            }
            self.artifacts.push(path);
        }
    }

    pub fn finish(self) -> Vec<String> {
        tracing::debug!(
            lines = self.lines,
            test_records = self.test_records,
            artifacts = self.artifacts.len(),
            "metadata stream consumed"
        );
        self.artifacts
    }
}

/// Reads a complete metadata stream and returns the surviving artifacts.
pub fn extract_artifacts<R: BufRead>(reader: R, filter: &ArtifactFilter) -> Result<Vec<String>> {
    let mut collector = ArtifactCollector::new(filter.clone());
    for line in reader.lines() {
        let line = line.map_err(CoverageError::MetadataIo)?;
        collector.push_line(&line)?;
    }
    Ok(collector.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(test: bool, paths: &[&str]) -> String {
        let filenames: Vec<String> = paths.iter().map(|p| format!("\"{p}\"")).collect();
        format!(
            r#"{{"reason":"compiler-artifact","profile":{{"test":{test}}},"filenames":[{}]}}"#,
            filenames.join(",")
        )
    }

    #[test]
    fn keeps_test_records_and_drops_dsym() {
        let stream = [
            record(true, &["a.bin"]),
            record(false, &["b.bin"]),
            record(true, &["/cache/dSYM/c.bin", "d.bin"]),
        ]
        .join("\n");

        let artifacts = extract_artifacts(stream.as_bytes(), &ArtifactFilter::default()).unwrap();
        assert_eq!(artifacts, vec!["a.bin", "d.bin"]);
    }

    #[test]
    fn duplicate_paths_keep_first_position() {
        let stream = [
            record(true, &["x", "y"]),
            record(true, &["y", "z", "x"]),
        ]
        .join("\n");

        let artifacts = extract_artifacts(stream.as_bytes(), &ArtifactFilter::default()).unwrap();
        assert_eq!(artifacts, vec!["x", "y", "z"]);
    }

    #[test]
    fn empty_marker_excludes_nothing() {
        let filter = ArtifactFilter::new("");
        assert!(!filter.is_excluded("target/debug/deps/demo.dSYM"));

        let default = ArtifactFilter::default();
        assert!(default.is_excluded("target/debug/deps/demo-1a2b.dSYM"));
        assert!(!default.is_excluded("target/debug/deps/demo-1a2b"));
    }

    #[test]
    fn malformed_line_stops_collection() {
        let stream = format!("{}\nnot json\n{}", record(true, &["a"]), record(true, &["b"]));
        let err = extract_artifacts(stream.as_bytes(), &ArtifactFilter::default()).unwrap_err();
        assert!(matches!(err, CoverageError::MalformedMetadata { line: 2, .. }));
    }

    #[test]
    fn array_lines_never_contribute_objects() {
        let stream = "[]\n[\"compiler-artifact\", {\"test\": true}, null, [\"x.bin\"]]\n";
        let err = extract_artifacts(stream.as_bytes(), &ArtifactFilter::default()).unwrap_err();
        assert!(matches!(err, CoverageError::MalformedMetadata { line: 1, .. }));
    }

    #[test]
    fn blank_lines_count_toward_position() {
        let mut collector = ArtifactCollector::default();
        collector.push_line("").unwrap();
        collector.push_line(&record(true, &["a"])).unwrap();
        let err = collector.push_line("{").unwrap_err();
        assert!(matches!(err, CoverageError::MalformedMetadata { line: 3, .. }));
    }
}
