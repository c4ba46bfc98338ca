// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cargo's `--message-format=json` records, reduced to the fields the
//! extractor needs.
//!
//! Every line cargo prints on stdout is one self-describing object. Only
//! `compiler-artifact` messages carry a `profile`, and only those compiled
//! with the test profile name binaries worth handing to `llvm-cov`.

use serde::de::Error as _;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CoverageError, Result};

/// One line of cargo's JSON message stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildRecord {
    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub profile: Option<ArtifactProfile>,

    #[serde(default)]
    pub target: Option<TargetInfo>,

    /// Output files in the order cargo reported them.
    #[serde(default)]
    pub filenames: Vec<String>,

    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtifactProfile {
    #[serde(default)]
    pub test: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: Vec<String>,
}

impl BuildRecord {
    /// True when the record describes an artifact built with the test profile.
    pub fn is_test(&self) -> bool {
        self.profile.as_ref().is_some_and(|profile| profile.test)
    }

    /// Target kinds (`lib`, `test`, `bin`, ...) joined for diagnostics.
    pub fn kinds(&self) -> String {
        self.target
            .as_ref()
            .map(|target| target.kind.join(","))
            .unwrap_or_default()
    }

    /// Target name for diagnostics, or the message reason when absent.
    pub fn label(&self) -> &str {
        match &self.target {
            Some(target) if !target.name.is_empty() => &target.name,
            _ => &self.reason,
        }
    }
}

/// Parses a single metadata line. `line` is the 1-based position used in
/// the error.
///
/// Cargo only ever prints objects. Anything else is rejected up front, since
/// the derived deserializer would otherwise read an array positionally.
pub fn parse_record(text: &str, line: usize) -> Result<BuildRecord> {
    let malformed = |source| CoverageError::MalformedMetadata { line, source };

    let value: Value = serde_json::from_str(text).map_err(malformed)?;
    if !value.is_object() {
        return Err(malformed(serde_json::Error::custom(
            "expected a JSON object per line",
        )));
    }
    serde_json::from_value(value).map_err(malformed)
}
