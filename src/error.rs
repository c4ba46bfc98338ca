// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors raised by the coverage pipeline before the report tool takes over.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for {program}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("test build failed with status {status}")]
    BuildFailed { status: ExitStatus },

    #[error("malformed build metadata on line {line}")]
    MalformedMetadata {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read build metadata")]
    MetadataIo(#[source] io::Error),

    #[error("invalid ignore-filename regex '{pattern}'")]
    InvalidIgnoreRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("profile data {} does not exist or is not a file", path.display())]
    MissingProfile { path: PathBuf },

    #[error(
        "neither RUSTFLAGS nor CARGO_ENCODED_RUSTFLAGS enables -C instrument-coverage; pass --instrument or export it"
    )]
    NotInstrumented,
}

pub type Result<T, E = CoverageError> = std::result::Result<T, E>;
