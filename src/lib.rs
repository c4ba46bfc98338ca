// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coverage summaries for the test suite of a cargo project.
//!
//! The pipeline has three stages: build the test binaries with
//! `cargo test --no-run --message-format=json`, pick the test artifacts out of
//! cargo's JSON messages, and hand them to `llvm-cov report` together with a
//! previously merged `.profdata` file.

pub mod artifacts;
pub mod driver;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod report;

pub use artifacts::{extract_artifacts, ArtifactCollector, ArtifactFilter, DSYM_MARKER};
pub use driver::{AmbientFlags, BuildDriver, BuildOptions};
pub use error::CoverageError;
pub use metadata::BuildRecord;
pub use pipeline::{MetadataSource, Preflight};
pub use report::ReportInvocation;
