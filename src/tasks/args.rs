// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use covreport::driver::AmbientFlags;
use covreport::{ArtifactFilter, BuildOptions, MetadataSource, Preflight, DSYM_MARKER};

use crate::tasks::util::log_step;

/// Options shared by every command that collects test artifacts.
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Run cargo and resolve relative paths from this directory
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Path to the Cargo.toml of the project under test
    #[arg(long, value_name = "PATH", env = "COVREPORT_MANIFEST_PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Package(s) whose tests are built
    #[arg(short, long = "package", value_name = "SPEC")]
    pub packages: Vec<String>,

    /// Build the tests of every workspace member
    #[arg(long)]
    pub workspace: bool,

    /// Features to enable (comma separated)
    #[arg(long, value_delimiter = ',', value_name = "FEATURE")]
    pub features: Vec<String>,

    /// Enable every feature of the selected packages
    #[arg(long)]
    pub all_features: bool,

    /// Build the tests in release mode
    #[arg(long)]
    pub release: bool,

    /// Propagate --frozen to cargo
    #[arg(long)]
    pub frozen: bool,

    /// Propagate --locked to cargo
    #[arg(long)]
    pub locked: bool,

    /// Append `-C instrument-coverage` to RUSTFLAGS (or CARGO_ENCODED_RUSTFLAGS when set) for
    /// the build. Setting either variable replaces `build.rustflags` from .cargo/config.toml
    #[arg(long)]
    pub instrument: bool,

    /// Read cargo JSON messages from this file instead of building (`-` for stdin)
    #[arg(long, value_name = "FILE", env = "COVREPORT_METADATA")]
    pub metadata: Option<PathBuf>,

    /// Drop artifact paths containing this text
    #[arg(long, value_name = "TEXT", default_value = DSYM_MARKER)]
    pub exclude_marker: String,

    /// Fail before building when the profile data or instrumentation flag is missing, or the
    /// ignore regex does not parse
    #[arg(long)]
    pub preflight: bool,
}

impl PipelineArgs {
    pub fn directory(&self) -> Result<PathBuf> {
        match &self.directory {
            Some(directory) => Ok(directory.clone()),
            None => std::env::current_dir().context("failed to resolve the current directory"),
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            manifest_path: self.manifest_path.clone(),
            packages: self.packages.clone(),
            workspace: self.workspace,
            features: self.features.clone(),
            all_features: self.all_features,
            release: self.release,
            frozen: self.frozen,
            locked: self.locked,
            instrument: self.instrument,
        }
    }

    pub fn source(&self) -> MetadataSource {
        match &self.metadata {
            Some(path) => MetadataSource::from_path(path),
            None => MetadataSource::Build(self.build_options()),
        }
    }

    pub fn filter(&self) -> ArtifactFilter {
        ArtifactFilter::new(self.exclude_marker.as_str())
    }

    pub fn preflight(&self) -> Preflight {
        Preflight {
            enabled: self.preflight,
        }
    }

    /// Runs the pre-flight checks, then the build and the artifact filter.
    pub fn collect(&self, directory: &Path, profile: Option<&Path>) -> Result<Vec<String>> {
        let source = self.source();
        self.preflight()
            .check(&source, profile, &AmbientFlags::from_env())
            .context("pre-flight check failed")?;

        let title = match &source {
            MetadataSource::Build(_) => "Building instrumented test binaries".to_string(),
            MetadataSource::File(path) => format!("Reading build metadata from {}", path.display()),
            MetadataSource::Stdin => "Reading build metadata from stdin".to_string(),
        };
        log_step(&title);

        let artifacts = source
            .collect(directory, &self.filter())
            .context("failed to collect test artifacts")?;

        if artifacts.is_empty() {
            tracing::warn!("no test artifacts survived filtering");
        } else {
            tracing::info!(count = artifacts.len(), "collected test artifacts");
        }

        Ok(artifacts)
    }
}
