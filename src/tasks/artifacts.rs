// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;

use crate::tasks::args::PipelineArgs;

/// Builds the tests and prints the artifacts `report` would pass to llvm-cov.
#[derive(Args, Debug)]
pub struct ArtifactsCommand {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Separate paths with NUL instead of newlines
    #[arg(short = 'z', long)]
    pub null: bool,
}

impl ArtifactsCommand {
    pub fn run(&self) -> Result<u8> {
        let directory = self.pipeline.directory()?;
        let artifacts = self.pipeline.collect(&directory, None)?;

        let terminator = if self.null { '\0' } else { '\n' };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for artifact in &artifacts {
            write!(out, "{artifact}{terminator}").context("failed to write artifact list")?;
        }
        out.flush().context("failed to write artifact list")?;

        Ok(0)
    }
}
