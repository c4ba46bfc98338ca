// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use covreport::report::{
    exit_code, validate_ignore_regex, ReportInvocation, DEFAULT_IGNORE_REGEX, DEFAULT_LLVM_COV,
    DEFAULT_PROFDATA,
};

use crate::tasks::args::PipelineArgs;
use crate::tasks::util::{format_command, log_command, log_step, resolve_path};

/// Builds the instrumented tests and prints an `llvm-cov report` summary.
#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// llvm-cov executable
    #[arg(long, value_name = "PROGRAM", env = "LLVM_COV", default_value = DEFAULT_LLVM_COV)]
    pub llvm_cov: String,

    /// Merged profile data recorded by an earlier instrumented test run
    #[arg(
        long,
        value_name = "PATH",
        env = "COVREPORT_PROFDATA",
        default_value = DEFAULT_PROFDATA
    )]
    pub instr_profile: PathBuf,

    /// Source files matching this regex are left out of the summary
    #[arg(
        long,
        value_name = "REGEX",
        env = "COVREPORT_IGNORE_REGEX",
        default_value = DEFAULT_IGNORE_REGEX
    )]
    pub ignore_filename_regex: String,

    /// Print the llvm-cov command line instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Extra arguments appended to the llvm-cov command line
    #[arg(last = true, value_name = "LLVM_COV_ARGS")]
    pub extra: Vec<String>,
}

impl ReportCommand {
    /// Returns the exit code of llvm-cov.
    pub fn run(&self) -> Result<u8> {
        // llvm-cov owns the regex dialect; the local parse is only a pre-flight hint.
        if self.pipeline.preflight {
            validate_ignore_regex(&self.ignore_filename_regex)
                .context("pre-flight check failed")?;
        }

        let directory = self.pipeline.directory()?;
        let profile = resolve_path(&directory, &self.instr_profile);
        let artifacts = self.pipeline.collect(&directory, Some(&profile))?;

        let invocation = ReportInvocation::new(artifacts, profile)
            .with_program(&self.llvm_cov)
            .with_directory(&directory)
            .with_ignore_regex(&self.ignore_filename_regex)
            .with_extra_args(self.extra.clone());

        if self.dry_run {
            println!("{}", format_command(&invocation.command()));
            return Ok(0);
        }

        log_step("Running llvm-cov report");
        log_command(&invocation.command());
        let status = invocation
            .execute()
            .with_context(|| format!("failed to run {}", self.llvm_cov))?;
        if !status.success() {
            tracing::debug!(%status, "llvm-cov reported failure");
        }

        Ok(exit_code(status))
    }
}
