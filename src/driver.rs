// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Runs `cargo test --no-run --message-format=json` and streams its stdout
//! into an [`ArtifactCollector`].

use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::artifacts::{ArtifactCollector, ArtifactFilter};
use crate::error::{CoverageError, Result};
use crate::logging::log_command;

/// Code-generation flag that makes rustc emit coverage counters.
pub const INSTRUMENT_COVERAGE_FLAG: &str = "-C instrument-coverage";

/// Selection and profile flags forwarded to `cargo test`.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub manifest_path: Option<PathBuf>,
    pub packages: Vec<String>,
    pub workspace: bool,
    pub features: Vec<String>,
    pub all_features: bool,
    pub release: bool,
    pub frozen: bool,
    pub locked: bool,
    /// Append [`INSTRUMENT_COVERAGE_FLAG`] to the environment flags for the build.
    pub instrument: bool,
}

impl BuildOptions {
    /// Arguments for the cargo invocation, in the order they are passed.
    pub fn cargo_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["test", "--no-run", "--message-format=json"]
            .into_iter()
            .map(OsString::from)
            .collect();

        if let Some(manifest) = &self.manifest_path {
            args.push(OsString::from("--manifest-path"));
            args.push(manifest.as_os_str().to_os_string());
        }
        if self.workspace {
            args.push(OsString::from("--workspace"));
        }
        for package in &self.packages {
            args.push(OsString::from("--package"));
            args.push(OsString::from(package));
        }
        if self.all_features {
            args.push(OsString::from("--all-features"));
        } else if !self.features.is_empty() {
            args.push(OsString::from("--features"));
            args.push(OsString::from(self.features.join(",")));
        }
        if self.release {
            args.push(OsString::from("--release"));
        }
        if self.frozen {
            args.push(OsString::from("--frozen"));
        }
        if self.locked {
            args.push(OsString::from("--locked"));
        }
        args
    }

    /// The variable and value to override so the build is instrumented, or
    /// `None` when the environment already takes care of it.
    ///
    /// Cargo reads `CARGO_ENCODED_RUSTFLAGS` in preference to `RUSTFLAGS`, so
    /// the flag goes into whichever one cargo will use. Either variable also
    /// replaces `build.rustflags` from `.cargo/config.toml`.
    pub fn rustflags(&self, ambient: &AmbientFlags) -> Option<(&'static str, OsString)> {
        if !self.instrument || ambient.instruments_coverage() {
            return None;
        }

        let (key, existing, separator, flag) = match &ambient.encoded {
            Some(encoded) => (
                ENCODED_RUSTFLAGS_VAR,
                Some(encoded.as_os_str()),
                ENCODED_SEPARATOR,
                ENCODED_INSTRUMENT_COVERAGE,
            ),
            None => (
                RUSTFLAGS_VAR,
                ambient.rustflags.as_deref(),
                " ",
                INSTRUMENT_COVERAGE_FLAG,
            ),
        };

        let mut value = OsString::new();
        if let Some(existing) = existing.filter(|existing| !existing.is_empty()) {
            value.push(existing);
            value.push(separator);
        }
        value.push(flag);
        Some((key, value))
    }

    /// Whether the build will be instrumented given the ambient flags.
    pub fn is_instrumented(&self, ambient: &AmbientFlags) -> bool {
        self.instrument || ambient.instruments_coverage()
    }
}

const RUSTFLAGS_VAR: &str = "RUSTFLAGS";
const ENCODED_RUSTFLAGS_VAR: &str = "CARGO_ENCODED_RUSTFLAGS";
const ENCODED_SEPARATOR: &str = "\x1f";
const ENCODED_INSTRUMENT_COVERAGE: &str = "-C\x1finstrument-coverage";

/// Compiler flags cargo picks up from the environment.
#[derive(Debug, Clone, Default)]
pub struct AmbientFlags {
    pub rustflags: Option<OsString>,
    /// `CARGO_ENCODED_RUSTFLAGS`, separated by `0x1f`.
    pub encoded: Option<OsString>,
}

impl AmbientFlags {
    pub fn from_env() -> Self {
        Self {
            rustflags: std::env::var_os(RUSTFLAGS_VAR),
            encoded: std::env::var_os(ENCODED_RUSTFLAGS_VAR),
        }
    }

    /// Only the variable cargo actually reads counts.
    pub fn instruments_coverage(&self) -> bool {
        match &self.encoded {
            Some(encoded) => has_instrument_coverage(encoded),
            None => self
                .rustflags
                .as_deref()
                .is_some_and(has_instrument_coverage),
        }
    }
}

/// True when a flag list enables coverage instrumentation.
pub fn has_instrument_coverage(flags: &OsStr) -> bool {
    flags.to_string_lossy().contains("instrument-coverage")
}

/// Spawns the instrumented test build and collects the test artifacts.
pub struct BuildDriver {
    program: OsString,
    directory: Option<PathBuf>,
    options: BuildOptions,
}

impl BuildDriver {
    pub fn new(options: BuildOptions) -> Self {
        let program = std::env::var_os("CARGO").unwrap_or_else(|| OsString::from("cargo"));
        Self {
            program,
            directory: None,
            options,
        }
    }

    /// Overrides the cargo executable.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_directory(mut self, directory: &Path) -> Self {
        self.directory = Some(directory.to_path_buf());
        self
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(directory) = &self.directory {
            command.current_dir(directory);
        }
        command.args(self.options.cargo_args());
        if let Some((key, value)) = self.options.rustflags(&AmbientFlags::from_env()) {
            command.env(key, value);
        }
        command
    }

    /// Runs the build, parsing stdout as it arrives.
    ///
    /// A malformed line kills the build. A failing build discards whatever
    /// was collected.
    pub fn run(&self, filter: &ArtifactFilter) -> Result<Vec<String>> {
        let mut command = self.command();
        command.stdout(Stdio::piped());
        command.stderr(Stdio::inherit());
        log_command(&command);

        let program = self.program.to_string_lossy().into_owned();
        let mut child = command.spawn().map_err(|source| CoverageError::Spawn {
            program: program.clone(),
            source,
        })?;

        let mut collector = ArtifactCollector::new(filter.clone());
        let streamed = match child.stdout.take() {
            Some(stdout) => stream_into(BufReader::new(stdout), &mut collector),
            None => Ok(()),
        };

        if let Err(err) = streamed {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        let status = child
            .wait()
            .map_err(|source| CoverageError::Wait { program, source })?;
        if !status.success() {
            return Err(CoverageError::BuildFailed { status });
        }

        Ok(collector.finish())
    }
}

fn stream_into<R: BufRead>(reader: R, collector: &mut ArtifactCollector) -> Result<()> {
    for line in reader.lines() {
        let line = line.map_err(CoverageError::MetadataIo)?;
        collector.push_line(&line)?;
    }
    Ok(())
}
