// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Assembles and executes the `llvm-cov report` command line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use regex::Regex;

use crate::error::{CoverageError, Result};

pub const DEFAULT_LLVM_COV: &str = "llvm-cov";
pub const REPORT_SUBCOMMAND: &str = "report";
pub const DEFAULT_PROFDATA: &str = "coverage.profdata";

/// Keeps sources of registry dependencies out of the summary.
pub const DEFAULT_IGNORE_REGEX: &str = "/.cargo/registry";

const OBJECT_FLAG: &str = "-object";
const SUMMARY_ONLY_FLAG: &str = "--summary-only";

/// A fully described `llvm-cov report` run.
#[derive(Debug, Clone)]
pub struct ReportInvocation {
    pub program: OsString,
    pub directory: Option<PathBuf>,
    pub objects: Vec<String>,
    pub profile: PathBuf,
    pub ignore_regex: String,
    /// Appended after the fixed flags.
    pub extra_args: Vec<String>,
}

impl ReportInvocation {
    pub fn new(objects: Vec<String>, profile: impl Into<PathBuf>) -> Self {
        Self {
            program: OsString::from(DEFAULT_LLVM_COV),
            directory: None,
            objects,
            profile: profile.into(),
            ignore_regex: DEFAULT_IGNORE_REGEX.to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_directory(mut self, directory: &Path) -> Self {
        self.directory = Some(directory.to_path_buf());
        self
    }

    pub fn with_ignore_regex(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_regex = pattern.into();
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Parses the ignore pattern with the `regex` crate. LLVM's dialect is
    /// not the same, so this is an opt-in early check, not the final word.
    pub fn validate(&self) -> Result<()> {
        validate_ignore_regex(&self.ignore_regex)
    }

    /// The argument vector, sub-command first.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(2 * self.objects.len() + 4 + self.extra_args.len());
        args.push(OsString::from(REPORT_SUBCOMMAND));
        for object in &self.objects {
            args.push(OsString::from(OBJECT_FLAG));
            args.push(OsString::from(object));
        }

        let mut profile = OsString::from("--instr-profile=");
        profile.push(&self.profile);
        args.push(profile);
        args.push(OsString::from(SUMMARY_ONLY_FLAG));
        args.push(OsString::from(format!(
            "--ignore-filename-regex={}",
            self.ignore_regex
        )));

        args.extend(self.extra_args.iter().map(OsString::from));
        args
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(directory) = &self.directory {
            command.current_dir(directory);
        }
        command.args(self.args());
        command
    }

    /// Runs the tool with inherited stdio and returns its exit status.
    pub fn execute(&self) -> Result<ExitStatus> {
        self.command()
            .status()
            .map_err(|source| CoverageError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })
    }
}

pub fn validate_ignore_regex(pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|source| CoverageError::InvalidIgnoreRegex {
            pattern: pattern.to_string(),
            source,
        })
}

/// Fails when the profile data is not a regular file.
pub fn check_profile(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CoverageError::MissingProfile {
            path: path.to_path_buf(),
        })
    }
}

/// Maps a child status onto this process's exit code. A child killed by a
/// signal has no code and maps to 1.
pub fn exit_code(status: ExitStatus) -> u8 {
    match status.code() {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(invocation: &ReportInvocation) -> Vec<String> {
        invocation
            .args()
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn objects_are_interleaved_with_flags() {
        let invocation = ReportInvocation::new(
            vec!["a.bin".to_string(), "d.bin".to_string()],
            "json5format.profdata",
        );
        assert_eq!(
            strings(&invocation),
            vec![
                "report",
                "-object",
                "a.bin",
                "-object",
                "d.bin",
                "--instr-profile=json5format.profdata",
                "--summary-only",
                "--ignore-filename-regex=/.cargo/registry",
            ]
        );
    }

    #[test]
    fn empty_object_list_is_still_a_valid_command() {
        let invocation = ReportInvocation::new(Vec::new(), DEFAULT_PROFDATA);
        assert_eq!(
            strings(&invocation),
            vec![
                "report",
                "--instr-profile=coverage.profdata",
                "--summary-only",
                "--ignore-filename-regex=/.cargo/registry",
            ]
        );
    }

    #[test]
    fn extra_args_follow_fixed_flags() {
        let invocation = ReportInvocation::new(vec!["t".to_string()], "p.profdata")
            .with_ignore_regex("(/rustc/|/.cargo/registry)")
            .with_extra_args(vec!["--use-color".to_string()]);
        let args = strings(&invocation);
        assert_eq!(args.last().map(String::as_str), Some("--use-color"));
        assert!(args.contains(&"--ignore-filename-regex=(/rustc/|/.cargo/registry)".to_string()));
    }

    #[test]
    fn arguments_are_stable_across_calls() {
        let invocation = ReportInvocation::new(
            vec!["x".to_string(), "y".to_string()],
            "p.profdata",
        );
        assert_eq!(invocation.args(), invocation.args());
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let invocation = ReportInvocation::new(Vec::new(), "p.profdata").with_ignore_regex("(");
        assert!(matches!(
            invocation.validate(),
            Err(CoverageError::InvalidIgnoreRegex { .. })
        ));
        assert!(validate_ignore_regex(DEFAULT_IGNORE_REGEX).is_ok());
    }

    #[test]
    fn missing_profile_is_reported() {
        let err = check_profile(Path::new("definitely/not/here.profdata")).unwrap_err();
        assert!(matches!(err, CoverageError::MissingProfile { .. }));
    }
}
