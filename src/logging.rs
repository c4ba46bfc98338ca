// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::ffi::OsStr;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::EnvFilter;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over the
/// verbosity derived from the command line.
pub fn init(verbose: u8, quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Prints a section header to stderr; stdout belongs to the report.
pub fn log_step(title: &str) {
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    eprintln!("\n=== {} ===", title);
}

/// Echoes a command line before it runs.
pub fn log_command(command: &Command) {
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    eprintln!("$ {}", format_command(command));
}

/// Formats a command with its arguments for diagnostic output.
pub fn format_command(command: &Command) -> String {
    let mut parts = Vec::new();
    parts.push(quote(command.get_program()));
    for arg in command.get_args() {
        parts.push(quote(arg));
    }
    parts.join(" ")
}

fn quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    if !text.is_empty() && !text.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_program_and_args() {
        let mut command = Command::new("llvm-cov");
        command.args(["report", "-object", "target/debug/deps/demo-1a2b"]);
        assert_eq!(
            format_command(&command),
            "llvm-cov report -object target/debug/deps/demo-1a2b"
        );
    }

    #[test]
    fn quotes_arguments_with_spaces() {
        let mut command = Command::new("llvm-cov");
        command.args(["-object", "my dir/demo", ""]);
        assert_eq!(format_command(&command), "llvm-cov -object 'my dir/demo' ''");
    }
}
