//! Blocking subprocess execution for a single job's command line.
//!
//! `run_command` is a plain blocking call: the worker pool already
//! supplies the concurrency by running one of these per worker thread,
//! and it must release its own critical section for the duration of the
//! call rather than hand off to yet another thread.

use std::io::Write;
use std::process::Command;

/// Result of running a job's command to completion.
pub struct CommandResult {
    /// Process exit code, or a synthesized nonzero code if the process was
    /// killed by a signal.
    pub code: i32,
    /// Combined stdout+stderr.
    pub output: Vec<u8>,
    /// True if the process was killed by SIGINT specifically -- lets the
    /// caller distinguish a deliberate abort from an ordinary failure.
    pub interrupted: bool,
}

/// Runs `cmdline` through a shell, capturing combined output. `filter` is
/// an opaque token forwarded to... nothing yet -- this crate has no output
/// filters of its own, but keeps the parameter so a caller wiring one in
/// later doesn't need to touch the call sites.
pub fn run_command(cmdline: &str, _filter: Option<&str>) -> anyhow::Result<CommandResult> {
    let output = shell_command(cmdline).output()?;

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);

    let (code, interrupted) = exit_info(&output.status, &mut combined);
    Ok(CommandResult {
        code,
        output: combined,
        interrupted,
    })
}

#[cfg(unix)]
fn shell_command(cmdline: &str) -> Command {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg(cmdline);
    cmd
}

#[cfg(windows)]
fn shell_command(cmdline: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(cmdline);
    cmd
}

#[cfg(unix)]
fn exit_info(status: &std::process::ExitStatus, output: &mut Vec<u8>) -> (i32, bool) {
    use std::os::unix::process::ExitStatusExt;
    if let Some(sig) = status.signal() {
        let interrupted = sig == libc::SIGINT;
        if interrupted {
            let _ = write!(output, "interrupted");
        } else {
            let _ = write!(output, "signal {}", sig);
        }
        return (128 + sig, interrupted);
    }
    (status.code().unwrap_or(1), false)
}

#[cfg(not(unix))]
fn exit_info(status: &std::process::ExitStatus, _output: &mut Vec<u8>) -> (i32, bool) {
    (status.code().unwrap_or(1), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_success_exit_code() {
        let result = run_command("exit 0", None).unwrap();
        assert_eq!(result.code, 0);
        assert!(!result.interrupted);
    }

    #[test]
    fn captures_failure_exit_code() {
        let result = run_command("exit 7", None).unwrap();
        assert_eq!(result.code, 7);
    }

    #[test]
    fn captures_combined_output() {
        let result = run_command("echo out; echo err 1>&2", None).unwrap();
        let text = String::from_utf8_lossy(&result.output);
        assert!(text.contains("out"));
        assert!(text.contains("err"));
    }
}
