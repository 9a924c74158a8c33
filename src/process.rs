//! Runs external tool programs and collects their output.

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

#[derive(Debug, PartialEq)]
pub enum Termination {
    Success,
    Interrupted,
    Failure,
}

/// Runs `program` with `args` to completion.  Returns how it terminated and
/// its stdout followed by its stderr, plus a note if it died from a signal.
pub fn run_command(program: &Path, args: &[String]) -> anyhow::Result<(Termination, Vec<u8>)> {
    let out = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| anyhow::anyhow!("spawn {}: {}", program.display(), err))?;

    let mut output = out.stdout;
    output.extend_from_slice(&out.stderr);
    let termination = termination(&out.status, &mut output);
    Ok((termination, output))
}

#[cfg(unix)]
fn termination(status: &ExitStatus, output: &mut Vec<u8>) -> Termination {
    use std::os::unix::process::ExitStatusExt;
    if status.success() {
        return Termination::Success;
    }
    match status.signal() {
        Some(libc::SIGINT) => {
            output.extend_from_slice(b"interrupted");
            Termination::Interrupted
        }
        Some(sig) => {
            output.extend_from_slice(format!("signal {}", sig).as_bytes());
            Termination::Failure
        }
        None => Termination::Failure,
    }
}

#[cfg(not(unix))]
fn termination(status: &ExitStatus, _output: &mut Vec<u8>) -> Termination {
    if status.success() {
        Termination::Success
    } else {
        Termination::Failure
    }
}
