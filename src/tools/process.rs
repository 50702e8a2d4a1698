//! Bounded subprocess execution

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::{Error, Result};

/// Captured output of a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// Find an executable on `PATH`
///
/// # Errors
///
/// Returns a configuration error if the binary is not installed
pub fn locate(binary: &str) -> Result<PathBuf> {
    which::which(binary).map_err(|_| Error::Config(format!("{binary} is not installed")))
}

/// Run a program to completion within `timeout`
///
/// The child is killed if the deadline passes.
///
/// # Errors
///
/// Returns error if the process cannot be spawned, times out, or exits
/// unsuccessfully
pub async fn run<I, S>(program: &Path, args: I, timeout: Duration) -> Result<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = tokio::process::Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| Error::Upstream(format!("failed to spawn {}: {e}", program.display())))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            Error::Upstream(format!(
                "{} timed out after {}s",
                display_name(program),
                timeout.as_secs()
            ))
        })?
        .map_err(|e| Error::Upstream(format!("{} process error: {e}", display_name(program))))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(Error::Upstream(format!(
            "{} exited with {}: {}",
            display_name(program),
            output.status,
            stderr.trim()
        )));
    }

    Ok(ProcessOutput { stdout, stderr })
}

fn display_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}
