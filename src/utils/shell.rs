use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Runs a command line through the platform shell.
#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Returns the exit code. Launch failures are errors, nonzero exits are not.
    async fn run(&self, command: &str) -> Result<i32>;
}

/// Streams merged stdout/stderr to the terminal as lines arrive.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

#[async_trait]
impl ShellRunner for SystemShell {
    async fn run(&self, command: &str) -> Result<i32> {
        stream_command(command, |line| println!("{line}")).await
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

/// Spawns `command`, handing every output line (stdout and stderr
/// interleaved in arrival order) to `on_line`.
pub async fn stream_command<F>(command: &str, mut on_line: F) -> Result<i32>
where
    F: FnMut(&str) + Send,
{
    debug!("Spawning shell for: {command}");

    let mut child = shell_command(command)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to launch shell for: {command}"))?;

    let stdout = child.stdout.take().context("Child stdout was not captured")?;
    let stderr = child.stderr.take().context("Child stderr was not captured")?;
    let mut out = lines(stdout);
    let mut err = lines(stderr);
    let (mut out_done, mut err_done) = (false, false);

    while !(out_done && err_done) {
        tokio::select! {
            segment = out.next_segment(), if !out_done => match segment? {
                Some(bytes) => on_line(&decode(&bytes)),
                None => out_done = true,
            },
            segment = err.next_segment(), if !err_done => match segment? {
                Some(bytes) => on_line(&decode(&bytes)),
                None => err_done = true,
            },
        }
    }

    let status = child
        .wait()
        .await
        .context("Failed to wait for shell command")?;
    debug!("Shell exited with {status}");
    Ok(status.code().unwrap_or(-1))
}

fn lines<R: AsyncRead + Unpin>(reader: R) -> tokio::io::Split<BufReader<R>> {
    BufReader::new(reader).split(b'\n')
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}
