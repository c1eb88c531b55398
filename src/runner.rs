//! Subprocess Runner (C2).
//!
//! `run(command, argv, limits, family) -> ExecutionOutcome`. Spawns the
//! child with C1 applied between fork and exec, waits with a hard
//! wall-clock deadline, and guarantees the child (and its process group)
//! is reaped before returning under every exit path. An orphaned child is
//! a correctness bug, not a best-effort detail.

use crate::errors::{Result, SandboxError};
use crate::limits::ResourceLimits;
use crate::registry::RuntimeFamily;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// The per-request output. `stdout` and `error` are independent channels;
/// both may be non-empty.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub error: String,
    pub success: bool,
}

impl ExecutionOutcome {
    fn timeout() -> Self {
        Self {
            stdout: String::new(),
            error: "Timeout".to_string(),
            success: false,
        }
    }

    fn internal(reason: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            error: reason.into(),
            success: false,
        }
    }
}

pub async fn run(
    command: &str,
    argv: &[String],
    limits: &ResourceLimits,
    family: RuntimeFamily,
) -> Result<ExecutionOutcome> {
    let mut cmd = Command::new(command);
    cmd.args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    apply_limits(&mut cmd, limits, family);

    let mut child = cmd.spawn().map_err(SandboxError::from)?;
    let pid = child.id();

    let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
    let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

    // Drain both pipes concurrently with the wait: a child that fills a
    // pipe buffer before exiting must not deadlock against an unread pipe.
    let drain = async {
        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let (stdout_result, stderr_result) = tokio::join!(
            stdout_pipe.read_to_end(&mut stdout_buf),
            stderr_pipe.read_to_end(&mut stderr_buf),
        );
        stdout_result.ok();
        stderr_result.ok();
        (stdout_buf, stderr_buf)
    };

    let wait_deadline = Duration::from_secs(limits.wall_timeout_seconds);

    match tokio::time::timeout(wait_deadline, async {
        let (stdout_buf, stderr_buf) = drain.await;
        let status = child.wait().await;
        (status, stdout_buf, stderr_buf)
    })
    .await
    {
        Ok((Ok(status), stdout_buf, stderr_buf)) => Ok(ExecutionOutcome {
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            error: String::from_utf8_lossy(&stderr_buf).into_owned(),
            success: status.success(),
        }),
        Ok((Err(e), _, _)) => Ok(ExecutionOutcome::internal(e.to_string())),
        Err(_) => {
            kill_process_group(pid);
            // Best-effort reap; the child is already dead or dying from
            // SIGKILL, this just prevents a zombie.
            let _ = child.wait().await;
            Ok(ExecutionOutcome::timeout())
        }
    }
}

#[cfg(unix)]
fn apply_limits(cmd: &mut Command, limits: &ResourceLimits, family: RuntimeFamily) {
    let limits = *limits;
    unsafe {
        std::os::unix::process::CommandExt::pre_exec(cmd, move || {
            crate::limits::apply(&limits, family)
        });
    }
}

#[cfg(not(unix))]
fn apply_limits(_cmd: &mut Command, _limits: &ResourceLimits, _family: RuntimeFamily) {
    // Process-level rlimits have no portable equivalent here; the wall-clock
    // timeout remains the authoritative bound on non-Unix targets.
}

/// Send SIGKILL to the whole process group, not just the PID, so a
/// grandchild spawned by the interpreter can't survive its parent's death.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
