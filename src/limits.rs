//! Resource-Limit Applier (C1).
//!
//! Invoked exactly once, in the child's `pre_exec` hook (after `fork`,
//! before the interpreter image loads) so the limits bind the interpreter
//! and every descendant it spawns. This is a defense layer, not the only
//! one: no namespaces, seccomp, or chroot live here, matching the teacher's
//! `NativePythonEngine::apply_resource_limits`.

use crate::registry::RuntimeFamily;

const MEMORY_FLOOR_BYTES: u64 = 1024 * 1024 * 1024;
const DEFAULT_MAX_CHILD_PROCESSES: u64 = 64;

/// Resolved, process-wide policy for a single submission. Immutable after
/// construction from `ResourceLimitsConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub cpu_time_seconds: u64,
    pub memory_bytes: u64,
    pub file_size_bytes: u64,
    pub wall_timeout_seconds: u64,
    pub max_child_processes: u64,
}

impl ResourceLimits {
    pub fn from_config(config: &crate::config::ResourceLimitsConfig) -> Self {
        Self {
            cpu_time_seconds: config.cpu_time_limit,
            memory_bytes: config.memory_limit_mb * 1024 * 1024,
            file_size_bytes: config.file_size_limit_kb * 1024,
            wall_timeout_seconds: config.timeout,
            max_child_processes: DEFAULT_MAX_CHILD_PROCESSES,
        }
    }

    fn memory_floor_applied(&self) -> u64 {
        self.memory_bytes.max(MEMORY_FLOOR_BYTES)
    }
}

/// Apply CPU/AS/FSIZE/NPROC limits to the just-forked child, before `exec`.
///
/// # Safety
/// Must only be called from within a `pre_exec` closure, between `fork` and
/// `exec`. The child is single-threaded at that point and only
/// async-signal-safe calls are permitted. `setrlimit` is async-signal-safe.
#[cfg(unix)]
pub unsafe fn apply(limits: &ResourceLimits, family: RuntimeFamily) -> std::io::Result<()> {
    // New process group: lets the Subprocess Runner (C2) signal the whole
    // tree with a single killpg instead of racing a grandchild that escaped
    // the parent's reap.
    if libc::setpgid(0, 0) != 0 {
        return Err(std::io::Error::last_os_error());
    }

    set_rlimit(
        libc::RLIMIT_CPU,
        limits.cpu_time_seconds,
        limits.cpu_time_seconds + 2,
    )?;

    let memory = limits.memory_floor_applied();
    set_rlimit(libc::RLIMIT_AS, memory, memory)?;

    set_rlimit(
        libc::RLIMIT_FSIZE,
        limits.file_size_bytes,
        limits.file_size_bytes,
    )?;

    // JS engines self-thread (worker threads, GC helpers) and fail to start
    // under a tight NPROC cap; exempt the js-like family entirely.
    if !matches!(family, RuntimeFamily::JsLike) {
        set_rlimit(
            libc::RLIMIT_NPROC,
            limits.max_child_processes,
            limits.max_child_processes,
        )?;
    }

    Ok(())
}

#[cfg(unix)]
fn set_rlimit(resource: libc::c_int, soft: u64, hard: u64) -> std::io::Result<()> {
    let rlimit = libc::rlimit {
        rlim_cur: soft as libc::rlim_t,
        rlim_max: hard as libc::rlim_t,
    };
    if unsafe { libc::setrlimit(resource, &rlimit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}
