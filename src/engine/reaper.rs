// src/engine/reaper.rs

//! Waiting for every launched stage and classifying how it ended.
//!
//! Each registered child gets its own blocking wait on the Tokio blocking
//! pool; `JoinSet::join_next` then yields terminations in the order the OS
//! reports them, not launch order. Only registered pids are waited for, so
//! unrelated children of the host process are never reaped here.
//!
//! The blocking wait only observes the termination and leaves the child a
//! zombie. It is released after its outcome has been handled, so a pid that
//! escalation may still signal can never be recycled by the OS.

use std::collections::BTreeMap;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::types::{ChildProcess, PipelineResult, StageOutcome, StageStatus};

/// Block until every child in `children` has terminated.
///
/// The first stage killed by a signal triggers escalation: every child that
/// has not been accounted for yet receives `SIGTERM`, so no stage is left
/// blocked on input that will never arrive. The aggregate result is failed
/// if any stage died from a signal.
///
/// A failing wait does not stop the loop; the remaining children are
/// still reaped and the first wait error is returned afterwards.
pub async fn reap_all(children: &[ChildProcess]) -> Result<PipelineResult> {
    let mut remaining: BTreeMap<usize, ChildProcess> = children
        .iter()
        .map(|c| (c.stage_index, c.clone()))
        .collect();

    let mut waits = JoinSet::new();
    for child in children {
        let pid = child.pid;
        let stage_index = child.stage_index;
        waits.spawn_blocking(move || (stage_index, observe_exit(pid)));
    }

    let mut statuses = Vec::with_capacity(children.len());
    let mut escalated = false;
    let mut first_error: Option<PipelineError> = None;

    while let Some(joined) = waits.join_next().await {
        let (stage_index, waited) = joined.map_err(|e| PipelineError::Other(e.into()))?;
        let Some(child) = remaining.remove(&stage_index) else {
            warn!(stage = stage_index, "termination reported for unknown stage");
            continue;
        };

        let outcome = match waited {
            Ok(outcome) => outcome,
            Err(source) => {
                error!(stage = stage_index, pid = child.pid.as_raw(), error = %source, "waiting for stage failed");
                if first_error.is_none() {
                    first_error = Some(PipelineError::Wait {
                        stage: stage_index,
                        source,
                    });
                }
                continue;
            }
        };

        match &outcome {
            StageOutcome::Exited(code) => {
                info!(stage = stage_index, program = %child.program, exit_code = code, "stage exited");
            }
            StageOutcome::Signaled(signal) => {
                warn!(stage = stage_index, program = %child.program, %signal, "stage terminated by signal");
                if !escalated {
                    escalated = true;
                    terminate(remaining.values());
                }
            }
        }
        release(child.pid);

        statuses.push(StageStatus {
            stage_index,
            program: child.program,
            outcome,
        });
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let result = PipelineResult::from_statuses(statuses);
    debug!(
        all_exited_cleanly = result.all_exited_cleanly,
        exit_code = result.aggregate_exit_code,
        "all stages reaped"
    );
    Ok(result)
}

/// Send `SIGTERM` to each child. Children that already exited are skipped.
pub fn terminate<'a>(children: impl IntoIterator<Item = &'a ChildProcess>) {
    for child in children {
        match kill(child.pid, Signal::SIGTERM) {
            Ok(()) => {
                info!(stage = child.stage_index, pid = child.pid.as_raw(), "sent SIGTERM to stage");
            }
            Err(Errno::ESRCH) => {
                debug!(stage = child.stage_index, pid = child.pid.as_raw(), "stage already gone");
            }
            Err(e) => {
                warn!(stage = child.stage_index, pid = child.pid.as_raw(), error = %e, "failed to signal stage");
            }
        }
    }
}

/// Block until `pid` has terminated, without reaping it.
///
/// The child stays a zombie, and keeps its pid, until [`release`] is called.
pub fn observe_exit(pid: Pid) -> nix::Result<StageOutcome> {
    loop {
        match wait_exited(pid) {
            Ok(Some(outcome)) => return Ok(outcome),
            Ok(None) => continue,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Reap a child whose termination was already observed.
pub fn release(pid: Pid) {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!(pid = pid.as_raw(), error = %e, "failed to release stage");
                return;
            }
            Ok(_) => return,
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn wait_exited(pid: Pid) -> nix::Result<Option<StageOutcome>> {
    use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};

    match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT)? {
        WaitStatus::Exited(_, code) => Ok(Some(StageOutcome::Exited(code))),
        WaitStatus::Signaled(_, signal, _) => {
            Ok(Some(StageOutcome::Signaled(signal.as_str().to_string())))
        }
        _ => Ok(None),
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn wait_exited(pid: Pid) -> nix::Result<Option<StageOutcome>> {
    use nix::libc;

    // SAFETY: an all-zero `siginfo_t` is a valid out-parameter for `waitid`.
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    // SAFETY: `info` outlives the call and `pid` is one of our children.
    let rc = unsafe {
        libc::waitid(
            libc::P_PID,
            pid.as_raw() as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOWAIT,
        )
    };
    Errno::result(rc)?;

    // SAFETY: `waitid` filled `info` for a child state change.
    let status = unsafe { info.si_status() };
    let outcome = match info.si_code {
        libc::CLD_EXITED => StageOutcome::Exited(status),
        libc::CLD_KILLED | libc::CLD_DUMPED => StageOutcome::Signaled(
            Signal::try_from(status)
                .map(|s| s.as_str().to_string())
                .unwrap_or_else(|_| format!("signal {status}")),
        ),
        _ => return Ok(None),
    };
    Ok(Some(outcome))
}
