// src/exec/launcher.rs

//! Spawning a single stage.

use std::os::fd::{AsRawFd, BorrowedFd, RawFd};

use nix::libc;
use nix::unistd::{ForkResult, fork};
use tracing::{debug, info};

use crate::errors::{PipelineError, Result};
use crate::exec::image::ExecImage;
use crate::types::{ChildProcess, Stage};

/// Trait abstracting how one stage is started.
///
/// Production code uses [`ForkLauncher`]; tests can wrap it to record how
/// each stage was wired.
pub trait StageLauncher {
    /// Start `stage` reading from `stdin` and writing to `stdout`.
    ///
    /// Returns as soon as the child exists; it does not wait for it. The
    /// parent's copies of `stdin`, `stdout` and `close_handles` are left
    /// open. The child closes every entry of `close_handles` that is not its
    /// own stdin or stdout before executing the program.
    fn launch(
        &mut self,
        stage_index: usize,
        stage: &Stage,
        stdin: BorrowedFd<'_>,
        stdout: BorrowedFd<'_>,
        close_handles: &[RawFd],
    ) -> Result<ChildProcess>;
}

/// Launches stages with `fork` + `execvp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForkLauncher;

impl ForkLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl StageLauncher for ForkLauncher {
    fn launch(
        &mut self,
        stage_index: usize,
        stage: &Stage,
        stdin: BorrowedFd<'_>,
        stdout: BorrowedFd<'_>,
        close_handles: &[RawFd],
    ) -> Result<ChildProcess> {
        let image = ExecImage::prepare(stage)?;
        let stdin = stdin.as_raw_fd();
        let stdout = stdout.as_raw_fd();

        debug!(
            stage = stage_index,
            program = %stage.program,
            stdin,
            stdout,
            fallback = image.has_fallback(),
            "forking stage"
        );

        // SAFETY: between `fork` and `exec`/`_exit` the child only calls
        // async-signal-safe functions on buffers prepared above.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => {
                info!(stage = stage_index, pid = child.as_raw(), cmd = %stage, "stage launched");
                Ok(ChildProcess {
                    pid: child,
                    stage_index,
                    program: stage.program.clone(),
                })
            }
            Ok(ForkResult::Child) => exec_in_child(&image, stdin, stdout, close_handles),
            Err(source) => Err(PipelineError::SpawnFailure {
                stage: stage_index,
                program: stage.program.clone(),
                source,
            }),
        }
    }
}

/// Child side of a launch: rewire stdio, drop foreign handles, exec.
fn exec_in_child(image: &ExecImage, stdin: RawFd, stdout: RawFd, close_handles: &[RawFd]) -> ! {
    // SAFETY: only async-signal-safe libc calls on plain integers.
    unsafe {
        // The orchestrator ignores SIGPIPE like any Rust binary; filters must
        // not inherit that.
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);

        if stdin != libc::STDIN_FILENO && libc::dup2(stdin, libc::STDIN_FILENO) < 0 {
            image.abort(b"digenv: cannot redirect stage stdin\n");
        }
        if stdout != libc::STDOUT_FILENO && libc::dup2(stdout, libc::STDOUT_FILENO) < 0 {
            image.abort(b"digenv: cannot redirect stage stdout\n");
        }

        for &fd in close_handles {
            if fd != libc::STDIN_FILENO && fd != libc::STDOUT_FILENO {
                libc::close(fd);
            }
        }
    }

    image.exec()
}
