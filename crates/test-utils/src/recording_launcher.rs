use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::sync::{Arc, Mutex};

use digenv::errors::{PipelineError, Result};
use digenv::exec::{ForkLauncher, StageLauncher};
use digenv::types::{ChildProcess, Stage};
use nix::errno::Errno;

/// How one stage was wired when it was launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    pub stage_index: usize,
    pub program: String,
    pub stdin: RawFd,
    pub stdout: RawFd,
    pub close_handles: Vec<RawFd>,
}

/// A launcher that:
/// - records how every stage was wired
/// - delegates the actual launch to an inner launcher (real forks by default)
/// - can simulate a spawn failure at a given stage index.
pub struct RecordingLauncher<L = ForkLauncher> {
    inner: L,
    records: Arc<Mutex<Vec<LaunchRecord>>>,
    fail_at: Option<usize>,
}

impl RecordingLauncher<ForkLauncher> {
    pub fn new() -> Self {
        Self::wrapping(ForkLauncher::new())
    }
}

impl Default for RecordingLauncher<ForkLauncher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: StageLauncher> RecordingLauncher<L> {
    pub fn wrapping(inner: L) -> Self {
        Self {
            inner,
            records: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
        }
    }

    /// Make the launch of `stage_index` fail as if `fork()` returned EAGAIN.
    pub fn fail_at(mut self, stage_index: usize) -> Self {
        self.fail_at = Some(stage_index);
        self
    }

    /// Shared handle on the records, usable after the launcher is moved.
    pub fn records_handle(&self) -> Arc<Mutex<Vec<LaunchRecord>>> {
        Arc::clone(&self.records)
    }

    pub fn records(&self) -> Vec<LaunchRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl<L: StageLauncher> StageLauncher for RecordingLauncher<L> {
    fn launch(
        &mut self,
        stage_index: usize,
        stage: &Stage,
        stdin: BorrowedFd<'_>,
        stdout: BorrowedFd<'_>,
        close_handles: &[RawFd],
    ) -> Result<ChildProcess> {
        if self.fail_at == Some(stage_index) {
            return Err(PipelineError::SpawnFailure {
                stage: stage_index,
                program: stage.program.clone(),
                source: Errno::EAGAIN,
            });
        }

        {
            let mut guard = self.records.lock().unwrap();
            guard.push(LaunchRecord {
                stage_index,
                program: stage.program.clone(),
                stdin: stdin.as_raw_fd(),
                stdout: stdout.as_raw_fd(),
                close_handles: close_handles.to_vec(),
            });
        }

        self.inner
            .launch(stage_index, stage, stdin, stdout, close_handles)
    }
}
