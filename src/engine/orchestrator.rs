// src/engine/orchestrator.rs

//! Composes channels, launcher and reaper into one pipeline run.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use tracing::{debug, error, info};

use crate::engine::reaper::{reap_all, terminate};
use crate::errors::{PipelineError, Result};
use crate::exec::{PipeSet, StageLauncher};
use crate::types::{ChildProcess, PipelineResult, RunState, Stage};

/// Runs an ordered list of stages as one pipe chain.
///
/// By default the first stage reads the process's stdin and the last stage
/// writes the process's stdout. [`with_stdin`](Self::with_stdin) and
/// [`with_stdout`](Self::with_stdout) replace those ends for the next run;
/// the orchestrator closes its copies once every stage has been launched.
#[derive(Debug)]
pub struct PipelineOrchestrator<L> {
    launcher: L,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    state: RunState,
}

impl<L: StageLauncher> PipelineOrchestrator<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            stdin: None,
            stdout: None,
            state: RunState::Unstarted,
        }
    }

    pub fn with_stdin(mut self, fd: OwnedFd) -> Self {
        self.stdin = Some(fd);
        self
    }

    pub fn with_stdout(mut self, fd: OwnedFd) -> Self {
        self.stdout = Some(fd);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn into_launcher(self) -> L {
        self.launcher
    }

    /// Run `stages` to completion.
    ///
    /// 1. Allocate `len - 1` channels.
    /// 2. Launch each stage with its input and output ends.
    /// 3. Close the parent's copy of every channel handle.
    /// 4. Reap every stage.
    ///
    /// A failure while allocating or launching ends the run in
    /// `Done { success: false }` and is returned to the caller. Stages that
    /// were already launched are signalled and reaped first.
    pub async fn run(&mut self, stages: &[Stage]) -> Result<PipelineResult> {
        if stages.is_empty() {
            return Err(PipelineError::Config(
                "a pipeline needs at least one stage".to_string(),
            ));
        }

        // Only the stages keep the replaced ends past launching.
        let stdin = self.stdin.take();
        let stdout = self.stdout.take();

        let pipes = match PipeSet::allocate(stages.len() - 1) {
            Ok(pipes) => pipes,
            Err(err) => {
                self.transition(RunState::Done { success: false });
                return Err(err);
            }
        };
        self.transition(RunState::ChannelsAllocated);

        let launched = self.launch_all(stages, &pipes, stdin.as_ref(), stdout.as_ref());

        // Downstream stages only see end-of-input once nobody but their
        // upstream stage holds the write end, the parent included.
        pipes.close_all();
        drop(stdin);
        drop(stdout);

        let children = match launched {
            Ok(children) => children,
            Err((err, children)) => {
                error!(error = %err, launched = children.len(), "pipeline launch failed");
                terminate(&children);
                if let Err(reap_err) = reap_all(&children).await {
                    error!(error = %reap_err, "reaping partially launched pipeline failed");
                }
                self.transition(RunState::Done { success: false });
                return Err(err);
            }
        };
        self.transition(RunState::StagesLaunched);

        self.transition(RunState::Reaping);
        let result = reap_all(&children).await;

        let success = matches!(&result, Ok(r) if r.all_exited_cleanly);
        self.transition(RunState::Done { success });

        if let Ok(r) = &result {
            info!(
                stages = stages.len(),
                all_exited_cleanly = r.all_exited_cleanly,
                exit_code = r.aggregate_exit_code,
                "pipeline finished"
            );
        }
        result
    }

    /// Launch every stage. On error, also hands back the children launched
    /// so far so they can be reaped.
    fn launch_all(
        &mut self,
        stages: &[Stage],
        pipes: &PipeSet,
        stdin: Option<&OwnedFd>,
        stdout: Option<&OwnedFd>,
    ) -> std::result::Result<Vec<ChildProcess>, (PipelineError, Vec<ChildProcess>)> {
        self.transition(RunState::StagesLaunching);

        let inherited_stdin = io::stdin();
        let inherited_stdout = io::stdout();
        let first_input: BorrowedFd<'_> = match stdin {
            Some(fd) => fd.as_fd(),
            None => inherited_stdin.as_fd(),
        };
        let last_output: BorrowedFd<'_> = match stdout {
            Some(fd) => fd.as_fd(),
            None => inherited_stdout.as_fd(),
        };

        // Replaced ends are private to the stage that binds them.
        let mut close_handles: Vec<RawFd> = pipes.handles();
        close_handles.extend(stdin.map(|fd| fd.as_raw_fd()));
        close_handles.extend(stdout.map(|fd| fd.as_raw_fd()));

        let last = stages.len() - 1;
        let mut children = Vec::with_capacity(stages.len());

        for (index, stage) in stages.iter().enumerate() {
            let input = if index == 0 {
                Some(first_input)
            } else {
                pipes.read_end(index - 1)
            };
            let output = if index == last {
                Some(last_output)
            } else {
                pipes.write_end(index)
            };

            let (Some(input), Some(output)) = (input, output) else {
                let err = PipelineError::Config(format!(
                    "no channel available for stage {index} ('{}')",
                    stage.program
                ));
                return Err((err, children));
            };

            match self
                .launcher
                .launch(index, stage, input, output, &close_handles)
            {
                Ok(child) => children.push(child),
                Err(err) => return Err((err, children)),
            }
        }

        Ok(children)
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}
