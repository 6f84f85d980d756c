// src/types.rs

//! Plain data shared between the config layer and the pipeline engine.

use std::fmt;

use nix::unistd::Pid;

/// Exit status reported when any stage was killed by a signal.
///
/// Matches the byte value of `exit(-1)`.
pub const ABNORMAL_EXIT_CODE: i32 = 255;

/// One filter program in the chain.
///
/// - `args = None` runs the program with `argv = [program]`.
/// - `args = Some(v)` runs it with `argv = [program, v...]`.
/// - `fallback` is only set on the pager slot: if `program` cannot be
///   executed, the child tries `fallback` once, with no arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub program: String,
    pub args: Option<Vec<String>>,
    pub fallback: Option<String>,
}

impl Stage {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: None,
            fallback: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Full argument vector, program name first.
    pub fn argv(&self) -> Vec<&str> {
        let mut argv = vec![self.program.as_str()];
        if let Some(args) = &self.args {
            argv.extend(args.iter().map(String::as_str));
        }
        argv
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))?;
        if let Some(fallback) = &self.fallback {
            write!(f, " (fallback: {fallback})")?;
        }
        Ok(())
    }
}

/// A launched stage that has not been reaped yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProcess {
    pub pid: Pid,
    pub stage_index: usize,
    pub program: String,
}

/// How a single stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Ran to completion and called `exit` (zero or non-zero).
    Exited(i32),
    /// Killed by an uncaught signal; holds the signal name.
    Signaled(String),
}

impl StageOutcome {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, StageOutcome::Signaled(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageStatus {
    pub stage_index: usize,
    pub program: String,
    pub outcome: StageOutcome,
}

/// Aggregate result of one pipeline run.
///
/// Only clean-vs-abnormal termination decides the aggregate. Individual exit
/// codes are kept in `statuses` (in termination order) for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub all_exited_cleanly: bool,
    pub aggregate_exit_code: i32,
    pub statuses: Vec<StageStatus>,
}

impl PipelineResult {
    pub fn from_statuses(statuses: Vec<StageStatus>) -> Self {
        let all_exited_cleanly = !statuses.iter().any(|s| s.outcome.is_abnormal());
        let aggregate_exit_code = if all_exited_cleanly {
            0
        } else {
            ABNORMAL_EXIT_CODE
        };
        Self {
            all_exited_cleanly,
            aggregate_exit_code,
            statuses,
        }
    }

    /// Outcome recorded for the given stage, if it was reaped.
    pub fn outcome_of(&self, stage_index: usize) -> Option<&StageOutcome> {
        self.statuses
            .iter()
            .find(|s| s.stage_index == stage_index)
            .map(|s| &s.outcome)
    }
}

/// Lifecycle of a single orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unstarted,
    ChannelsAllocated,
    StagesLaunching,
    StagesLaunched,
    Reaping,
    Done { success: bool },
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Unstarted
    }
}
