// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`pipe_set`] allocates and owns the channels between adjacent stages.
//! - [`image`] prepares the argv of a stage (and its fallback) before fork.
//! - [`launcher`] provides the `StageLauncher` trait and the `ForkLauncher`
//!   that forks, rewires stdio and executes a stage.

pub mod image;
pub mod launcher;
pub mod pipe_set;

pub use image::{ExecImage, LAUNCH_FAILURE_EXIT_CODE};
pub use launcher::{ForkLauncher, StageLauncher};
pub use pipe_set::{Channel, PipeSet};
