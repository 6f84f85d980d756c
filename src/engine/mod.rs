// src/engine/mod.rs

//! Pipeline orchestration.
//!
//! - [`orchestrator`] drives one run: channels, launches, parent-side close,
//!   then reaping.
//! - [`reaper`] waits for every stage and escalates on signal death.

pub mod orchestrator;
pub mod reaper;

pub use orchestrator::PipelineOrchestrator;
pub use reaper::{observe_exit, reap_all, release, terminate};
