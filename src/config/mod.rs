// src/config/mod.rs

//! Configuration for digenv.
//!
//! Responsibilities:
//! - Define the pager/filter settings and the stage list they produce
//!   (`model.rs`).
//! - Resolve settings from CLI flags and the environment (`loader.rs`).
//! - Validate settings and stage lists (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{PAGER_ENV_VAR, from_env, from_sources};
pub use model::{
    DEFAULT_PAGER, ENV_SOURCE_PROGRAM, FALLBACK_PAGER, FILTER_PROGRAM, PipelineConfig,
    RawPipelineConfig, SORT_PROGRAM,
};
pub use validate::validate_stages;
