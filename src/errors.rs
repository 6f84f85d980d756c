// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid stage '{program}': {reason}")]
    InvalidStage { program: String, reason: String },

    #[error("Cannot allocate channel {index} of {requested}: {source}")]
    ResourceExhausted {
        index: usize,
        requested: usize,
        #[source]
        source: nix::Error,
    },

    #[error("Cannot spawn stage {stage} ('{program}'): {source}")]
    SpawnFailure {
        stage: usize,
        program: String,
        #[source]
        source: nix::Error,
    },

    #[error("Waiting for stage {stage} failed: {source}")]
    Wait {
        stage: usize,
        #[source]
        source: nix::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
