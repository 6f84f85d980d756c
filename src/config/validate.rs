// src/config/validate.rs

use crate::config::model::{DEFAULT_PAGER, PipelineConfig, RawPipelineConfig};
use crate::errors::{PipelineError, Result};
use crate::types::Stage;

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = PipelineError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        let pager = raw.pager.unwrap_or_else(|| DEFAULT_PAGER.to_string());
        validate_pager(&pager)?;
        validate_filter_args(&raw.filter_args)?;
        Ok(PipelineConfig::new_unchecked(pager, raw.filter_args))
    }
}

fn validate_pager(pager: &str) -> Result<()> {
    if pager.trim().is_empty() {
        return Err(PipelineError::Config("pager name must not be empty".to_string()));
    }
    if pager.contains('\0') {
        return Err(PipelineError::Config(format!(
            "pager name {pager:?} contains a NUL byte"
        )));
    }
    Ok(())
}

fn validate_filter_args(args: &[String]) -> Result<()> {
    match args.iter().find(|a| a.contains('\0')) {
        Some(arg) => Err(PipelineError::Config(format!(
            "filter argument {arg:?} contains a NUL byte"
        ))),
        None => Ok(()),
    }
}

/// Check a stage list before it is handed to the orchestrator.
///
/// - at least one stage
/// - every program name is non-empty
pub fn validate_stages(stages: &[Stage]) -> Result<()> {
    if stages.is_empty() {
        return Err(PipelineError::Config(
            "a pipeline needs at least one stage".to_string(),
        ));
    }
    for (index, stage) in stages.iter().enumerate() {
        if stage.program.trim().is_empty() {
            return Err(PipelineError::Config(format!(
                "stage {index} has an empty program name"
            )));
        }
    }
    Ok(())
}
