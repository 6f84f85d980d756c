// src/config/model.rs

use crate::types::Stage;

/// Pager used when neither `--pager` nor `PAGER` is set.
pub const DEFAULT_PAGER: &str = "less";

/// Simpler pager tried when the configured one cannot be executed.
pub const FALLBACK_PAGER: &str = "more";

pub const ENV_SOURCE_PROGRAM: &str = "printenv";
pub const FILTER_PROGRAM: &str = "grep";
pub const SORT_PROGRAM: &str = "sort";

/// Unvalidated settings, as collected from the CLI and environment.
///
/// Convert into [`PipelineConfig`] with `TryFrom`, which validates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPipelineConfig {
    /// Explicit pager; `None` means [`DEFAULT_PAGER`].
    pub pager: Option<String>,

    /// Arguments for the filter stage. Empty means no filter stage.
    pub filter_args: Vec<String>,
}

/// Validated settings that determine the stage list.
///
/// ```text
/// printenv | sort | $PAGER                 (no filter args)
/// printenv | grep ARGS... | sort | $PAGER  (filter args given)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pager: String,
    filter_args: Vec<String>,
}

impl PipelineConfig {
    /// Build a config without validation. Used by `TryFrom` after checks.
    pub(crate) fn new_unchecked(pager: String, filter_args: Vec<String>) -> Self {
        Self { pager, filter_args }
    }

    pub fn pager(&self) -> &str {
        &self.pager
    }

    pub fn filter_args(&self) -> &[String] {
        &self.filter_args
    }

    pub fn uses_filter(&self) -> bool {
        !self.filter_args.is_empty()
    }

    /// The ordered stage list handed to the orchestrator.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Vec::with_capacity(4);
        stages.push(Stage::new(ENV_SOURCE_PROGRAM));
        if self.uses_filter() {
            stages.push(Stage::new(FILTER_PROGRAM).with_args(self.filter_args.iter().cloned()));
        }
        stages.push(Stage::new(SORT_PROGRAM));
        stages.push(Stage::new(self.pager.clone()).with_fallback(FALLBACK_PAGER));
        stages
    }
}
