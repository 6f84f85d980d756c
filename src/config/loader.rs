// src/config/loader.rs

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::Result;

/// Environment variable that overrides the pager.
pub const PAGER_ENV_VAR: &str = "PAGER";

/// Resolve the config for this process from CLI args and `PAGER`.
pub fn from_env(args: &CliArgs) -> Result<PipelineConfig> {
    from_sources(
        args.pager.clone(),
        std::env::var(PAGER_ENV_VAR).ok(),
        args.patterns.clone(),
    )
}

/// Resolve the config from explicit sources.
///
/// Pager priority:
/// 1. `cli_pager` (the `--pager` flag)
/// 2. `env_pager`, unless empty or only whitespace
/// 3. the default pager
pub fn from_sources(
    cli_pager: Option<String>,
    env_pager: Option<String>,
    filter_args: Vec<String>,
) -> Result<PipelineConfig> {
    let env_pager = env_pager.filter(|p| !p.trim().is_empty());
    let pager = cli_pager.or(env_pager);
    debug!(?pager, filter_args = filter_args.len(), "resolved pipeline settings");

    PipelineConfig::try_from(RawPipelineConfig { pager, filter_args })
}
