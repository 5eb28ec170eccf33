use std::path::PathBuf;

use anyhow::{Context, Result};
use banana_engine::{
    lookup_env, resolve_provider_config, ProviderClient, ProviderConfig, ProviderKind,
    ProviderOptions, SourceImage, DEFAULT_TIMEOUT_SECS,
};
use clap::Args;
use tracing_subscriber::EnvFilter;

/// Provider selection flags shared by both generation binaries.
#[derive(Debug, Clone, Args)]
pub struct ProviderArgs {
    /// Force a provider instead of auto-detecting from available keys.
    #[arg(long, value_parser = parse_provider)]
    pub provider: Option<ProviderKind>,
    /// API key; `sk-or-` keys route to OpenRouter unless --provider is set.
    #[arg(long)]
    pub api_key: Option<String>,
    /// Image model override.
    #[arg(long, short = 'm')]
    pub model: Option<String>,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

fn parse_provider(raw: &str) -> Result<ProviderKind, String> {
    raw.parse::<ProviderKind>().map_err(|err| err.to_string())
}

impl ProviderArgs {
    pub fn options(&self) -> ProviderOptions {
        ProviderOptions {
            provider: self.provider,
            api_key: self.api_key.clone(),
            image_model: self.model.clone(),
            timeout_secs: Some(self.timeout),
        }
    }

    pub fn resolve(&self) -> Result<(ProviderConfig, ProviderClient)> {
        let config = resolve_provider_config(&self.options(), lookup_env)?;
        let client = ProviderClient::new(&config)
            .with_context(|| format!("failed to build {} client", config.kind))?;
        Ok((config, client))
    }
}

/// `RUST_LOG` wins; otherwise `debug` with `-v` and `warn` without.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Edit-mode precondition, checked before any network call.
pub fn read_source_image(path: Option<&PathBuf>) -> Result<Option<SourceImage>> {
    path.map(SourceImage::read).transpose().map_err(Into::into)
}
