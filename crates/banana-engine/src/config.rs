//! Credential and endpoint resolution.
//!
//! Values come from an explicit flag, the process environment, or the
//! nearest `.env` file, in that order. Resolution itself takes a lookup
//! closure so it can be exercised without touching the real environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::provider::{ProviderConfig, ProviderKind};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DOTENV_PARENT_DEPTH: usize = 5;
const OPENROUTER_KEY_PREFIX: &str = "sk-or-";

pub fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `.env` files in `start` and up to five parents, nearest first.
pub fn dotenv_candidates(start: &Path) -> Vec<PathBuf> {
    start
        .ancestors()
        .take(DOTENV_PARENT_DEPTH + 1)
        .map(|dir| dir.join(".env"))
        .collect()
}

/// Reads `key` from the first `.env` that defines it, without exporting
/// anything into the process environment.
pub fn dotenv_value(key: &str, start: &Path) -> Option<String> {
    for path in dotenv_candidates(start) {
        if !path.is_file() {
            continue;
        }
        let entries = match dotenvy::from_path_iter(&path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(path = %path.display(), "skipping unreadable .env: {err}");
                continue;
            }
        };
        for entry in entries.flatten() {
            if entry.0 == key {
                let value = entry.1.trim().to_string();
                if !value.is_empty() {
                    tracing::debug!(key, path = %path.display(), "loaded value from .env");
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Process environment first, then `.env` files from the working directory up.
pub fn lookup_env(key: &str) -> Option<String> {
    non_empty_env(key).or_else(|| {
        let cwd = std::env::current_dir().ok()?;
        dotenv_value(key, &cwd)
    })
}

fn provider_key(kind: ProviderKind, lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    kind.key_envs().iter().find_map(|key| lookup(*key))
}

/// Picks the provider and its key. An explicit key is routed by its prefix
/// unless the provider is forced.
pub fn resolve_credentials(
    provider_override: Option<ProviderKind>,
    explicit_key: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(ProviderKind, String), ConfigError> {
    let explicit_key = explicit_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    if let Some(kind) = provider_override {
        let key = explicit_key
            .or_else(|| provider_key(kind, &lookup))
            .ok_or(ConfigError::MissingKey(kind))?;
        return Ok((kind, key));
    }

    if let Some(key) = explicit_key {
        let kind = if key.starts_with(OPENROUTER_KEY_PREFIX) {
            ProviderKind::OpenRouter
        } else {
            ProviderKind::Google
        };
        return Ok((kind, key));
    }

    [ProviderKind::Google, ProviderKind::OpenRouter]
        .into_iter()
        .find_map(|kind| provider_key(kind, &lookup).map(|key| (kind, key)))
        .ok_or(ConfigError::NoCredentials)
}

#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub provider: Option<ProviderKind>,
    pub api_key: Option<String>,
    pub image_model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Full provider configuration: credentials, models, endpoint and timeout.
pub fn resolve_provider_config(
    options: &ProviderOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ProviderConfig, ConfigError> {
    let (kind, api_key) =
        resolve_credentials(options.provider, options.api_key.as_deref(), &lookup)?;
    let image_model = options
        .image_model
        .as_deref()
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(kind.default_image_model())
        .to_string();
    let api_base = lookup(kind.api_base_env())
        .unwrap_or_else(|| kind.default_api_base().to_string())
        .trim_end_matches('/')
        .to_string();
    let timeout_secs = options
        .timeout_secs
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    Ok(ProviderConfig {
        kind,
        api_key,
        image_model,
        review_model: kind.default_review_model().to_string(),
        request_timeout: Duration::from_secs(timeout_secs),
        api_base,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{dotenv_value, resolve_credentials, resolve_provider_config, ProviderOptions};
    use crate::error::ConfigError;
    use crate::provider::ProviderKind;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn google_key_wins_auto_detection() -> anyhow::Result<()> {
        let lookup = env(&[("GEMINI_API_KEY", "g-key"), ("OPENROUTER_API_KEY", "sk-or-x")]);
        assert_eq!(
            resolve_credentials(None, None, lookup)?,
            (ProviderKind::Google, "g-key".to_string())
        );

        let lookup = env(&[("GOOGLE_API_KEY", "alt")]);
        assert_eq!(resolve_credentials(None, None, lookup)?.1, "alt");

        let lookup = env(&[("OPENROUTER_API_KEY", "sk-or-x")]);
        assert_eq!(resolve_credentials(None, None, lookup)?.0, ProviderKind::OpenRouter);
        Ok(())
    }

    #[test]
    fn no_keys_is_a_config_error() {
        assert!(matches!(
            resolve_credentials(None, None, env(&[])),
            Err(ConfigError::NoCredentials)
        ));
        assert!(matches!(
            resolve_credentials(Some(ProviderKind::OpenRouter), None, env(&[("GEMINI_API_KEY", "g")])),
            Err(ConfigError::MissingKey(ProviderKind::OpenRouter))
        ));
    }

    #[test]
    fn explicit_key_is_routed_by_prefix() -> anyhow::Result<()> {
        let (kind, _) = resolve_credentials(None, Some("sk-or-v1-abc"), env(&[]))?;
        assert_eq!(kind, ProviderKind::OpenRouter);
        let (kind, _) = resolve_credentials(None, Some("AIza123"), env(&[]))?;
        assert_eq!(kind, ProviderKind::Google);
        let (kind, key) =
            resolve_credentials(Some(ProviderKind::Google), Some("sk-or-forced"), env(&[]))?;
        assert_eq!((kind, key.as_str()), (ProviderKind::Google, "sk-or-forced"));
        Ok(())
    }

    #[test]
    fn provider_config_applies_defaults_and_overrides() -> anyhow::Result<()> {
        let lookup = env(&[
            ("OPENROUTER_API_KEY", "sk-or-x"),
            ("OPENROUTER_API_BASE", "http://localhost:9999/v1/"),
        ]);
        let config = resolve_provider_config(&ProviderOptions::default(), lookup)?;
        assert_eq!(config.kind, ProviderKind::OpenRouter);
        assert_eq!(config.image_model, "google/gemini-3-pro-image-preview");
        assert_eq!(config.review_model, "google/gemini-3-pro-preview");
        assert_eq!(config.api_base, "http://localhost:9999/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(120));

        let options = ProviderOptions {
            image_model: Some("custom/model".to_string()),
            timeout_secs: Some(30),
            ..ProviderOptions::default()
        };
        let config = resolve_provider_config(&options, env(&[("GEMINI_API_KEY", "g")]))?;
        assert_eq!(config.image_model, "custom/model");
        assert_eq!(config.review_model, "gemini-3-pro-preview");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn dotenv_lookup_walks_up_parents() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(
            temp.path().join(".env"),
            "# keys\nOPENROUTER_API_KEY=sk-or-from-file\n",
        )?;
        std::fs::write(nested.join(".env"), "OTHER=1\n")?;

        assert_eq!(
            dotenv_value("OPENROUTER_API_KEY", &nested).as_deref(),
            Some("sk-or-from-file")
        );
        assert!(dotenv_value("GEMINI_API_KEY", &nested).is_none());
        Ok(())
    }
}
