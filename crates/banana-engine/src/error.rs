use std::path::PathBuf;

use crate::provider::ProviderKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "No API key found. Set GEMINI_API_KEY (preferred, https://aistudio.google.com/apikey) \
         or OPENROUTER_API_KEY (https://openrouter.ai/keys), or pass --api-key"
    )]
    NoCredentials,

    #[error("{} not found. Get one at: {}", .0.key_env(), .0.key_url())]
    MissingKey(ProviderKind),

    #[error("{0}")]
    UnknownDocType(String),

    #[error("Unknown provider '{0}'. Expected google or openrouter")]
    UnknownProvider(String),

    #[error("Iterations must be between 1 and {max} (got {got})")]
    InvalidIterations { got: u32, max: u32 },
}

/// Failures of a single provider call. Display text carries the markers the
/// output validator keys on (`API Error (401)`, `timed out`, ...).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{} not found for {provider}", .provider.key_env())]
    MissingKey { provider: ProviderKind },

    #[error("{provider} API Error ({status}): {detail}")]
    Auth {
        provider: ProviderKind,
        status: u16,
        detail: String,
    },

    #[error("{provider} API Error (429): {detail}")]
    RateLimit {
        provider: ProviderKind,
        detail: String,
    },

    #[error("{provider} request timed out after {seconds}s (use --timeout to increase)")]
    Timeout { provider: ProviderKind, seconds: u64 },

    #[error("{provider}: {reason}")]
    Content {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} API Error ({status}): {detail}")]
    Http {
        provider: ProviderKind,
        status: u16,
        detail: String,
    },

    #[error("{provider} request failed: {detail}")]
    Transport {
        provider: ProviderKind,
        detail: String,
    },
}

impl ProviderError {
    pub fn no_image(provider: ProviderKind) -> Self {
        ProviderError::Content {
            provider,
            reason: "No image data in API response".to_string(),
        }
    }

    pub fn empty(provider: ProviderKind) -> Self {
        ProviderError::Content {
            provider,
            reason: "No text or image in API response".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Image file not found: {}", .0.display())]
    SourceImageNotFound(PathBuf),

    #[error("failed reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("failed writing {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
}

impl GenerateError {
    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        GenerateError::Write {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::provider::ProviderKind;

    use super::{CodecError, ConfigError, ProviderError};

    #[test]
    fn display_text_carries_validator_markers() {
        let auth = ProviderError::Auth {
            provider: ProviderKind::OpenRouter,
            status: 401,
            detail: "User not found.".to_string(),
        };
        assert_eq!(auth.to_string(), "openrouter API Error (401): User not found.");

        let timeout = ProviderError::Timeout {
            provider: ProviderKind::Google,
            seconds: 120,
        };
        assert!(timeout.to_string().contains("timed out"));

        assert_eq!(
            ProviderError::no_image(ProviderKind::Google).to_string(),
            "google: No image data in API response"
        );
        assert_eq!(
            ConfigError::MissingKey(ProviderKind::OpenRouter).to_string(),
            "OPENROUTER_API_KEY not found. Get one at: https://openrouter.ai/keys"
        );
        assert!(CodecError::SourceImageNotFound("a/b.png".into())
            .to_string()
            .starts_with("Image file not found: a/b.png"));
    }
}
