//! One `complete` call over two wire shapes.
//!
//! The backend is fixed when the client is built; replies are normalized
//! into [`Completion`] regardless of where each provider nests its payload.
//! A single attempt is made per call.

mod google;
mod openrouter;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use serde_json::Value;

use crate::error::{ConfigError, ProviderError};

pub use google::GoogleClient;
pub use openrouter::OpenRouterClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    OpenRouter,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn key_env(self) -> &'static str {
        match self {
            ProviderKind::Google => "GEMINI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Environment variables checked for this provider's key, in order.
    pub fn key_envs(self) -> &'static [&'static str] {
        match self {
            ProviderKind::Google => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
            ProviderKind::OpenRouter => &["OPENROUTER_API_KEY"],
        }
    }

    pub fn key_url(self) -> &'static str {
        match self {
            ProviderKind::Google => "https://aistudio.google.com/apikey",
            ProviderKind::OpenRouter => "https://openrouter.ai/keys",
        }
    }

    pub fn api_base_env(self) -> &'static str {
        match self {
            ProviderKind::Google => "GEMINI_API_BASE",
            ProviderKind::OpenRouter => "OPENROUTER_API_BASE",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            ProviderKind::Google => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    pub fn default_image_model(self) -> &'static str {
        match self {
            ProviderKind::Google => "gemini-3-pro-image-preview",
            ProviderKind::OpenRouter => "google/gemini-3-pro-image-preview",
        }
    }

    pub fn default_review_model(self) -> &'static str {
        match self {
            ProviderKind::Google => "gemini-3-pro-preview",
            ProviderKind::OpenRouter => "google/gemini-3-pro-preview",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Ok(ProviderKind::Google),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: String,
    pub image_model: String,
    pub review_model: String,
    pub request_timeout: Duration,
    pub api_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { mime_type: String, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user_with_image(text: impl Into<String>, mime_type: &str, data: Vec<u8>) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                ContentPart::Text(text.into()),
                ContentPart::Image {
                    mime_type: mime_type.to_string(),
                    data,
                },
            ],
        }
    }

    pub fn has_image(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, ContentPart::Image { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: Option<String>,
    pub image: Option<ImagePayload>,
}

impl Completion {
    fn into_checked(self, provider: ProviderKind) -> Result<Self, ProviderError> {
        if self.text.is_none() && self.image.is_none() {
            return Err(ProviderError::empty(provider));
        }
        Ok(self)
    }
}

pub trait CompletionBackend {
    fn kind(&self) -> ProviderKind;

    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        wants_image: bool,
    ) -> Result<Completion, ProviderError>;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for &B {
    fn kind(&self) -> ProviderKind {
        (**self).kind()
    }

    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        wants_image: bool,
    ) -> Result<Completion, ProviderError> {
        (**self).complete(model, messages, wants_image)
    }
}

/// The configured backend; selected once, never by inspecting replies.
pub enum ProviderClient {
    Google(GoogleClient),
    OpenRouter(OpenRouterClient),
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Err(ProviderError::MissingKey {
                provider: config.kind,
            });
        }
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ProviderError::Transport {
                provider: config.kind,
                detail: err.to_string(),
            })?;
        Ok(match config.kind {
            ProviderKind::Google => ProviderClient::Google(GoogleClient::new(config, http)),
            ProviderKind::OpenRouter => {
                ProviderClient::OpenRouter(OpenRouterClient::new(config, http))
            }
        })
    }
}

impl CompletionBackend for ProviderClient {
    fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::Google(_) => ProviderKind::Google,
            ProviderClient::OpenRouter(_) => ProviderKind::OpenRouter,
        }
    }

    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        wants_image: bool,
    ) -> Result<Completion, ProviderError> {
        match self {
            ProviderClient::Google(client) => client.complete(model, messages, wants_image),
            ProviderClient::OpenRouter(client) => client.complete(model, messages, wants_image),
        }
    }
}

pub(crate) fn send_json(
    provider: ProviderKind,
    request: RequestBuilder,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    tracing::debug!(%provider, "sending provider request");
    let response = request.send().map_err(|err| {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                seconds: timeout.as_secs(),
            }
        } else {
            ProviderError::Transport {
                provider,
                detail: err.to_string(),
            }
        }
    })?;
    response_json_or_error(provider, response, timeout)
}

fn response_json_or_error(
    provider: ProviderKind,
    response: HttpResponse,
    timeout: Duration,
) -> Result<Value, ProviderError> {
    let status = response.status().as_u16();
    let body = response.text().map_err(|err| {
        if err.is_timeout() {
            ProviderError::Timeout {
                provider,
                seconds: timeout.as_secs(),
            }
        } else {
            ProviderError::Transport {
                provider,
                detail: format!("response body read failed: {err}"),
            }
        }
    })?;
    tracing::debug!(%provider, status, bytes = body.len(), "provider responded");
    classify_status(provider, status, &body)?;
    serde_json::from_str(&body).map_err(|_| ProviderError::Content {
        provider,
        reason: format!(
            "returned invalid JSON payload: {}",
            truncate_text(&body, 200)
        ),
    })
}

pub(crate) fn classify_status(
    provider: ProviderKind,
    status: u16,
    body: &str,
) -> Result<(), ProviderError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let detail = error_detail(body);
    Err(match status {
        401 | 403 => ProviderError::Auth {
            provider,
            status,
            detail,
        },
        429 => ProviderError::RateLimit { provider, detail },
        _ => ProviderError::Http {
            provider,
            status,
            detail,
        },
    })
}

/// `error.message` from a JSON error body, else the truncated raw body.
pub(crate) fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| embedded_error(&value))
        .unwrap_or_else(|| truncate_text(body.trim(), 512))
}

/// Error object some providers return alongside a 200.
pub(crate) fn embedded_error(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    match error {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(obj) => Some(
            obj.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
