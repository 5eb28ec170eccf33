//! Provider clients, image codec and the generate/review loop.

pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod prompts;
pub mod provider;
pub mod single;

pub use codec::{normalize_to_png, PngConversion, SourceImage};
pub use config::{lookup_env, resolve_provider_config, ProviderOptions, DEFAULT_TIMEOUT_SECS};
pub use error::{CodecError, ConfigError, GenerateError, ProviderError};
pub use generator::{GenerationReport, GenerationRequest, Generator, Outcome};
pub use provider::{
    Completion, CompletionBackend, ContentPart, ImagePayload, Message, ProviderClient,
    ProviderConfig, ProviderKind,
};
pub use single::{generate_single, next_edit_output, SingleShot, DEFAULT_IMAGE_OUTPUT};
