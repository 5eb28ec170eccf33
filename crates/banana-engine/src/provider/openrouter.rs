use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Map, Value};

use super::{
    embedded_error, non_empty, send_json, Completion, CompletionBackend, ContentPart,
    ImagePayload, Message, ProviderConfig, ProviderKind, Role,
};
use crate::codec::{data_uri, decode_data_uri};
use crate::config::non_empty_env;
use crate::error::ProviderError;

const KIND: ProviderKind = ProviderKind::OpenRouter;
const DEFAULT_REFERER: &str = "https://github.com/flight505/nano-banana";
const DEFAULT_TITLE: &str = "Nano Banana";

pub struct OpenRouterClient {
    http: HttpClient,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

impl OpenRouterClient {
    pub(super) fn new(config: &ProviderConfig, http: HttpClient) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        }
    }

    fn apply_attribution_headers(request: RequestBuilder) -> RequestBuilder {
        let referer =
            non_empty_env("OPENROUTER_HTTP_REFERER").unwrap_or_else(|| DEFAULT_REFERER.to_string());
        let title = non_empty_env("OPENROUTER_X_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string());
        request.header("HTTP-Referer", referer).header("X-Title", title)
    }
}

impl CompletionBackend for OpenRouterClient {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        wants_image: bool,
    ) -> Result<Completion, ProviderError> {
        let payload = build_payload(model, messages, wants_image);
        let request = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload);
        let response = send_json(KIND, Self::apply_attribution_headers(request), self.timeout)?;
        extract_completion(&response)
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Text-only messages go out as plain strings, mixed ones as content blocks.
pub(crate) fn build_payload(model: &str, messages: &[Message], wants_image: bool) -> Value {
    let wire_messages: Vec<Value> = messages
        .iter()
        .map(|message| {
            let content = if message.has_image() {
                let blocks: Vec<Value> = message
                    .parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => json!({ "type": "text", "text": text }),
                        ContentPart::Image { mime_type, data } => json!({
                            "type": "image_url",
                            "image_url": { "url": data_uri(mime_type, data) },
                        }),
                    })
                    .collect();
                Value::Array(blocks)
            } else {
                let text: Vec<&str> = message
                    .parts
                    .iter()
                    .filter_map(|part| match part {
                        ContentPart::Text(text) => Some(text.as_str()),
                        ContentPart::Image { .. } => None,
                    })
                    .collect();
                Value::String(text.join("\n"))
            };
            json!({ "role": role_name(message.role), "content": content })
        })
        .collect();

    let mut payload = Map::new();
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload.insert("messages".to_string(), Value::Array(wire_messages));
    if wants_image {
        payload.insert("modalities".to_string(), json!(["image", "text"]));
    }
    Value::Object(payload)
}

fn inline_data_uri_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=\r\n]+").ok())
        .as_ref()
}

fn image_from_uri(url: &str) -> Option<ImagePayload> {
    let (mime_type, bytes) = decode_data_uri(url)?;
    Some(ImagePayload {
        bytes,
        mime_type: Some(mime_type),
    })
}

fn block_url(block: &Value) -> Option<&str> {
    let image_url = block.get("image_url")?;
    image_url
        .get("url")
        .and_then(Value::as_str)
        .or_else(|| image_url.as_str())
}

/// `message.images` first, then image blocks in list content, then a data
/// URI embedded in string content. Remote URLs are not fetched.
fn extract_image(message: &Value) -> Option<ImagePayload> {
    if let Some(images) = message.get("images").and_then(Value::as_array) {
        if let Some(image) = images.iter().filter_map(block_url).find_map(image_from_uri) {
            return Some(image);
        }
    }
    match message.get("content") {
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("image_url"))
            .filter_map(block_url)
            .find_map(image_from_uri),
        Some(Value::String(content)) if content.contains("data:image") => {
            let found = inline_data_uri_pattern()?.find(content)?;
            let compact: String = found
                .as_str()
                .chars()
                .filter(|ch| !ch.is_whitespace())
                .collect();
            image_from_uri(&compact)
        }
        _ => None,
    }
}

fn extract_text(message: &Value) -> Option<String> {
    let content = match message.get("content") {
        Some(Value::String(content)) if !content.contains("data:image") => content.clone(),
        Some(Value::Array(blocks)) => blocks
            .iter()
            .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    };
    non_empty(content).or_else(|| {
        message
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string)
            .and_then(non_empty)
    })
}

pub(crate) fn extract_completion(payload: &Value) -> Result<Completion, ProviderError> {
    if let Some(reason) = embedded_error(payload) {
        return Err(ProviderError::Content {
            provider: KIND,
            reason,
        });
    }
    let Some(message) = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
    else {
        return Err(ProviderError::empty(KIND));
    };
    Completion {
        text: extract_text(message),
        image: extract_image(message),
    }
    .into_checked(KIND)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::json;

    use super::{build_payload, extract_completion};
    use crate::error::ProviderError;
    use crate::provider::Message;

    fn png_uri(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", BASE64.encode(bytes))
    }

    #[test]
    fn text_messages_stay_strings_and_images_become_blocks() {
        let payload = build_payload(
            "google/gemini-3-pro-image-preview",
            &[Message::user_with_image("edit", "image/png", vec![7, 7])],
            true,
        );
        let content = &payload["messages"][0]["content"];
        assert_eq!(content[0], json!({ "type": "text", "text": "edit" }));
        assert_eq!(content[1]["type"], json!("image_url"));
        assert_eq!(content[1]["image_url"]["url"], json!(png_uri(&[7, 7])));
        assert_eq!(payload["modalities"], json!(["image", "text"]));

        let review = build_payload("m", &[Message::user_text("rate")], false);
        assert_eq!(review["messages"][0]["content"], json!("rate"));
        assert!(review.get("modalities").is_none());
    }

    #[test]
    fn images_field_takes_priority() -> anyhow::Result<()> {
        let payload = json!({
            "choices": [{
                "message": {
                    "content": "Done.",
                    "images": [{ "type": "image_url", "image_url": { "url": png_uri(b"first") } }]
                }
            }]
        });
        let completion = extract_completion(&payload)?;
        assert_eq!(completion.text.as_deref(), Some("Done."));
        assert_eq!(completion.image.map(|image| image.bytes), Some(b"first".to_vec()));
        Ok(())
    }

    #[test]
    fn falls_back_to_content_blocks_and_inline_uris() -> anyhow::Result<()> {
        let blocks = json!({
            "choices": [{ "message": { "content": [
                { "type": "text", "text": "caption" },
                { "type": "image_url", "image_url": { "url": png_uri(b"block") } }
            ] } }]
        });
        let completion = extract_completion(&blocks)?;
        assert_eq!(completion.text.as_deref(), Some("caption"));
        assert_eq!(completion.image.map(|image| image.bytes), Some(b"block".to_vec()));

        let inline = json!({
            "choices": [{ "message": {
                "content": format!("Here you go: {}", png_uri(b"inline"))
            } }]
        });
        let completion = extract_completion(&inline)?;
        assert_eq!(completion.image.map(|image| image.bytes), Some(b"inline".to_vec()));
        Ok(())
    }

    #[test]
    fn reasoning_fills_in_for_missing_content() -> anyhow::Result<()> {
        let payload = json!({
            "choices": [{ "message": { "content": "", "reasoning": "SCORE: 8.0/10" } }]
        });
        assert_eq!(
            extract_completion(&payload)?.text.as_deref(),
            Some("SCORE: 8.0/10")
        );
        Ok(())
    }

    #[test]
    fn error_and_empty_payloads_fail() {
        assert!(matches!(
            extract_completion(&json!({ "error": { "message": "no credits" } })),
            Err(ProviderError::Content { ref reason, .. }) if reason == "no credits"
        ));
        assert!(matches!(
            extract_completion(&json!({ "choices": [] })),
            Err(ProviderError::Content { .. })
        ));
        assert!(matches!(
            extract_completion(&json!({ "choices": [{ "message": { "content": "" } }] })),
            Err(ProviderError::Content { ref reason, .. }) if reason == "No text or image in API response"
        ));
    }
}
