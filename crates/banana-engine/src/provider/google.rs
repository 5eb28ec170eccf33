use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Map, Value};

use super::{
    embedded_error, non_empty, send_json, Completion, CompletionBackend, ContentPart,
    ImagePayload, Message, ProviderConfig, ProviderKind, Role,
};
use crate::error::ProviderError;

const KIND: ProviderKind = ProviderKind::Google;

pub struct GoogleClient {
    http: HttpClient,
    api_key: String,
    api_base: String,
    timeout: Duration,
}

impl GoogleClient {
    pub(super) fn new(config: &ProviderConfig, http: HttpClient) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        endpoint(&self.api_base, model)
    }
}

impl CompletionBackend for GoogleClient {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    fn complete(
        &self,
        model: &str,
        messages: &[Message],
        wants_image: bool,
    ) -> Result<Completion, ProviderError> {
        let payload = build_payload(messages, wants_image);
        let request = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);
        let response = send_json(KIND, request, self.timeout)?;
        extract_completion(&response)
    }
}

fn endpoint(api_base: &str, model: &str) -> String {
    let model = model.trim().trim_start_matches("models/");
    format!("{api_base}/models/{model}:generateContent")
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

pub(crate) fn build_payload(messages: &[Message], wants_image: bool) -> Value {
    let contents: Vec<Value> = messages
        .iter()
        .map(|message| {
            let parts: Vec<Value> = message
                .parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => json!({ "text": text }),
                    ContentPart::Image { mime_type, data } => json!({
                        "inline_data": {
                            "mime_type": mime_type,
                            "data": BASE64.encode(data),
                        }
                    }),
                })
                .collect();
            json!({ "role": role_name(message.role), "parts": parts })
        })
        .collect();

    let mut payload = Map::new();
    payload.insert("contents".to_string(), Value::Array(contents));
    if wants_image {
        payload.insert(
            "generationConfig".to_string(),
            json!({ "responseModalities": ["TEXT", "IMAGE"] }),
        );
    }
    Value::Object(payload)
}

/// First candidate only; thought parts are skipped.
pub(crate) fn extract_completion(payload: &Value) -> Result<Completion, ProviderError> {
    if let Some(reason) = embedded_error(payload) {
        return Err(ProviderError::Content {
            provider: KIND,
            reason,
        });
    }
    let parts = payload
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    let mut image = None;
    for part in &parts {
        if part.get("thought").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        if let Some(chunk) = part.get("text").and_then(Value::as_str) {
            if !text.is_empty() && !chunk.is_empty() {
                text.push('\n');
            }
            text.push_str(chunk);
            continue;
        }
        if image.is_some() {
            continue;
        }
        let Some(inline) = part
            .get("inlineData")
            .or_else(|| part.get("inline_data"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        let mime_type = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(mime) = &mime_type {
            if !mime.starts_with("image/") {
                continue;
            }
        }
        let data = inline.get("data").and_then(Value::as_str).unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let bytes = BASE64
            .decode(data.trim().as_bytes())
            .map_err(|err| ProviderError::Content {
                provider: KIND,
                reason: format!("image base64 decode failed: {err}"),
            })?;
        image = Some(ImagePayload { bytes, mime_type });
    }

    Completion {
        text: non_empty(text),
        image,
    }
    .into_checked(KIND)
}

#[cfg(test)]
mod tests {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::json;

    use super::{build_payload, endpoint, extract_completion};
    use crate::error::ProviderError;
    use crate::provider::Message;

    #[test]
    fn endpoint_strips_models_prefix() {
        assert_eq!(
            endpoint("https://example.test/v1beta", "models/gemini-3-pro-preview"),
            "https://example.test/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn payload_inlines_images_and_requests_modalities() {
        let messages = [Message::user_with_image("edit this", "image/jpeg", vec![1, 2, 3])];
        let payload = build_payload(&messages, true);
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(payload["contents"][0]["role"], json!("user"));
        assert_eq!(parts[0]["text"], json!("edit this"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], json!("image/jpeg"));
        assert_eq!(parts[1]["inline_data"]["data"], json!(BASE64.encode([1u8, 2, 3])));
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["TEXT", "IMAGE"])
        );

        let review = build_payload(&[Message::user_text("score it")], false);
        assert!(review.get("generationConfig").is_none());
    }

    #[test]
    fn extracts_text_and_first_image_in_either_casing() -> anyhow::Result<()> {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "planning", "thought": true },
                        { "text": "Here is the diagram." },
                        { "inlineData": { "mimeType": "image/png", "data": BASE64.encode(b"png!") } },
                        { "inline_data": { "mime_type": "image/png", "data": BASE64.encode(b"second") } }
                    ]
                }
            }]
        });
        let completion = extract_completion(&payload)?;
        assert_eq!(completion.text.as_deref(), Some("Here is the diagram."));
        let image = completion.image.ok_or_else(|| anyhow::anyhow!("missing image"))?;
        assert_eq!(image.bytes, b"png!");
        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
        Ok(())
    }

    #[test]
    fn empty_or_error_payloads_fail() {
        assert!(matches!(
            extract_completion(&json!({ "candidates": [] })),
            Err(ProviderError::Content { ref reason, .. }) if reason == "No text or image in API response"
        ));
        assert!(matches!(
            extract_completion(&json!({ "error": { "message": "blocked" } })),
            Err(ProviderError::Content { ref reason, .. }) if reason == "blocked"
        ));
    }
}
