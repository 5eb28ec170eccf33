//! Single-shot generate or edit, without review.

use std::path::{Path, PathBuf};

use crate::codec::{normalize_to_png, SourceImage};
use crate::error::{GenerateError, ProviderError};
use crate::provider::{CompletionBackend, Message};

pub const DEFAULT_IMAGE_OUTPUT: &str = "generated_image.png";

#[derive(Debug, Clone)]
pub struct SingleShot {
    pub path: PathBuf,
    pub bytes: usize,
    pub text: Option<String>,
}

/// First free `<stem>_edited.png`, `<stem>_edited_2.png`, ... next to `input`.
pub fn next_edit_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("image");
    let first = input.with_file_name(format!("{stem}_edited.png"));
    if !first.exists() {
        return first;
    }
    (2u32..)
        .map(|n| input.with_file_name(format!("{stem}_edited_{n}.png")))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

pub fn generate_single<B: CompletionBackend>(
    backend: &B,
    model: &str,
    prompt: &str,
    source: Option<&SourceImage>,
    output: &Path,
) -> Result<SingleShot, GenerateError> {
    let message = match source {
        Some(image) => Message::user_with_image(prompt, image.mime_type, image.bytes.clone()),
        None => Message::user_text(prompt),
    };
    tracing::info!(provider = %backend.kind(), model, edit = source.is_some(), "requesting image");
    let completion = backend.complete(model, &[message], true)?;
    let image = completion
        .image
        .ok_or_else(|| ProviderError::no_image(backend.kind()))?;

    let is_png_output = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    let bytes = if is_png_output {
        let converted = normalize_to_png(image.bytes);
        tracing::debug!(path = converted.label(), "normalized output");
        converted.into_bytes()
    } else {
        image.bytes
    };

    if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|err| GenerateError::write(dir, err))?;
    }
    std::fs::write(output, &bytes).map_err(|err| GenerateError::write(output, err))?;
    Ok(SingleShot {
        path: output.to_path_buf(),
        bytes: bytes.len(),
        text: completion.text,
    })
}
