//! Raster normalization and inline base64 payloads.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use banana_contracts::hook::PNG_MAGIC;
use image::ImageFormat;

use crate::error::CodecError;

pub const DEFAULT_MIME: &str = "image/png";

/// Which path `normalize_to_png` took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PngConversion {
    AlreadyPng(Vec<u8>),
    Converted(Vec<u8>),
    /// Decoding or re-encoding failed; the original bytes are kept.
    Passthrough { bytes: Vec<u8>, reason: String },
}

impl PngConversion {
    pub fn bytes(&self) -> &[u8] {
        match self {
            PngConversion::AlreadyPng(bytes) | PngConversion::Converted(bytes) => bytes,
            PngConversion::Passthrough { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PngConversion::AlreadyPng(bytes) | PngConversion::Converted(bytes) => bytes,
            PngConversion::Passthrough { bytes, .. } => bytes,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PngConversion::AlreadyPng(_) => "already_png",
            PngConversion::Converted(_) => "converted",
            PngConversion::Passthrough { .. } => "passthrough",
        }
    }
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_MAGIC)
}

pub fn normalize_to_png(bytes: Vec<u8>) -> PngConversion {
    if is_png(&bytes) {
        return PngConversion::AlreadyPng(bytes);
    }
    let decoded = match image::load_from_memory(&bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            return PngConversion::Passthrough {
                bytes,
                reason: format!("decode failed: {err}"),
            }
        }
    };
    let mut out = Cursor::new(Vec::new());
    match decoded.write_to(&mut out, ImageFormat::Png) {
        Ok(()) => PngConversion::Converted(out.into_inner()),
        Err(err) => PngConversion::Passthrough {
            bytes,
            reason: format!("png encode failed: {err}"),
        },
    }
}

/// MIME type from magic bytes, for provider output of unknown type.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if is_png(bytes) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MIME
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => DEFAULT_MIME,
    }
}

/// An edit-mode source image, read once before any network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn read(path: impl Into<PathBuf>) -> Result<Self, CodecError> {
        let path = path.into();
        if !path.is_file() {
            return Err(CodecError::SourceImageNotFound(path));
        }
        let bytes = std::fs::read(&path).map_err(|source| CodecError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            mime_type: mime_for_path(&path),
            path,
            bytes,
        })
    }

    pub fn data_uri(&self) -> String {
        data_uri(self.mime_type, &self.bytes)
    }
}

pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

pub fn to_data_uri(path: &Path) -> Result<String, CodecError> {
    SourceImage::read(path).map(|image| image.data_uri())
}

/// `(mime, bytes)` for a `data:` URI; `None` when it is not base64 image data.
pub fn decode_data_uri(value: &str) -> Option<(String, Vec<u8>)> {
    let (meta, payload) = value.trim().split_once(',')?;
    let meta = meta.trim().strip_prefix("data:")?;
    if !meta.ends_with(";base64") {
        return None;
    }
    let mime = meta
        .split(';')
        .next()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .unwrap_or(DEFAULT_MIME)
        .to_string();
    let bytes = BASE64.decode(payload.trim().as_bytes()).ok()?;
    Some((mime, bytes))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::{
        decode_data_uri, is_png, mime_for_path, normalize_to_png, sniff_mime, to_data_uri,
        PngConversion, SourceImage,
    };
    use crate::error::CodecError;

    fn encoded(format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let mut image = RgbImage::new(4, 3);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 40) as u8, (y * 60) as u8, 128]);
        }
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format)?;
        Ok(out.into_inner())
    }

    #[test]
    fn png_input_passes_through_untouched() -> anyhow::Result<()> {
        let png = encoded(ImageFormat::Png)?;
        let result = normalize_to_png(png.clone());
        assert_eq!(result, PngConversion::AlreadyPng(png));
        Ok(())
    }

    #[test]
    fn jpeg_input_is_converted() -> anyhow::Result<()> {
        let jpeg = encoded(ImageFormat::Jpeg)?;
        assert!(!is_png(&jpeg));
        let result = normalize_to_png(jpeg);
        assert_eq!(result.label(), "converted");
        assert!(is_png(result.bytes()));
        Ok(())
    }

    #[test]
    fn undecodable_input_is_kept_with_a_reason() {
        let result = normalize_to_png(b"not an image".to_vec());
        match result {
            PngConversion::Passthrough { bytes, reason } => {
                assert_eq!(bytes, b"not an image");
                assert!(reason.starts_with("decode failed"));
            }
            other => panic!("expected passthrough, got {}", other.label()),
        }
    }

    #[test]
    fn mime_table_defaults_to_png() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_for_path(Path::new("a.bmp")), "image/png");
        assert_eq!(mime_for_path(Path::new("noext")), "image/png");
    }

    #[test]
    fn sniffs_common_magic_bytes() -> anyhow::Result<()> {
        assert_eq!(sniff_mime(&encoded(ImageFormat::Png)?), "image/png");
        assert_eq!(sniff_mime(&encoded(ImageFormat::Jpeg)?), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime(b"??"), "image/png");
        Ok(())
    }

    #[test]
    fn data_uri_round_trip_is_lossless() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("photo.jpg");
        let original: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        std::fs::write(&path, &original)?;

        let uri = to_data_uri(&path)?;
        assert!(uri.starts_with("data:image/jpeg;base64,"));
        let (mime, decoded) =
            decode_data_uri(&uri).ok_or_else(|| anyhow::anyhow!("uri did not decode"))?;
        assert_eq!(mime, "image/jpeg");
        assert_eq!(decoded, original);
        Ok(())
    }

    #[test]
    fn missing_source_image_fails_before_reading() {
        let err = SourceImage::read("/definitely/not/here.png");
        assert!(matches!(err, Err(CodecError::SourceImageNotFound(_))));
    }

    #[test]
    fn non_base64_uris_are_rejected() {
        assert!(decode_data_uri("https://example.test/a.png").is_none());
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_none());
    }
}
