use super::ReasonCode;

#[derive(Clone, Copy, Debug)]
pub(crate) struct FailurePattern {
    /// Lowercase needle matched against the lowercased command result.
    pub needle: &'static str,
    pub reason: ReasonCode,
    pub guidance: &'static str,
}

const SETUP_GUIDANCE: &str = "API key not configured. Run /nano-banana:setup to configure GEMINI_API_KEY or OPENROUTER_API_KEY.";

/// Ordered; first match wins.
pub(crate) const KNOWN_FAILURES: &[FailurePattern] = &[
    FailurePattern {
        needle: "api_key not found",
        reason: ReasonCode::MissingCredentials,
        guidance: SETUP_GUIDANCE,
    },
    FailurePattern {
        needle: "no api key found",
        reason: ReasonCode::MissingCredentials,
        guidance: SETUP_GUIDANCE,
    },
    FailurePattern {
        needle: "api error (401)",
        reason: ReasonCode::InvalidApiKey,
        guidance: "API key is invalid or expired. Check your API key at https://openrouter.ai/keys or https://aistudio.google.com/apikey",
    },
    FailurePattern {
        needle: "api error (403)",
        reason: ReasonCode::PermissionDenied,
        guidance: "API key lacks permissions. Check your API key at https://openrouter.ai/keys or https://aistudio.google.com/apikey",
    },
    FailurePattern {
        needle: "api error (429)",
        reason: ReasonCode::RateLimited,
        guidance: "Rate limited by the provider. Wait a moment and retry later, or check your account credits.",
    },
    FailurePattern {
        needle: "timed out",
        reason: ReasonCode::TimedOut,
        guidance: "Request timed out. Try a simpler prompt, retry, or use --timeout to increase the limit.",
    },
    FailurePattern {
        needle: "image file not found",
        reason: ReasonCode::SourceImageMissing,
        guidance: "Source image path does not exist. Verify the file path and try again.",
    },
    FailurePattern {
        needle: "no image data in api response",
        reason: ReasonCode::NoImageReturned,
        guidance: "API returned no image. The model may have refused the prompt. Try rephrasing.",
    },
    FailurePattern {
        needle: "no text or image in api response",
        reason: ReasonCode::EmptyResponse,
        guidance: "API returned an empty response. Check that your account has credits.",
    },
];

/// Case-sensitive generic markers, checked only when no known failure matched.
pub(crate) const GENERIC_FAILURE_MARKERS: &[&str] = &["Generation failed", "Error: "];

pub(crate) const GENERIC_FAILURE_GUIDANCE: &str =
    "Image generation failed. Check the error output above for details.";

pub(crate) fn match_known_failure(result_text: &str) -> Option<&'static FailurePattern> {
    let lowered = result_text.to_lowercase();
    KNOWN_FAILURES
        .iter()
        .find(|pattern| lowered.contains(pattern.needle))
}

pub(crate) fn has_generic_failure(result_text: &str) -> bool {
    GENERIC_FAILURE_MARKERS
        .iter()
        .any(|marker| result_text.contains(marker))
}
