//! Input normalization and content fingerprinting.
//!
//! Normalization trims the text, rewrites instruction-override phrases with
//! a fixed redaction marker (the input being classified must not be able to
//! steer the downstream oracle), and truncates to a fixed bound. The
//! fingerprint is a SHA-256 digest of the case-folded canonical text and is
//! used only as a cache key.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Default maximum canonical text length, in characters. Longer input is
/// truncated with a trailing ellipsis before being sent to any strategy.
/// Overridable per classifier via `ClassifierConfig::max_input_chars`.
pub const MAX_INPUT_CHARS: usize = 3000;

/// Marker substituted for instruction-override phrases.
pub const REDACTION_MARKER: &str = "[redacted]";

// An "ignore/disregard/forget" verb followed in the same clause by a
// previous/above/instruction/prompt reference.
static INSTRUCTION_OVERRIDE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:ignore|disregard|forget)\b[^.!?\n]{0,120}?\b(?:previous|above|instructions?|prompts?)\b",
    )
    .expect("instruction-override pattern is valid")
});

/// Canonical form of an input text: trimmed, redacted, length-bounded.
/// Case is preserved; case-folding happens only inside [`fingerprint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalText(String);

impl CanonicalText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize raw input text with the default length bound. The
/// pre-truncation text is never forwarded downstream; callers hand
/// strategies only the returned value.
pub fn normalize(text: &str) -> CanonicalText {
    normalize_with_limit(text, MAX_INPUT_CHARS)
}

/// Canonicalize raw input text, truncating to `max_chars` characters.
pub fn normalize_with_limit(text: &str, max_chars: usize) -> CanonicalText {
    let trimmed = text.trim();
    let redacted = INSTRUCTION_OVERRIDE.replace_all(trimmed, REDACTION_MARKER);

    let mut canonical: String = redacted.chars().take(max_chars).collect();
    if redacted.chars().count() > max_chars {
        canonical.push('…');
    }
    CanonicalText(canonical)
}

/// Stable digest of canonical text, hex encoded.
///
/// Equal normalized text always yields an equal fingerprint; whitespace-only
/// and case-only differences in the original input collapse to the same
/// digest.
pub fn fingerprint(canonical: &CanonicalText) -> String {
    let folded = canonical.as_str().trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(folded.as_bytes());
    format!("{:x}", hasher.finalize())
}
