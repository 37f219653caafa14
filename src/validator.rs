//! Repair of untrusted oracle output.
//!
//! Every field coming back from an oracle call is treated as optionally
//! absent, out of range, or of the wrong type. Nothing in here rejects:
//! out-of-range numbers are clamped, unknown enums fall back to the safe
//! default, missing text gets a fixed placeholder. The only hard failure is
//! a body with no parseable JSON object at all, which the strategy boundary
//! converts into a dropped/fail-safe result.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::ClassifierError;
use crate::types::{ThreatLevel, Verdict};

/// Default reason/feedback text when the oracle omits the field.
pub const DEFAULT_REASON: &str = "Analysis performed";

/// Clamp a value into `[0.0, 1.0]`. Non-finite input yields `default`.
pub fn clamp_unit(value: f64, default: f64) -> f64 {
    if !value.is_finite() {
        return default;
    }
    value.clamp(0.0, 1.0)
}

/// Coerce a loose JSON value (number, or numeric string) into the unit
/// interval; anything else yields `default`.
pub fn coerce_unit(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) => clamp_unit(v, default),
        None => default,
    }
}

/// Coerce a loose JSON value (bool, "true"/"false", 0/1) into a bool.
pub fn coerce_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "spam" | "1" => true,
            "false" | "no" | "legitimate" | "0" => false,
            _ => default,
        },
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
        _ => default,
    }
}

/// Coerce a threat-level string into the enum; unknown values fall back to
/// `Low`.
pub fn coerce_threat(value: Option<&str>) -> ThreatLevel {
    match value.map(|s| s.trim().to_uppercase()).as_deref() {
        Some("MEDIUM") => ThreatLevel::Medium,
        Some("HIGH") => ThreatLevel::High,
        Some("CRITICAL") => ThreatLevel::Critical,
        _ => ThreatLevel::Low,
    }
}

/// Verdict fields as the oracle actually returns them: every field optional
/// and loosely typed. Accepts both snake_case and camelCase spellings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawVerdict {
    #[serde(alias = "isSpam")]
    pub is_spam: Option<Value>,
    pub reason: Option<String>,
    pub confidence: Option<Value>,
    #[serde(alias = "threatLevel")]
    pub threat_level: Option<String>,
    #[serde(alias = "patternSimilarity")]
    pub pattern_similarity: Option<Value>,
    #[serde(alias = "learningFeedback")]
    pub learning_feedback: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "riskFactors")]
    pub risk_factors: Option<Value>,
}

/// Extract the JSON object from an oracle reply that may be wrapped in
/// markdown fences or surrounding prose: first `{` through last `}`.
pub fn extract_json(text: &str) -> &str {
    let start = text.find('{').unwrap_or(0);
    let end = text.rfind('}').map(|i| i + 1).unwrap_or(text.len());
    if start < end {
        &text[start..end]
    } else {
        text
    }
}

/// Parse an oracle reply into a `RawVerdict`.
pub fn parse_raw_verdict(body: &str) -> Result<RawVerdict, ClassifierError> {
    serde_json::from_str(extract_json(body))
        .map_err(|e| ClassifierError::MalformedResponse(format!("verdict JSON: {}", e)))
}

/// Normalize a raw verdict into the validated data model.
///
/// Clamps confidence and pattern similarity into `[0,1]`, coerces the
/// threat level, and fills textual defaults. Optional strategy-owned fields
/// are carried through when present; the calling strategy strips the ones
/// it does not own.
pub fn sanitize(raw: &RawVerdict) -> Verdict {
    let risk_factors = raw.risk_factors.as_ref().and_then(|v| match v {
        Value::Array(items) => {
            let factors: Vec<String> = items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect();
            if factors.is_empty() {
                None
            } else {
                Some(factors)
            }
        }
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        _ => None,
    });

    Verdict {
        is_spam: coerce_bool(raw.is_spam.as_ref(), false),
        reason: raw
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON)
            .to_string(),
        confidence: coerce_unit(raw.confidence.as_ref(), 0.5),
        threat_level: coerce_threat(raw.threat_level.as_deref()),
        pattern_similarity: raw
            .pattern_similarity
            .as_ref()
            .map(|v| coerce_unit(Some(v), 0.0)),
        learning_feedback: raw
            .learning_feedback
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string),
        category: raw.category.clone(),
        risk_factors,
        from_cache: false,
    }
}
