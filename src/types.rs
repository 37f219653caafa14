//! Core data model for spam classification.
//!
//! These are plain Send+Sync value types: everything a strategy returns has
//! already been through the validator, so the invariants documented here
//! (unit-interval scores, always-present reason text) hold by construction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity attached to a spam verdict. `Low` is the safe default used
/// whenever the oracle returns an unknown or missing level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for ThreatLevel {
    fn default() -> Self {
        ThreatLevel::Low
    }
}

/// A normalized classification verdict.
///
/// `confidence` and `pattern_similarity` are always within `[0.0, 1.0]`;
/// the optional fields are populated only by the strategy variants that own
/// them (`pattern_similarity`/`learning_feedback` by the memory strategy,
/// `category`/`risk_factors` by the multi-stage strategy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub is_spam: bool,
    pub reason: String,
    pub confidence: f64,
    pub threat_level: ThreatLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_factors: Option<Vec<String>>,
    /// Set by the orchestrator when the verdict was served from the cache.
    /// Never stored as `true`.
    #[serde(default)]
    pub from_cache: bool,
}

impl Verdict {
    /// The conservative default returned when classification cannot be
    /// completed (oracle outage, malformed output from every strategy).
    pub fn fail_safe() -> Self {
        Self {
            is_spam: false,
            reason: "analysis failed, defaulting to safe classification".to_string(),
            confidence: 0.5,
            threat_level: ThreatLevel::Low,
            pattern_similarity: None,
            learning_feedback: None,
            category: None,
            risk_factors: None,
            from_cache: false,
        }
    }

    /// Fixed verdict for empty/blank input; no oracle call is ever made.
    pub fn empty_input() -> Self {
        Self {
            is_spam: false,
            reason: "empty input, nothing to classify".to_string(),
            confidence: 1.0,
            threat_level: ThreatLevel::Low,
            pattern_similarity: None,
            learning_feedback: None,
            category: None,
            risk_factors: None,
            from_cache: false,
        }
    }
}

/// Aggregate decision derived from multiple strategy verdicts.
///
/// Recomputed on every comparison request; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub is_spam: bool,
    /// Arithmetic mean of the contributing confidences.
    pub confidence: f64,
    /// Fraction of strategies on the majority side; 1.0 when unanimous.
    pub agreement: f64,
    /// Number of verdicts that contributed to the reduction.
    pub strategies_counted: usize,
}

/// Result of running every configured strategy against the same input.
/// A strategy that failed is simply absent from `per_strategy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub per_strategy: HashMap<String, Verdict>,
    pub consensus: ConsensusResult,
}
