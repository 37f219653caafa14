//! Memory-augmented strategy.
//!
//! Keeps a bounded in-process memory of previously classified patterns
//! (fingerprint plus a keyword token set) and consults it before the oracle
//! call to compute a pattern-similarity score. The memory is internal to
//! this strategy: lookups never touch the shared verdict cache and never
//! block sibling strategies in a comparison.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::errors::ClassifierError;
use crate::fingerprint::{self, CanonicalText};
use crate::provider::LlmProvider;
use crate::types::Verdict;
use crate::validator;

use super::{ClassificationStrategy, VERDICT_SCHEMA_HINT};

/// Maximum remembered patterns; oldest-first eviction beyond this.
const MEMORY_CAPACITY: usize = 200;

/// Keyword tokens kept per remembered pattern.
const MAX_TOKENS: usize = 32;

#[derive(Debug, Clone)]
struct PatternRecord {
    tokens: HashSet<String>,
    is_spam: bool,
}

#[derive(Debug, Default)]
struct PatternMemory {
    records: HashMap<String, PatternRecord>,
    insertion_order: VecDeque<String>,
}

impl PatternMemory {
    /// Similarity of the given input to remembered patterns: 1.0 on exact
    /// fingerprint recall, otherwise the best Jaccard overlap of keyword
    /// token sets.
    fn recall(&self, fp: &str, tokens: &HashSet<String>) -> (f64, Option<bool>) {
        if let Some(record) = self.records.get(fp) {
            return (1.0, Some(record.is_spam));
        }
        let mut best = 0.0f64;
        let mut best_spam = None;
        for record in self.records.values() {
            let intersection = record.tokens.intersection(tokens).count();
            let union = record.tokens.union(tokens).count();
            if union == 0 {
                continue;
            }
            let jaccard = intersection as f64 / union as f64;
            if jaccard > best {
                best = jaccard;
                best_spam = Some(record.is_spam);
            }
        }
        (best, best_spam)
    }

    fn record(&mut self, fp: String, tokens: HashSet<String>, is_spam: bool) {
        if self.records.contains_key(&fp) {
            if let Some(record) = self.records.get_mut(&fp) {
                record.is_spam = is_spam;
            }
            return;
        }
        if self.records.len() >= MEMORY_CAPACITY {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.records.remove(&oldest);
            }
        }
        self.records.insert(fp.clone(), PatternRecord { tokens, is_spam });
        self.insertion_order.push_back(fp);
    }
}

pub struct MemoryStrategy {
    provider: Arc<dyn LlmProvider>,
    memory: Mutex<PatternMemory>,
}

impl MemoryStrategy {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            memory: Mutex::new(PatternMemory::default()),
        }
    }

    /// Forget every remembered pattern.
    pub fn clear_memory(&self) {
        let mut memory = self.memory.lock().expect("pattern memory lock poisoned");
        memory.records.clear();
        memory.insertion_order.clear();
    }

    pub fn remembered_patterns(&self) -> usize {
        self.memory
            .lock()
            .expect("pattern memory lock poisoned")
            .records
            .len()
    }

    fn tokenize(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() >= 4)
            .take(MAX_TOKENS)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl ClassificationStrategy for MemoryStrategy {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn classify(&self, text: &CanonicalText) -> Result<Verdict, ClassifierError> {
        let fp = fingerprint::fingerprint(text);
        let tokens = Self::tokenize(text.as_str());

        let (similarity, prior_spam) = {
            let memory = self.memory.lock().expect("pattern memory lock poisoned");
            memory.recall(&fp, &tokens)
        };
        debug!(similarity, ?prior_spam, "pattern memory recall");

        let memory_context = match prior_spam {
            Some(true) if similarity > 0.0 => format!(
                "A previously seen pattern with similarity {:.2} was judged spam.",
                similarity
            ),
            Some(false) if similarity > 0.0 => format!(
                "A previously seen pattern with similarity {:.2} was judged legitimate.",
                similarity
            ),
            _ => "No similar pattern is on record.".to_string(),
        };
        let prompt = format!(
            "Classify the following email as spam or legitimate. {} {} Additionally \
             include \"pattern_similarity\": number 0..1 and \"learning_feedback\": string.\n\nEmail:\n{}",
            memory_context,
            VERDICT_SCHEMA_HINT,
            text.as_str()
        );

        let body = self.provider.complete(&prompt).await?;
        let mut verdict = validator::sanitize(&validator::parse_raw_verdict(&body)?);

        // The locally recalled similarity is authoritative when the oracle
        // omits or underreports the field.
        let claimed = verdict.pattern_similarity.unwrap_or(0.0);
        verdict.pattern_similarity = Some(validator::clamp_unit(claimed.max(similarity), 0.0));
        if verdict.learning_feedback.is_none() {
            verdict.learning_feedback = Some(memory_context);
        }
        verdict.category = None;
        verdict.risk_factors = None;

        {
            let mut memory = self.memory.lock().expect("pattern memory lock poisoned");
            memory.record(fp, tokens, verdict.is_spam);
        }

        Ok(verdict)
    }
}
