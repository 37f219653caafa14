//! Classification orchestrator and consensus reduction.
//!
//! Single-strategy path per request:
//! fingerprint → cache lookup → (hit: return cached) → strategy → cache
//! write → return. Any strategy failure recovers to the fail-safe verdict;
//! nothing here is fatal and no error reaches the caller.
//!
//! The comparison path fans out to every configured strategy concurrently
//! and fans in by waiting for all to settle; a failing strategy is dropped
//! from the consensus reduction rather than failing the whole comparison.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, VerdictCache};
use crate::config::ClassifierConfig;
use crate::errors::ClassifierError;
use crate::fingerprint::{self, CanonicalText};
use crate::provider::ProviderFactory;
use crate::strategies::{
    ClassificationStrategy, MemoryStrategy, MultiStageStrategy, SinglePassStrategy,
};
use crate::types::{ComparisonReport, ConsensusResult, Verdict};

/// Orchestrates strategies, cache and validation behind an infallible
/// classification surface.
pub struct SpamClassifier {
    cache: VerdictCache,
    cache_enabled: bool,
    max_input_chars: usize,
    strategies: Vec<Arc<dyn ClassificationStrategy>>,
    memory: Option<Arc<MemoryStrategy>>,
}

impl SpamClassifier {
    /// Build the classifier from configuration: provider via the factory,
    /// the three standard strategies, and the verdict cache.
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        if let Err(errors) = config.validate() {
            return Err(ClassifierError::Config(errors.join("; ")));
        }
        let provider = ProviderFactory::create(&config.provider)?;
        info!(provider = %provider.info().name, model = %provider.info().model, "building classifier");

        let memory = Arc::new(MemoryStrategy::new(Arc::clone(&provider)));
        let strategies: Vec<Arc<dyn ClassificationStrategy>> = vec![
            Arc::new(SinglePassStrategy::new(Arc::clone(&provider))),
            Arc::new(MultiStageStrategy::new(Arc::clone(&provider))),
            Arc::clone(&memory) as Arc<dyn ClassificationStrategy>,
        ];

        Ok(Self {
            cache: VerdictCache::new(&config.cache),
            cache_enabled: config.cache.enabled,
            max_input_chars: config.max_input_chars,
            strategies,
            memory: Some(memory),
        })
    }

    /// Build a classifier over caller-supplied strategies. Used by tests
    /// and by callers embedding custom strategy sets; the memory
    /// administration surface is inert for such sets.
    pub fn with_strategies(
        config: &ClassifierConfig,
        strategies: Vec<Arc<dyn ClassificationStrategy>>,
    ) -> Self {
        Self {
            cache: VerdictCache::new(&config.cache),
            cache_enabled: config.cache.enabled,
            max_input_chars: config.max_input_chars.max(1),
            strategies,
            memory: None,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Classify with one named strategy. Never fails: empty input, unknown
    /// strategy names and oracle failures all map to fixed verdicts.
    pub async fn classify(&self, text: &str, strategy_name: &str) -> Verdict {
        if text.trim().is_empty() {
            debug!("empty input, short-circuiting without oracle call");
            return Verdict::empty_input();
        }

        let strategy = match self.strategies.iter().find(|s| s.name() == strategy_name) {
            Some(s) => Arc::clone(s),
            None => {
                warn!(strategy = strategy_name, "unknown strategy requested");
                return Verdict::fail_safe();
            }
        };

        let canonical = fingerprint::normalize_with_limit(text, self.max_input_chars);
        let fp = fingerprint::fingerprint(&canonical);

        if self.cache_enabled {
            if let Some(mut cached) = self.cache.get(&fp) {
                cached.from_cache = true;
                return cached;
            }
        }

        match strategy.classify(&canonical).await {
            Ok(verdict) => {
                if self.cache_enabled {
                    self.cache.put(&fp, verdict.clone());
                }
                verdict
            }
            Err(e) => {
                warn!(strategy = strategy_name, error = %e, "strategy failed, returning fail-safe verdict");
                Verdict::fail_safe()
            }
        }
    }

    /// Run every configured strategy concurrently against the same
    /// canonical text and reduce the surviving verdicts to a consensus.
    pub async fn compare(&self, text: &str) -> ComparisonReport {
        if text.trim().is_empty() {
            let verdict = Verdict::empty_input();
            return ComparisonReport {
                per_strategy: HashMap::new(),
                consensus: ConsensusResult {
                    is_spam: verdict.is_spam,
                    confidence: verdict.confidence,
                    agreement: 1.0,
                    strategies_counted: 0,
                },
            };
        }

        let canonical = fingerprint::normalize_with_limit(text, self.max_input_chars);
        let outcomes = join_all(self.strategies.iter().map(|strategy| {
            let strategy = Arc::clone(strategy);
            let canonical = &canonical;
            async move { (strategy.name(), strategy.classify(canonical).await) }
        }))
        .await;

        let mut per_strategy = HashMap::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(verdict) => {
                    per_strategy.insert(name.to_string(), verdict);
                }
                Err(e) => {
                    warn!(strategy = name, error = %e, "strategy dropped from consensus");
                }
            }
        }

        let consensus = reduce_consensus(per_strategy.values());
        ComparisonReport {
            per_strategy,
            consensus,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Forget the memory strategy's remembered patterns.
    pub fn clear_strategy_memory(&self) {
        if let Some(memory) = &self.memory {
            memory.clear_memory();
        }
    }
}

/// Reduce N available verdicts to a consensus decision.
///
/// Strict majority decides spam (ties resolve to legitimate); confidence is
/// the arithmetic mean; agreement is the majority fraction. Zero available
/// verdicts yield the fail-safe values with zero agreement.
fn reduce_consensus<'a>(verdicts: impl Iterator<Item = &'a Verdict>) -> ConsensusResult {
    let verdicts: Vec<&Verdict> = verdicts.collect();
    let n = verdicts.len();
    if n == 0 {
        let fail_safe = Verdict::fail_safe();
        return ConsensusResult {
            is_spam: fail_safe.is_spam,
            confidence: fail_safe.confidence,
            agreement: 0.0,
            strategies_counted: 0,
        };
    }

    let spam_count = verdicts.iter().filter(|v| v.is_spam).count();
    let confidence = verdicts.iter().map(|v| v.confidence).sum::<f64>() / n as f64;
    let agreement = spam_count.max(n - spam_count) as f64 / n as f64;

    ConsensusResult {
        is_spam: spam_count * 2 > n,
        confidence,
        agreement,
        strategies_counted: n,
    }
}
