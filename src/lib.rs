//! spamgate: LLM-backed spam classification core.
//!
//! Classifies free-form text (an email body) as spam or legitimate by
//! delegating judgment to an external text-classification oracle. The core
//! provides:
//!
//! - **Fingerprinting + bounded TTL cache**: normalized input is hashed and
//!   prior verdicts are reused, avoiding redundant oracle calls.
//! - **Output validation**: every field returned by an oracle call is
//!   treated as untrusted and clamped/repaired before use.
//! - **Multi-strategy orchestration**: independent classification
//!   strategies run concurrently; partial failure is tolerated and the
//!   surviving verdicts reduce to a consensus decision with an agreement
//!   score.
//!
//! The HTTP/UI layer, prompt wording and oracle internals are external
//! collaborators; nothing here persists across process restarts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use spamgate::{ClassifierConfig, SpamClassifier};
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! rt.block_on(async {
//!     let config = ClassifierConfig::default(); // stub provider
//!     let classifier = SpamClassifier::new(&config).expect("valid config");
//!
//!     let verdict = classifier.classify("You have won a prize!", "single_pass").await;
//!     println!("spam: {} ({})", verdict.is_spam, verdict.reason);
//!
//!     let report = classifier.compare("You have won a prize!").await;
//!     println!("agreement: {}", report.consensus.agreement);
//! });
//! ```

pub mod cache;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod orchestrator;
pub mod provider;
pub mod strategies;
pub mod types;
pub mod validator;

pub use cache::{CacheSettings, CacheStats, VerdictCache};
pub use config::{ClassifierConfig, ProviderConfig, ProviderType};
pub use errors::ClassifierError;
pub use fingerprint::{fingerprint, normalize, normalize_with_limit, CanonicalText};
pub use orchestrator::SpamClassifier;
pub use provider::{LlmProvider, ProviderFactory, StubProvider, StubScript};
pub use strategies::{
    ClassificationStrategy, MemoryStrategy, MultiStageStrategy, SinglePassStrategy,
};
pub use types::{ComparisonReport, ConsensusResult, ThreatLevel, Verdict};
