//! Classification strategies.
//!
//! Each strategy wraps one or more oracle calls and returns a normalized
//! verdict. The orchestrator depends only on [`ClassificationStrategy`];
//! the variants are:
//!
//! - **single_pass**: one oracle call.
//! - **multi_stage**: a cheap screening call, escalating to a deep-analysis
//!   call that may attach a category and risk factors.
//! - **memory**: consults its own bounded pattern memory before calling the
//!   oracle and reports a pattern-similarity score.
//!
//! Every variant parses the oracle reply through the validator before
//! returning; raw oracle fields never cross this boundary.

pub mod memory;
pub mod multi_stage;
pub mod single_pass;

use async_trait::async_trait;

use crate::errors::ClassifierError;
use crate::fingerprint::CanonicalText;
use crate::types::Verdict;

pub use memory::MemoryStrategy;
pub use multi_stage::MultiStageStrategy;
pub use single_pass::SinglePassStrategy;

/// A classification strategy: canonical text in, validated verdict out.
///
/// Errors mean the oracle call or its parsing failed; the orchestrator
/// decides whether that becomes a fail-safe verdict (single-strategy path)
/// or a dropped participant (comparison path).
#[async_trait]
pub trait ClassificationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, text: &CanonicalText) -> Result<Verdict, ClassifierError>;
}

/// Shared instruction for verdict-shaped JSON output.
pub(crate) const VERDICT_SCHEMA_HINT: &str = "Respond with a single JSON object: \
    {\"is_spam\": bool, \"reason\": string, \"confidence\": number 0..1, \
    \"threat_level\": \"LOW\"|\"MEDIUM\"|\"HIGH\"|\"CRITICAL\"}";
