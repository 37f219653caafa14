//! Multi-stage strategy: screen first, escalate to deep analysis.
//!
//! Stage one is a cheap screening call. When the screen is confidently
//! clean the strategy returns it as-is; otherwise a second deep-analysis
//! call runs, which may attach a category and risk factors to the verdict.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::ClassifierError;
use crate::fingerprint::CanonicalText;
use crate::provider::LlmProvider;
use crate::types::Verdict;
use crate::validator;

use super::{ClassificationStrategy, VERDICT_SCHEMA_HINT};

/// Screen verdicts at least this confident (and clean) skip stage two.
const CLEAN_SCREEN_CONFIDENCE: f64 = 0.9;

pub struct MultiStageStrategy {
    provider: Arc<dyn LlmProvider>,
}

impl MultiStageStrategy {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    async fn screen(&self, text: &CanonicalText) -> Result<Verdict, ClassifierError> {
        let prompt = format!(
            "Quick spam screen of the following email. {}\n\nEmail:\n{}",
            VERDICT_SCHEMA_HINT,
            text.as_str()
        );
        let body = self.provider.complete(&prompt).await?;
        Ok(validator::sanitize(&validator::parse_raw_verdict(&body)?))
    }

    async fn deep_analysis(
        &self,
        text: &CanonicalText,
        screen: &Verdict,
    ) -> Result<Verdict, ClassifierError> {
        let prompt = format!(
            "Detailed spam analysis of the following email. An initial screen judged it \
             {} (confidence {:.2}). {} Additionally include \"category\": string and \
             \"risk_factors\": [string].\n\nEmail:\n{}",
            if screen.is_spam { "spam" } else { "legitimate" },
            screen.confidence,
            VERDICT_SCHEMA_HINT,
            text.as_str()
        );
        let body = self.provider.complete(&prompt).await?;
        Ok(validator::sanitize(&validator::parse_raw_verdict(&body)?))
    }
}

#[async_trait]
impl ClassificationStrategy for MultiStageStrategy {
    fn name(&self) -> &'static str {
        "multi_stage"
    }

    async fn classify(&self, text: &CanonicalText) -> Result<Verdict, ClassifierError> {
        let mut screen = self.screen(text).await?;

        if !screen.is_spam && screen.confidence >= CLEAN_SCREEN_CONFIDENCE {
            debug!(confidence = screen.confidence, "screen confidently clean, skipping deep analysis");
            screen.pattern_similarity = None;
            screen.learning_feedback = None;
            screen.category = None;
            screen.risk_factors = None;
            return Ok(screen);
        }

        let mut verdict = self.deep_analysis(text, &screen).await?;
        verdict.pattern_similarity = None;
        verdict.learning_feedback = None;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::normalize;
    use crate::provider::{StubProvider, StubScript};

    #[tokio::test]
    async fn confidently_clean_screen_skips_stage_two() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Respond(
            r#"{"is_spam": false, "reason": "routine correspondence", "confidence": 0.95}"#
                .to_string(),
        ));
        let strategy = MultiStageStrategy::new(Arc::clone(&stub) as Arc<dyn LlmProvider>);

        let verdict = strategy.classify(&normalize("See you at 3pm")).await.unwrap();
        assert!(!verdict.is_spam);
        assert_eq!(stub.call_count(), 1, "deep analysis must be skipped");
    }

    #[tokio::test]
    async fn suspicious_screen_escalates_and_keeps_risk_factors() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Respond(
            r#"{"is_spam": true, "reason": "urgency cues", "confidence": 0.6}"#.to_string(),
        ));
        stub.push_script(StubScript::Respond(
            r#"{"is_spam": true, "reason": "credential phishing", "confidence": 0.93,
                "threat_level": "CRITICAL", "category": "phishing",
                "risk_factors": ["urgency", "credential request"]}"#
                .to_string(),
        ));
        let strategy = MultiStageStrategy::new(Arc::clone(&stub) as Arc<dyn LlmProvider>);

        let verdict = strategy
            .classify(&normalize("Your account will be locked, click here"))
            .await
            .unwrap();
        assert!(verdict.is_spam);
        assert_eq!(verdict.category.as_deref(), Some("phishing"));
        assert_eq!(
            verdict.risk_factors.as_deref(),
            Some(&["urgency".to_string(), "credential request".to_string()][..])
        );
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn stage_two_failure_fails_the_strategy() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Respond(
            r#"{"is_spam": true, "confidence": 0.7}"#.to_string(),
        ));
        stub.push_script(StubScript::Fail("rate limit".to_string()));
        let strategy = MultiStageStrategy::new(Arc::clone(&stub) as Arc<dyn LlmProvider>);

        let result = strategy.classify(&normalize("win big")).await;
        assert!(result.is_err());
    }
}
