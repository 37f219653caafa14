//! Single-pass strategy: one oracle call, validated.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ClassifierError;
use crate::fingerprint::CanonicalText;
use crate::provider::LlmProvider;
use crate::types::Verdict;
use crate::validator;

use super::{ClassificationStrategy, VERDICT_SCHEMA_HINT};

pub struct SinglePassStrategy {
    provider: Arc<dyn LlmProvider>,
}

impl SinglePassStrategy {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ClassificationStrategy for SinglePassStrategy {
    fn name(&self) -> &'static str {
        "single_pass"
    }

    async fn classify(&self, text: &CanonicalText) -> Result<Verdict, ClassifierError> {
        let prompt = format!(
            "Classify the following email as spam or legitimate. {}\n\nEmail:\n{}",
            VERDICT_SCHEMA_HINT,
            text.as_str()
        );
        let body = self.provider.complete(&prompt).await?;
        let raw = validator::parse_raw_verdict(&body)?;

        let mut verdict = validator::sanitize(&raw);
        // Fields owned by other strategy variants are not reported here.
        verdict.pattern_similarity = None;
        verdict.learning_feedback = None;
        verdict.category = None;
        verdict.risk_factors = None;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::normalize;
    use crate::provider::{StubProvider, StubScript};
    use crate::types::ThreatLevel;

    #[tokio::test]
    async fn parses_and_validates_oracle_reply() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Respond(
            r#"```json
            {"is_spam": true, "reason": "lottery scam", "confidence": 2.5, "threat_level": "HIGH"}
            ```"#
                .to_string(),
        ));
        let strategy = SinglePassStrategy::new(stub);

        let verdict = strategy.classify(&normalize("You have won!")).await.unwrap();
        assert!(verdict.is_spam);
        assert_eq!(verdict.confidence, 1.0, "confidence must be clamped");
        assert_eq!(verdict.threat_level, ThreatLevel::High);
        assert!(verdict.pattern_similarity.is_none());
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced_as_error() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Fail("timeout".to_string()));
        let strategy = SinglePassStrategy::new(stub);

        let result = strategy.classify(&normalize("hello")).await;
        assert!(matches!(result, Err(ClassifierError::Provider(_))));
    }

    #[tokio::test]
    async fn unparseable_reply_is_malformed() {
        let stub = Arc::new(StubProvider::new());
        stub.push_script(StubScript::Respond("I think it's fine".to_string()));
        let strategy = SinglePassStrategy::new(stub);

        let result = strategy.classify(&normalize("hello")).await;
        assert!(matches!(result, Err(ClassifierError::MalformedResponse(_))));
    }
}
