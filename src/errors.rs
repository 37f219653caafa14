//! Classification errors.

/// Errors surfaced inside the classification core.
///
/// Strategies return these to the orchestrator; the orchestrator recovers
/// every one of them into a fail-safe verdict, so nothing here ever reaches
/// the caller as an error.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Transport-level oracle failure: timeout, connection error, rate limit.
    #[error("provider error: {0}")]
    Provider(String),

    /// The oracle replied but the body was not parseable as a verdict.
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    /// Invalid configuration detected at construction time.
    #[error("configuration error: {0}")]
    Config(String),
}
