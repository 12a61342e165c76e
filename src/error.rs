use thiserror::Error;

/// Terminal failure modes of a job. Every variant ends up as a non-ok
/// Outcome with its display text as the error message.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unsupported task: {0}")]
    UnsupportedTask(String),

    #[error("Empty text")]
    EmptyText,

    /// The model worker could not be started or failed to load the model.
    #[error("Missing model capability: {0}")]
    MissingCapability(String),

    /// Any encode/generate/decode failure. Aborts the whole job.
    #[error("Generation failed: {0}")]
    GenerationFailure(String),
}
