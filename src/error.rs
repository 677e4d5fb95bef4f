use thiserror::Error;

/// Failures callers are expected to tell apart. Everything else travels as a
/// plain `anyhow::Error` with context attached.
#[derive(Error, Debug)]
pub(crate) enum FinsortError {
    /// Malformed identifiers, dates or amounts. Nothing was written.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced transaction or category does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The classifier answered with a non-success status that is not a
    /// quota or billing signal.
    #[error("Classifier failed ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The classifier could not be reached at all.
    #[error("Classifier unreachable: {0}")]
    Network(String),
}

impl FinsortError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn upstream(status: u16, body: &str) -> Self {
        Self::Upstream {
            status,
            body: body.chars().take(500).collect(),
        }
    }
}
