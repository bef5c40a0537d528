//! Construction-time error kinds. Runtime conditions (no target visible, a
//! task not yet complete, an interlock blocking a command) are never errors
//! (§7). These are only ever returned from builder/construction call sites,
//! never from `update`.

use thiserror::Error;

/// A programmer error surfaced at construction time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    /// A builder method was called in a stage that doesn't support it, e.g.
    /// `.velocity()` on a servo-position starter.
    #[error("invalid builder stage: `{method}` is not valid here ({reason})")]
    InvalidBuilderStage { method: &'static str, reason: String },

    /// A configuration value violated a precondition (negative tolerance,
    /// empty fan-out group, negative rate limit, ...).
    #[error("invalid config for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The requested control mode doesn't apply to the picked hardware kind.
    #[error("incompatible control mode: {hardware} does not support `{mode}`")]
    IncompatibleControlMode { hardware: &'static str, mode: &'static str },

    /// A task or decorator that requires feedback was attached to a
    /// plant with `has_feedback() == false`.
    #[error("feedback required: `{context}` needs a feedback-capable plant")]
    FeedbackRequired { context: &'static str },
}

pub type BuildResult<T> = Result<T, BuildError>;
