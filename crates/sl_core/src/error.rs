use thiserror::Error;

/// Invalid-operation and collaborator-failure taxonomy for the session core.
///
/// Invalid operations are rejected synchronously with no state mutated;
/// presenting feedback is the caller's job. Only `Persist` represents a hard
/// failure of the final explicit save.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown player id: {id}")]
    UnknownPlayer { id: String },

    #[error("Unknown criterion id: {id}")]
    UnknownCriterion { id: String },

    #[error("Cannot substitute {first} and {second}: both are {zone}")]
    SameZonePair { first: String, second: String, zone: &'static str },

    #[error("Score {score} out of range (allowed 0..=5)")]
    ScoreOutOfRange { score: u8 },

    #[error("Cannot start a session with an empty roster")]
    EmptyRoster,

    #[error("Operation requires {expected} phase, session is {current}")]
    InvalidPhase { expected: &'static str, current: &'static str },

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("Failed to persist session record: {0}")]
    Persist(String),
}

impl SessionError {
    /// True for synchronous rejections that leave all state untouched.
    pub fn is_invalid_operation(&self) -> bool {
        !matches!(self, SessionError::Report(_) | SessionError::Persist(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
