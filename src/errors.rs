use thiserror::Error;

/// Errors surfaced by the execution pipeline (C1-C6).
///
/// These never reach a caller verbatim. The HTTP layer converts every
/// variant into the public envelope shape so a panic message or raw OS
/// error string is never exposed to the submitter.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Unsupported language: {0}")]
    UnknownRuntime(String),

    #[error("Code syntax error: {0}")]
    SyntaxError(String),

    #[error("Unsupported package: {0}")]
    DisallowedImport(String),

    #[error("queue full")]
    QueueFull,

    #[error("failed to spawn interpreter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for SandboxError {
    fn from(e: std::io::Error) -> Self {
        SandboxError::Spawn(e)
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
