use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// How a failure should be presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// The caller may try again later (or re-prompt).
    Recoverable,
    /// Retrying the same request will not help.
    Fatal,
}

/// Implemented by every error that crosses the core boundary.
pub trait Classify: std::error::Error {
    fn class(&self) -> ErrorClass;

    /// Reason string suitable for direct display to an end user.
    fn user_message(&self) -> String {
        self.to_string()
    }
}

impl Classify for StoreError {
    fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotFound(_) => ErrorClass::Fatal,
            StoreError::Backend(_) => ErrorClass::Recoverable,
        }
    }

    fn user_message(&self) -> String {
        match self {
            StoreError::NotFound(what) => format!("{what} was not found"),
            StoreError::Backend(_) => "Storage is temporarily unavailable, please try again".into(),
        }
    }
}

/// Tagged result handed to callers instead of raw errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success { value: T },
    RecoverableError { reason: String },
    FatalError { reason: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success { value } => Some(value),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::RecoverableError { reason } | Outcome::FatalError { reason } => Some(reason),
        }
    }
}

impl<T, E: Classify> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::Success { value },
            Err(e) => {
                let reason = e.user_message();
                match e.class() {
                    ErrorClass::Recoverable => Outcome::RecoverableError { reason },
                    ErrorClass::Fatal => Outcome::FatalError { reason },
                }
            }
        }
    }
}
