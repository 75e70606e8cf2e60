//! Typed failures surfaced to UI-facing callers.
//! Network and server failures are converted into these at the operation boundary; every
//! variant carries a human-readable message suitable for a toast or form banner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    InvalidCredentials,
    DuplicateEmail,
    MalformedToken,
    NetworkError,
    /// Client-side validation refused the payload before any request was made.
    InvalidInput,
    /// Server answered with a status that is neither a credential rejection nor a conflict.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new<S: Into<String>>(kind: AuthErrorKind, message: S) -> Self { Self { kind, message: message.into() } }
    pub fn invalid_credentials<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::InvalidCredentials, msg) }
    pub fn duplicate_email<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::DuplicateEmail, msg) }
    pub fn malformed_token<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::MalformedToken, msg) }
    pub fn network<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::NetworkError, msg) }
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::InvalidInput, msg) }
    pub fn rejected<S: Into<String>>(msg: S) -> Self { Self::new(AuthErrorKind::Rejected, msg) }

    pub fn code_str(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::InvalidCredentials => "invalid_credentials",
            AuthErrorKind::DuplicateEmail => "duplicate_email",
            AuthErrorKind::MalformedToken => "malformed_token",
            AuthErrorKind::NetworkError => "network_error",
            AuthErrorKind::InvalidInput => "invalid_input",
            AuthErrorKind::Rejected => "rejected",
        }
    }

    pub fn message(&self) -> &str { &self.message }

    /// All auth failures can be retried by the user (fix input, check connectivity).
    pub fn is_recoverable(&self) -> bool { true }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorKind {
    IntentCreationFailed,
    ConfirmationFailed,
    /// Server refused confirmation because the intent's window elapsed.
    IntentExpired,
    /// Operation not valid for the flow's current state (terminal, mismatched id, in flight).
    InvalidState,
    /// No usable session to authorize the payment call.
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct PaymentError {
    pub kind: PaymentErrorKind,
    pub message: String,
}

impl PaymentError {
    pub fn new<S: Into<String>>(kind: PaymentErrorKind, message: S) -> Self { Self { kind, message: message.into() } }
    pub fn intent_creation<S: Into<String>>(msg: S) -> Self { Self::new(PaymentErrorKind::IntentCreationFailed, msg) }
    pub fn confirmation<S: Into<String>>(msg: S) -> Self { Self::new(PaymentErrorKind::ConfirmationFailed, msg) }
    pub fn expired<S: Into<String>>(msg: S) -> Self { Self::new(PaymentErrorKind::IntentExpired, msg) }
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self { Self::new(PaymentErrorKind::InvalidState, msg) }
    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self { Self::new(PaymentErrorKind::Unauthenticated, msg) }

    pub fn code_str(&self) -> &'static str {
        match self.kind {
            PaymentErrorKind::IntentCreationFailed => "intent_creation_failed",
            PaymentErrorKind::ConfirmationFailed => "confirmation_failed",
            PaymentErrorKind::IntentExpired => "intent_expired",
            PaymentErrorKind::InvalidState => "invalid_state",
            PaymentErrorKind::Unauthenticated => "unauthenticated",
        }
    }

    pub fn message(&self) -> &str { &self.message }

    /// Only a failed confirmation leaves the flow open for another attempt;
    /// everything else ends the donation attempt.
    pub fn is_recoverable(&self) -> bool { matches!(self.kind, PaymentErrorKind::ConfirmationFailed) }
}

pub type AuthResult<T> = Result<T, AuthError>;
pub type PaymentResult<T> = Result<T, PaymentError>;
