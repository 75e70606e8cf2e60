pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod payments;
pub mod storage;

pub use client::{ApiClient, ApiFailure};
pub use config::ClientConfig;
pub use error::{AuthError, AuthErrorKind, PaymentError, PaymentErrorKind};
pub use identity::{Role, SessionManager, User};
pub use payments::{PaymentIntentFlow, PaymentsApi};
pub use storage::{KvStore, SessionStore, TokenPair};

// Test-only printing helper: expands to tprintln! during tests and is absent otherwise.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In non-test builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
