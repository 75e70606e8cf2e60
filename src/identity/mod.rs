//! Client-side identity: access-token claims, the derived user, and the session lifecycle
//! (login, registration, refresh, logout) against the platform's auth endpoints.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod principal;
mod provider;
mod registration;
mod session;

pub use claims::{decode_claims, TokenClaims};
pub use principal::{Role, User, AUTHORITY_ADMIN, AUTHORITY_MANAGER};
pub use provider::{AuthApi, TokenResponse, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH};
pub use registration::{FieldError, Gender, RegisterRequest, MIN_PASSWORD_LEN};
pub use session::SessionManager;
