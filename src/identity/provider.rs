// Calls to the platform's /api/auth endpoints and the mapping of their failures.
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{ApiClient, ApiFailure};
use crate::error::{AuthError, AuthResult};

use super::registration::RegisterRequest;

pub const LOGIN_PATH: &str = "api/auth/login";
pub const REGISTER_PATH: &str = "api/auth/register";
pub const LOGOUT_PATH: &str = "api/auth/logout";
pub const REFRESH_PATH: &str = "api/auth/refresh-token";

const NETWORK_MESSAGE: &str = "Unable to reach the server. Check your connection and try again.";
const MISCONFIGURED_MESSAGE: &str = "The server address is not configured correctly.";

/// Token body returned by login, register and refresh.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Refresh may or may not rotate it; login/register always send one.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse").field("rotated", &self.refresh_token.is_some()).finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone, Debug)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self { Self { client } }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<TokenResponse> {
        let resp = self.client
            .post_json(LOGIN_PATH, &LoginBody { email, password }, None)
            .await
            .map_err(|f| match f {
                ApiFailure::Network(_) => AuthError::network(NETWORK_MESSAGE),
                ApiFailure::Status { status, message } if (400..500).contains(&status) => {
                    AuthError::invalid_credentials(message.unwrap_or_else(|| "Invalid email or password".into()))
                }
                ApiFailure::Status { message, .. } => {
                    AuthError::rejected(message.unwrap_or_else(|| "Login failed. Please try again later.".into()))
                }
                ApiFailure::Decode(m) => AuthError::malformed_token(format!("Unexpected login response: {}", m)),
                ApiFailure::Endpoint(m) => {
                    warn!(error = %m, "login endpoint unusable");
                    AuthError::rejected(MISCONFIGURED_MESSAGE)
                }
            })?;
        resp.json::<TokenResponse>()
            .map_err(|e| AuthError::malformed_token(format!("Unexpected login response: {}", e)))
    }

    pub async fn register(&self, req: &RegisterRequest) -> AuthResult<TokenResponse> {
        let resp = self.client
            .post_json(REGISTER_PATH, req, None)
            .await
            .map_err(|f| match f {
                ApiFailure::Network(_) => AuthError::network(NETWORK_MESSAGE),
                ApiFailure::Status { status: 409, message } => {
                    AuthError::duplicate_email(message.unwrap_or_else(|| "An account with this email already exists".into()))
                }
                ApiFailure::Status { message, .. } => {
                    AuthError::rejected(message.unwrap_or_else(|| "Registration failed. Please review your details and try again.".into()))
                }
                ApiFailure::Decode(m) => AuthError::malformed_token(format!("Unexpected registration response: {}", m)),
                ApiFailure::Endpoint(m) => {
                    warn!(error = %m, "registration endpoint unusable");
                    AuthError::rejected(MISCONFIGURED_MESSAGE)
                }
            })?;
        resp.json::<TokenResponse>()
            .map_err(|e| AuthError::malformed_token(format!("Unexpected registration response: {}", e)))
    }

    /// Server-side session end. Callers treat any failure as non-fatal.
    pub async fn logout(&self, access_token: &str) -> Result<(), ApiFailure> {
        self.client.post_empty(LOGOUT_PATH, Some(access_token)).await.map(|_| ())
    }

    /// Mint a new pair with the refresh token as the credential.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, ApiFailure> {
        self.client.post_empty(REFRESH_PATH, Some(refresh_token)).await?.json::<TokenResponse>()
    }
}
