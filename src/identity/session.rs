use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};
use crate::storage::{KvStore, SessionStore, TokenPair};
use crate::tprintln;

use super::claims::{decode_claims, TokenClaims};
use super::principal::User;
use super::provider::{AuthApi, TokenResponse};
use super::registration::RegisterRequest;

/// Owns the client's single authenticated identity (or none).
///
/// Cheap to clone; clones share the token slot, so a refresh spawned from one handle is
/// visible through all of them. Token writes are wholesale: login/register start a new
/// session, refresh replaces the pair of the current one, logout clears it.
#[derive(Clone)]
pub struct SessionManager {
    api: AuthApi,
    client: ApiClient,
    store: SessionStore,
    pending_refresh: Arc<Mutex<Option<JoinHandle<Option<String>>>>>,
}

impl SessionManager {
    pub fn new(client: ApiClient, store: SessionStore) -> Self {
        Self { api: AuthApi::new(client.clone()), client, store, pending_refresh: Arc::new(Mutex::new(None)) }
    }

    /// HTTP client from `cfg`, token slot on `cfg.session_file` (in memory when unset).
    pub fn from_config(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let client = ApiClient::new(cfg)?;
        let kv = match &cfg.session_file {
            Some(path) => KvStore::load_or_default(path),
            None => KvStore::in_memory(),
        };
        Ok(Self::new(client, SessionStore::init(kv)))
    }

    pub fn client(&self) -> &ApiClient { &self.client }

    pub fn store(&self) -> &SessionStore { &self.store }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::invalid_input("Email and password are required"));
        }
        let tokens = self.api.login(email.trim(), password).await.map_err(|e| {
            info!(code = e.code_str(), "login failed");
            e
        })?;
        let user = self.establish(tokens)?;
        info!(role = %user.role, "login succeeded");
        tprintln!("session.login user={} role={}", user.email, user.role);
        Ok(user)
    }

    /// Validation runs again here so a malformed payload never reaches the server,
    /// whatever the calling form already checked.
    pub async fn register(&self, req: &RegisterRequest) -> AuthResult<User> {
        let errs = req.validate();
        if let Some(first) = errs.first() {
            return Err(AuthError::invalid_input(first.message.clone()));
        }
        let tokens = self.api.register(req).await.map_err(|e| {
            info!(code = e.code_str(), "registration failed");
            e
        })?;
        let user = self.establish(tokens)?;
        info!(role = %user.role, "registration succeeded");
        tprintln!("session.register user={} role={}", user.email, user.role);
        Ok(user)
    }

    /// Local tokens are cleared first and unconditionally; the server call that follows is
    /// best-effort and its failure only gets logged.
    pub async fn logout(&self) {
        let previous = self.store.get();
        self.store.clear();
        info!("session cleared");
        let Some(pair) = previous else { return; };
        match self.api.logout(&pair.access_token).await {
            Ok(()) => debug!("server-side logout acknowledged"),
            Err(f) => warn!(error = %f, "server-side logout failed; local session already cleared"),
        }
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// `None` without a network call when no refresh token is stored. Any failure clears
    /// the session and yields `None`; there is no retry. A refresh whose session was
    /// logged out or replaced while it was in flight is dropped.
    pub async fn refresh_access_token(&self) -> Option<String> {
        let generation = self.store.generation();
        let refresh = self.store.refresh_token()?;
        let tokens = match self.api.refresh(&refresh).await {
            Ok(t) => t,
            Err(f) => {
                warn!(error = %f, "token refresh failed; ending session");
                self.store.clear_if_current(generation);
                return None;
            }
        };
        if let Err(e) = decode_claims(&tokens.access_token) {
            warn!(error = %e, "refreshed access token is unusable; ending session");
            self.store.clear_if_current(generation);
            return None;
        }
        let pair = TokenPair::new(tokens.access_token, tokens.refresh_token.unwrap_or(refresh));
        if !self.store.replace_if_current(generation, &pair) {
            debug!("discarding refresh for a session that has since ended");
            return None;
        }
        tprintln!("session.refresh ok generation={}", generation);
        Some(pair.access_token)
    }

    /// The signed-in user, or `None`.
    ///
    /// When the stored access token has expired this starts a background refresh and
    /// still answers `None`; callers re-query once it settles (see
    /// `wait_for_pending_refresh`). Must be called inside a tokio runtime for the refresh
    /// to start.
    pub fn current_user_or_trigger_refresh(&self) -> Option<User> {
        let claims = self.stored_claims()?;
        if claims.is_expired() {
            self.spawn_refresh();
            return None;
        }
        Some(User::from_claims(&claims))
    }

    /// Await the most recently spawned background refresh, returning its new access token.
    pub async fn wait_for_pending_refresh(&self) -> Option<String> {
        let task = self.pending_refresh.lock().take();
        match task {
            Some(t) => t.await.unwrap_or_else(|e| {
                warn!(error = %e, "background refresh task did not complete");
                None
            }),
            None => None,
        }
    }

    /// Like `current_user_or_trigger_refresh`, but refreshes inline and answers with the
    /// refreshed identity.
    pub async fn current_user_refreshing(&self) -> Option<User> {
        let claims = self.stored_claims()?;
        if !claims.is_expired() {
            return Some(User::from_claims(&claims));
        }
        let fresh = self.refresh_access_token().await?;
        let claims = decode_claims(&fresh).ok()?;
        if claims.is_expired() { return None; }
        Some(User::from_claims(&claims))
    }

    /// Stored and unexpired. Never refreshes.
    pub fn is_authenticated(&self) -> bool { self.bearer_token().is_some() }

    /// Access token to present on authenticated calls, if it is still valid.
    pub fn bearer_token(&self) -> Option<String> {
        let access = self.store.access_token()?;
        match decode_claims(&access) {
            Ok(c) if !c.is_expired() => Some(access),
            _ => None,
        }
    }

    /// Valid access token, refreshing first when the stored one has expired.
    pub async fn authorized_token(&self) -> Option<String> {
        if let Some(t) = self.bearer_token() { return Some(t); }
        self.store.refresh_token()?;
        self.refresh_access_token().await
    }

    pub fn stored_tokens(&self) -> Option<TokenPair> { self.store.get() }

    fn stored_claims(&self) -> Option<TokenClaims> {
        let access = self.store.access_token()?;
        match decode_claims(&access) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(error = %e, "stored access token cannot be decoded");
                None
            }
        }
    }

    fn spawn_refresh(&self) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available; background token refresh skipped");
            return;
        };
        let this = self.clone();
        let task = rt.spawn(async move { this.refresh_access_token().await });
        // an earlier refresh keeps running detached; racing writes are last-write-wins
        *self.pending_refresh.lock() = Some(task);
        debug!("background token refresh started");
    }

    fn establish(&self, tokens: TokenResponse) -> AuthResult<User> {
        let claims = decode_claims(&tokens.access_token)?;
        let Some(refresh) = tokens.refresh_token.filter(|r| !r.is_empty()) else {
            return Err(AuthError::malformed_token("Server response did not include a refresh token"));
        };
        self.store.set(&TokenPair::new(tokens.access_token, refresh));
        Ok(User::from_claims(&claims))
    }
}
