use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::kv::KvStore;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Access + refresh token, always stored and cleared together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }
}

// Tokens are credentials; keep them out of logs and panic messages.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} bytes>", self.refresh_token.len()))
            .finish()
    }
}

/// The single token slot of a client instance.
///
/// Every write replaces the pair wholesale. A generation counter is bumped whenever a new
/// session starts or the slot is cleared, so a refresh that was issued for an older session
/// can be dropped instead of overwriting what replaced it.
#[derive(Clone, Debug)]
pub struct SessionStore {
    kv: KvStore,
    generation: Arc<Mutex<u64>>,
}

impl SessionStore {
    /// Take ownership of the slot. A half-written pair (one key without the other) is
    /// discarded so readers only ever see complete pairs.
    pub fn init(kv: KvStore) -> Self {
        let store = Self { kv, generation: Arc::new(Mutex::new(0)) };
        let has_access = store.kv.contains(ACCESS_TOKEN_KEY);
        let has_refresh = store.kv.contains(REFRESH_TOKEN_KEY);
        if has_access != has_refresh {
            tracing::warn!("session store: discarding incomplete token pair");
            store.kv.remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]);
        }
        store
    }

    pub fn in_memory() -> Self { Self::init(KvStore::in_memory()) }

    pub fn get(&self) -> Option<TokenPair> {
        let access = self.kv.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.kv.get(REFRESH_TOKEN_KEY)?;
        Some(TokenPair { access_token: access, refresh_token: refresh })
    }

    pub fn access_token(&self) -> Option<String> { self.kv.get(ACCESS_TOKEN_KEY) }

    pub fn refresh_token(&self) -> Option<String> { self.kv.get(REFRESH_TOKEN_KEY) }

    pub fn generation(&self) -> u64 { *self.generation.lock() }

    /// Store the pair of a freshly established session (login/register).
    pub fn set(&self, pair: &TokenPair) {
        let mut gen = self.generation.lock();
        *gen += 1;
        self.write_pair(pair);
    }

    /// Store a refreshed pair, unless the session it was minted for has since been
    /// cleared or replaced. Returns whether the pair was written.
    pub fn replace_if_current(&self, generation: u64, pair: &TokenPair) -> bool {
        let gen = self.generation.lock();
        if *gen != generation { return false; }
        self.write_pair(pair);
        true
    }

    /// Drop both tokens. Never fails.
    pub fn clear(&self) {
        let mut gen = self.generation.lock();
        *gen += 1;
        self.kv.remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]);
    }

    /// Clear only if no newer session has been established since `generation`.
    pub fn clear_if_current(&self, generation: u64) -> bool {
        let mut gen = self.generation.lock();
        if *gen != generation { return false; }
        *gen += 1;
        self.kv.remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]);
        true
    }

    fn write_pair(&self, pair: &TokenPair) {
        self.kv.set_many(&[
            (ACCESS_TOKEN_KEY, pair.access_token.as_str()),
            (REFRESH_TOKEN_KEY, pair.refresh_token.as_str()),
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_the_pair() {
        let store = SessionStore::in_memory();
        assert_eq!(store.get(), None);
        let pair = TokenPair::new("at", "rt");
        store.set(&pair);
        assert_eq!(store.get(), Some(pair));
        assert_eq!(store.access_token().as_deref(), Some("at"));
        assert_eq!(store.refresh_token().as_deref(), Some("rt"));
    }

    #[test]
    fn clear_removes_both_and_bumps_generation() {
        let store = SessionStore::in_memory();
        store.set(&TokenPair::new("at", "rt"));
        let gen = store.generation();
        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(store.generation() > gen);
    }

    #[test]
    fn stale_refresh_is_dropped() {
        let store = SessionStore::in_memory();
        store.set(&TokenPair::new("at1", "rt1"));
        let gen = store.generation();
        assert!(store.replace_if_current(gen, &TokenPair::new("at2", "rt2")));
        // refreshes do not start a new session
        assert_eq!(store.generation(), gen);
        assert!(store.replace_if_current(gen, &TokenPair::new("at3", "rt3")));
        assert_eq!(store.access_token().as_deref(), Some("at3"));

        store.clear();
        assert!(!store.replace_if_current(gen, &TokenPair::new("at4", "rt4")));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn init_discards_half_pairs() {
        let kv = KvStore::in_memory();
        kv.set(ACCESS_TOKEN_KEY, "orphan");
        let store = SessionStore::init(kv.clone());
        assert_eq!(store.get(), None);
        assert!(!kv.contains(ACCESS_TOKEN_KEY));
    }

    #[test]
    fn debug_does_not_leak_tokens() {
        let s = format!("{:?}", TokenPair::new("secret-access", "secret-refresh"));
        assert!(!s.contains("secret"));
    }

    #[cfg(unix)]
    #[test]
    fn persisted_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".donor-link").join("session.json");
        let store = SessionStore::init(KvStore::load_or_default(&path));
        store.set(&TokenPair::new("at", "rt"));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
