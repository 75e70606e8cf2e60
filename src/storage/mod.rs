//! Client-local persistence: a string key-value slot and the token-pair store built on it.

pub mod kv;
mod session_store;

pub use kv::KvStore;
pub use session_store::{SessionStore, TokenPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
