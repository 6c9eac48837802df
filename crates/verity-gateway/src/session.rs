//! Server-side session store with signed cookie ids
//!
//! Sessions hold either a pending login (the PKCE verifier and state nonce
//! waiting for the callback) or the authenticated claim set, never both. The
//! browser only ever sees an opaque id, signed with the configured secret so
//! a forged cookie is rejected before any lookup.

use crate::oidc::UserClaims;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "verity_sid";

/// A login waiting for its callback
#[derive(Debug, Clone)]
pub struct PendingLogin {
    /// PKCE code verifier, never sent to the browser
    pub code_verifier: String,
    /// State nonce expected back on the callback
    pub state: String,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    pending: Option<PendingLogin>,
    user: Option<UserClaims>,
}

struct Entry {
    state: SessionState,
    created_at: Instant,
}

/// In-memory session store keyed by random ids
pub struct SessionStore {
    secret: Vec<u8>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionStore {
    /// Create a store; `secret` signs cookie values, `ttl` bounds entries
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh anonymous session, returning its id
    pub fn create(&self) -> String {
        self.sweep();

        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        let id: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

        self.sessions.write().unwrap().insert(
            id.clone(),
            Entry {
                state: SessionState::default(),
                created_at: Instant::now(),
            },
        );
        debug!(session = %id, "Session created");
        id
    }

    /// Store a pending login on a session
    pub fn set_pending(&self, id: &str, pending: PendingLogin) {
        if let Some(entry) = self.sessions.write().unwrap().get_mut(id) {
            entry.state.pending = Some(pending);
            entry.state.user = None;
        }
    }

    /// Remove and return the pending login, if any
    ///
    /// Consuming it makes each authorization code exchange single-shot.
    pub fn take_pending(&self, id: &str) -> Option<PendingLogin> {
        self.sessions
            .write()
            .unwrap()
            .get_mut(id)
            .and_then(|entry| entry.state.pending.take())
    }

    /// Mark a session authenticated
    pub fn set_user(&self, id: &str, user: UserClaims) {
        if let Some(entry) = self.sessions.write().unwrap().get_mut(id) {
            entry.state.user = Some(user);
            entry.state.pending = None;
        }
    }

    /// The authenticated user on a live session, if any
    pub fn user(&self, id: &str) -> Option<UserClaims> {
        let sessions = self.sessions.read().unwrap();
        let entry = sessions.get(id)?;
        if entry.created_at.elapsed() > self.ttl {
            return None;
        }
        entry.state.user.clone()
    }

    /// Whether the id refers to a live session
    pub fn exists(&self, id: &str) -> bool {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(id)
            .map(|e| e.created_at.elapsed() <= self.ttl)
            .unwrap_or(false)
    }

    /// Destroy a session; destroying a missing one is a no-op
    pub fn destroy(&self, id: &str) {
        self.sessions.write().unwrap().remove(id);
        debug!(session = %id, "Session destroyed");
    }

    /// Number of stored sessions, expired entries included
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Whether the store holds no sessions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries past their lifetime
    pub fn sweep(&self) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.retain(|_, entry| entry.created_at.elapsed() <= self.ttl);
    }

    /// The signed cookie value for a session id
    pub fn sign(&self, id: &str) -> String {
        format!("{}.{}", id, self.signature(id))
    }

    /// Recover the session id from a cookie value, rejecting bad signatures
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (id, signature) = cookie_value.split_once('.')?;
        if constant_time_eq(signature.as_bytes(), self.signature(id).as_bytes()) {
            Some(id.to_string())
        } else {
            None
        }
    }

    fn signature(&self, id: &str) -> String {
        URL_SAFE_NO_PAD.encode(hmac_sha256(&self.secret, id.as_bytes()))
    }
}

/// HMAC-SHA256 over the standard inner/outer padding construction
fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    const BLOCK_SIZE: usize = 64;

    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        let hashed = Sha256::digest(key);
        key_block[..hashed.len()].copy_from_slice(&hashed);
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha256::new();
    let mut outer = Sha256::new();
    inner.update(key_block.map(|b| b ^ 0x36));
    inner.update(message);
    outer.update(key_block.map(|b| b ^ 0x5c));
    outer.update(inner.finalize());
    outer.finalize().into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new("test-session-secret", Duration::from_secs(3600))
    }

    fn test_user() -> UserClaims {
        UserClaims {
            sub: "0xwallet".to_string(),
            name: Some("wallet".to_string()),
            email: None,
            verification_level: Some("orb".to_string()),
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let store = store();
        let id = store.create();

        assert!(store.exists(&id));
        assert!(store.user(&id).is_none());
    }

    #[test]
    fn test_pending_is_consumed_once() {
        let store = store();
        let id = store.create();

        store.set_pending(
            &id,
            PendingLogin {
                code_verifier: "verifier".to_string(),
                state: "state".to_string(),
            },
        );

        let pending = store.take_pending(&id).unwrap();
        assert_eq!(pending.code_verifier, "verifier");
        assert!(store.take_pending(&id).is_none());
    }

    #[test]
    fn test_set_user_clears_pending() {
        let store = store();
        let id = store.create();
        store.set_pending(
            &id,
            PendingLogin {
                code_verifier: "v".to_string(),
                state: "s".to_string(),
            },
        );

        store.set_user(&id, test_user());

        assert!(store.take_pending(&id).is_none());
        assert_eq!(store.user(&id).unwrap().sub, "0xwallet");
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let store = store();
        let id = store.create();

        store.destroy(&id);
        assert!(!store.exists(&id));
        // Second destroy of the same id is harmless
        store.destroy(&id);
        store.destroy("never-existed");
    }

    #[test]
    fn test_expired_sessions_are_dead() {
        let store = SessionStore::new("secret", Duration::from_secs(0));
        let id = store.create();
        std::thread::sleep(Duration::from_millis(5));

        assert!(!store.exists(&id));
        assert!(store.user(&id).is_none());

        store.sweep();
        assert!(store.is_empty());
    }

    #[test]
    fn test_cookie_sign_and_verify() {
        let store = store();
        let id = store.create();

        let cookie = store.sign(&id);
        assert_eq!(store.verify(&cookie).as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_tampered_cookie_rejected() {
        let store = store();
        let id = store.create();
        let cookie = store.sign(&id);

        let mut forged = cookie.clone();
        forged.replace_range(0..1, if &cookie[0..1] == "a" { "b" } else { "a" });
        assert!(store.verify(&forged).is_none());

        assert!(store.verify("no-dot-here").is_none());
        assert!(store.verify(&format!("{}.wrongsig", id)).is_none());
    }

    #[test]
    fn test_different_secret_rejects_cookie() {
        let store_a = SessionStore::new("secret-a", Duration::from_secs(3600));
        let store_b = SessionStore::new("secret-b", Duration::from_secs(3600));

        let id = store_a.create();
        let cookie = store_a.sign(&id);
        assert!(store_b.verify(&cookie).is_none());
    }

    #[test]
    fn test_hmac_rfc4231_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?");
        let expected = [
            0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
            0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
            0x64, 0xec, 0x38, 0x43,
        ];
        assert_eq!(mac, expected);
    }
}
