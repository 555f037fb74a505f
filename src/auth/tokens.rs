//! In-memory bearer token store.
//!
//! A single map from opaque token to user id, owned by the service instance
//! rather than living in process-global state, so test code and a future
//! shared backend get an explicit handle. Entries have no TTL and no capacity
//! bound; a token lives until it is revoked or the process exits.

use parking_lot::RwLock;
use rand::RngCore;
use std::collections::HashMap;

/// Token byte length before hex encoding (24 bytes = 192 bits = 48 hex chars).
const TOKEN_BYTES: usize = 24;

/// Process-local mapping from bearer token to user id.
///
/// A token, while present, maps to exactly one user id fixed at issuance;
/// mappings are only ever inserted or removed, never mutated.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh token bound to `user_id` and return it.
    ///
    /// Collisions are not checked: 192 bits of OS randomness make them
    /// negligible, and checking would not close the window anyway.
    pub fn issue(&self, user_id: &str) -> String {
        let token = generate_token();
        self.tokens
            .write()
            .insert(token.clone(), user_id.to_string());
        token
    }

    /// Remove the mapping if present. Revoking an unknown or already-revoked
    /// token is a no-op, never an error.
    pub fn revoke(&self, token: &str) {
        self.tokens.write().remove(token);
    }

    /// Look up the user id for a token. Pure lookup, no side effect.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.read().get(token).cloned()
    }

    /// Number of live tokens (surfaced by the health endpoint).
    pub fn active_tokens(&self) -> usize {
        self.tokens.read().len()
    }
}

/// Random session token: 24 CSPRNG bytes, hex-encoded (48 lowercase chars).
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
