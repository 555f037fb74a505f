//! The user directory: the external store of identity and credential-hash
//! records.
//!
//! The auth core only ever reads from it. Two backends:
//! - [`supabase::SupabaseDirectory`]: Supabase PostgREST, the production path
//! - [`memory::MemoryDirectory`]: config-declared users, for tests and
//!   keyless local runs

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{DirectoryBackend, DirectoryConfig};
use memory::MemoryDirectory;
use supabase::{SupabaseConfig, SupabaseDirectory};

/// Role granted when the directory row carries no roles at all.
///
/// The backing column may not exist in every deployment yet; worth
/// revisiting once all rows carry an explicit role list.
pub const DEFAULT_ROLE: &str = "USER";

/// A full identity record as the directory returns it.
///
/// `password_hash` never leaves the auth core; callers get [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    /// Immutable unique id (uuid or numeric, always stringified).
    pub id: String,
    /// Unique login name; directory lookup is case-insensitive.
    pub username: String,
    /// Optional display label; the public view falls back to `username`.
    pub name: Option<String>,
    /// Ordered role strings, `["USER"]` when the row has none.
    pub roles: Vec<String>,
    /// Opaque stored hash; absent rows can never authenticate.
    pub password_hash: Option<String>,
}

impl User {
    /// Project to the caller-visible shape, excluding the password hash.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            username: self.username.clone(),
            name: self
                .name
                .clone()
                .unwrap_or_else(|| self.username.clone()),
            roles: self.roles.clone(),
        }
    }
}

/// Projection of [`User`] returned to callers, with no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub roles: Vec<String>,
}

/// Data-access failure from the directory backend. Distinct from auth
/// errors; surfaced to callers as a generic failure, never retried here.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(String),
    #[error("directory returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("directory response malformed: {0}")]
    Decode(String),
}

/// Read-only lookup interface the auth core consumes.
///
/// Both lookups return the full record including the password hash; exact
/// matching/storage semantics are owned by the backend.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Case-insensitive exact match on username (no wildcards).
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError>;

    /// Exact match on id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError>;
}

/// Construct the configured directory backend.
pub fn build_directory(config: &DirectoryConfig) -> anyhow::Result<Arc<dyn UserDirectory>> {
    match config.backend {
        DirectoryBackend::Supabase => {
            // Environment wins over the config file so service keys stay out
            // of committed config.
            let resolved = SupabaseConfig::from_env().unwrap_or_else(|| SupabaseConfig {
                url: config.supabase.url.clone(),
                service_key: config.supabase.service_key.clone(),
                users_table: config.supabase.users_table.clone(),
            });
            if resolved.url.is_empty() || resolved.service_key.is_empty() {
                anyhow::bail!(
                    "directory backend 'supabase' needs a url and service key; \
                     set SUPABASE_URL / SUPABASE_SERVICE_KEY or fill in [directory.supabase]"
                );
            }
            Ok(Arc::new(SupabaseDirectory::new(resolved)?))
        }
        DirectoryBackend::Memory => {
            if config.users.is_empty() {
                tracing::warn!("memory directory has no users; every login will fail");
            }
            let users = config.users.iter().map(|entry| User {
                id: entry.id.clone(),
                username: entry.username.clone(),
                name: entry.name.clone(),
                roles: entry
                    .roles
                    .clone()
                    .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]),
                password_hash: entry.password_hash.clone(),
            });
            Ok(Arc::new(MemoryDirectory::new(users)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "1".into(),
            username: "Alice".into(),
            name: None,
            roles: vec![DEFAULT_ROLE.into()],
            password_hash: Some("irrelevant".into()),
        }
    }

    #[test]
    fn public_projection_excludes_hash_and_falls_back_to_username() {
        let public = sample_user().to_public();
        assert_eq!(public.name, "Alice");
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("irrelevant"));
    }

    #[test]
    fn public_projection_prefers_display_name() {
        let mut user = sample_user();
        user.name = Some("Alice Liddell".into());
        assert_eq!(user.to_public().name, "Alice Liddell");
    }
}
