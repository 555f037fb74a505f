//! In-memory user directory for tests and keyless local runs.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{DirectoryError, User, UserDirectory};

/// Fixed set of users held in memory, keyed for both lookup shapes.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    by_username: HashMap<String, User>,
    by_id: HashMap<String, User>,
}

impl MemoryDirectory {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let mut by_username = HashMap::new();
        let mut by_id = HashMap::new();
        for user in users {
            by_username.insert(user.username.to_lowercase(), user.clone());
            by_id.insert(user.id.clone(), user);
        }
        Self { by_username, by_id }
    }

    /// Remove a user, e.g. to simulate deletion behind a live token.
    #[cfg(test)]
    pub fn remove(&mut self, id: &str) {
        if let Some(user) = self.by_id.remove(id) {
            self.by_username.remove(&user.username.to_lowercase());
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.by_username.get(&username.to_lowercase()).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        Ok(self.by_id.get(id).cloned())
    }
}
