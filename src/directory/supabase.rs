//! Supabase-backed user directory.
//!
//! HTTP client (reqwest) against the Supabase PostgREST endpoint with
//! service-key authentication. Username matching uses PostgREST `ilike`
//! with no wildcards: an exact, case-insensitive match resolved by the
//! database, not by this client.

use async_trait::async_trait;
use serde::Deserialize;

use super::{DirectoryError, User, UserDirectory, DEFAULT_ROLE};

/// Columns fetched for every lookup. The hash stays server-side of the
/// public projection; it is needed here for verification.
const SELECT_COLUMNS: &str = "id,username,password_hash,roles,name";

/// Supabase connection configuration.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Supabase project URL (e.g., https://xxxx.supabase.co).
    pub url: String,
    /// Service role key (server-side, never exposed to clients).
    pub service_key: String,
    /// Table holding user rows.
    pub users_table: String,
}

impl SupabaseConfig {
    /// Load from environment variables; `None` when either is unset/empty.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("SUPABASE_URL").ok()?;
        let service_key = std::env::var("SUPABASE_SERVICE_KEY").ok()?;

        if url.is_empty() || service_key.is_empty() {
            return None;
        }

        Some(Self {
            url,
            service_key,
            users_table: std::env::var("SUPABASE_USERS_TABLE").unwrap_or_else(|_| "users".into()),
        })
    }
}

/// PostgREST client scoped to the users table.
pub struct SupabaseDirectory {
    config: SupabaseConfig,
    http: reqwest::Client,
}

impl SupabaseDirectory {
    pub fn new(config: SupabaseConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { config, http })
    }

    /// PostgREST URL for the users table.
    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.config.url, self.config.users_table)
    }

    /// Base headers for authenticated requests.
    fn auth_headers(&self) -> Vec<(&str, String)> {
        vec![
            ("apikey", self.config.service_key.clone()),
            (
                "Authorization",
                format!("Bearer {}", self.config.service_key),
            ),
        ]
    }

    /// Fetch at most one row matching a PostgREST filter expression.
    async fn fetch_one(&self, filter: &str) -> Result<Option<User>, DirectoryError> {
        let url = format!(
            "{}?select={}&{}&limit=1",
            self.table_url(),
            SELECT_COLUMNS,
            filter
        );

        let mut request = self.http.get(&url);
        for (key, value) in self.auth_headers() {
            request = request.header(key, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<UserRow> = resp
            .json()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;

        Ok(rows.into_iter().next().map(UserRow::into_user))
    }
}

#[async_trait]
impl UserDirectory for SupabaseDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DirectoryError> {
        // `ilike` without wildcards: exact match, case folded by Postgres.
        let filter = format!("username=ilike.{}", urlencoding::encode(username.trim()));
        self.fetch_one(&filter).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, DirectoryError> {
        let filter = format!("id=eq.{}", urlencoding::encode(id));
        self.fetch_one(&filter).await
    }
}

/// Raw row shape from PostgREST. Ids may be uuid strings or numbers;
/// `roles` and `name` columns may be null or missing entirely.
#[derive(Debug, Deserialize)]
struct UserRow {
    id: serde_json::Value,
    username: String,
    #[serde(default)]
    password_hash: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    name: Option<String>,
}

impl UserRow {
    fn into_user(self) -> User {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        User {
            id,
            username: self.username,
            name: self.name,
            roles: self
                .roles
                .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]),
            password_hash: self.password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SupabaseConfig {
        SupabaseConfig {
            url: server.uri(),
            service_key: "test-service-key".into(),
            users_table: "users".into(),
        }
    }

    #[test]
    fn table_url_construction() {
        let dir = SupabaseDirectory::new(SupabaseConfig {
            url: "https://test-project.supabase.co".into(),
            service_key: "k".into(),
            users_table: "users".into(),
        })
        .unwrap();
        assert_eq!(
            dir.table_url(),
            "https://test-project.supabase.co/rest/v1/users"
        );
    }

    #[tokio::test]
    async fn find_by_username_sends_ilike_and_maps_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("username", "ilike.alice"))
            .and(header("apikey", "test-service-key"))
            .and(header("Authorization", "Bearer test-service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 7,
                "username": "Alice",
                "password_hash": "$2b$12$notarealhash",
                "roles": ["USER", "ADMIN"],
                "name": "Alice Liddell",
            }])))
            .mount(&server)
            .await;

        let dir = SupabaseDirectory::new(config_for(&server)).unwrap();
        // Surrounding whitespace is trimmed before it reaches the filter
        let user = dir
            .find_by_username("  alice ")
            .await
            .unwrap()
            .expect("row expected");

        assert_eq!(user.id, "7");
        assert_eq!(user.username, "Alice");
        assert_eq!(user.roles, vec!["USER", "ADMIN"]);
        assert_eq!(user.name.as_deref(), Some("Alice Liddell"));
        assert_eq!(user.password_hash.as_deref(), Some("$2b$12$notarealhash"));
    }

    #[tokio::test]
    async fn missing_roles_and_name_get_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "ab12",
                "username": "bob",
                "password_hash": null,
                "roles": null,
                "name": null,
            }])))
            .mount(&server)
            .await;

        let dir = SupabaseDirectory::new(config_for(&server)).unwrap();
        let user = dir.find_by_username("bob").await.unwrap().unwrap();

        assert_eq!(user.id, "ab12");
        assert_eq!(user.roles, vec![DEFAULT_ROLE]);
        assert_eq!(user.name, None);
        assert_eq!(user.password_hash, None);
        // The public view falls back to the username
        assert_eq!(user.to_public().name, "bob");
    }

    #[tokio::test]
    async fn empty_result_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let dir = SupabaseDirectory::new(config_for(&server)).unwrap();
        assert!(dir.find_by_username("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn backend_failure_surfaces_as_directory_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(500).set_body_string("pg down"))
            .mount(&server)
            .await;

        let dir = SupabaseDirectory::new(config_for(&server)).unwrap();
        let err = dir.find_by_id("1").await.unwrap_err();
        match err {
            DirectoryError::Backend { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "pg down");
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_by_id_uses_eq_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", "eq.7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": 7,
                "username": "Alice",
            }])))
            .mount(&server)
            .await;

        let dir = SupabaseDirectory::new(config_for(&server)).unwrap();
        let user = dir.find_by_id("7").await.unwrap();
        assert_eq!(user.unwrap().username, "Alice");
    }
}
