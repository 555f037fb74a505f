//! Authentication core: password verification, bearer token lifecycle, and
//! the login/logout/resolve orchestration over an external user directory.
//!
//! ## Design Decisions
//! - No JWT dependency: sessions are opaque random tokens resolved by
//!   server-side lookup in an injected [`tokens::TokenStore`].
//! - Hash encoding is detected from the stored string's shape, so legacy
//!   SHA-256 accounts keep verifying while new hashes are bcrypt.
//! - Token state is volatile by contract: nothing survives a restart.

pub mod password;
pub mod service;
pub mod tokens;

pub use password::{detect_hash_kind, verify_password, HashKind};
pub use service::{AuthError, AuthService, LoginCredentials, LoginSuccess};
pub use tokens::TokenStore;
