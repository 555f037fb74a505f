//! Password verification against stored hashes.
//!
//! Two encodings are in circulation:
//! - bcrypt (`$2a$`/`$2b$`/`$2y$` prefixed), the current scheme
//! - unsalted SHA-256 hex digests, a legacy scheme kept only so existing
//!   accounts keep working until they re-hash
//!
//! The kind is detected from the hash string itself, not from stored
//! metadata, so a future rehash-on-login step can slot in without touching
//! this interface.

use sha2::{Digest, Sha256};

/// Hash encoding detected from the stored string's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    /// bcrypt-family hash (`$2…` prefix).
    Bcrypt,
    /// Legacy unsalted SHA-256 digest: exactly 64 hex characters.
    LegacySha256,
    /// Anything else. Never verifies.
    Unknown,
}

/// Classify a stored hash by shape. Pure; does no comparison work.
pub fn detect_hash_kind(stored: &str) -> HashKind {
    if stored.starts_with("$2") {
        HashKind::Bcrypt
    } else if stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit()) {
        HashKind::LegacySha256
    } else {
        HashKind::Unknown
    }
}

/// Verify a plaintext password against a stored hash.
///
/// Absent hashes, unknown encodings, and any internal comparison error all
/// return `false`; this function fails closed and never panics.
pub fn verify_password(plain: &str, stored: Option<&str>) -> bool {
    let Some(stored) = stored else {
        return false;
    };

    match detect_hash_kind(stored) {
        HashKind::Bcrypt => bcrypt::verify(plain, stored).unwrap_or(false),
        HashKind::LegacySha256 => {
            let digest = hex::encode(Sha256::digest(plain.as_bytes()));
            // Byte-exact on the stored value: digests are stored lowercase.
            constant_time_eq(digest.as_bytes(), stored.as_bytes())
        }
        HashKind::Unknown => false,
    }
}

/// Constant-time byte comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sha256_hex(plain: &str) -> String {
        hex::encode(Sha256::digest(plain.as_bytes()))
    }

    #[test]
    fn detects_bcrypt_prefix() {
        assert_eq!(detect_hash_kind("$2b$12$abcdefghijk"), HashKind::Bcrypt);
        assert_eq!(detect_hash_kind("$2a$10$xyz"), HashKind::Bcrypt);
        assert_eq!(detect_hash_kind("$2y$10$xyz"), HashKind::Bcrypt);
    }

    #[test]
    fn detects_legacy_sha256() {
        let lower = sha256_hex("secret");
        assert_eq!(lower.len(), 64);
        assert_eq!(detect_hash_kind(&lower), HashKind::LegacySha256);
        // Detection tolerates either case of hex digit
        assert_eq!(
            detect_hash_kind(&lower.to_ascii_uppercase()),
            HashKind::LegacySha256
        );
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert_eq!(detect_hash_kind(""), HashKind::Unknown);
        assert_eq!(detect_hash_kind("plaintext"), HashKind::Unknown);
        // 63 hex chars, one short of a digest
        assert_eq!(detect_hash_kind(&sha256_hex("x")[..63]), HashKind::Unknown);
        // 64 chars but not all hex
        let mut not_hex = sha256_hex("x");
        not_hex.replace_range(0..1, "g");
        assert_eq!(detect_hash_kind(&not_hex), HashKind::Unknown);
        // argon2 PHC strings are not bcrypt
        assert_eq!(
            detect_hash_kind("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$hash"),
            HashKind::Unknown
        );
    }

    #[test]
    fn absent_hash_never_verifies() {
        assert!(!verify_password("anything", None));
    }

    #[test]
    fn unknown_encoding_never_verifies() {
        assert!(!verify_password("secret", Some("secret")));
        assert!(!verify_password("", Some("")));
    }

    #[test]
    fn legacy_sha256_verifies_and_rejects() {
        let stored = sha256_hex("secret");
        assert!(verify_password("secret", Some(&stored)));
        assert!(!verify_password("wrong", Some(&stored)));
    }

    #[test]
    fn legacy_comparison_is_byte_exact_on_the_hash() {
        // Digests are stored lowercase; an uppercase copy is detected as
        // legacy but must not verify; the comparison is byte-exact.
        let upper = sha256_hex("secret").to_ascii_uppercase();
        assert!(!verify_password("secret", Some(&upper)));
    }

    #[test]
    fn bcrypt_roundtrip() {
        // Low cost keeps the test fast; verification is cost-agnostic.
        let stored = bcrypt::hash("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", Some(&stored)));
        assert!(!verify_password("hunter3", Some(&stored)));
    }

    #[test]
    fn malformed_bcrypt_fails_closed() {
        // `$2` prefix routes to bcrypt, whose parse error becomes `false`
        assert!(!verify_password("secret", Some("$2b$12$truncated")));
        assert!(!verify_password("secret", Some("$2")));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
