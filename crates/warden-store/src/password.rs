//! Salted password digests.
//!
//! `hash = hex(SHA-256(salt ‖ password))`. The salt is random per account
//! and stored next to the hash; it is generated once at creation and never
//! regenerated on load.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Salt length in bytes before hex encoding (16 bytes = 32 hex chars).
const SALT_BYTES: usize = 16;

/// Generates a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Computes the lowercase hex digest of `salt ‖ password`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut digest = Sha256::new();
    digest.update(salt.as_bytes());
    digest.update(password.as_bytes());
    hex::encode(digest.finalize())
}

/// Recomputes the digest for `password` and compares it to `expected`.
pub fn verify_password(password: &str, salt: &str, expected: &str) -> bool {
    constant_time_eq(
        hash_password(password, salt).as_bytes(),
        expected.as_bytes(),
    )
}

/// Byte comparison whose running time doesn't depend on where the inputs
/// first differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
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

    #[test]
    fn test_hash_password_is_deterministic_for_same_salt() {
        assert_eq!(hash_password("pw", "salt"), hash_password("pw", "salt"));
        assert_ne!(hash_password("pw", "salt"), hash_password("pw", "other"));
    }

    #[test]
    fn test_hash_password_is_salt_then_password() {
        // Concatenation order matters: H("ab" ‖ "c") == H("a" ‖ "bc").
        assert_eq!(hash_password("c", "ab"), hash_password("bc", "a"));
        assert_eq!(hash_password("pw", "s").len(), 64);
    }

    #[test]
    fn test_hash_password_known_vector() {
        // sha256(""): empty salt and password.
        assert_eq!(
            hash_password("", ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_generate_salt_is_random_hex() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_password_accepts_right_rejects_wrong() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
        assert!(!verify_password("hunter3", &salt, &hash));
        assert!(!verify_password("hunter2", &salt, ""));
    }
}
