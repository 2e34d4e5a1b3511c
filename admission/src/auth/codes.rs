//! Single-use confirmation and reset codes.
//!
//! Codes are 32 random bytes rendered as hex so they travel inside URLs
//! unescaped. Only the SHA-256 digest is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Raw code length in bytes
pub const CODE_BYTES: usize = 32;

/// Generate a fresh code
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Digest stored in place of the code
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_hex() {
        let a = generate_code();
        let b = generate_code();
        assert_ne!(a, b);
        assert_eq!(a.len(), CODE_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_is_stable_and_not_the_code() {
        let code = generate_code();
        assert_eq!(hash_code(&code), hash_code(&code));
        assert_ne!(hash_code(&code), code);
        assert_eq!(hash_code(&format!(" {code}\n")), hash_code(&code));
    }
}
