//! Hashing utilities
//!
//! Provides SHA-256 hashing and the `0x`-prefixed address derivation used
//! for wallet instance handles.

use sha2::{Digest, Sha256};

/// Length of a derived address in hex characters (20 bytes)
pub const ADDRESS_HEX_LEN: usize = 40;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Derive an Ethereum-style address (`0x` + 40 hex chars) from arbitrary input
pub fn derive_address(input: &[u8]) -> String {
    let hex = sha256_hex(input);
    format!("0x{}", &hex[..ADDRESS_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let data = b"hello world";
        let hash = sha256(data);
        assert_eq!(hash.len(), 32);
        assert_eq!(
            sha256_hex(data),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_derive_address() {
        let address = derive_address(b"hello world");
        assert_eq!(address.len(), 2 + ADDRESS_HEX_LEN);
        assert_eq!(address, "0xb94d27b9934d3e08a52e52d7da7dabfac484efe3");

        // Deterministic
        assert_eq!(address, derive_address(b"hello world"));
        assert_ne!(address, derive_address(b"hello world!"));
    }
}
