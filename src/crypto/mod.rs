//! Hashing utilities
//!
//! SHA-256 digests and the address derivation used for wallet instances.

pub mod hash;

pub use hash::{derive_address, sha256, sha256_hex, ADDRESS_HEX_LEN};
