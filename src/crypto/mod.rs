//! Cryptography module for rsacrypt
//!
//! Hybrid encryption: a fresh AES-256-CBC key encrypts the data and is
//! itself wrapped with RSA-OAEP (SHA-256) under the recipient's public key.
//! Nothing in here logs or touches the filesystem.

mod hybrid;
pub(crate) mod keys;

pub use hybrid::{
    decrypt, decrypt_with_pem, encrypt, encrypt_with_pem, encrypted_len, EncryptedPayload,
};
pub use keys::{
    generate_keypair, private_key_from_pem, public_key_from_pem, public_key_pem_from_private,
    KeyPair,
};

/// Size of AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of CBC initialization vector in bytes
pub const IV_SIZE: usize = 16;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Fixed RSA public exponent
pub const PUBLIC_EXPONENT: u32 = 65537;

/// Smallest accepted RSA modulus in bits
pub const MIN_KEY_BITS: usize = 2048;

/// Largest accepted RSA modulus in bits
pub const MAX_KEY_BITS: usize = 4096;

/// Default RSA modulus in bits
pub const DEFAULT_KEY_BITS: usize = 2048;
