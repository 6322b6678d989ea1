//! rsacrypt - Hybrid RSA + AES encryption
//!
//! Encrypts arbitrary byte buffers, images and files for the holder of an
//! RSA private key. A fresh AES-256 key encrypts the data in CBC mode and is
//! wrapped with RSA-OAEP (SHA-256); the output is
//! `wrapped key || IV || ciphertext`.

pub mod config;
pub mod crypto;
pub mod error;
pub mod file;
pub mod payload;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crypto::{decrypt, encrypt, generate_keypair, KeyPair};
    pub use crate::error::{Error, Result};
    pub use crate::payload::Payload;
    pub use rsa::{RsaPrivateKey, RsaPublicKey};
}
