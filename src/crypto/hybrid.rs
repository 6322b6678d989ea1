//! RSA-OAEP + AES-256-CBC hybrid encryption
//!
//! Wire format, with no header or version tag:
//!
//! ```text
//! [wrapped AES key: modulus bytes][IV: 16 bytes][AES-256-CBC ciphertext: n * 16 bytes]
//! ```
//!
//! The AES key is wrapped with RSA-OAEP (SHA-256 digest, MGF1-SHA-256, empty
//! label). The plaintext is PKCS#7 padded, so a full padding block is added
//! when its length is already a multiple of 16.
//!
//! There is no authentication tag. Corruption of the ciphertext is only caught
//! when it happens to break the padding, and a wrong key is caught by OAEP.

use crate::crypto::keys::{private_key_from_pem, public_key_from_pem};
use crate::crypto::{BLOCK_SIZE, IV_SIZE, KEY_SIZE};
use crate::error::{Error, Result};
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Structured view of a wire payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// AES key encrypted under the recipient's RSA key
    pub wrapped_key: Vec<u8>,
    /// CBC initialization vector (fresh per encryption)
    pub iv: [u8; IV_SIZE],
    /// Padded and encrypted data
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Total size of the serialized payload
    pub fn size(&self) -> usize {
        self.wrapped_key.len() + IV_SIZE + self.ciphertext.len()
    }

    /// Serialize to the wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(&self.wrapped_key);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Split wire bytes for a key whose modulus is `key_size` bytes long
    pub fn from_bytes(bytes: &[u8], key_size: usize) -> Result<Self> {
        let header = key_size + IV_SIZE;
        // Too short for the wrapped key itself: the payload was made for a smaller key
        if bytes.len() < header {
            return Err(Error::DecryptionFailed);
        }
        if bytes.len() < header + BLOCK_SIZE {
            return Err(Error::TruncatedPayload {
                expected: header + BLOCK_SIZE,
                got: bytes.len(),
            });
        }

        let ciphertext = &bytes[header..];
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::TruncatedPayload {
                expected: header + ciphertext.len().next_multiple_of(BLOCK_SIZE),
                got: bytes.len(),
            });
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[key_size..header]);

        Ok(EncryptedPayload {
            wrapped_key: bytes[..key_size].to_vec(),
            iv,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Length of the wire payload for a plaintext of `plaintext_len` bytes
pub fn encrypted_len(key_size: usize, plaintext_len: usize) -> usize {
    key_size + IV_SIZE + (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE
}

/// Encrypt arbitrary bytes for the holder of `public_key`
///
/// A new AES key and IV are drawn from the OS random source on every call,
/// so encrypting the same data twice never yields the same output.
pub fn encrypt(plaintext: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    let mut aes_key = Zeroizing::new([0u8; KEY_SIZE]);
    let mut iv = [0u8; IV_SIZE];
    OsRng
        .try_fill_bytes(&mut aes_key[..])
        .map_err(|e| Error::Entropy(e.to_string()))?;
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| Error::Entropy(e.to_string()))?;

    let wrapped_key = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &aes_key[..])
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => Error::PlaintextTooLargeForKey(format!(
                "{}-byte AES key does not fit a {}-byte modulus",
                KEY_SIZE,
                public_key.size()
            )),
            other => Error::Encryption(other.to_string()),
        })?;

    let ciphertext = aes_cbc_encrypt(&aes_key, &iv, plaintext)?;

    Ok(EncryptedPayload {
        wrapped_key,
        iv,
        ciphertext,
    }
    .to_bytes())
}

/// Decrypt a wire payload with the matching private key
///
/// The wrapped-key length is taken from the private key's modulus; the
/// payload itself carries no length information.
pub fn decrypt(wire: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
    let key_size = private_key.size();
    if wire.len() < key_size + IV_SIZE {
        return Err(Error::DecryptionFailed);
    }

    // Unwrap before validating the ciphertext segment so that a wrong key of
    // any size is reported as DecryptionFailed. Any OAEP failure looks the same.
    let aes_key = private_key
        .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), &wire[..key_size])
        .map(Zeroizing::new)
        .map_err(|_| Error::DecryptionFailed)?;
    if aes_key.len() != KEY_SIZE {
        return Err(Error::DecryptionFailed);
    }

    let payload = EncryptedPayload::from_bytes(wire, key_size)?;

    Aes256CbcDec::new_from_slices(&aes_key, &payload.iv)
        .map_err(|_| Error::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(&payload.ciphertext)
        .map_err(|_| Error::InvalidPadding)
}

/// Encrypt with a SubjectPublicKeyInfo (or PKCS#1) PEM public key
pub fn encrypt_with_pem(plaintext: &[u8], public_pem: &[u8]) -> Result<Vec<u8>> {
    let public_key = public_key_from_pem(public_pem)?;
    encrypt(plaintext, &public_key)
}

/// Decrypt with a PKCS#8 (or PKCS#1) PEM private key
pub fn decrypt_with_pem(wire: &[u8], private_pem: &[u8]) -> Result<Vec<u8>> {
    let private_key = private_key_from_pem(private_pem)?;
    decrypt(wire, &private_key)
}

fn aes_cbc_encrypt(key: &[u8; KEY_SIZE], iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|_| Error::Encryption("invalid AES key or IV length".to_string()))?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_keypair;
    use crate::crypto::keys::tests::{other_keypair, shared_keypair};
    use cbc::cipher::block_padding::NoPadding;

    fn keys() -> (RsaPublicKey, RsaPrivateKey) {
        let pair = shared_keypair();
        (pair.public_key().unwrap(), pair.private_key().unwrap())
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (public, private) = keys();
        let plaintext = b"Hello, RSA encryption!";

        let encrypted = encrypt(plaintext, &public).unwrap();
        assert_eq!(encrypted.len(), 256 + 16 + 32);
        assert_eq!(encrypted.len(), 304);

        let decrypted = decrypt(&encrypted, &private).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_round_trip_across_block_boundaries() {
        let (public, private) = keys();

        for len in [0usize, 1, 15, 16, 17, 31, 32, 33, 255, 4096] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i * 7 % 251) as u8).collect();
            let encrypted = encrypt(&plaintext, &public).unwrap();

            assert_eq!(encrypted.len(), 256 + 16 + (len - len % 16 + 16));
            assert_eq!(encrypted.len(), encrypted_len(256, len));
            assert_eq!(decrypt(&encrypted, &private).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_empty_plaintext_pads_full_block() {
        let key = [7u8; KEY_SIZE];
        let iv = [9u8; IV_SIZE];

        let ciphertext = aes_cbc_encrypt(&key, &iv, b"").unwrap();
        assert_eq!(ciphertext.len(), BLOCK_SIZE);

        let raw = Aes256CbcDec::new_from_slices(&key, &iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .unwrap();
        assert_eq!(raw, vec![0x10u8; BLOCK_SIZE]);
    }

    #[test]
    fn test_aligned_plaintext_gets_extra_block() {
        let key = [1u8; KEY_SIZE];
        let iv = [2u8; IV_SIZE];
        let plaintext = [0xabu8; 32];

        let ciphertext = aes_cbc_encrypt(&key, &iv, &plaintext).unwrap();
        assert_eq!(ciphertext.len(), 48);

        let raw = Aes256CbcDec::new_from_slices(&key, &iv)
            .unwrap()
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .unwrap();
        assert_eq!(&raw[..32], &plaintext);
        assert_eq!(&raw[32..], &[16u8; 16]);
    }

    #[test]
    fn test_non_deterministic() {
        let (public, private) = keys();
        let plaintext = b"same input twice";

        let first = encrypt(plaintext, &public).unwrap();
        let second = encrypt(plaintext, &public).unwrap();
        assert_ne!(first, second);

        let first_iv = &first[256..272];
        let second_iv = &second[256..272];
        assert_ne!(first_iv, second_iv);

        assert_eq!(decrypt(&first, &private).unwrap(), plaintext);
        assert_eq!(decrypt(&second, &private).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let (public, _) = keys();
        let wrong = other_keypair().private_key().unwrap();

        let encrypted = encrypt(b"Secret data", &public).unwrap();
        assert!(matches!(
            decrypt(&encrypted, &wrong),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_wrapped_key_fails() {
        let (public, private) = keys();

        let mut encrypted = encrypt(b"Secret data", &public).unwrap();
        encrypted[10] ^= 0xFF;

        assert!(matches!(
            decrypt(&encrypted, &private),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_last_byte_usually_breaks_padding() {
        // Probabilistic: a garbled final block still ends in valid padding ~1/256 of the time
        let (public, private) = keys();
        let trials = 16;
        let mut padding_failures = 0;

        for _ in 0..trials {
            let mut encrypted = encrypt(b"Hello, RSA encryption!", &public).unwrap();
            let last = encrypted.len() - 1;
            encrypted[last] ^= 0x01;

            if matches!(decrypt(&encrypted, &private), Err(Error::InvalidPadding)) {
                padding_failures += 1;
            }
        }

        assert!(padding_failures >= trials - 2);
    }

    #[test]
    fn test_truncated_payload() {
        let (public, private) = keys();
        let encrypted = encrypt(b"Secret data", &public).unwrap();

        assert!(matches!(
            decrypt(&encrypted[..200], &private),
            Err(Error::DecryptionFailed)
        ));
        assert!(matches!(
            decrypt(&encrypted[..280], &private),
            Err(Error::TruncatedPayload { expected: 288, got: 280 })
        ));
        assert!(matches!(
            decrypt(&encrypted[..encrypted.len() - 3], &private),
            Err(Error::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_payload_split() {
        let (public, _) = keys();
        let encrypted = encrypt(b"split me", &public).unwrap();

        let payload = EncryptedPayload::from_bytes(&encrypted, 256).unwrap();
        assert_eq!(payload.wrapped_key.len(), 256);
        assert_eq!(payload.ciphertext.len(), 16);
        assert_eq!(payload.size(), encrypted.len());
        assert_eq!(payload.to_bytes(), encrypted);
    }

    #[test]
    fn test_pem_entry_points() {
        let pair = shared_keypair();
        let plaintext = vec![0x42u8; 1024 * 64];

        let encrypted = encrypt_with_pem(&plaintext, pair.public_pem().as_bytes()).unwrap();
        let decrypted = decrypt_with_pem(&encrypted, pair.private_pem().as_bytes()).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_bad_pem_rejected() {
        assert!(matches!(
            encrypt_with_pem(b"data", b"not a key"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_concurrent_calls_share_keys() {
        let (public, private) = keys();

        std::thread::scope(|scope| {
            for t in 0..4u8 {
                let (public, private) = (&public, &private);
                scope.spawn(move || {
                    let plaintext = vec![t; 100 + t as usize];
                    let encrypted = encrypt(&plaintext, public).unwrap();
                    assert_eq!(decrypt(&encrypted, private).unwrap(), plaintext);
                });
            }
        });
    }

    #[test]
    fn test_wrong_key_of_larger_size_fails() {
        let (public, _) = keys();
        let larger = generate_keypair(3072).unwrap().private_key().unwrap();

        // Shorter than the larger key's wrapped-key segment
        let short = encrypt(b"Hello, RSA encryption!", &public).unwrap();
        assert!(matches!(
            decrypt(&short, &larger),
            Err(Error::DecryptionFailed)
        ));

        // Long enough to split, but the ciphertext segment no longer lines up
        let long = encrypt(&[0x33u8; 500], &public).unwrap();
        assert!(matches!(
            decrypt(&long, &larger),
            Err(Error::DecryptionFailed)
        ));
    }

    #[test]
    fn test_aes_key_too_large_for_tiny_modulus() {
        let tiny = RsaPrivateKey::new(&mut OsRng, 512).unwrap();
        let public = RsaPublicKey::from(&tiny);

        assert!(matches!(
            encrypt(b"data", &public),
            Err(Error::PlaintextTooLargeForKey(_))
        ));
    }
}
