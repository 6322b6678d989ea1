//! Payload codec
//!
//! Converts between domain payloads and the byte buffers the cipher works on.
//! Images are serialized as PNG so that alpha and exact pixel values survive
//! the round trip.

use crate::crypto;
use crate::error::{Error, Result};
use image::{ColorType, DynamicImage, ImageFormat};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::io::Cursor;

/// Something that can be encrypted
#[derive(Debug, Clone)]
pub enum Payload {
    /// Raw bytes, encrypted as-is
    Bytes(Vec<u8>),
    /// In-memory image, encrypted as PNG
    Image(DynamicImage),
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(bytes.to_vec())
    }
}

impl From<DynamicImage> for Payload {
    fn from(image: DynamicImage) -> Self {
        Payload::Image(image)
    }
}

impl Payload {
    /// Canonical byte buffer for this payload
    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        match self {
            Payload::Bytes(bytes) => Ok(bytes.clone()),
            Payload::Image(image) => encode_png(image),
        }
    }

    /// Short description used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "bytes",
            Payload::Image(_) => "image",
        }
    }
}

/// Decode a decrypted buffer back into an image
pub fn from_buffer(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| Error::CorruptImageData(e.to_string()))
}

/// Serialize the payload and encrypt it for `public_key`
pub fn encrypt_payload(payload: &Payload, public_key: &RsaPublicKey) -> Result<Vec<u8>> {
    let buffer = payload.to_buffer()?;
    crypto::encrypt(&buffer, public_key)
}

/// Decrypt a wire payload that holds an encrypted image
pub fn decrypt_image(wire: &[u8], private_key: &RsaPrivateKey) -> Result<DynamicImage> {
    let buffer = crypto::decrypt(wire, private_key)?;
    from_buffer(&buffer)
}

/// Wire size the payload will have under a key of `key_size` bytes
pub fn encrypted_size(payload: &Payload, key_size: usize) -> Result<usize> {
    let buffer = payload.to_buffer()?;
    Ok(crypto::encrypted_len(key_size, buffer.len()))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    if !png_supports(image.color()) {
        return Err(Error::UnsupportedPayloadType(format!(
            "{:?} images cannot be stored losslessly as PNG",
            image.color()
        )));
    }

    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| match e {
            image::ImageError::Unsupported(u) => Error::UnsupportedPayloadType(u.to_string()),
            other => Error::Serialization(other.to_string()),
        })?;
    Ok(cursor.into_inner())
}

fn png_supports(color: ColorType) -> bool {
    matches!(
        color,
        ColorType::L8
            | ColorType::La8
            | ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16
    )
}
