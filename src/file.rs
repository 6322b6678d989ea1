//! File codec
//!
//! Whole-file encryption and decryption. Inputs are read fully into memory;
//! there is no streaming mode. Output directories are created on demand.

use crate::config::OutputConfig;
use crate::crypto::{self, private_key_from_pem, public_key_from_pem, KeyPair};
use crate::error::{Error, Result};
use crate::payload::{self, Payload};
use image::DynamicImage;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Encrypt `in_path` and write the wire payload to `out_path`
pub fn encrypt_file<P: AsRef<Path>, Q: AsRef<Path>>(
    in_path: P,
    out_path: Q,
    public_key: &RsaPublicKey,
) -> Result<()> {
    let data = fs::read(in_path.as_ref())?;
    let encrypted = crypto::encrypt(&data, public_key)?;
    write_output(out_path.as_ref(), &encrypted)?;

    debug!(
        "Encrypted {:?} ({} bytes) -> {:?} ({} bytes)",
        in_path.as_ref(),
        data.len(),
        out_path.as_ref(),
        encrypted.len()
    );
    Ok(())
}

/// Decrypt `in_path` and write the plaintext to `out_path`
pub fn decrypt_file<P: AsRef<Path>, Q: AsRef<Path>>(
    in_path: P,
    out_path: Q,
    private_key: &RsaPrivateKey,
) -> Result<()> {
    let encrypted = fs::read(in_path.as_ref())?;
    let data = crypto::decrypt(&encrypted, private_key)?;
    write_output(out_path.as_ref(), &data)?;

    debug!(
        "Decrypted {:?} -> {:?} ({} bytes)",
        in_path.as_ref(),
        out_path.as_ref(),
        data.len()
    );
    Ok(())
}

/// Encrypt a payload and write it to disk, returning the path written
///
/// Without an explicit `out_path` the first free `<stem>_<n>.<ext>` in the
/// configured output directory is used.
pub fn encrypt_image_to_file(
    payload: &Payload,
    public_key: &RsaPublicKey,
    out_path: Option<&Path>,
    output: &OutputConfig,
) -> Result<PathBuf> {
    let target = match out_path {
        Some(path) => path.to_path_buf(),
        None => next_available_path(&output.dir, &output.file_stem, &output.extension),
    };

    let encrypted = payload::encrypt_payload(payload, public_key)?;
    write_output(&target, &encrypted)?;

    debug!("Encrypted {} written to {:?}", payload.kind(), target);
    Ok(target)
}

/// Read an encrypted image from disk and decode it
pub fn decrypt_image_file<P: AsRef<Path>>(
    in_path: P,
    private_key: &RsaPrivateKey,
) -> Result<DynamicImage> {
    let encrypted = fs::read(in_path.as_ref())?;
    payload::decrypt_image(&encrypted, private_key)
}

/// Load an image from disk as an encryptable payload
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Payload> {
    let image = image::open(path.as_ref()).map_err(|e| match e {
        image::ImageError::IoError(io) => Error::Io(io),
        image::ImageError::Unsupported(u) => Error::UnsupportedPayloadType(u.to_string()),
        other => Error::CorruptImageData(other.to_string()),
    })?;
    Ok(Payload::Image(image))
}

/// Write an image to disk as PNG
pub fn save_png<P: AsRef<Path>>(image: &DynamicImage, path: P) -> Result<()> {
    let bytes = Payload::Image(image.clone()).to_buffer()?;
    write_output(path.as_ref(), &bytes)?;
    debug!("Image ({}x{}) written to {:?}", image.width(), image.height(), path.as_ref());
    Ok(())
}

/// First `<stem>_<n>.<ext>` in `dir` that does not exist yet
pub fn next_available_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let mut index = 0u64;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", stem, index, extension));
        if !candidate.exists() {
            return candidate;
        }
        index += 1;
    }
}

/// Write the PEM halves of a keypair to whichever paths are given
pub fn write_keypair(
    pair: &KeyPair,
    private_path: Option<&Path>,
    public_path: Option<&Path>,
) -> Result<()> {
    if let Some(path) = private_path {
        write_private(path, pair.private_pem().as_bytes())?;
        debug!("Private key written to {:?}", path);
    }

    if let Some(path) = public_path {
        write_output(path, pair.public_pem().as_bytes())?;
        debug!("Public key written to {:?}", path);
    }

    Ok(())
}

/// Load a PEM public key from disk
pub fn load_public_key<P: AsRef<Path>>(path: P) -> Result<RsaPublicKey> {
    let pem = fs::read(path.as_ref())?;
    public_key_from_pem(&pem)
}

/// Load a PEM private key from disk
pub fn load_private_key<P: AsRef<Path>>(path: P) -> Result<RsaPrivateKey> {
    let pem = zeroize::Zeroizing::new(fs::read(path.as_ref())?);
    private_key_from_pem(&pem)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Write secret material; on Unix the file is created owner-only
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten an existing file before writing
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    write_output(path, bytes)
}
