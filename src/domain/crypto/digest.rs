use std::fmt;
use std::io::Read;

use sha2::{Digest, Sha256};

use crate::domain::constants::{
    SHA256_DIGEST_INFO_LEN, SHA256_DIGEST_INFO_PREFIX, SHA256_DIGEST_LEN,
};
use crate::{SigningError, SigningResult};

const READ_CHUNK: usize = 64 * 1024;

/// A SHA-256 digest value.
///
/// Invariant: exactly 32 bytes.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Sha256Digest([u8; SHA256_DIGEST_LEN]);

impl Sha256Digest {
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Stream `reader` to the end through SHA-256.
    pub fn compute_reader<R: Read + ?Sized>(reader: &mut R) -> SigningResult<(Self, u64)> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            total += n as u64;
        }
        Ok((Self(hasher.finalize().into()), total))
    }

    pub fn from_slice(bytes: &[u8]) -> SigningResult<Self> {
        let arr: [u8; SHA256_DIGEST_LEN] = bytes.try_into().map_err(|_| {
            SigningError::CryptographicError(format!(
                "digest length mismatch (expected {SHA256_DIGEST_LEN}, actual {})",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(hex_str: &str) -> SigningResult<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SigningError::InvalidInput(format!("invalid digest hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SHA256_DIGEST_LEN] {
        &self.0
    }
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Digest({})", self.to_hex())
    }
}

/// The 51-byte SHA-256 `DigestInfo` handed to the remote signer.
///
/// Invariant: fixed 19-byte prefix followed by the 32-byte digest.
#[derive(Clone, Eq, PartialEq)]
pub struct DigestInfoBlob([u8; SHA256_DIGEST_INFO_LEN]);

impl DigestInfoBlob {
    #[must_use]
    pub fn from_digest(digest: &Sha256Digest) -> Self {
        let mut bytes = [0u8; SHA256_DIGEST_INFO_LEN];
        bytes[..SHA256_DIGEST_INFO_PREFIX.len()].copy_from_slice(&SHA256_DIGEST_INFO_PREFIX);
        bytes[SHA256_DIGEST_INFO_PREFIX.len()..].copy_from_slice(digest.as_bytes());
        Self(bytes)
    }

    /// Accept an encoded blob, checking its length and prefix.
    pub fn from_bytes(bytes: &[u8]) -> SigningResult<Self> {
        let arr: [u8; SHA256_DIGEST_INFO_LEN] = bytes.try_into().map_err(|_| {
            SigningError::InvalidInput(format!(
                "DigestInfo must be {SHA256_DIGEST_INFO_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        if arr[..SHA256_DIGEST_INFO_PREFIX.len()] != SHA256_DIGEST_INFO_PREFIX {
            return Err(SigningError::InvalidInput(
                "DigestInfo does not carry the SHA-256 prefix".into(),
            ));
        }
        Ok(Self(arr))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The digest embedded after the prefix.
    #[must_use]
    pub fn digest(&self) -> Sha256Digest {
        let mut arr = [0u8; SHA256_DIGEST_LEN];
        arr.copy_from_slice(&self.0[SHA256_DIGEST_INFO_PREFIX.len()..]);
        Sha256Digest(arr)
    }
}

impl fmt::Debug for DigestInfoBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestInfoBlob(digest={})", self.digest().to_hex())
    }
}
