use std::fmt;

use crate::{SigningError, SigningResult};

/// Raw signature value returned by the remote signer (PKCS#1 v1.5 over the
/// `DigestInfo`). Opaque to this crate apart from its length.
#[derive(Clone, Eq, PartialEq)]
pub struct RawSignature {
    bytes: Box<[u8]>,
}

impl RawSignature {
    pub fn new(bytes: Vec<u8>) -> SigningResult<Self> {
        if bytes.is_empty() {
            return Err(SigningError::InvalidInput(
                "remote signer returned an empty signature".into(),
            ));
        }
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawSignature(len={})", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert!(RawSignature::new(Vec::new()).is_err());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let sig = RawSignature::new(vec![0xAA; 256]).unwrap();
        assert_eq!(format!("{sig:?}"), "RawSignature(len=256)");
    }
}
