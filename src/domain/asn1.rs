//! Minimal DER writer helpers plus a borrowed TLV reader.
//!
//! Writing is done by hand so every byte of the signed attributes is under our
//! control; reading goes through `der::AnyRef` so length handling stays strict.

use der::{asn1::AnyRef, asn1::ObjectIdentifier, Reader, SliceReader, Tagged};

use crate::domain::constants;
use crate::{SigningError, SigningResult};

/// Encode a DER definite length (short form below 128, long form otherwise).
#[must_use]
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let mut out = Vec::with_capacity(1 + bytes.len() - skip);
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
    out
}

/// Wrap `value` with `tag` and its DER length.
#[must_use]
pub fn tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let len = encode_length(value.len());
    let mut out = Vec::with_capacity(1 + len.len() + value.len());
    out.push(tag);
    out.extend_from_slice(&len);
    out.extend_from_slice(value);
    out
}

/// SEQUENCE over already-encoded parts, in the given order.
#[must_use]
pub fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    tlv(constants::ASN1_SEQUENCE_TAG, &parts.concat())
}

/// SET OF with elements sorted by their encodings (X.690 11.6).
#[must_use]
pub fn set_of(mut elements: Vec<Vec<u8>>) -> Vec<u8> {
    elements.sort();
    tlv(constants::ASN1_SET_TAG, &elements.concat())
}

/// Context-specific constructed tag `[n]` around already-encoded content.
#[must_use]
pub fn context(n: u8, content: &[u8]) -> Vec<u8> {
    tlv(constants::ASN1_CONTEXT_0_TAG | n, content)
}

#[must_use]
pub fn octet_string(value: &[u8]) -> Vec<u8> {
    tlv(constants::ASN1_OCTET_STRING_TAG, value)
}

#[must_use]
pub fn oid(oid: &ObjectIdentifier) -> Vec<u8> {
    tlv(constants::ASN1_OID_TAG, oid.as_bytes())
}

#[must_use]
pub fn ia5_string(value: &str) -> Vec<u8> {
    tlv(constants::ASN1_IA5_STRING_TAG, value.as_bytes())
}

/// `AlgorithmIdentifier { oid, NULL }`.
#[must_use]
pub fn algorithm_identifier(algorithm: &ObjectIdentifier) -> Vec<u8> {
    sequence(&[&oid(algorithm), constants::ASN1_NULL])
}

/// Replace the outer tag of an encoded element, keeping length and content.
pub fn retag(encoded: &[u8], tag: u8) -> SigningResult<Vec<u8>> {
    let element = Tlv::parse(encoded)?;
    Ok(tlv(tag, element.value()))
}

/// One decoded DER element borrowed from its input buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    tag: u8,
    value: &'a [u8],
    raw: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Parse exactly one element; trailing bytes are an error.
    pub fn parse(bytes: &'a [u8]) -> SigningResult<Self> {
        let mut elements = Self::parse_all(bytes)?;
        if elements.len() != 1 {
            return Err(SigningError::Asn1Error(format!(
                "expected a single DER element, found {}",
                elements.len()
            )));
        }
        Ok(elements.remove(0))
    }

    /// Parse a run of concatenated elements (e.g. the content of a SEQUENCE).
    pub fn parse_all(bytes: &'a [u8]) -> SigningResult<Vec<Self>> {
        let mut reader = SliceReader::new(bytes)?;
        let mut elements = Vec::new();
        while !reader.is_finished() {
            let start = usize::try_from(reader.position())?;
            let any: AnyRef<'a> = reader.decode()?;
            let end = usize::try_from(reader.position())?;
            let raw = bytes.get(start..end).ok_or_else(|| {
                SigningError::Asn1Error(format!("element bounds {start}..{end} out of range"))
            })?;
            elements.push(Self {
                tag: u8::from(any.tag()),
                value: any.value(),
                raw,
            });
        }
        Ok(elements)
    }

    /// Parse the leading element and ignore whatever follows it.
    pub fn parse_first(bytes: &'a [u8]) -> SigningResult<Self> {
        let mut reader = SliceReader::new(bytes)?;
        let any: AnyRef<'a> = reader.decode()?;
        let end = usize::try_from(reader.position())?;
        Ok(Self {
            tag: u8::from(any.tag()),
            value: any.value(),
            raw: &bytes[..end],
        })
    }

    #[must_use]
    pub fn tag(&self) -> u8 {
        self.tag
    }
    #[must_use]
    pub fn value(&self) -> &'a [u8] {
        self.value
    }
    /// Full encoding including tag and length.
    #[must_use]
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn children(&self) -> SigningResult<Vec<Tlv<'a>>> {
        Self::parse_all(self.value)
    }

    pub fn expect_tag(self, tag: u8, what: &str) -> SigningResult<Self> {
        if self.tag != tag {
            return Err(SigningError::Asn1Error(format!(
                "{what}: expected tag 0x{tag:02x}, found 0x{:02x}",
                self.tag
            )));
        }
        Ok(self)
    }

    pub fn as_oid(&self) -> SigningResult<ObjectIdentifier> {
        if self.tag != constants::ASN1_OID_TAG {
            return Err(SigningError::Asn1Error(format!(
                "expected OBJECT IDENTIFIER, found tag 0x{:02x}",
                self.tag
            )));
        }
        ObjectIdentifier::from_bytes(self.value)
            .map_err(|e| SigningError::Asn1Error(format!("invalid OID: {e}")))
    }
}

impl std::fmt::Debug for Tlv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tlv(tag=0x{:02x}, len={})", self.tag, self.value.len())
    }
}

/// Fetch the `index`-th child or fail with a descriptive error.
pub fn child<'a>(children: &[Tlv<'a>], index: usize, what: &str) -> SigningResult<Tlv<'a>> {
    children
        .get(index)
        .copied()
        .ok_or_else(|| SigningError::Asn1Error(format!("{what}: missing element #{index}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_forms() {
        assert_eq!(encode_length(0), vec![0x00]);
        assert_eq!(encode_length(127), vec![0x7f]);
        assert_eq!(encode_length(128), vec![0x81, 0x80]);
        assert_eq!(encode_length(255), vec![0x81, 0xff]);
        assert_eq!(encode_length(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(encode_length(70_000), vec![0x83, 0x01, 0x11, 0x70]);
    }

    #[test]
    fn test_set_of_sorts_elements() {
        let a = octet_string(&[0x02]);
        let b = octet_string(&[0x01]);
        let set = set_of(vec![a.clone(), b.clone()]);
        assert_eq!(set, tlv(0x31, &[b, a].concat()));
    }

    #[test]
    fn test_parse_nested_sequence() {
        let encoded = sequence(&[&oid(&constants::OID_SHA256), constants::ASN1_NULL]);
        let outer = Tlv::parse(&encoded).unwrap();
        assert_eq!(outer.tag(), 0x30);
        assert_eq!(outer.raw(), encoded.as_slice());

        let children = outer.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_oid().unwrap(), constants::OID_SHA256);
        assert_eq!(children[1].raw(), constants::ASN1_NULL);
    }

    #[test]
    fn test_parse_rejects_trailing_bytes() {
        let mut encoded = octet_string(b"abc");
        encoded.push(0x00);
        assert!(Tlv::parse(&encoded).is_err());
        assert!(Tlv::parse(&[]).is_err());
    }

    #[test]
    fn test_retag_keeps_content() {
        let set = set_of(vec![octet_string(b"x")]);
        let retagged = retag(&set, 0xa0).unwrap();
        assert_eq!(retagged[0], 0xa0);
        assert_eq!(&retagged[1..], &set[1..]);
    }

    #[test]
    fn test_large_element_round_trip() {
        let payload = vec![0xAB; 1000];
        let encoded = octet_string(&payload);
        let parsed = Tlv::parse(&encoded).unwrap();
        assert_eq!(parsed.value(), payload.as_slice());
    }
}
