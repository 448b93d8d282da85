//! Signed (authenticated) attributes and the committed attribute context.

use std::fmt;

use der::asn1::ObjectIdentifier;

use crate::domain::{
    asn1::{self, Tlv},
    constants,
    crypto::{DigestInfoBlob, Sha256Digest},
};
use crate::{SigningError, SigningResult};

/// One encoded `Attribute ::= SEQUENCE { attrType, SET OF attrValues }`.
#[derive(Clone)]
pub struct SignedAttributeLogical {
    pub oid: ObjectIdentifier,
    pub der: Vec<u8>,
}

impl SignedAttributeLogical {
    /// Encode a single-valued attribute.
    #[must_use]
    pub fn single(oid: ObjectIdentifier, value_der: Vec<u8>) -> Self {
        let der = asn1::sequence(&[&asn1::oid(&oid), &asn1::set_of(vec![value_der])]);
        Self { oid, der }
    }
}

impl fmt::Debug for SignedAttributeLogical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributeLogical(oid={}, len={})",
            self.oid,
            self.der.len()
        )
    }
}

/// Canonically ordered attributes (DER SET OF ordering by encoding).
pub struct SignedAttributesCanonical {
    ordered: Vec<SignedAttributeLogical>,
}

impl SignedAttributesCanonical {
    #[must_use]
    pub fn new(mut attrs: Vec<SignedAttributeLogical>) -> Self {
        attrs.sort_by(|a, b| a.der.cmp(&b.der));
        Self { ordered: attrs }
    }
    #[must_use]
    pub fn ordered(&self) -> &[SignedAttributeLogical] {
        &self.ordered
    }

    /// Full `SET OF Attribute` encoding, the exact bytes that get digested.
    #[must_use]
    pub fn to_set_der(&self) -> Vec<u8> {
        asn1::set_of(self.ordered.iter().map(|a| a.der.clone()).collect())
    }
}

impl fmt::Debug for SignedAttributesCanonical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SignedAttributesCanonical(count={})",
            self.ordered.len()
        )
    }
}

/// The attribute SET committed to at prepare time.
///
/// Finalization embeds these bytes verbatim; nothing here is ever re-derived.
#[derive(Clone, PartialEq, Eq)]
pub struct AttributesContext {
    set_der: Vec<u8>,
}

impl AttributesContext {
    pub(crate) fn from_canonical(attrs: &SignedAttributesCanonical) -> Self {
        Self {
            set_der: attrs.to_set_der(),
        }
    }

    /// Accept a previously persisted SET, checking it is one well-formed SET
    /// of attributes.
    pub fn from_der(set_der: Vec<u8>) -> SigningResult<Self> {
        let set = Tlv::parse(&set_der)?.expect_tag(constants::ASN1_SET_TAG, "signed attributes")?;
        let attrs = set.children()?;
        if attrs.is_empty() {
            return Err(SigningError::Pkcs7Error("signed attribute set is empty".into()));
        }
        for attr in &attrs {
            let parts = attr
                .expect_tag(constants::ASN1_SEQUENCE_TAG, "attribute")?
                .children()?;
            asn1::child(&parts, 0, "attribute type")?.as_oid()?;
            asn1::child(&parts, 1, "attribute values")?
                .expect_tag(constants::ASN1_SET_TAG, "attribute values")?;
        }
        Ok(Self { set_der })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.set_der
    }

    /// SHA-256 of the SET encoding.
    #[must_use]
    pub fn digest(&self) -> Sha256Digest {
        Sha256Digest::compute(&self.set_der)
    }

    #[must_use]
    pub fn digest_info(&self) -> DigestInfoBlob {
        DigestInfoBlob::from_digest(&self.digest())
    }

    /// The same bytes with the outer tag switched to `[0] IMPLICIT`, as they
    /// appear inside `SignerInfo`.
    pub fn to_implicit_der(&self) -> SigningResult<Vec<u8>> {
        asn1::retag(&self.set_der, constants::ASN1_CONTEXT_0_TAG)
    }

    /// Attribute type OIDs in encoded order.
    pub fn attribute_oids(&self) -> SigningResult<Vec<ObjectIdentifier>> {
        attribute_values(&self.set_der)?
            .into_iter()
            .map(|(oid, _)| Ok(oid))
            .collect()
    }

    /// Value of the `messageDigest` attribute.
    pub fn message_digest(&self) -> SigningResult<Sha256Digest> {
        let values = find_attribute(&self.set_der, &constants::OID_MESSAGE_DIGEST)?
            .ok_or_else(|| {
                SigningError::Pkcs7Error("signed attributes carry no messageDigest".into())
            })?;
        let value = Tlv::parse(&values)?
            .children()?
            .into_iter()
            .next()
            .ok_or_else(|| SigningError::Pkcs7Error("messageDigest has no value".into()))?
            .expect_tag(constants::ASN1_OCTET_STRING_TAG, "messageDigest")?;
        Sha256Digest::from_slice(value.value())
    }

    /// Encoded `SET OF AttributeValue` for `oid`, if present.
    pub fn attribute(&self, oid: &ObjectIdentifier) -> SigningResult<Option<Vec<u8>>> {
        find_attribute(&self.set_der, oid)
    }
}

impl fmt::Debug for AttributesContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributesContext(len={})", self.set_der.len())
    }
}

/// `(type, encoded SET OF values)` for each attribute in a SET or `[0]` block.
pub(crate) fn attribute_values(set_der: &[u8]) -> SigningResult<Vec<(ObjectIdentifier, Vec<u8>)>> {
    let mut out = Vec::new();
    for attr in Tlv::parse(set_der)?.children()? {
        let parts = attr.children()?;
        let oid = asn1::child(&parts, 0, "attribute type")?.as_oid()?;
        let values = asn1::child(&parts, 1, "attribute values")?;
        out.push((oid, values.raw().to_vec()));
    }
    Ok(out)
}

fn find_attribute(set_der: &[u8], oid: &ObjectIdentifier) -> SigningResult<Option<Vec<u8>>> {
    Ok(attribute_values(set_der)?
        .into_iter()
        .find(|(found, _)| found == oid)
        .map(|(_, values)| values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_attr(byte: u8) -> SignedAttributeLogical {
        SignedAttributeLogical::single(
            constants::OID_MESSAGE_DIGEST,
            asn1::octet_string(&[byte; 32]),
        )
    }

    fn content_type_attr() -> SignedAttributeLogical {
        SignedAttributeLogical::single(constants::OID_CONTENT_TYPE, asn1::oid(&constants::OID_DATA))
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let a = SignedAttributesCanonical::new(vec![digest_attr(1), content_type_attr()]);
        let b = SignedAttributesCanonical::new(vec![content_type_attr(), digest_attr(1)]);
        assert_eq!(a.to_set_der(), b.to_set_der());
        assert_eq!(a.ordered()[0].oid, constants::OID_CONTENT_TYPE);
    }

    #[test]
    fn test_context_reads_message_digest() {
        let canonical = SignedAttributesCanonical::new(vec![digest_attr(7), content_type_attr()]);
        let ctx = AttributesContext::from_canonical(&canonical);
        assert_eq!(ctx.message_digest().unwrap().as_bytes(), &[7u8; 32]);
        assert_eq!(
            ctx.attribute_oids().unwrap(),
            vec![constants::OID_CONTENT_TYPE, constants::OID_MESSAGE_DIGEST]
        );
        assert_eq!(ctx.digest_info().digest(), Sha256Digest::compute(ctx.as_der()));
    }

    #[test]
    fn test_implicit_form() {
        let ctx = AttributesContext::from_canonical(&SignedAttributesCanonical::new(vec![
            content_type_attr(),
        ]));
        let implicit = ctx.to_implicit_der().unwrap();
        assert_eq!(implicit[0], 0xa0);
        assert_eq!(&implicit[1..], &ctx.as_der()[1..]);
    }

    #[test]
    fn test_from_der_validation() {
        let ctx = AttributesContext::from_canonical(&SignedAttributesCanonical::new(vec![
            content_type_attr(),
        ]));
        assert!(AttributesContext::from_der(ctx.as_der().to_vec()).is_ok());
        assert!(AttributesContext::from_der(vec![0x31, 0x00]).is_err());
        assert!(AttributesContext::from_der(vec![0x30, 0x00]).is_err());
        assert!(AttributesContext::from_der(asn1::set_of(vec![asn1::octet_string(b"x")])).is_err());
    }

    #[test]
    fn test_missing_message_digest() {
        let ctx = AttributesContext::from_canonical(&SignedAttributesCanonical::new(vec![
            content_type_attr(),
        ]));
        assert!(matches!(
            ctx.message_digest(),
            Err(SigningError::Pkcs7Error(_))
        ));
    }
}
