//! Tests for signed attributes canonical ordering and content.

use der::asn1::ObjectIdentifier;
use remote_cms_signer::domain::constants;
use remote_cms_signer::domain::pkcs7::{SignedAttributeLogical, SignedAttributesCanonical};
use remote_cms_signer::services::SignedAttributesBuilder;
use remote_cms_signer::{AttributesContext, CrlBlob, RevocationEvidence, Sha256Digest, SignaturePolicy};

mod common;

#[test]
fn canonical_ordering_is_lexicographic_by_der() {
    let attr = |arc: &str, value: u8| {
        SignedAttributeLogical::single(
            ObjectIdentifier::new(arc).unwrap(),
            vec![0x02, 0x01, value],
        )
    };
    let a = attr("1.2.3.2", 1);
    let b = attr("1.2.3.1", 9);
    let c = attr("1.2.3.3", 0);

    let canonical = SignedAttributesCanonical::new(vec![a.clone(), b.clone(), c.clone()]);
    let ordered: Vec<_> = canonical.ordered().iter().map(|x| x.oid.to_string()).collect();
    assert_eq!(ordered, vec!["1.2.3.1", "1.2.3.2", "1.2.3.3"]);

    // Insertion order never changes the encoding.
    let shuffled = SignedAttributesCanonical::new(vec![c, a, b]);
    assert_eq!(canonical.to_set_der(), shuffled.to_set_der());
}

#[test]
fn built_attributes_carry_expected_set() {
    let chain = common::chain(2);
    let digest = Sha256Digest::compute(b"signable bytes");
    let evidence = RevocationEvidence {
        crls: Some(vec![CrlBlob::new(common::blob(0x11, 64))]),
        ocsp: None,
    };
    let policy = SignaturePolicy::default();

    let canonical = SignedAttributesBuilder::new()
        .build(&digest, chain.leaf(), &evidence, Some(&policy))
        .unwrap();
    let context = AttributesContext::from_der(canonical.to_set_der()).unwrap();
    let oids = context.attribute_oids().unwrap();

    assert!(oids.contains(&constants::OID_CONTENT_TYPE));
    assert!(oids.contains(&constants::OID_MESSAGE_DIGEST));
    assert!(oids.contains(&constants::OID_SIGNING_CERTIFICATE_V2));
    assert!(oids.contains(&constants::OID_SIGNATURE_POLICY_ID));
    assert!(oids.contains(&constants::OID_ADBE_REVOCATION_INFO_ARCHIVAL));
    assert_eq!(oids.len(), 5);
    assert_eq!(context.message_digest().unwrap(), digest);

    let without_policy = SignedAttributesBuilder::new()
        .build(&digest, chain.leaf(), &RevocationEvidence::none(), None)
        .unwrap();
    assert_eq!(without_policy.ordered().len(), 3);
}
