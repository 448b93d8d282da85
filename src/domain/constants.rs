//! Centralized constants for commonly repeated DER/OID bytes, tags and sizes.
//! Keep this intentionally small; only broadly reused literals should live here.

use der::asn1::ObjectIdentifier;

// === ASN.1 DER Tags ===

/// ASN.1 BOOLEAN tag
pub const ASN1_BOOLEAN_TAG: u8 = 0x01;

/// ASN.1 INTEGER tag
pub const ASN1_INTEGER_TAG: u8 = 0x02;

/// ASN.1 OCTET STRING tag
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;

/// ASN.1 OBJECT IDENTIFIER tag
pub const ASN1_OID_TAG: u8 = 0x06;

/// ASN.1 ENUMERATED tag
pub const ASN1_ENUMERATED_TAG: u8 = 0x0a;

/// ASN.1 IA5String tag
pub const ASN1_IA5_STRING_TAG: u8 = 0x16;

/// ASN.1 SEQUENCE tag
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;

/// ASN.1 SET tag
pub const ASN1_SET_TAG: u8 = 0x31;

/// ASN.1 NULL value (tag + length + null)
pub const ASN1_NULL: &[u8] = &[0x05, 0x00];

/// Context-specific constructed tag [0]
pub const ASN1_CONTEXT_0_TAG: u8 = 0xa0;

/// Context-specific constructed tag [1]
pub const ASN1_CONTEXT_1_TAG: u8 = 0xa1;

/// INTEGER 1, used for `SignedData` and `SignerInfo` versions and `TimeStampReq`.
pub const ASN1_INTEGER_ONE: [u8; 3] = [0x02, 0x01, 0x01];

/// BOOLEAN TRUE value for the certReq field of a timestamp request
pub const CERT_REQ_TRUE: [u8; 3] = [0x01, 0x01, 0xFF];

/// ENUMERATED successful(0) for `OCSPResponse.responseStatus`
pub const OCSP_RESPONSE_SUCCESSFUL: [u8; 3] = [0x0a, 0x01, 0x00];

// === DigestInfo ===

/// DER prefix of a SHA-256 `DigestInfo` up to and including the OCTET STRING header.
pub const SHA256_DIGEST_INFO_PREFIX: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01,
    0x05, 0x00, 0x04, 0x20,
];

/// SHA-256 digest length in bytes
pub const SHA256_DIGEST_LEN: usize = 32;

/// Total length of a SHA-256 `DigestInfo`
pub const SHA256_DIGEST_INFO_LEN: usize = SHA256_DIGEST_INFO_PREFIX.len() + SHA256_DIGEST_LEN;

// === Placeholder estimation ===

/// Base reservation for the signed-data container
pub const PLACEHOLDER_BASE_SIZE: usize = 8192;

/// Extra reservation when OCSP responses are embedded
pub const PLACEHOLDER_OCSP_SIZE: usize = 4192;

/// Extra reservation when a timestamp token is embedded
pub const PLACEHOLDER_TIMESTAMP_SIZE: usize = 4600;

/// Per-CRL encoding overhead
pub const PLACEHOLDER_CRL_OVERHEAD: usize = 10;

// === Algorithm OIDs ===

/// SHA-256 (2.16.840.1.101.3.4.2.1)
pub const OID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// rsaEncryption (1.2.840.113549.1.1.1)
pub const OID_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

// === CMS content types ===

/// id-data (1.2.840.113549.1.7.1)
pub const OID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// id-signedData (1.2.840.113549.1.7.2)
pub const OID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// id-ct-TSTInfo (1.2.840.113549.1.9.16.1.4)
pub const OID_CT_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

// === Attribute OIDs ===

/// PKCS#9 contentType (1.2.840.113549.1.9.3)
pub const OID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// PKCS#9 messageDigest (1.2.840.113549.1.9.4)
pub const OID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// id-aa-signingCertificateV2 (1.2.840.113549.1.9.16.2.47)
pub const OID_SIGNING_CERTIFICATE_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.47");

/// id-aa-ets-sigPolicyId (1.2.840.113549.1.9.16.2.15)
pub const OID_SIGNATURE_POLICY_ID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.15");

/// id-spq-ets-uri (1.2.840.113549.1.9.16.5.1)
pub const OID_SPQ_ETS_URI: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.5.1");

/// adbe-revocationInfoArchival (1.2.840.113583.1.1.8)
pub const OID_ADBE_REVOCATION_INFO_ARCHIVAL: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113583.1.1.8");

/// id-aa-timeStampToken (1.2.840.113549.1.9.16.2.14)
pub const OID_TIMESTAMP_TOKEN: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.2.14");

/// id-pkix-ocsp-basic (1.3.6.1.5.5.7.48.1.1)
pub const OID_OCSP_BASIC: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1.1");

/// id-ad-ocsp (1.3.6.1.5.5.7.48.1), access method in Authority Information Access
pub const OID_AD_OCSP: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");

/// id-sha1 (1.3.14.3.2.26), the hash OCSP responders universally accept in `CertID`
pub const OID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

// === Certificate fields ===

/// id-ce-cRLDistributionPoints (2.5.29.31)
pub const OID_CRL_DISTRIBUTION_POINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.31");

/// id-pe-authorityInfoAccess (1.3.6.1.5.5.7.1.1)
pub const OID_AUTHORITY_INFO_ACCESS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.1");

// === Signature policy defaults ===

/// Default signature policy identifier
pub const DEFAULT_POLICY_OID: &str = "2.16.620.2.1.2.2";

/// Default signature policy document URI
pub const DEFAULT_POLICY_URI: &str =
    "https://www.autenticacao.gov.pt/documents/20126/0/POL%2316.PolAssQual_signed_signed.pdf";
