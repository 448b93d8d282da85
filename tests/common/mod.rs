//! Shared fixtures for integration tests: deterministic certificates, fake
//! collaborators and a one-shot HTTP responder.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use der::asn1::{Any, BitString, ObjectIdentifier, SetOfVec, UtcTime};
use der::{Encode, Tag};
use remote_cms_signer::domain::{asn1, constants, crypto::SubjectField};
use remote_cms_signer::{
    Certificate, CertificateChain, DigestInfoBlob, RawSignature, RemoteSigningGateway,
    RevocationResponder, Sha256Digest, SigningError, SigningResult, TimestampAuthorityClient,
    TimestampToken,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};
use x509_cert::{TbsCertificate, Version};

fn name(cn: &str) -> RdnSequence {
    let atv = AttributeTypeAndValue {
        oid: SubjectField::CommonName.oid(),
        value: Any::new(Tag::Utf8String, cn.as_bytes()).unwrap(),
    };
    RdnSequence(vec![RelativeDistinguishedName(
        SetOfVec::try_from(vec![atv]).unwrap(),
    )])
}

fn alg(oid: ObjectIdentifier) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid,
        parameters: Some(Any::null()),
    }
}

/// DER certificate with a dummy signature; nothing here verifies it.
pub fn cert_der(subject: &str, issuer: &str, serial: u8) -> Vec<u8> {
    let sha256_rsa = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
    let tbs = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[serial]).unwrap(),
        signature: alg(sha256_rsa),
        issuer: name(issuer),
        validity: Validity {
            not_before: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(1_600_000_000)).unwrap(),
            ),
            not_after: Time::UtcTime(
                UtcTime::from_unix_duration(Duration::from_secs(1_900_000_000)).unwrap(),
            ),
        },
        subject: name(subject),
        subject_public_key_info: SubjectPublicKeyInfoOwned {
            algorithm: alg(constants::OID_RSA_ENCRYPTION),
            subject_public_key: BitString::from_bytes(&[0x30, 0x03, 0x02, 0x01, serial]).unwrap(),
        },
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };
    x509_cert::Certificate {
        tbs_certificate: tbs,
        signature_algorithm: alg(sha256_rsa),
        signature: BitString::from_bytes(&[serial; 16]).unwrap(),
    }
    .to_der()
    .unwrap()
}

/// Signer, intermediate, root; `len` in 1..=3.
pub fn chain(len: usize) -> CertificateChain {
    let all = [
        cert_der("Document Signer", "Issuing CA", 3),
        cert_der("Issuing CA", "Root CA", 2),
        cert_der("Root CA", "Root CA", 1),
    ];
    CertificateChain::from_der_list(all[..len].to_vec()).unwrap()
}

pub fn chain_pem(chain: &CertificateChain) -> String {
    chain
        .to_der_list()
        .iter()
        .map(|der| der::pem::encode_string("CERTIFICATE", der::pem::LineEnding::LF, der).unwrap())
        .collect()
}

/// Small well-formed DER element standing in for a CRL or OCSP response.
pub fn blob(fill: u8, len: usize) -> Vec<u8> {
    asn1::octet_string(&vec![fill; len])
}

/// Gateway returning a fixed signature and recording what it was asked to sign.
pub struct FakeGateway {
    pub signature: Vec<u8>,
    pub requests: Mutex<Vec<DigestInfoBlob>>,
}

impl FakeGateway {
    pub fn new(signature_len: usize) -> Self {
        Self {
            signature: vec![0x6b; signature_len],
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RemoteSigningGateway for FakeGateway {
    async fn sign(&self, digest_info: &DigestInfoBlob) -> SigningResult<RawSignature> {
        self.requests.lock().unwrap().push(digest_info.clone());
        RawSignature::new(self.signature.clone())
    }
}

/// TSA issuing a structurally valid token over the SHA-256 of the signature.
pub struct FakeTsa;

#[async_trait]
impl TimestampAuthorityClient for FakeTsa {
    async fn get_timestamp_token(&self, signature: &[u8]) -> SigningResult<TimestampToken> {
        TimestampToken::from_der(token_der(Sha256Digest::compute(signature).as_bytes()))
    }
}

/// Responder returning `blob` for every certificate, or failing when `None`.
pub struct FakeResponder {
    pub blob: Option<Vec<u8>>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeResponder {
    pub fn returning(blob: Vec<u8>) -> Self {
        Self {
            blob: Some(blob),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            blob: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RevocationResponder for FakeResponder {
    async fn get_encoded(
        &self,
        certificate: &Certificate,
        issuer: Option<&Certificate>,
    ) -> SigningResult<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push((
            certificate.common_name().unwrap_or_default(),
            issuer.and_then(Certificate::common_name),
        ));
        self.blob
            .clone()
            .map(Some)
            .ok_or_else(|| SigningError::RevocationError("responder offline".into()))
    }
}

/// RFC 3161 `TimeStampToken` with the given message imprint.
pub fn token_der(imprint: &[u8]) -> Vec<u8> {
    let tst_info = asn1::sequence(&[
        &constants::ASN1_INTEGER_ONE,
        &asn1::oid(&ObjectIdentifier::new_unwrap("1.2.3.4.1")),
        &asn1::sequence(&[
            &asn1::algorithm_identifier(&constants::OID_SHA256),
            &asn1::octet_string(imprint),
        ]),
        &asn1::tlv(constants::ASN1_INTEGER_TAG, &[0x07]),
        &asn1::tlv(0x18, b"20250301093000Z"),
    ]);
    let encap = asn1::sequence(&[
        &asn1::oid(&constants::OID_CT_TST_INFO),
        &asn1::context(0, &asn1::octet_string(&tst_info)),
    ]);
    let signed_data = asn1::sequence(&[
        &asn1::tlv(constants::ASN1_INTEGER_TAG, &[0x03]),
        &asn1::set_of(vec![asn1::algorithm_identifier(&constants::OID_SHA256)]),
        &encap,
        &asn1::set_of(Vec::new()),
    ]);
    asn1::sequence(&[
        &asn1::oid(&constants::OID_SIGNED_DATA),
        &asn1::context(0, &signed_data),
    ])
}

/// `TimeStampResp` with `status` and optional token.
pub fn timestamp_response(status: u8, token: Option<&[u8]>) -> Vec<u8> {
    let status_info = asn1::sequence(&[&asn1::tlv(constants::ASN1_INTEGER_TAG, &[status])]);
    match token {
        Some(token) => asn1::sequence(&[&status_info, token]),
        None => asn1::sequence(&[&status_info]),
    }
}

/// A request captured by [`serve_once`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

/// Serve one canned HTTP response on a random local port.
///
/// Returns the base URL and a handle resolving to the captured request.
pub async fn serve_once(
    status: u16,
    content_type: &str,
    body: Vec<u8>,
) -> (String, tokio::task::JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let content_type = content_type.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let (head, body_start) = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break (String::from_utf8_lossy(&buf[..pos]).into_owned(), pos + 4);
            }
        };
        let request = CapturedRequest {
            head: head.clone(),
            body: Vec::new(),
        };
        let content_length: usize = request
            .header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        while buf.len() < body_start + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        let reply = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.ok();

        CapturedRequest {
            head,
            body: buf[body_start..].to_vec(),
        }
    });

    (format!("http://{addr}"), handle)
}
