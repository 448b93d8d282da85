//! HTTP collaborators against a canned local responder.

use std::time::Duration;

use base64::Engine;
use remote_cms_signer::adapters::crl_http_client::{CrlHttpClient, CrlHttpConfig};
use remote_cms_signer::adapters::ocsp_http_client::{build_request, OcspHttpClient, OcspHttpConfig};
use remote_cms_signer::adapters::remote::protocol::{
    CertificateChainResponse, ErrorResponse, SignRequest, SignResponse, PROTOCOL_VERSION,
};
use remote_cms_signer::adapters::remote::{GatewayConfig, HttpSigningGateway};
use remote_cms_signer::adapters::timestamp_http_client::{TimestampHttpClient, TimestampHttpConfig};
use remote_cms_signer::domain::{asn1, asn1::Tlv, constants};
use remote_cms_signer::{
    DigestInfoBlob, RemoteSigningGateway, RevocationResponder, Sha256Digest, SigningError,
    TimestampAuthorityClient,
};

mod common;
use common::{serve_once, timestamp_response, token_der};

fn gateway(base_url: &str) -> HttpSigningGateway {
    let config = GatewayConfig::new(base_url, "app-42")
        .with_credentials("user", "pass")
        .with_timeout(5);
    HttpSigningGateway::new(config)
        .unwrap()
        .with_document_name("contract.pdf")
}

fn tsa(url: &str) -> TimestampHttpClient {
    TimestampHttpClient::new(TimestampHttpConfig {
        primary: format!("{url}/tsr"),
        fallbacks: Vec::new(),
        timeout: Duration::from_secs(5),
        retries_per_server: 1,
        retry_delay: Duration::from_millis(10),
    })
    .unwrap()
}

#[tokio::test]
async fn gateway_posts_digest_info_with_basic_auth() {
    let signature = vec![0x17; 256];
    let body = serde_json::to_vec(&SignResponse::new(&signature)).unwrap();
    let (url, server) = serve_once(200, "application/json", body).await;

    let digest_info = DigestInfoBlob::from_digest(&Sha256Digest::compute(b"attributes"));
    let raw = gateway(&url).sign(&digest_info).await.unwrap();
    assert_eq!(raw.as_slice(), signature.as_slice());

    let request = server.await.unwrap();
    assert!(request.head.starts_with("POST /sign "));
    assert_eq!(
        request.header("authorization").as_deref(),
        Some("Basic dXNlcjpwYXNz")
    );
    let sent: SignRequest = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(sent.version, PROTOCOL_VERSION);
    assert_eq!(sent.application_id, "app-42");
    assert_eq!(sent.document_name, "contract.pdf");
    assert_eq!(sent.decode_digest_info().unwrap(), digest_info.as_bytes());
}

#[tokio::test]
async fn gateway_denial_carries_authority_status() {
    let body = serde_json::to_vec(&ErrorResponse::new("801", "OTP expired")).unwrap();
    let (url, _server) = serve_once(403, "application/json", body).await;

    let digest_info = DigestInfoBlob::from_digest(&Sha256Digest::compute(b"x"));
    match gateway(&url).sign(&digest_info).await.unwrap_err() {
        SigningError::RemoteDenied { status, message } => {
            assert_eq!(status, "801");
            assert_eq!(message, "OTP expired");
        }
        other => panic!("expected RemoteDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_fetches_pem_chain() {
    let chain = common::chain(2);
    let body = serde_json::to_vec(&CertificateChainResponse {
        version: PROTOCOL_VERSION.to_string(),
        certificate_chain_pem: common::chain_pem(&chain),
    })
    .unwrap();
    let (url, server) = serve_once(200, "application/json", body).await;

    let fetched = gateway(&url).get_certificate_chain().await.unwrap();
    assert_eq!(fetched.to_der_list(), chain.to_der_list());
    assert!(server.await.unwrap().head.starts_with("POST /certificate "));
}

#[tokio::test]
async fn timestamp_client_returns_validated_token() {
    let signature = vec![0x23; 256];
    let token = token_der(Sha256Digest::compute(&signature).as_bytes());
    let (url, server) = serve_once(
        200,
        "application/timestamp-reply",
        timestamp_response(0, Some(&token)),
    )
    .await;

    let received = tsa(&url).get_timestamp_token(&signature).await.unwrap();
    assert_eq!(received.der(), token.as_slice());
    assert_eq!(received.gen_time(), "20250301093000Z");

    let request = server.await.unwrap();
    assert_eq!(
        request.header("content-type").as_deref(),
        Some("application/timestamp-query")
    );
    let req = Tlv::parse(&request.body).unwrap();
    assert_eq!(req.tag(), constants::ASN1_SEQUENCE_TAG);
    let imprint = req.children().unwrap()[1].children().unwrap()[1];
    assert_eq!(imprint.value(), Sha256Digest::compute(&signature).as_bytes());
}

#[tokio::test]
async fn timestamp_rejection_is_timestamp_error() {
    let (url, _server) =
        serve_once(200, "application/timestamp-reply", timestamp_response(2, None)).await;

    let err = tsa(&url).get_timestamp_token(&[1; 64]).await.unwrap_err();
    assert!(matches!(err, SigningError::TimestampError(msg) if msg.contains("status 2")));
}

#[tokio::test]
async fn timestamp_for_other_signature_is_rejected() {
    let token = token_der(Sha256Digest::compute(b"someone else").as_bytes());
    let (url, _server) = serve_once(
        200,
        "application/timestamp-reply",
        timestamp_response(0, Some(&token)),
    )
    .await;

    let err = tsa(&url).get_timestamp_token(&[1; 64]).await.unwrap_err();
    assert!(matches!(err, SigningError::TimestampError(_)));
}

#[tokio::test]
async fn crl_client_downloads_pem_crl() {
    let crl_der = vec![0x30, 0x05, 0x02, 0x03, 0x01, 0x00, 0x01];
    let pem = der::pem::encode_string("X509 CRL", der::pem::LineEnding::LF, &crl_der).unwrap();
    let (url, server) = serve_once(200, "application/pkix-crl", pem.into_bytes()).await;

    let client = CrlHttpClient::new(CrlHttpConfig {
        urls: vec![format!("{url}/issuing.crl")],
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let chain = common::chain(2);
    let crl = client
        .get_encoded(chain.leaf(), chain.certificates().get(1))
        .await
        .unwrap();
    assert_eq!(crl, Some(crl_der));
    assert!(server.await.unwrap().head.starts_with("GET /issuing.crl "));
}

#[tokio::test]
async fn ocsp_client_posts_request_and_returns_basic_response() {
    let basic = asn1::sequence(&[&asn1::octet_string(b"tbsResponseData")]);
    let body = asn1::sequence(&[
        &constants::OCSP_RESPONSE_SUCCESSFUL,
        &asn1::context(
            0,
            &asn1::sequence(&[&asn1::oid(&constants::OID_OCSP_BASIC), &asn1::octet_string(&basic)]),
        ),
    ]);
    let (url, server) = serve_once(200, "application/ocsp-response", body).await;

    let client = OcspHttpClient::new(OcspHttpConfig {
        url: Some(format!("{url}/ocsp")),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let chain = common::chain(2);
    let issuer = &chain.certificates()[1];
    let response = client.get_encoded(chain.leaf(), Some(issuer)).await.unwrap();
    assert_eq!(response, Some(basic));

    let request = server.await.unwrap();
    assert!(request.head.starts_with("POST /ocsp "));
    assert_eq!(
        request.header("content-type").as_deref(),
        Some("application/ocsp-request")
    );
    assert_eq!(request.body, build_request(chain.leaf(), issuer).unwrap());
}

#[tokio::test]
async fn ocsp_refusal_is_revocation_error() {
    let body = asn1::sequence(&[&asn1::tlv(constants::ASN1_ENUMERATED_TAG, &[0x03])]);
    let (url, _server) = serve_once(200, "application/ocsp-response", body).await;

    let client = OcspHttpClient::new(OcspHttpConfig {
        url: Some(url),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let chain = common::chain(2);
    let err = client
        .get_encoded(chain.leaf(), chain.certificates().get(1))
        .await
        .unwrap_err();
    assert!(matches!(err, SigningError::RevocationError(_)));
}

#[test]
fn gateway_request_is_base64_of_digest_info() {
    let digest_info = DigestInfoBlob::from_digest(&Sha256Digest::compute(b"doc"));
    let request = SignRequest::new(digest_info.as_bytes(), "app", "doc.pdf");
    assert_eq!(
        base64::engine::general_purpose::STANDARD
            .decode(&request.digest_info_b64)
            .unwrap(),
        digest_info.as_bytes()
    );
}
