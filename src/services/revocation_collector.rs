//! Gathers CRL and OCSP evidence for a certificate chain.
//!
//! Lookups are advisory: a failing responder is logged and skipped, it never
//! blocks signing.

use crate::adapters::collaborators::RevocationResponder;
use crate::domain::asn1::Tlv;
use crate::domain::crypto::CertificateChain;
use crate::domain::revocation::{CrlBlob, OcspBlob, RevocationEvidence};

#[derive(Default)]
pub struct RevocationEvidenceCollector<'a> {
    crl_responders: Vec<&'a dyn RevocationResponder>,
    ocsp_responder: Option<&'a dyn RevocationResponder>,
}

impl<'a> RevocationEvidenceCollector<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CRL source; several may be configured and are asked in order.
    #[must_use]
    pub fn with_crl_responder(mut self, responder: &'a dyn RevocationResponder) -> Self {
        self.crl_responders.push(responder);
        self
    }

    #[must_use]
    pub fn with_ocsp_responder(mut self, responder: Option<&'a dyn RevocationResponder>) -> Self {
        self.ocsp_responder = responder;
        self
    }

    pub async fn collect(&self, chain: &CertificateChain) -> RevocationEvidence {
        let crls = self.collect_crls(chain).await;
        let ocsp = self.collect_ocsp(chain).await;
        log::info!(
            "Revocation evidence: {} CRL(s), {} OCSP response(s)",
            crls.as_ref().map_or_else(|| "no".to_string(), |v| v.len().to_string()),
            ocsp.as_ref().map_or_else(|| "no".to_string(), |v| v.len().to_string()),
        );
        RevocationEvidence { crls, ocsp }
    }

    async fn collect_crls(&self, chain: &CertificateChain) -> Option<Vec<CrlBlob>> {
        if self.crl_responders.is_empty() {
            return None;
        }
        let mut blobs = Vec::new();
        for (index, cert) in chain.certificates().iter().enumerate() {
            let issuer = chain.certificates().get(index + 1);
            for responder in &self.crl_responders {
                match responder.get_encoded(cert, issuer).await {
                    Ok(Some(der)) if is_single_element("CRL", index, &der) => {
                        log::debug!("CRL for chain[{index}]: {} bytes", der.len());
                        blobs.push(CrlBlob::new(der));
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => log::debug!("No CRL for chain[{index}]"),
                    Err(e) => log::warn!("CRL lookup for chain[{index}] failed, skipping: {e}"),
                }
            }
        }
        Some(blobs)
    }

    async fn collect_ocsp(&self, chain: &CertificateChain) -> Option<Vec<OcspBlob>> {
        let responder = self.ocsp_responder?;
        if chain.len() < 2 {
            log::debug!("Chain has a single certificate; OCSP not applicable");
            return None;
        }
        let mut blobs = Vec::new();
        for (index, (cert, issuer)) in chain.adjacent_pairs().enumerate() {
            match responder.get_encoded(cert, Some(issuer)).await {
                Ok(Some(der)) if is_single_element("OCSP response", index, &der) => {
                    log::debug!("OCSP for chain[{index}]: {} bytes", der.len());
                    blobs.push(OcspBlob::new(der));
                }
                Ok(Some(_)) => {}
                Ok(None) => log::debug!("No OCSP response for chain[{index}]"),
                Err(e) => log::warn!("OCSP lookup for chain[{index}] failed, skipping: {e}"),
            }
        }
        Some(blobs)
    }
}

/// Evidence is archived as-is, so anything but one DER element is dropped here.
fn is_single_element(kind: &str, index: usize, der: &[u8]) -> bool {
    match Tlv::parse(der) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Malformed {kind} for chain[{index}] ({} bytes), skipping: {e}", der.len());
            false
        }
    }
}
