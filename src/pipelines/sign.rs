//! `SigningCoordinator` drives one document through the two signing phases.
//!
//! Prepare: collect revocation evidence, size and reserve the placeholder,
//! hash the signable bytes and commit to the signed attributes.
//! Finalize: obtain the remote signature, optionally timestamp it, assemble
//! the `SignedData` and write it into the reserved space.
//!
//! The two phases can run in one call (`sign_document`) or in separate
//! processes through a [`PendingDocument`].

use serde::{Deserialize, Serialize};

use crate::{
    adapters::collaborators::{
        DocumentContainer, RemoteSigningGateway, RevocationResponder, TimestampAuthorityClient,
    },
    domain::{
        crypto::{CertificateChain, DigestInfoBlob, RawSignature, Sha256Digest},
        pkcs7::FinalizedSignature,
        policy::SignaturePolicy,
        session::SessionSnapshot,
    },
    services::{AwaitingSignature, PreparedSession, RevocationEvidenceCollector, SigningSession},
    SigningError, SigningResult,
};

/// A prepared document waiting for its remote signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDocument<H> {
    pub session: SessionSnapshot,
    pub handle: H,
}

pub struct SigningCoordinator<'a> {
    gateway: &'a dyn RemoteSigningGateway,
    timestamp_client: Option<&'a dyn TimestampAuthorityClient>,
    crl_responders: Vec<&'a dyn RevocationResponder>,
    ocsp_responder: Option<&'a dyn RevocationResponder>,
    policy: Option<SignaturePolicy>,
    placeholder_margin: usize,
}

impl<'a> SigningCoordinator<'a> {
    #[must_use]
    pub fn new(gateway: &'a dyn RemoteSigningGateway) -> Self {
        Self {
            gateway,
            timestamp_client: None,
            crl_responders: Vec::new(),
            ocsp_responder: None,
            policy: Some(SignaturePolicy::default()),
            placeholder_margin: 0,
        }
    }

    #[must_use]
    pub fn with_timestamp_client(mut self, client: Option<&'a dyn TimestampAuthorityClient>) -> Self {
        self.timestamp_client = client;
        self
    }

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

    #[must_use]
    pub fn with_policy(mut self, policy: Option<SignaturePolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_placeholder_margin(mut self, margin: usize) -> Self {
        self.placeholder_margin = margin;
        self
    }

    #[must_use]
    pub fn has_timestamp(&self) -> bool {
        self.timestamp_client.is_some()
    }

    /// Collect evidence and open a session for `chain`.
    pub async fn open_session(&self, chain: CertificateChain) -> SigningSession {
        let collector = self
            .crl_responders
            .iter()
            .fold(RevocationEvidenceCollector::new(), |c, r| c.with_crl_responder(*r))
            .with_ocsp_responder(self.ocsp_responder);
        let evidence = collector.collect(&chain).await;
        SigningSession::new(chain, evidence).with_policy(self.policy.clone())
    }

    /// Reserve the placeholder in `container` and commit to the attributes.
    ///
    /// Nothing is sent to the gateway in this phase.
    pub async fn prepare<C: DocumentContainer>(
        &self,
        chain: CertificateChain,
        container: &mut C,
    ) -> SigningResult<(C::Handle, PreparedSession)> {
        let session = self.open_session(chain).await;
        let reserved = session.estimate_placeholder(self.has_timestamp()) + self.placeholder_margin;
        log::info!("Reserving {reserved} bytes for the signature");

        let handle = container.reserve_signature_placeholder(reserved)?;
        let prepared = {
            let mut signable = container.read_signable_bytes(&handle)?;
            session.prepare(&mut signable, reserved)?
        };
        Ok((handle, prepared))
    }

    /// Prepare and detach: the returned [`PendingDocument`] can be stored and
    /// finalized later, together with the `DigestInfo` to be signed.
    pub async fn prepare_pending<C: DocumentContainer>(
        &self,
        chain: CertificateChain,
        container: &mut C,
    ) -> SigningResult<(PendingDocument<C::Handle>, DigestInfoBlob)> {
        let (handle, prepared) = self.prepare(chain, container).await?;
        let (digest_info, awaiting) = prepared.request_signature();
        let pending = PendingDocument {
            session: awaiting.snapshot(),
            handle,
        };
        Ok((pending, digest_info))
    }

    /// Assemble the final structure around `raw_signature` and write it.
    ///
    /// The container's signable bytes are hashed again first; if they no
    /// longer match the session the call fails with `Desynchronized` and
    /// nothing is written.
    pub async fn finalize<C: DocumentContainer>(
        &self,
        awaiting: AwaitingSignature,
        raw_signature: &RawSignature,
        container: &mut C,
        handle: C::Handle,
    ) -> SigningResult<FinalizedSignature> {
        let (current, _) = {
            let mut signable = container.read_signable_bytes(&handle)?;
            Sha256Digest::compute_reader(&mut signable)?
        };
        if current != *awaiting.naked_hash() {
            let awaiting_hash_hex = awaiting.naked_hash().to_hex();
            awaiting.abandon();
            return Err(SigningError::Desynchronized(format!(
                "document changed since prepare: signable bytes hash to {}, session expects {}",
                current.to_hex(),
                awaiting_hash_hex
            )));
        }
        let finalized = awaiting
            .finalize(raw_signature, self.timestamp_client)
            .await?;
        container.write_final_signature(handle, &finalized)?;
        Ok(finalized)
    }

    /// Finalize a document prepared by [`Self::prepare_pending`].
    pub async fn finalize_pending<C: DocumentContainer>(
        &self,
        pending: PendingDocument<C::Handle>,
        raw_signature: &RawSignature,
        container: &mut C,
    ) -> SigningResult<FinalizedSignature> {
        let awaiting = AwaitingSignature::from_snapshot(pending.session)?;
        self.finalize(awaiting, raw_signature, container, pending.handle)
            .await
    }

    /// Sign a pending document through the gateway and finalize it.
    pub async fn sign_pending<C: DocumentContainer>(
        &self,
        pending: PendingDocument<C::Handle>,
        container: &mut C,
    ) -> SigningResult<FinalizedSignature> {
        let awaiting = AwaitingSignature::from_snapshot(pending.session)?;
        let raw_signature = self.gateway.sign(awaiting.digest_info()).await?;
        self.finalize(awaiting, &raw_signature, container, pending.handle)
            .await
    }

    /// Run both phases back to back.
    pub async fn sign_document<C: DocumentContainer>(
        &self,
        chain: CertificateChain,
        container: &mut C,
    ) -> SigningResult<FinalizedSignature> {
        let (handle, prepared) = self.prepare(chain, container).await?;
        let (digest_info, awaiting) = prepared.request_signature();
        log::info!("Requesting remote signature");
        let raw_signature = match self.gateway.sign(&digest_info).await {
            Ok(sig) => sig,
            Err(e) => {
                awaiting.abandon();
                return Err(e);
            }
        };
        self.finalize(awaiting, &raw_signature, container, handle)
            .await
    }
}
