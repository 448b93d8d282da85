//! Per-document signing session as a typestate:
//! `SigningSession` → `PreparedSession` → `AwaitingSignature` → `FinalizedSignature`.
//!
//! Each step consumes the previous state, so attributes cannot be skipped and
//! a finalized session cannot be reused. Dropping a state (or calling
//! `abandon`) ends the attempt.

use std::io::Read;

use crate::adapters::collaborators::TimestampAuthorityClient;
use crate::domain::{
    crypto::{CertificateChain, DigestInfoBlob, RawSignature, Sha256Digest},
    pkcs7::{AttributesContext, FinalizedSignature},
    policy::SignaturePolicy,
    revocation::RevocationEvidence,
    session::{SessionSnapshot, SessionState, SNAPSHOT_VERSION},
};
use crate::services::{
    injector::SignatureInjector,
    placeholder::PlaceholderSizeEstimator,
    session_builder::{PreparedAttributes, SigningSessionBuilder},
};
use crate::{SigningError, SigningResult};

/// Created: chain and evidence are resolved, nothing is committed yet.
#[derive(Debug)]
pub struct SigningSession {
    chain: CertificateChain,
    evidence: RevocationEvidence,
    policy: Option<SignaturePolicy>,
}

impl SigningSession {
    /// New session using the default signature policy.
    #[must_use]
    pub fn new(chain: CertificateChain, evidence: RevocationEvidence) -> Self {
        Self {
            chain,
            evidence,
            policy: Some(SignaturePolicy::default()),
        }
    }

    /// Replace the signature policy; `None` omits the policy attribute.
    #[must_use]
    pub fn with_policy(mut self, policy: Option<SignaturePolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::Created
    }
    #[must_use]
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }
    #[must_use]
    pub fn evidence(&self) -> &RevocationEvidence {
        &self.evidence
    }

    /// Placeholder size to reserve before preparing.
    #[must_use]
    pub fn estimate_placeholder(&self, has_timestamp: bool) -> usize {
        PlaceholderSizeEstimator::for_evidence(&self.evidence, has_timestamp)
    }

    /// Hash the signable bytes and commit to the signed attributes.
    pub fn prepare<R: Read + ?Sized>(
        self,
        document: &mut R,
        reserved: usize,
    ) -> SigningResult<PreparedSession> {
        if reserved == 0 {
            return Err(SigningError::InvalidInput(
                "reserved placeholder size must be positive".into(),
            ));
        }
        let prepared = SigningSessionBuilder::new(self.policy).prepare(
            document,
            &self.chain,
            &self.evidence,
        )?;
        log::info!(
            "Session {}: document digest {}",
            SessionState::AttributesPrepared,
            prepared.naked_hash.to_hex()
        );
        Ok(PreparedSession {
            chain: self.chain,
            evidence: self.evidence,
            prepared,
            reserved,
        })
    }

    pub fn abandon(self) {
        log::info!("Session {} before prepare", SessionState::Abandoned);
    }
}

/// AttributesPrepared: the attribute SET and `DigestInfo` are fixed.
#[derive(Debug)]
pub struct PreparedSession {
    chain: CertificateChain,
    evidence: RevocationEvidence,
    prepared: PreparedAttributes,
    reserved: usize,
}

impl PreparedSession {
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::AttributesPrepared
    }
    #[must_use]
    pub fn digest_info(&self) -> &DigestInfoBlob {
        &self.prepared.digest_info
    }
    #[must_use]
    pub fn naked_hash(&self) -> &Sha256Digest {
        &self.prepared.naked_hash
    }
    #[must_use]
    pub fn context(&self) -> &AttributesContext {
        &self.prepared.context
    }
    #[must_use]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Hand out the `DigestInfo` for the remote signer and wait for its answer.
    #[must_use]
    pub fn request_signature(self) -> (DigestInfoBlob, AwaitingSignature) {
        let digest_info = self.prepared.digest_info.clone();
        log::info!("Session {}", SessionState::AwaitingRemoteSignature);
        (
            digest_info,
            AwaitingSignature {
                chain: self.chain,
                evidence: self.evidence,
                prepared: self.prepared,
                reserved: self.reserved,
            },
        )
    }

    pub fn abandon(self) {
        log::info!("Session {} after prepare", SessionState::Abandoned);
    }
}

/// AwaitingRemoteSignature: only the raw signature is missing.
#[derive(Debug)]
pub struct AwaitingSignature {
    chain: CertificateChain,
    evidence: RevocationEvidence,
    prepared: PreparedAttributes,
    reserved: usize,
}

impl AwaitingSignature {
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::AwaitingRemoteSignature
    }
    #[must_use]
    pub fn digest_info(&self) -> &DigestInfoBlob {
        &self.prepared.digest_info
    }
    #[must_use]
    pub fn naked_hash(&self) -> &Sha256Digest {
        &self.prepared.naked_hash
    }
    #[must_use]
    pub fn context(&self) -> &AttributesContext {
        &self.prepared.context
    }
    #[must_use]
    pub fn chain(&self) -> &CertificateChain {
        &self.chain
    }
    #[must_use]
    pub fn evidence(&self) -> &RevocationEvidence {
        &self.evidence
    }
    #[must_use]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Weave the remote signature into the final structure.
    pub async fn finalize(
        self,
        raw_signature: &RawSignature,
        timestamp_client: Option<&dyn TimestampAuthorityClient>,
    ) -> SigningResult<FinalizedSignature> {
        let finalized = SignatureInjector::finalize(
            raw_signature,
            &self.prepared.context,
            &self.prepared.naked_hash,
            &self.chain,
            timestamp_client,
            self.reserved,
        )
        .await?;
        log::info!("Session {}", SessionState::Finalized);
        Ok(finalized)
    }

    pub fn abandon(self) {
        log::info!("Session {} while awaiting the remote signature", SessionState::Abandoned);
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            chain: self.chain.to_der_list(),
            evidence: self.evidence.clone(),
            signed_attributes: self.prepared.context.as_der().to_vec(),
            naked_hash: self.prepared.naked_hash.to_hex(),
            digest_info: self.prepared.digest_info.as_bytes().to_vec(),
            reserved_size: self.reserved,
        }
    }

    /// Rebuild a session from a snapshot, re-checking that the stored
    /// `DigestInfo` and document digest match the stored attributes.
    pub fn from_snapshot(snapshot: SessionSnapshot) -> SigningResult<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SigningError::InvalidInput(format!(
                "unsupported session snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        if snapshot.reserved_size == 0 {
            return Err(SigningError::InvalidInput(
                "session snapshot has no reserved placeholder size".into(),
            ));
        }
        let chain = CertificateChain::from_der_list(snapshot.chain)?;
        let context = AttributesContext::from_der(snapshot.signed_attributes)?;
        let naked_hash = Sha256Digest::from_hex(&snapshot.naked_hash)?;
        let digest_info = DigestInfoBlob::from_bytes(&snapshot.digest_info)?;

        if digest_info != context.digest_info() {
            return Err(SigningError::Desynchronized(
                "DigestInfo does not match the stored signed attributes".into(),
            ));
        }
        if context.message_digest()? != naked_hash {
            return Err(SigningError::Desynchronized(
                "document digest does not match the stored signed attributes".into(),
            ));
        }

        Ok(Self {
            chain,
            evidence: snapshot.evidence,
            prepared: PreparedAttributes {
                digest_info,
                naked_hash,
                context,
            },
            reserved: snapshot.reserved_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crypto::test_certs;

    fn awaiting() -> AwaitingSignature {
        let session = SigningSession::new(test_certs::chain(2), RevocationEvidence::none());
        let reserved = session.estimate_placeholder(false);
        let (_, awaiting) = session
            .prepare(&mut &b"document bytes"[..], reserved)
            .unwrap()
            .request_signature();
        awaiting
    }

    #[test]
    fn test_states_progress() {
        let session = SigningSession::new(test_certs::chain(1), RevocationEvidence::none());
        assert_eq!(session.state(), SessionState::Created);
        assert_eq!(session.estimate_placeholder(false), 8192);
        let prepared = session.prepare(&mut &b"x"[..], 8192).unwrap();
        assert_eq!(prepared.state(), SessionState::AttributesPrepared);
        let (info, awaiting) = prepared.request_signature();
        assert_eq!(awaiting.state(), SessionState::AwaitingRemoteSignature);
        assert_eq!(&info, awaiting.digest_info());
    }

    #[test]
    fn test_zero_reservation_rejected() {
        let session = SigningSession::new(test_certs::chain(1), RevocationEvidence::none());
        assert!(session.prepare(&mut &b"x"[..], 0).is_err());
    }

    #[tokio::test]
    async fn test_snapshot_finalizes_identically() {
        let original = awaiting();
        let json = serde_json::to_string(&original.snapshot()).unwrap();
        let restored = AwaitingSignature::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.digest_info(), original.digest_info());

        let sig = RawSignature::new(vec![0x42; 256]).unwrap();
        let a = original.finalize(&sig, None).await.unwrap();
        let b = restored.finalize(&sig, None).await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let mut snapshot = awaiting().snapshot();
        snapshot.naked_hash = Sha256Digest::compute(b"tampered").to_hex();
        assert!(matches!(
            AwaitingSignature::from_snapshot(snapshot),
            Err(SigningError::Desynchronized(_))
        ));

        let mut snapshot = awaiting().snapshot();
        let last = snapshot.digest_info.len() - 1;
        snapshot.digest_info[last] ^= 0xFF;
        assert!(matches!(
            AwaitingSignature::from_snapshot(snapshot),
            Err(SigningError::Desynchronized(_))
        ));

        let mut snapshot = awaiting().snapshot();
        snapshot.version = 99;
        assert!(AwaitingSignature::from_snapshot(snapshot).is_err());
    }
}
