//! Finalize phase: wrap the remote signature into the final `SignedData`.
//!
//! The attribute SET committed at prepare time is embedded verbatim. Nothing
//! is recomputed, so later changes to evidence or chain order cannot make the
//! signed bytes drift from what the remote signer saw.

use crate::adapters::collaborators::TimestampAuthorityClient;
use crate::domain::{
    crypto::{CertificateChain, RawSignature, Sha256Digest},
    pkcs7::{AttributesContext, FinalizedSignature},
};
use crate::services::pkcs7_builder::Pkcs7BuilderService;
use crate::{SigningError, SigningResult};

pub struct SignatureInjector;

impl SignatureInjector {
    /// Assemble the final structure and check it fits `reserved` bytes.
    ///
    /// # Errors
    ///
    /// - `Desynchronized` when the context does not carry `naked_hash`
    /// - `TimestampError` when a configured authority fails
    /// - `CapacityExceeded` when the encoding is larger than `reserved`
    pub async fn finalize(
        raw_signature: &RawSignature,
        context: &AttributesContext,
        naked_hash: &Sha256Digest,
        chain: &CertificateChain,
        timestamp_client: Option<&dyn TimestampAuthorityClient>,
        reserved: usize,
    ) -> SigningResult<FinalizedSignature> {
        let committed = context.message_digest()?;
        if committed != *naked_hash {
            return Err(SigningError::Desynchronized(format!(
                "signed attributes commit to {} but the document hashes to {}",
                committed.to_hex(),
                naked_hash.to_hex()
            )));
        }

        let token = match timestamp_client {
            Some(client) => {
                let token = client
                    .get_timestamp_token(raw_signature.as_slice())
                    .await
                    .map_err(|e| match e {
                        SigningError::TimestampError(_) => e,
                        other => SigningError::TimestampError(other.to_string()),
                    })?;
                token.validate_message_imprint(
                    Sha256Digest::compute(raw_signature.as_slice()).as_bytes(),
                )?;
                log::info!("Timestamp token obtained (genTime {})", token.gen_time());
                Some(token)
            }
            None => None,
        };

        let finalized =
            Pkcs7BuilderService::new(chain).build_signed(context, raw_signature, token.as_ref())?;
        if finalized.len() > reserved {
            return Err(SigningError::CapacityExceeded {
                required: finalized.len(),
                reserved,
            });
        }
        log::info!(
            "Finalized signature: {} of {} reserved bytes",
            finalized.len(),
            reserved
        );
        Ok(finalized)
    }
}
