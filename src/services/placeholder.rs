//! Upper bound for the size of the finished `SignedData`.
//!
//! The bound is reserved in the document before the signature exists, so it
//! has to cover the certificate chain, the signature itself and whatever
//! evidence will be embedded. The constants were tuned against real output.

use crate::domain::constants::{
    PLACEHOLDER_BASE_SIZE, PLACEHOLDER_CRL_OVERHEAD, PLACEHOLDER_OCSP_SIZE,
    PLACEHOLDER_TIMESTAMP_SIZE,
};
use crate::domain::revocation::RevocationEvidence;

pub struct PlaceholderSizeEstimator;

impl PlaceholderSizeEstimator {
    #[must_use]
    pub fn estimate(has_ocsp: bool, has_timestamp: bool, crl_lengths: &[usize]) -> usize {
        let mut size = PLACEHOLDER_BASE_SIZE;
        if has_ocsp {
            size += PLACEHOLDER_OCSP_SIZE;
        }
        if has_timestamp {
            size += PLACEHOLDER_TIMESTAMP_SIZE;
        }
        size + crl_lengths
            .iter()
            .map(|len| len + PLACEHOLDER_CRL_OVERHEAD)
            .sum::<usize>()
    }

    /// Estimate from collected evidence. OCSP space is reserved whenever an
    /// OCSP responder took part, even if it returned nothing.
    #[must_use]
    pub fn for_evidence(evidence: &RevocationEvidence, has_timestamp: bool) -> usize {
        Self::estimate(evidence.has_ocsp(), has_timestamp, &evidence.crl_lengths())
    }
}
