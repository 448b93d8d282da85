//! Session lifecycle states and the persisted form of a session that is
//! waiting for its remote signature.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::revocation::RevocationEvidence;

/// Snapshot format version; bump when fields change meaning.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Lifecycle of one document's signing attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Created,
    AttributesPrepared,
    AwaitingRemoteSignature,
    Finalized,
    Abandoned,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::AttributesPrepared => "attributes-prepared",
            Self::AwaitingRemoteSignature => "awaiting-remote-signature",
            Self::Finalized => "finalized",
            Self::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Everything finalize needs, so prepare and finalize can run in separate
/// processes. Restoring re-checks the digest chain before use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    #[serde(with = "super::b64::list")]
    pub chain: Vec<Vec<u8>>,
    pub evidence: RevocationEvidence,
    #[serde(with = "super::b64")]
    pub signed_attributes: Vec<u8>,
    /// Hex SHA-256 of the signable bytes.
    pub naked_hash: String,
    #[serde(with = "super::b64")]
    pub digest_info: Vec<u8>,
    pub reserved_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(
            SessionState::AwaitingRemoteSignature.to_string(),
            "awaiting-remote-signature"
        );
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = SessionSnapshot {
            version: SNAPSHOT_VERSION,
            chain: vec![vec![0x30, 0x00]],
            evidence: RevocationEvidence::none(),
            signed_attributes: vec![0x31, 0x00],
            naked_hash: "00".repeat(32),
            digest_info: vec![1, 2, 3],
            reserved_size: 8192,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["chain"][0], "MAA=");
        assert_eq!(json["signed_attributes"], "MQA=");
        assert!(json["evidence"]["crls"].is_null());

        let back: SessionSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
