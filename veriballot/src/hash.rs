use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of arbitrary bytes. Every digest in the
/// system goes through here.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Digest of a raw voter identifier. Keys the ledger so the
/// identifier itself is never stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VoterHash(String);

impl VoterHash {
    pub fn of_voter_id(voter_id: &str) -> Self {
        VoterHash(sha256_hex(voter_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest of a canonical ballot message. A separate type from
/// [`VoterHash`] so the two namespaces cannot be swapped by accident.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct BallotHash(String);

impl BallotHash {
    pub fn of_message(message: &str) -> Self {
        BallotHash(sha256_hex(message))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BallotHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
