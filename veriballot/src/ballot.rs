use crate::*;

/// Verb prefix of every canonical ballot message.
pub const CAST_VERB: &str = "I vote for";

/// Canonical plaintext for a choice: `"I vote for <candidate>"`.
pub fn ballot_message(candidate: &str) -> String {
    format!("{} {}", CAST_VERB, candidate)
}

/// A ballot as it leaves the voter: the canonical message, its digest,
/// and the voter's PSS signature over the digest.
///
/// Construction is the signing half of a submission. Verification and
/// recording happen separately, against the ledger's copy of the
/// public key, so anything altered in between is caught there.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignedBallot {
    pub voter_hash: VoterHash,
    pub candidate: String,
    pub message: String,
    pub message_hash: BallotHash,
    #[serde(with = "serde_b64")]
    pub signature: Vec<u8>,
}

impl SignedBallot {
    /// Build and sign a ballot with the voter's private key.
    ///
    /// Does not consult the ledger; whether this key matches the
    /// registered public key is decided at verification time.
    pub fn new(voter_id: &str, candidate: &str, private_pem: &str) -> Result<Self, Error> {
        let message = ballot_message(candidate);
        let message_hash = BallotHash::of_message(&message);
        let signature = sign_digest(&message_hash, private_pem)?;

        Ok(SignedBallot {
            voter_hash: VoterHash::of_voter_id(voter_id),
            candidate: candidate.to_string(),
            message,
            message_hash,
            signature,
        })
    }
}
