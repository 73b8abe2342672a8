use crate::*;

use chrono::{DateTime, Utc};
use log::{debug, info};

/// Returned to the caller once a ballot is accepted and recorded.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub voter_hash: VoterHash,
    pub candidate: String,
    pub cast_at: DateTime<Utc>,
}

/// Full submission: sign on the voter's side, then verify and record.
///
/// The roster is consulted before any hashing or signing, and the
/// cheap registration and single-use checks run up front. The same
/// checks repeat authoritatively inside the ledger commit, so two
/// racing submissions for one voter resolve to one success and one
/// `AlreadyVoted`.
pub fn submit_vote(
    ledger: &Ledger,
    voter_id: &str,
    candidate: &str,
    private_pem: &str,
) -> Result<VoteReceipt, Error> {
    if !ledger.candidates().iter().any(|c| c == candidate) {
        return Err(Error::InvalidCandidate(candidate.to_string()));
    }

    let voter_hash = VoterHash::of_voter_id(voter_id);
    let voter = ledger.voter(&voter_hash).ok_or(Error::NotRegistered)?;
    if voter.has_voted {
        return Err(Error::AlreadyVoted);
    }

    let ballot = SignedBallot::new(voter_id, candidate, private_pem)?;
    verify_and_record(ledger, ballot)
}

/// Verification half of a submission, fed a ballot signed elsewhere.
///
/// The digest is recomputed from the received message, never trusted
/// from the ballot; the signature is checked against the registered
/// public key, not anything the ballot carries. Only then does the
/// atomic commit run.
pub fn verify_and_record(ledger: &Ledger, ballot: SignedBallot) -> Result<VoteReceipt, Error> {
    let voter = ledger.voter(&ballot.voter_hash).ok_or(Error::NotRegistered)?;

    let recomputed = BallotHash::of_message(&ballot.message);
    if recomputed != ballot.message_hash {
        debug!("ballot hash mismatch for voter {}", ballot.voter_hash);
        return Err(Error::IntegrityViolation);
    }
    if !verify_digest(&ballot.message_hash, &ballot.signature, &voter.public_key) {
        debug!("ballot signature rejected for voter {}", ballot.voter_hash);
        return Err(Error::SignatureInvalid);
    }

    let cast_at = Utc::now();
    ledger.try_commit_vote(VoteRecord {
        voter_hash: ballot.voter_hash.clone(),
        candidate: ballot.candidate.clone(),
        message: ballot.message,
        message_hash: ballot.message_hash,
        signature: ballot.signature,
        cast_at,
    })?;
    info!(
        "vote recorded for voter {} ({})",
        ballot.voter_hash, ballot.candidate
    );

    Ok(VoteReceipt {
        voter_hash: ballot.voter_hash,
        candidate: ballot.candidate,
        cast_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn election() -> (TempDir, Ledger, Registration) {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();
        ledger
            .set_candidates(vec!["Alice".to_string(), "Bob".to_string()])
            .unwrap();
        let registration = register(&ledger, "voter-1", 1024).unwrap();
        (dir, ledger, registration)
    }

    #[test]
    fn accepted_vote_is_recorded_and_flagged() {
        let (_dir, ledger, registration) = election();

        let receipt =
            submit_vote(&ledger, "voter-1", "Bob", &registration.private_key_pem).unwrap();
        assert_eq!(receipt.candidate, "Bob");
        assert_eq!(receipt.voter_hash, registration.hashed_id);

        let data = ledger.snapshot();
        assert_eq!(data.votes.len(), 1);
        assert_eq!(data.votes[0].candidate, "Bob");
        assert!(data.voters[&registration.hashed_id].has_voted);
    }

    #[test]
    fn roster_gate_fires_before_signing() {
        let (_dir, ledger, _) = election();

        // the key material is garbage: reaching the signer would fail
        // with a key error, so InvalidCandidate proves the ordering
        let err = submit_vote(&ledger, "voter-1", "Mallory", "not a pem").unwrap_err();
        assert!(matches!(err, Error::InvalidCandidate(_)));
    }

    #[test]
    fn tampered_message_is_an_integrity_violation() {
        let (_dir, ledger, registration) = election();

        let mut ballot =
            SignedBallot::new("voter-1", "Alice", &registration.private_key_pem).unwrap();
        ballot.message = ballot_message("Bob");
        ballot.candidate = "Bob".to_string();

        let err = verify_and_record(&ledger, ballot).unwrap_err();
        assert!(matches!(err, Error::IntegrityViolation));
        assert!(!ledger.has_votes());
    }

    #[test]
    fn consistent_but_resigned_ballot_fails_signature_check() {
        let (_dir, ledger, _) = election();

        // signed with a key the ledger has never seen, message and
        // hash both internally consistent
        let (other_private, _) = generate_keypair(1024).unwrap();
        let ballot = SignedBallot::new("voter-1", "Alice", &other_private).unwrap();

        let err = verify_and_record(&ledger, ballot).unwrap_err();
        assert!(matches!(err, Error::SignatureInvalid));
        assert!(!ledger.has_votes());
    }
}
