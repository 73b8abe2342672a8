use crate::*;

use std::path::Path;

/// Owning facade over the whole protocol: one ledger, one key size,
/// every public operation.
///
/// All synchronization lives inside the ledger, so a `VotingSystem`
/// can be shared across threads behind an `Arc` as-is.
#[derive(Debug)]
pub struct VotingSystem {
    ledger: Ledger,
    key_bits: usize,
}

impl VotingSystem {
    /// Open (or create) the ledger at `path` with production-size keys.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with_key_bits(path, DEFAULT_KEY_BITS)
    }

    /// Same as [`VotingSystem::open`] with an explicit RSA modulus
    /// size. Sizes below 1024 bits are refused.
    pub fn open_with_key_bits(path: impl AsRef<Path>, key_bits: usize) -> Result<Self, Error> {
        if key_bits < 1024 {
            return Err(Error::InvalidInput(
                "key size must be at least 1024 bits".to_string(),
            ));
        }
        let ledger = Ledger::open(path.as_ref())?;
        Ok(VotingSystem { ledger, key_bits })
    }

    /// Ledger file backing this system.
    pub fn path(&self) -> &Path {
        self.ledger.path()
    }

    /// Install the candidate roster for a fresh election. Names must
    /// be distinct and non-blank, and the roster cannot change once
    /// votes are recorded; `reset` first.
    pub fn setup_election(&self, candidates: Vec<String>) -> Result<(), Error> {
        if candidates.is_empty() {
            return Err(Error::InvalidInput(
                "candidate roster must not be empty".to_string(),
            ));
        }
        for (i, name) in candidates.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "candidate name must not be blank".to_string(),
                ));
            }
            if candidates[..i].contains(name) {
                return Err(Error::InvalidInput(format!(
                    "duplicate candidate: {}",
                    name
                )));
            }
        }
        self.ledger.set_candidates(candidates)
    }

    /// Append one candidate to an election that has not seen votes yet.
    pub fn add_candidate(&self, name: &str) -> Result<(), Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput(
                "candidate name must not be blank".to_string(),
            ));
        }
        self.ledger.add_candidate(name.to_string())
    }

    /// Current candidate roster.
    pub fn candidates(&self) -> Vec<String> {
        self.ledger.candidates()
    }

    /// Enroll a voter and hand back their credentials exactly once.
    pub fn register(&self, voter_id: &str) -> Result<Registration, Error> {
        registration::register(&self.ledger, voter_id, self.key_bits)
    }

    /// Sign and cast a ballot for `voter_id` with their private key.
    pub fn submit_vote(
        &self,
        voter_id: &str,
        candidate: &str,
        private_pem: &str,
    ) -> Result<VoteReceipt, Error> {
        voting::submit_vote(&self.ledger, voter_id, candidate, private_pem)
    }

    /// Verify and record a ballot signed elsewhere.
    pub fn submit_ballot(&self, ballot: SignedBallot) -> Result<VoteReceipt, Error> {
        voting::verify_and_record(&self.ledger, ballot)
    }

    /// Count the current state.
    pub fn tally(&self) -> Tally {
        tally::tally(&self.ledger)
    }

    /// Replay integrity checks over every recorded vote.
    pub fn audit_all(&self) -> AuditReport {
        audit::audit_all(&self.ledger)
    }

    /// Wipe voters, votes, and the roster together.
    pub fn reset(&self) -> Result<(), Error> {
        self.ledger.reset()
    }

    /// Direct access to the underlying ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
