use crate::*;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::debug;
use parking_lot::RwLock;

/// One registered voter, keyed in the ledger by the hash of their
/// identifier. `has_voted` flips false to true exactly once, at vote
/// commit.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoterRecord {
    pub hashed_id: VoterHash,
    pub public_key: String,
    pub has_voted: bool,
    pub registered_at: DateTime<Utc>,
}

/// One accepted vote. Append-only; never mutated once recorded.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub voter_hash: VoterHash,
    pub candidate: String,
    pub message: String,
    pub message_hash: BallotHash,
    #[serde(with = "serde_b64")]
    pub signature: Vec<u8>,
    pub cast_at: DateTime<Utc>,
}

/// The full durable state: voters in registration order, the
/// append-only vote list, and the candidate roster.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LedgerData {
    pub voters: IndexMap<VoterHash, VoterRecord>,
    pub votes: Vec<VoteRecord>,
    pub candidates: Vec<String>,
}

/// Durable election ledger: one JSON document behind a read-write
/// lock, rewritten atomically after every mutation.
///
/// Every check-then-act runs inside `try_register` / `try_commit_vote`
/// under the write lock; that is what makes per-voter exclusivity hold
/// under concurrent submissions. Mutations clone the state, apply the
/// change, persist the clone, and only then swap it in, so a failed
/// save leaves memory and disk agreeing on the old state.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    data: RwLock<LedgerData>,
}

impl Ledger {
    /// Load the ledger at `path`, starting empty when the file does
    /// not exist yet. An unreadable or undecodable file is an error,
    /// never a silent empty start.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Decode {
                    path: path.clone(),
                    source,
                })?
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LedgerData::default(),
            Err(source) => return Err(PersistenceError::Read { path, source }),
        };

        Ok(Ledger {
            path,
            data: RwLock::new(data),
        })
    }

    /// File backing this ledger.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point-in-time copy of the full state.
    pub fn snapshot(&self) -> LedgerData {
        self.data.read().clone()
    }

    pub fn is_registered(&self, voter: &VoterHash) -> bool {
        self.data.read().voters.contains_key(voter)
    }

    /// The registered record for `voter`, if any.
    pub fn voter(&self, voter: &VoterHash) -> Option<VoterRecord> {
        self.data.read().voters.get(voter).cloned()
    }

    pub fn candidates(&self) -> Vec<String> {
        self.data.read().candidates.clone()
    }

    pub fn has_votes(&self) -> bool {
        !self.data.read().votes.is_empty()
    }

    /// Insert a fresh voter record. Uniqueness is checked here, under
    /// the write lock: of two concurrent registrations for one
    /// identifier exactly one wins.
    pub fn try_register(&self, record: VoterRecord) -> Result<(), Error> {
        let mut guard = self.data.write();
        if guard.voters.contains_key(&record.hashed_id) {
            return Err(Error::AlreadyRegistered);
        }

        let mut next = guard.clone();
        next.voters.insert(record.hashed_id.clone(), record);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Record an accepted vote: mark the voter as having voted and
    /// append the record, together or not at all. Registration,
    /// single-use, and roster membership are re-checked here, under
    /// the write lock; this is the authoritative double-vote gate.
    pub fn try_commit_vote(&self, vote: VoteRecord) -> Result<(), Error> {
        let mut guard = self.data.write();
        let voter = guard
            .voters
            .get(&vote.voter_hash)
            .ok_or(Error::NotRegistered)?;
        if voter.has_voted {
            return Err(Error::AlreadyVoted);
        }
        if !guard.candidates.iter().any(|c| c == &vote.candidate) {
            return Err(Error::InvalidCandidate(vote.candidate));
        }

        let mut next = guard.clone();
        if let Some(record) = next.voters.get_mut(&vote.voter_hash) {
            record.has_voted = true;
        }
        next.votes.push(vote);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Replace the candidate roster. Refused once votes are recorded;
    /// a voted election only changes through [`Ledger::reset`].
    pub fn set_candidates(&self, candidates: Vec<String>) -> Result<(), Error> {
        let mut guard = self.data.write();
        if !guard.votes.is_empty() {
            return Err(Error::InvalidInput(
                "candidates cannot change once votes are recorded".to_string(),
            ));
        }

        let mut next = guard.clone();
        next.candidates = candidates;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Append one candidate under the same no-votes-yet rule.
    pub fn add_candidate(&self, name: String) -> Result<(), Error> {
        let mut guard = self.data.write();
        if !guard.votes.is_empty() {
            return Err(Error::InvalidInput(
                "candidates cannot change once votes are recorded".to_string(),
            ));
        }
        if guard.candidates.contains(&name) {
            return Err(Error::InvalidInput(format!(
                "candidate already on the roster: {}",
                name
            )));
        }

        let mut next = guard.clone();
        next.candidates.push(name);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    /// Clear voters, votes, and the roster together.
    pub fn reset(&self) -> Result<(), Error> {
        let mut guard = self.data.write();
        let next = LedgerData::default();
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &LedgerData) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec_pretty(data).map_err(PersistenceError::Encode)?;
        write_atomic(&self.path, &json).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            "ledger saved: {} voters, {} votes, {} candidates",
            data.voters.len(),
            data.votes.len(),
            data.candidates.len()
        );
        Ok(())
    }
}

/// Write to a sibling temp file, sync, then rename over the target, so
/// a crash mid-save never leaves a torn document behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn voter(id: &str) -> VoterRecord {
        VoterRecord {
            hashed_id: VoterHash::of_voter_id(id),
            public_key: "test public key".to_string(),
            has_voted: false,
            registered_at: Utc::now(),
        }
    }

    fn vote(id: &str, candidate: &str) -> VoteRecord {
        let message = ballot_message(candidate);
        let message_hash = BallotHash::of_message(&message);
        VoteRecord {
            voter_hash: VoterHash::of_voter_id(id),
            candidate: candidate.to_string(),
            message,
            message_hash,
            signature: vec![1, 2, 3],
            cast_at: Utc::now(),
        }
    }

    #[test]
    fn starts_empty_and_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.json");

        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.snapshot().voters.is_empty());

        ledger.set_candidates(vec!["Alice".to_string()]).unwrap();
        ledger.try_register(voter("v1")).unwrap();
        ledger.try_commit_vote(vote("v1", "Alice")).unwrap();
        drop(ledger);

        let ledger = Ledger::open(&path).unwrap();
        let data = ledger.snapshot();
        assert_eq!(data.voters.len(), 1);
        assert_eq!(data.votes.len(), 1);
        assert_eq!(data.candidates, vec!["Alice".to_string()]);
        assert!(data.voters[&VoterHash::of_voter_id("v1")].has_voted);
    }

    #[test]
    fn stored_document_uses_the_published_field_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.json");

        let ledger = Ledger::open(&path).unwrap();
        ledger.set_candidates(vec!["Alice".to_string()]).unwrap();
        ledger.try_register(voter("v1")).unwrap();
        ledger.try_commit_vote(vote("v1", "Alice")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let voter = raw["voters"][VoterHash::of_voter_id("v1").as_str()].clone();
        for field in ["hashedId", "publicKey", "hasVoted", "registeredAt"] {
            assert!(voter.get(field).is_some(), "missing {}", field);
        }
        let vote = raw["votes"][0].clone();
        for field in [
            "voterHash",
            "candidate",
            "message",
            "messageHash",
            "signature",
            "castAt",
        ] {
            assert!(vote.get(field).is_some(), "missing {}", field);
        }
        assert!(vote["signature"].is_string());
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();

        ledger.try_register(voter("v1")).unwrap();
        let err = ledger.try_register(voter("v1")).unwrap_err();
        assert!(matches!(err, Error::AlreadyRegistered));
        assert_eq!(ledger.snapshot().voters.len(), 1);
    }

    #[test]
    fn commit_gates_registration_single_use_and_roster() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();
        ledger.set_candidates(vec!["Alice".to_string()]).unwrap();

        let err = ledger.try_commit_vote(vote("ghost", "Alice")).unwrap_err();
        assert!(matches!(err, Error::NotRegistered));

        ledger.try_register(voter("v1")).unwrap();
        let err = ledger.try_commit_vote(vote("v1", "Mallory")).unwrap_err();
        assert!(matches!(err, Error::InvalidCandidate(_)));

        ledger.try_commit_vote(vote("v1", "Alice")).unwrap();
        let err = ledger.try_commit_vote(vote("v1", "Alice")).unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));
        assert_eq!(ledger.snapshot().votes.len(), 1);
    }

    #[test]
    fn roster_locks_once_votes_exist() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();
        ledger.set_candidates(vec!["Alice".to_string()]).unwrap();
        ledger.try_register(voter("v1")).unwrap();
        ledger.try_commit_vote(vote("v1", "Alice")).unwrap();

        let err = ledger
            .set_candidates(vec!["Mallory".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = ledger.add_candidate("Mallory".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(ledger.candidates(), vec!["Alice".to_string()]);
    }

    #[test]
    fn add_candidate_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();

        ledger.add_candidate("Alice".to_string()).unwrap();
        let err = ledger.add_candidate("Alice".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(ledger.candidates(), vec!["Alice".to_string()]);
    }

    #[test]
    fn reset_clears_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.json");
        let ledger = Ledger::open(&path).unwrap();
        ledger.set_candidates(vec!["Alice".to_string()]).unwrap();
        ledger.try_register(voter("v1")).unwrap();
        ledger.try_commit_vote(vote("v1", "Alice")).unwrap();

        ledger.reset().unwrap();
        let data = ledger.snapshot();
        assert!(data.voters.is_empty());
        assert!(data.votes.is_empty());
        assert!(data.candidates.is_empty());

        // the wipe is durable too
        drop(ledger);
        let ledger = Ledger::open(&path).unwrap();
        assert!(ledger.snapshot().voters.is_empty());
    }

    #[test]
    fn corrupt_file_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = Ledger::open(&path).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { .. }));
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("votes.json");
        let ledger = Ledger::open(&path).unwrap();
        ledger.try_register(voter("v1")).unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("votes.json.tmp").exists());
    }
}
