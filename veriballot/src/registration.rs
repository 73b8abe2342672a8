use crate::*;

use std::fmt;

use chrono::Utc;
use log::info;

/// A successful enrollment: the ledger key for the voter and their
/// private key PEM, handed back exactly once. The ledger keeps only
/// the public half; a lost key is never re-served.
pub struct Registration {
    pub hashed_id: VoterHash,
    pub private_key_pem: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("hashed_id", &self.hashed_id)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Enroll a voter: hash the identifier, issue a fresh key pair, and
/// store the public half with an unvoted record.
///
/// Key generation runs before any ledger lock is taken; the insert
/// itself re-checks uniqueness under the write lock.
pub fn register(ledger: &Ledger, voter_id: &str, key_bits: usize) -> Result<Registration, Error> {
    if voter_id.trim().is_empty() {
        return Err(Error::InvalidInput(
            "voter id must not be blank".to_string(),
        ));
    }

    // the raw identifier is hashed as supplied, without normalization
    let hashed_id = VoterHash::of_voter_id(voter_id);
    if ledger.is_registered(&hashed_id) {
        return Err(Error::AlreadyRegistered);
    }

    let (private_pem, public_pem) = generate_keypair(key_bits)?;
    ledger.try_register(VoterRecord {
        hashed_id: hashed_id.clone(),
        public_key: public_pem,
        has_voted: false,
        registered_at: Utc::now(),
    })?;
    info!("registered voter {}", hashed_id);

    Ok(Registration {
        hashed_id,
        private_key_pem: private_pem,
    })
}
