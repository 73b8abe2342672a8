use crate::*;

use log::{info, warn};

/// Outcome of a full-ledger integrity audit. `ok` is the one-glance
/// answer; `violations` carries one entry per failing vote.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditReport {
    pub ok: bool,
    pub violations: Vec<VoterHash>,
}

/// Replay every recorded vote's integrity checks against the current
/// ledger state: the message must still hash to the stored digest, the
/// signature must still verify under the registered public key, and
/// the voter record must exist and be marked as having voted. Reports,
/// never repairs.
pub fn audit_all(ledger: &Ledger) -> AuditReport {
    let data = ledger.snapshot();
    let mut violations = Vec::new();

    for vote in &data.votes {
        let voter = match data.voters.get(&vote.voter_hash) {
            Some(voter) => voter,
            None => {
                warn!("audit: vote by {} has no voter record", vote.voter_hash);
                violations.push(vote.voter_hash.clone());
                continue;
            }
        };
        if !voter.has_voted {
            warn!(
                "audit: vote by {} but the voter is not marked as having voted",
                vote.voter_hash
            );
            violations.push(vote.voter_hash.clone());
            continue;
        }
        if BallotHash::of_message(&vote.message) != vote.message_hash {
            warn!(
                "audit: stored message for {} does not match its hash",
                vote.voter_hash
            );
            violations.push(vote.voter_hash.clone());
            continue;
        }
        if !verify_digest(&vote.message_hash, &vote.signature, &voter.public_key) {
            warn!(
                "audit: signature for {} fails verification",
                vote.voter_hash
            );
            violations.push(vote.voter_hash.clone());
        }
    }

    let ok = violations.is_empty();
    if ok {
        info!("audit: {} votes verified clean", data.votes.len());
    }
    AuditReport { ok, violations }
}
