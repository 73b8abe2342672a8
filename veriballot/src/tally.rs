use crate::*;

use indexmap::IndexMap;

/// Read-only statistics over the current ledger state.
///
/// Candidates appear in roster order with zero counts included; a
/// candidate seen only in vote records (a tampered store) is appended
/// after the roster so the totals stay truthful. The audit, not the
/// tally, is the tamper detector.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub results: IndexMap<String, u64>,
    pub total_registered: u64,
    pub total_voted: u64,
    pub total_votes: u64,
    pub participation_rate: f64,
}

/// Count the current ledger state.
pub fn tally(ledger: &Ledger) -> Tally {
    let data = ledger.snapshot();

    let mut results: IndexMap<String, u64> = data
        .candidates
        .iter()
        .map(|name| (name.clone(), 0))
        .collect();
    for vote in &data.votes {
        *results.entry(vote.candidate.clone()).or_insert(0) += 1;
    }

    let total_registered = data.voters.len() as u64;
    let total_voted = data.voters.values().filter(|v| v.has_voted).count() as u64;
    let total_votes = data.votes.len() as u64;
    let participation_rate = if total_registered == 0 {
        0.0
    } else {
        total_voted as f64 / total_registered as f64 * 100.0
    };

    Tally {
        results,
        total_registered,
        total_voted,
        total_votes,
        participation_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_election_counts_to_zero() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();
        ledger
            .set_candidates(vec!["Alice".to_string(), "Bob".to_string()])
            .unwrap();

        let tally = tally(&ledger);
        assert_eq!(tally.results.get("Alice"), Some(&0));
        assert_eq!(tally.results.get("Bob"), Some(&0));
        assert_eq!(tally.total_registered, 0);
        assert_eq!(tally.total_voted, 0);
        assert_eq!(tally.total_votes, 0);
        assert_eq!(tally.participation_rate, 0.0);
    }

    #[test]
    fn results_keep_roster_order() {
        let dir = TempDir::new().unwrap();
        let ledger = Ledger::open(dir.path().join("votes.json")).unwrap();
        ledger
            .set_candidates(vec![
                "Charlie".to_string(),
                "Alice".to_string(),
                "Bob".to_string(),
            ])
            .unwrap();

        let tally = tally(&ledger);
        let names: Vec<&String> = tally.results.keys().collect();
        assert_eq!(names, vec!["Charlie", "Alice", "Bob"]);
    }
}
