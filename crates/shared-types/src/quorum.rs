//! Quorum decision state.
//!
//! A room holds at most one active proposal. Votes accumulate until either
//! side reaches the threshold numerator; ties and shortfalls stay undecided.

use serde::{Deserialize, Serialize};

/// Terminal or pending outcome of a tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumResult {
    Accepted,
    Rejected,
    Undecided,
}

/// Vote counts against the threshold in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u32,
    pub no: u32,
    /// Votes either side needs to close the question.
    pub need: u32,
    pub result: QuorumResult,
}

/// One cast vote. The vote list only grows: a voter who votes again adds
/// another entry, and every entry counts toward the tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumVote {
    pub voter: String,
    pub yes: bool,
}

/// The decision most recently recorded for a proposal. Votes keep
/// accumulating afterwards, so a later decide call may supersede it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Envelope id of the decision.
    pub envelope_id: String,
    pub result: QuorumResult,
    pub at: String,
}

/// The live proposal in a room, plus accumulated votes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumState {
    pub room: String,
    /// Envelope id of the active proposal.
    pub proposal_id: String,
    /// Threshold spelled `N-of-M`, e.g. `2-of-3`.
    pub threshold: String,
    /// Cast votes in arrival order.
    #[serde(default)]
    pub votes: Vec<QuorumVote>,
    pub proposed_at: String,
    /// The latest recorded decision, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionRecord>,
}

impl QuorumState {
    /// Votes needed to close, read from the threshold numerator.
    /// Malformed thresholds fall back to 2.
    pub fn need(&self) -> u32 {
        self.threshold
            .split("-of-")
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(2)
    }

    /// Count votes and resolve. Yes wins when both sides reach the
    /// threshold in the same tally.
    pub fn tally(&self) -> Tally {
        let need = self.need();
        let yes = self.votes.iter().filter(|v| v.yes).count() as u32;
        let no = self.votes.len() as u32 - yes;
        let result = if yes >= need {
            QuorumResult::Accepted
        } else if no >= need {
            QuorumResult::Rejected
        } else {
            QuorumResult::Undecided
        };
        Tally {
            yes,
            no,
            need,
            result,
        }
    }
}
