//! # Quorum Engine
//!
//! Threshold decisions over envelope threads. A room holds one active
//! proposal at a time; proposing again discards the previous question and
//! every vote cast on it. Votes and decisions are ordinary envelopes
//! chained under the proposal, so the full history of a question is
//! readable through the envelope listing alone. The vote list only grows,
//! and a decision never closes it: deciding records the tally of the
//! moment, and later votes can supersede it on the next decide.

#![warn(clippy::all)]

use eg_store::Store;
use serde_json::{json, Value};
use shared_types::{
    DecisionRecord, Envelope, QuorumResult, QuorumState, QuorumVote, StoreError, Tally, Thread,
};
use std::sync::Arc;

pub const DEFAULT_THRESHOLD: &str = "2-of-3";

/// How many thread entries to scan when chaining `prev`.
const THREAD_SCAN_LIMIT: usize = 1_000;

pub struct QuorumEngine {
    store: Arc<Store>,
}

/// Outcome of a decision check.
pub struct Decision {
    pub tally: Tally,
    /// The decision envelope, present only when this call recorded a new
    /// outcome. Undecided tallies and repeat calls with an unchanged
    /// outcome carry `None`.
    pub envelope: Option<Envelope>,
    pub decided_at: Option<String>,
}

fn topic(room: &str) -> String {
    format!("topic:quorum/{room}")
}

impl QuorumEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Open a new question in `room`, discarding any previous proposal and
    /// its votes.
    pub async fn propose(
        &self,
        room: &str,
        threshold: Option<String>,
        payload: Value,
        from: Option<String>,
    ) -> Result<(Envelope, QuorumState), StoreError> {
        if room.trim().is_empty() {
            return Err(StoreError::invalid("room must not be empty"));
        }
        let threshold = threshold
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_THRESHOLD.to_string());

        let mut env = Envelope::new("proposal");
        env.from = from;
        env.to = vec![topic(room)];
        env.payload = payload;
        env.meta = json!({ "room": room, "threshold": threshold });
        let env = self.store.create_envelope(env).await?;

        let state = QuorumState {
            room: room.to_string(),
            proposal_id: env.id.clone(),
            threshold,
            votes: Vec::new(),
            proposed_at: env.created_at.clone(),
            decision: None,
        };
        self.store.put_quorum(&state).await?;
        self.store
            .audit(
                "quorum.propose",
                json!({ "room": room, "proposal_id": state.proposal_id }),
            )
            .await;
        Ok((env, state))
    }

    /// Cast a vote on the active proposal. Votes only accumulate: voting
    /// again appends another entry, and every entry counts.
    pub async fn vote(
        &self,
        room: &str,
        voter: &str,
        yes: bool,
    ) -> Result<(Envelope, Tally), StoreError> {
        if voter.trim().is_empty() {
            return Err(StoreError::invalid("voter must not be empty"));
        }
        let mut state = self
            .store
            .get_quorum(room)
            .await?
            .ok_or_else(|| StoreError::invalid(format!("no active proposal in room {room}")))?;

        let prev = self.last_in_thread(&state.proposal_id).await?;
        let mut env = Envelope::new("vote");
        env.from = Some(voter.to_string());
        env.to = vec![topic(room)];
        env.thread = Some(Thread {
            root: Some(state.proposal_id.clone()),
            prev: Some(prev),
        });
        env.payload = json!({ "voter": voter, "choice": if yes { "yes" } else { "no" } });
        let env = self.store.create_envelope(env).await?;

        state.votes.push(QuorumVote {
            voter: voter.to_string(),
            yes,
        });
        self.store.put_quorum(&state).await?;
        let tally = state.tally();
        self.store
            .audit(
                "quorum.vote",
                json!({
                    "room": room,
                    "voter": voter,
                    "choice": yes,
                    "yes": tally.yes,
                    "no": tally.no,
                }),
            )
            .await;
        Ok((env, tally))
    }

    /// Recompute the tally from the current vote set and record the outcome
    /// when it is conclusive. Repeat calls with an unchanged outcome return
    /// the standing decision without a new envelope; a tally that moved to
    /// a different outcome records a fresh decision.
    pub async fn decide(&self, room: &str) -> Result<Decision, StoreError> {
        let mut state = self
            .store
            .get_quorum(room)
            .await?
            .ok_or_else(|| StoreError::invalid(format!("no active proposal in room {room}")))?;
        let tally = state.tally();

        if tally.result == QuorumResult::Undecided {
            return Ok(Decision {
                tally,
                envelope: None,
                decided_at: None,
            });
        }
        if let Some(decision) = &state.decision {
            if decision.result == tally.result {
                return Ok(Decision {
                    decided_at: Some(decision.at.clone()),
                    tally,
                    envelope: None,
                });
            }
        }

        let prev = self.last_in_thread(&state.proposal_id).await?;
        let mut env = Envelope::new("decision");
        env.to = vec![topic(room)];
        env.thread = Some(Thread {
            root: Some(state.proposal_id.clone()),
            prev: Some(prev),
        });
        env.payload = json!({
            "room": room,
            "result": tally.result,
            "yes": tally.yes,
            "no": tally.no,
            "need": tally.need,
        });
        let env = self.store.create_envelope(env).await?;

        state.decision = Some(DecisionRecord {
            envelope_id: env.id.clone(),
            result: tally.result,
            at: env.created_at.clone(),
        });
        self.store.put_quorum(&state).await?;
        tracing::info!(room, result = ?tally.result, yes = tally.yes, no = tally.no, "quorum decided");
        self.store
            .audit(
                "quorum.decide",
                json!({ "room": room, "proposal_id": state.proposal_id, "result": tally.result }),
            )
            .await;
        Ok(Decision {
            decided_at: Some(env.created_at.clone()),
            tally,
            envelope: Some(env),
        })
    }

    /// The active proposal and its standing tally, if any.
    pub async fn status(&self, room: &str) -> Result<Option<(QuorumState, Tally)>, StoreError> {
        Ok(self
            .store
            .get_quorum(room)
            .await?
            .map(|state| {
                let tally = state.tally();
                (state, tally)
            }))
    }

    /// Id of the newest envelope under `root`, for `prev` chaining. Falls
    /// back to the root itself for the first follower.
    async fn last_in_thread(&self, root: &str) -> Result<String, StoreError> {
        let thread = self.store.list_thread(root, THREAD_SCAN_LIMIT).await?;
        Ok(thread
            .last()
            .map(|e| e.id.clone())
            .unwrap_or_else(|| root.to_string()))
    }
}
