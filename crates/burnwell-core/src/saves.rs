//! Bookkeeping for fire-and-forget answer saves.
//!
//! Every save gets a sequence number. A completion only counts if it belongs
//! to the latest save issued for that question; anything older that resolves
//! late is ignored, so the newest answer always wins.

use std::collections::HashMap;

use crate::error::ApiError;
use crate::model::{QuestionId, Score};

/// Where the latest answer for a question stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    InFlight,
    Saved,
    /// The save failed in transit, or could not be sent at all. Retried on
    /// the next mutation.
    Failed,
    /// The backend refused the answer. Not retried until the question is
    /// answered again.
    Rejected,
}

#[derive(Debug, Clone, Copy)]
struct SaveEntry {
    seq: u64,
    score: Score,
    state: SaveState,
}

/// Completion report sent back by a save task.
#[derive(Debug)]
pub struct SaveOutcome {
    pub question_id: QuestionId,
    pub seq: u64,
    pub result: Result<(), ApiError>,
}

/// What `SaveTracker::settle` did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    Applied(SaveState),
    /// A newer save for the same question was issued in the meantime.
    Stale,
}

/// Per-question save state keyed by sequence number.
#[derive(Debug, Default)]
pub struct SaveTracker {
    next_seq: u64,
    entries: HashMap<QuestionId, SaveEntry>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a save about to be sent and return its sequence number.
    pub fn begin(&mut self, question_id: QuestionId, score: Score) -> u64 {
        let seq = self.bump();
        self.entries.insert(
            question_id,
            SaveEntry {
                seq,
                score,
                state: SaveState::InFlight,
            },
        );
        seq
    }

    /// Record an answer that could not be sent (no attempt to save against).
    pub fn hold(&mut self, question_id: QuestionId, score: Score) {
        let seq = self.bump();
        self.entries.insert(
            question_id,
            SaveEntry {
                seq,
                score,
                state: SaveState::Failed,
            },
        );
    }

    /// Apply a completion if it is still the latest save for its question.
    pub fn settle(&mut self, outcome: &SaveOutcome) -> Settled {
        let Some(entry) = self.entries.get_mut(&outcome.question_id) else {
            return Settled::Stale;
        };
        if entry.seq != outcome.seq {
            return Settled::Stale;
        }
        entry.state = match &outcome.result {
            Ok(()) => SaveState::Saved,
            Err(e) if e.is_transient() => SaveState::Failed,
            Err(_) => SaveState::Rejected,
        };
        Settled::Applied(entry.state)
    }

    pub fn state(&self, question_id: QuestionId) -> Option<SaveState> {
        self.entries.get(&question_id).map(|e| e.state)
    }

    /// Questions whose latest answer is not acknowledged yet.
    pub fn unsaved(&self) -> Vec<QuestionId> {
        let mut ids: Vec<QuestionId> = self
            .entries
            .iter()
            .filter(|(_, e)| e.state != SaveState::Saved)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Answers whose latest save failed in transit, with the score to resend.
    pub fn failed(&self) -> Vec<(QuestionId, Score)> {
        let mut failed: Vec<(QuestionId, Score)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.state == SaveState::Failed)
            .map(|(id, e)| (*id, e.score))
            .collect();
        failed.sort_by_key(|(id, _)| *id);
        failed
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.state == SaveState::InFlight)
            .count()
    }

    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}
