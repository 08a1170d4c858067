//! Core trait definitions for the assessment backend and the user prompts.
//!
//! `AssessmentApi` is implemented by the `burnwell-client` crate (HTTP and
//! offline backends). `SessionPrompt` is implemented by whatever front end
//! drives the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{
    Progress, Question, QuestionId, ResponseEntry, Responses, Score, ScoreReport, TestId,
    UserContext,
};

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// The remote service that owns questions, persistence and scoring.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// Ordered question list.
    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError>;

    /// Open a new assessment attempt for the user.
    async fn start_test(&self, user: &UserContext) -> Result<TestId, ApiError>;

    /// Persist a single answer against an attempt.
    async fn save_response(
        &self,
        test_id: &TestId,
        question_id: QuestionId,
        score: Score,
    ) -> Result<(), ApiError>;

    /// Answers stored so far for an attempt.
    async fn test_progress(&self, test_id: &TestId) -> Result<Responses, ApiError>;

    /// The user's unfinished attempt, if any.
    async fn in_progress_test(&self, user: &UserContext) -> Result<Option<TestId>, ApiError>;

    /// Submit answers for scoring.
    async fn submit(&self, submission: &Submission) -> Result<ScoreReport, ApiError>;
}

/// Body of a scoring request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: String,
    pub responses: Vec<ResponseEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<TestId>,
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

/// Answer to "you have an unfinished assessment".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    Restart,
}

/// Answer to "not every question is answered".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitChoice {
    SubmitAnyway,
    CompleteAll,
}

/// Questions the session asks the user.
pub trait SessionPrompt {
    /// An unfinished attempt exists; resume it or start over?
    fn choose_resume(&mut self, test_id: &TestId) -> ResumeChoice;

    /// Submission is incomplete; submit anyway or keep answering?
    fn confirm_incomplete(&mut self, progress: Progress) -> SubmitChoice;
}

/// Prompt with fixed answers, for non-interactive callers.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt {
    pub resume: ResumeChoice,
    pub submit: SubmitChoice,
}

impl Default for FixedPrompt {
    fn default() -> Self {
        Self {
            resume: ResumeChoice::Resume,
            submit: SubmitChoice::CompleteAll,
        }
    }
}

impl SessionPrompt for FixedPrompt {
    fn choose_resume(&mut self, _: &TestId) -> ResumeChoice {
        self.resume
    }

    fn confirm_incomplete(&mut self, _: Progress) -> SubmitChoice {
        self.submit
    }
}
