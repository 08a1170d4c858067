//! In-process backend for running assessments without a server.
//!
//! Keeps attempts in memory, serves the MBI question bank, and scores
//! submissions locally. Failures can be injected per endpoint, which makes it
//! handy as a test double too.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use burnwell_core::error::ApiError;
use burnwell_core::model::{
    Question, QuestionId, Responses, Score, ScoreReport, TestId, UserContext,
};
use burnwell_core::traits::{AssessmentApi, Submission};

use crate::mbi;

/// Backend operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Questions,
    StartTest,
    SaveResponse,
    TestProgress,
    InProgressTest,
    Submit,
}

#[derive(Debug, Clone)]
struct TestRecord {
    user_id: String,
    responses: Responses,
    status: TestStatus,
    created_at: DateTime<Utc>,
    order: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TestStatus {
    InProgress,
    Abandoned,
    Completed,
}

#[derive(Default)]
struct State {
    tests: HashMap<TestId, TestRecord>,
    next_order: u64,
    failures: HashMap<Endpoint, u32>,
    saves: u32,
}

/// Summary of a stored attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSummary {
    pub test_id: TestId,
    pub user_id: String,
    pub answered: usize,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Backend that lives entirely in memory.
pub struct OfflineBackend {
    questions: Vec<Question>,
    state: Mutex<State>,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineBackend {
    /// Backend serving the MBI question bank.
    pub fn new() -> Self {
        Self::with_questions(mbi::questions())
    }

    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            questions,
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next `times` calls to `endpoint` fail with a network error.
    pub fn fail_next(&self, endpoint: Endpoint, times: u32) {
        let mut state = self.lock();
        *state.failures.entry(endpoint).or_insert(0) += times;
    }

    /// Seed an unfinished attempt, as if a previous run had been interrupted.
    pub fn seed_attempt(&self, user_id: &str, answers: &[(QuestionId, Score)]) -> TestId {
        let mut state = self.lock();
        let test_id = Self::open_attempt(&mut state, user_id);
        if let Some(record) = state.tests.get_mut(&test_id) {
            record.responses = answers.iter().copied().collect();
        }
        test_id
    }

    pub fn attempt(&self, test_id: &TestId) -> Option<AttemptSummary> {
        let state = self.lock();
        state.tests.get(test_id).map(|r| AttemptSummary {
            test_id: test_id.clone(),
            user_id: r.user_id.clone(),
            answered: r.responses.len(),
            completed: r.status == TestStatus::Completed,
            created_at: r.created_at,
        })
    }

    /// Number of successful answer saves so far.
    pub fn save_count(&self) -> u32 {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // State is plain data, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(state: &mut State, endpoint: Endpoint) -> Result<(), ApiError> {
        if let Some(remaining) = state.failures.get_mut(&endpoint) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApiError::Network(format!("injected failure for {endpoint:?}")));
            }
        }
        Ok(())
    }

    fn open_attempt(state: &mut State, user_id: &str) -> TestId {
        for record in state.tests.values_mut() {
            if record.user_id == user_id && record.status == TestStatus::InProgress {
                record.status = TestStatus::Abandoned;
            }
        }
        let test_id = TestId::new(Uuid::new_v4().to_string());
        state.next_order += 1;
        let order = state.next_order;
        state.tests.insert(
            test_id.clone(),
            TestRecord {
                user_id: user_id.to_string(),
                responses: Responses::new(),
                status: TestStatus::InProgress,
                created_at: Utc::now(),
                order,
            },
        );
        test_id
    }

    fn not_found() -> ApiError {
        ApiError::Rejected {
            status: 404,
            detail: "Test not found".to_string(),
        }
    }
}

#[async_trait]
impl AssessmentApi for OfflineBackend {
    fn name(&self) -> &str {
        "offline"
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::Questions)?;
        Ok(self.questions.clone())
    }

    async fn start_test(&self, user: &UserContext) -> Result<TestId, ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::StartTest)?;
        let test_id = Self::open_attempt(&mut state, &user.user_id);
        debug!(test_id = %test_id, user = %user.user_id, "opened offline attempt");
        Ok(test_id)
    }

    async fn save_response(
        &self,
        test_id: &TestId,
        question_id: QuestionId,
        score: Score,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::SaveResponse)?;
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(ApiError::Rejected {
                status: 400,
                detail: "Invalid question ID".to_string(),
            });
        }
        let record = state.tests.get_mut(test_id).ok_or_else(Self::not_found)?;
        if record.status != TestStatus::InProgress {
            return Err(ApiError::Rejected {
                status: 400,
                detail: "Test is no longer in progress".to_string(),
            });
        }
        record.responses.insert(question_id, score);
        state.saves += 1;
        Ok(())
    }

    async fn test_progress(&self, test_id: &TestId) -> Result<Responses, ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::TestProgress)?;
        state
            .tests
            .get(test_id)
            .map(|r| r.responses.clone())
            .ok_or_else(Self::not_found)
    }

    async fn in_progress_test(&self, user: &UserContext) -> Result<Option<TestId>, ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::InProgressTest)?;
        Ok(state
            .tests
            .iter()
            .filter(|(_, r)| r.user_id == user.user_id && r.status == TestStatus::InProgress)
            .max_by_key(|(_, r)| r.order)
            .map(|(id, _)| id.clone()))
    }

    async fn submit(&self, submission: &Submission) -> Result<ScoreReport, ApiError> {
        let mut state = self.lock();
        Self::check_failure(&mut state, Endpoint::Submit)?;
        let mut report = mbi::score(&self.questions, &submission.responses)?;

        let test_id = match &submission.test_id {
            Some(id) if state.tests.contains_key(id) => id.clone(),
            Some(_) => return Err(Self::not_found()),
            None => Self::open_attempt(&mut state, &submission.user_id),
        };
        if let Some(record) = state.tests.get_mut(&test_id) {
            if record.status == TestStatus::Completed {
                return Err(ApiError::Rejected {
                    status: 400,
                    detail: "Test already submitted".to_string(),
                });
            }
            record.responses = submission
                .responses
                .iter()
                .map(|e| (e.question_id, e.score))
                .collect();
            record.status = TestStatus::Completed;
        }
        report.test_id = Some(test_id);
        Ok(report)
    }
}
