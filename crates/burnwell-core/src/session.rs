//! Assessment session controller.
//!
//! Drives one user through the ordered question list: records answers,
//! saves each one in the background, keeps the cursor in range, resumes an
//! unfinished attempt, and submits for scoring.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::model::{
    Progress, Question, QuestionId, Responses, Score, ScoreReport, TestId, UserContext,
};
use crate::resume::{plan_start, StartPlan};
use crate::saves::{SaveOutcome, SaveState, SaveTracker, Settled};
use crate::traits::{AssessmentApi, SessionPrompt, SubmitChoice, Submission};

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between recording an answer and moving to the next question.
    pub advance_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            advance_delay: Duration::from_millis(300),
        }
    }
}

/// Result of `AssessmentSession::submit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The backend scored the answers; the session is finished.
    Completed(ScoreReport),
    /// The user chose to keep answering. The cursor sits on the first
    /// unanswered question.
    Cancelled,
}

/// One assessment attempt.
///
/// Must be used from within a tokio runtime: answer saves are spawned as
/// background tasks.
pub struct AssessmentSession {
    api: Arc<dyn AssessmentApi>,
    user: UserContext,
    config: SessionConfig,
    questions: Vec<Question>,
    responses: Responses,
    cursor: usize,
    test_id: Option<TestId>,
    resumed: bool,
    started_at: DateTime<Utc>,
    saves: SaveTracker,
    save_tx: mpsc::UnboundedSender<SaveOutcome>,
    save_rx: mpsc::UnboundedReceiver<SaveOutcome>,
    report: Option<ScoreReport>,
}

impl AssessmentSession {
    /// Load questions and either resume the user's unfinished attempt or
    /// start a new one.
    ///
    /// Never fails: a failed question fetch yields an empty session, a failed
    /// lookup or restore falls back to a fresh attempt, and a failed start
    /// leaves the session without an attempt id.
    pub async fn initialize<P>(
        api: Arc<dyn AssessmentApi>,
        user: UserContext,
        config: SessionConfig,
        prompt: &mut P,
    ) -> Self
    where
        P: SessionPrompt + ?Sized,
    {
        let questions = match api.fetch_questions().await {
            Ok(questions) => questions,
            Err(e) => {
                warn!(backend = api.name(), "failed to fetch questions: {e}");
                Vec::new()
            }
        };

        let in_progress = match api.in_progress_test(&user).await {
            Ok(found) => found,
            Err(e) => {
                warn!(user = %user.user_id, "in-progress lookup failed, starting fresh: {e}");
                None
            }
        };

        let choice = in_progress.as_ref().map(|id| prompt.choose_resume(id));
        let (save_tx, save_rx) = mpsc::unbounded_channel();

        let mut session = Self {
            api,
            user,
            config,
            questions,
            responses: Responses::new(),
            cursor: 0,
            test_id: None,
            resumed: false,
            started_at: Utc::now(),
            saves: SaveTracker::new(),
            save_tx,
            save_rx,
            report: None,
        };

        match plan_start(in_progress, choice) {
            StartPlan::Resume(test_id) => {
                if let Err(e) = session.restore(test_id).await {
                    warn!("could not restore progress, starting a new attempt: {e}");
                    session.start_new().await;
                }
            }
            StartPlan::StartNew => session.start_new().await,
        }

        session
    }

    async fn restore(&mut self, test_id: TestId) -> Result<(), SessionError> {
        let mut responses = self.api.test_progress(&test_id).await?;
        responses.retain_known(&self.questions);
        self.cursor = responses
            .first_unanswered(&self.questions)
            .unwrap_or_else(|| self.last_index());
        info!(
            test_id = %test_id,
            answered = responses.len(),
            total = self.questions.len(),
            "resumed assessment"
        );
        self.responses = responses;
        self.test_id = Some(test_id);
        self.resumed = true;
        Ok(())
    }

    async fn start_new(&mut self) {
        self.responses = Responses::new();
        self.cursor = 0;
        self.resumed = false;
        self.test_id = match self.api.start_test(&self.user).await {
            Ok(test_id) => {
                info!(test_id = %test_id, "started assessment");
                Some(test_id)
            }
            Err(e) => {
                warn!(user = %self.user.user_id, "failed to start assessment: {e}");
                None
            }
        };
    }

    // -----------------------------------------------------------------------
    // Answers
    // -----------------------------------------------------------------------

    /// Record an answer, save it in the background, and advance after the
    /// configured delay unless already on the last question.
    pub async fn select_answer(
        &mut self,
        question_id: QuestionId,
        score: Score,
    ) -> Result<(), SessionError> {
        if self.report.is_some() {
            return Err(SessionError::Finished);
        }
        if !self.questions.iter().any(|q| q.id == question_id) {
            return Err(SessionError::UnknownQuestion(question_id));
        }
        self.drain_saves();

        self.responses.insert(question_id, score);
        self.retry_failed_saves(Some(question_id));
        self.dispatch_save(question_id, score);

        if !self.config.advance_delay.is_zero() {
            tokio::time::sleep(self.config.advance_delay).await;
        }
        self.navigate_next();
        Ok(())
    }

    /// Like `select_answer`, validating a raw score first.
    pub async fn select_value(
        &mut self,
        question_id: QuestionId,
        value: i64,
    ) -> Result<(), SessionError> {
        let score = Score::try_from(value)?;
        self.select_answer(question_id, score).await
    }

    /// Answer whatever question the cursor is on.
    pub async fn answer_current(&mut self, score: Score) -> Result<(), SessionError> {
        let Some(question) = self.current_question() else {
            return Err(SessionError::NoQuestions);
        };
        let id = question.id;
        self.select_answer(id, score).await
    }

    /// Resend every answer whose last save failed in transit. Answers the
    /// backend rejected stay unsaved until they are answered again.
    pub fn retry_unsaved(&mut self) {
        self.drain_saves();
        self.retry_failed_saves(None);
    }

    fn retry_failed_saves(&mut self, skip: Option<QuestionId>) {
        if self.test_id.is_none() {
            return;
        }
        for (question_id, score) in self.saves.failed() {
            if Some(question_id) == skip {
                continue;
            }
            debug!(question = %question_id, "retrying unsaved answer");
            self.dispatch_save(question_id, score);
        }
    }

    fn dispatch_save(&mut self, question_id: QuestionId, score: Score) {
        let Some(test_id) = self.test_id.clone() else {
            self.saves.hold(question_id, score);
            return;
        };

        let seq = self.saves.begin(question_id, score);
        let api = Arc::clone(&self.api);
        let tx = self.save_tx.clone();
        tokio::spawn(async move {
            let result = api.save_response(&test_id, question_id, score).await;
            // The receiver lives as long as the session; a closed channel
            // only means the session was dropped.
            let _ = tx.send(SaveOutcome {
                question_id,
                seq,
                result,
            });
        });
    }

    /// Apply every save completion that has arrived so far.
    pub fn drain_saves(&mut self) {
        while let Ok(outcome) = self.save_rx.try_recv() {
            self.apply_outcome(outcome);
        }
    }

    /// Wait up to `timeout` for in-flight saves. Returns `true` when nothing
    /// is left in flight.
    pub async fn flush_saves(&mut self, timeout: Duration) -> bool {
        self.drain_saves();
        let deadline = tokio::time::Instant::now() + timeout;
        while self.saves.in_flight() > 0 {
            match tokio::time::timeout_at(deadline, self.save_rx.recv()).await {
                Ok(Some(outcome)) => self.apply_outcome(outcome),
                _ => break,
            }
        }
        self.saves.in_flight() == 0
    }

    fn apply_outcome(&mut self, outcome: SaveOutcome) {
        match (self.saves.settle(&outcome), &outcome.result) {
            (Settled::Stale, _) => {
                debug!(question = %outcome.question_id, seq = outcome.seq, "ignoring stale save result");
            }
            (Settled::Applied(SaveState::Rejected), Err(e)) => {
                warn!(question = %outcome.question_id, "answer rejected by backend: {e}");
            }
            (Settled::Applied(_), Err(e)) => {
                warn!(question = %outcome.question_id, "answer save failed, will retry: {e}");
            }
            (Settled::Applied(_), Ok(())) => {
                debug!(question = %outcome.question_id, seq = outcome.seq, "answer saved");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Move back one question; no-op on the first.
    pub fn navigate_previous(&mut self) -> usize {
        self.retry_unsaved();
        self.cursor = self.cursor.saturating_sub(1);
        self.cursor
    }

    /// Move forward one question; no-op on the last.
    pub fn navigate_next(&mut self) -> usize {
        self.retry_unsaved();
        self.cursor = (self.cursor + 1).min(self.last_index());
        self.cursor
    }

    /// Jump to `index`, clamped to the question list.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.retry_unsaved();
        self.cursor = index.min(self.last_index());
        self.cursor
    }

    fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Send the answers for scoring.
    ///
    /// An incomplete set asks `prompt` first. On failure the session is left
    /// untouched so the caller can retry.
    pub async fn submit<P>(&mut self, prompt: &mut P) -> Result<SubmitOutcome, SessionError>
    where
        P: SessionPrompt + ?Sized,
    {
        if self.report.is_some() {
            return Err(SessionError::Finished);
        }
        self.drain_saves();

        let progress = self.progress();
        if progress.answered < progress.total {
            match prompt.confirm_incomplete(progress) {
                SubmitChoice::SubmitAnyway => {
                    info!(%progress, "submitting incomplete assessment");
                }
                SubmitChoice::CompleteAll => {
                    if let Some(index) = self.responses.first_unanswered(&self.questions) {
                        self.cursor = index;
                    }
                    return Ok(SubmitOutcome::Cancelled);
                }
            }
        }

        let submission = Submission {
            user_id: self.user.user_id.clone(),
            responses: self.responses.ordered_entries(&self.questions),
            test_id: self.test_id.clone(),
        };

        match self.api.submit(&submission).await {
            Ok(report) => {
                info!(burnout_level = %report.burnout_level, "assessment scored");
                self.report = Some(report.clone());
                Ok(SubmitOutcome::Completed(report))
            }
            Err(e) => {
                warn!("submit failed: {e}");
                Err(e.into())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn progress(&self) -> Progress {
        Progress {
            answered: self.responses.len(),
            total: self.questions.len(),
        }
    }

    pub fn test_id(&self) -> Option<&TestId> {
        self.test_id.as_ref()
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Questions whose latest answer the backend has not acknowledged.
    pub fn unsaved(&self) -> Vec<QuestionId> {
        self.saves.unsaved()
    }

    pub fn save_state(&self, question_id: QuestionId) -> Option<SaveState> {
        self.saves.state(question_id)
    }

    pub fn is_finished(&self) -> bool {
        self.report.is_some()
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }
}
