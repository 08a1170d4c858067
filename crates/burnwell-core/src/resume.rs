//! Deciding whether a new session resumes an unfinished attempt.

use crate::model::TestId;
use crate::traits::ResumeChoice;

/// How to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPlan {
    Resume(TestId),
    StartNew,
}

/// Combine the backend's unfinished attempt (if any) with the user's choice.
///
/// `choice` is `None` when nobody was asked, which only happens when there is
/// nothing to resume.
pub fn plan_start(in_progress: Option<TestId>, choice: Option<ResumeChoice>) -> StartPlan {
    match (in_progress, choice) {
        (Some(test_id), Some(ResumeChoice::Resume)) => StartPlan::Resume(test_id),
        (Some(_), Some(ResumeChoice::Restart)) => StartPlan::StartNew,
        (Some(test_id), None) => StartPlan::Resume(test_id),
        (None, _) => StartPlan::StartNew,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_in_progress_starts_new() {
        assert_eq!(plan_start(None, None), StartPlan::StartNew);
        assert_eq!(
            plan_start(None, Some(ResumeChoice::Resume)),
            StartPlan::StartNew
        );
    }

    #[test]
    fn user_choice_is_honoured() {
        let id = TestId::new("17");
        assert_eq!(
            plan_start(Some(id.clone()), Some(ResumeChoice::Resume)),
            StartPlan::Resume(id.clone())
        );
        assert_eq!(
            plan_start(Some(id), Some(ResumeChoice::Restart)),
            StartPlan::StartNew
        );
    }

    #[test]
    fn unasked_resume_keeps_progress() {
        let id = TestId::new("17");
        assert_eq!(plan_start(Some(id.clone()), None), StartPlan::Resume(id));
    }
}
