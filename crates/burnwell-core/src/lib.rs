//! burnwell-core: assessment model, backend trait, and session controller.
//!
//! This crate defines the questionnaire data model, the `AssessmentApi`
//! trait that backends implement, and the `AssessmentSession` that drives a
//! user through one attempt.

pub mod error;
pub mod model;
pub mod resume;
pub mod saves;
pub mod session;
pub mod traits;

pub use error::{ApiError, ScoreError, SessionError};
pub use model::{
    Category, Level, Progress, Question, QuestionId, ResponseEntry, Responses, Score, ScoreReport,
    TestId, UserContext,
};
pub use session::{AssessmentSession, SessionConfig, SubmitOutcome};
pub use traits::{AssessmentApi, ResumeChoice, SessionPrompt, SubmitChoice, Submission};
