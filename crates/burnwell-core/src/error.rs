//! Error types.
//!
//! `ApiError` covers failures talking to the assessment backend. It lives in
//! `burnwell-core` so the session controller can decide what is transient and
//! what to show the user without string matching.

use thiserror::Error;

use crate::model::QuestionId;

/// Shown when the backend gives us nothing better to say.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur when interacting with the assessment backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The backend rejected the request.
    #[error("backend rejected request (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    /// The backend answered with a body we could not decode.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` for transport failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout(_) | ApiError::Network(_) => true,
            ApiError::Rejected { status, .. } => *status >= 500 || *status == 429,
            ApiError::Decode(_) => false,
        }
    }

    /// Best available message for the user: the backend's own detail string
    /// for rejections, a generic sentence otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected { status, detail } if *status < 500 && !detail.trim().is_empty() => {
                detail.trim().to_string()
            }
            ApiError::Timeout(_) | ApiError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Invalid answer value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("score {0} is outside 0..=6")]
    OutOfRange(i64),

    #[error("score is not a number: {0:?}")]
    NotANumber(String),
}

/// Errors returned by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),

    #[error(transparent)]
    InvalidScore(#[from] ScoreError),

    #[error("there are no questions to answer")]
    NoQuestions,

    #[error("assessment already submitted")]
    Finished,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ApiError::Timeout(30).is_transient());
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Rejected {
            status: 503,
            detail: String::new()
        }
        .is_transient());
        assert!(!ApiError::Rejected {
            status: 400,
            detail: "Invalid question ID".into()
        }
        .is_transient());
        assert!(!ApiError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn user_message_prefers_backend_detail() {
        let err = ApiError::Rejected {
            status: 400,
            detail: "User does not exist".into(),
        };
        assert_eq!(err.user_message(), "User does not exist");

        let blank = ApiError::Rejected {
            status: 422,
            detail: "  ".into(),
        };
        assert_eq!(blank.user_message(), GENERIC_FAILURE_MESSAGE);

        let server = ApiError::Rejected {
            status: 500,
            detail: "Traceback ...".into(),
        };
        assert_eq!(server.user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
