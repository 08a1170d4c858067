//! HTTP assessment backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use burnwell_core::error::ApiError;
use burnwell_core::model::{
    Question, QuestionId, ResponseEntry, Responses, Score, ScoreReport, TestId, UserContext,
};
use burnwell_core::traits::{AssessmentApi, Submission};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Backend reached over HTTP/JSON.
pub struct HttpBackend {
    base_url: Url,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::Network(format!("invalid base URL: {base_url}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_token: api_token.filter(|t| !t.is_empty()),
            timeout_secs: timeout.as_secs(),
            client,
        })
    }

    /// Endpoint URL under the base path. Each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, segments: &[&str]) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(self.url(segments)))
    }

    fn post<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(self.url(segments)).json(body))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.header("Authorization", format!("Bearer {token}")),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Rejected {
            status: status.as_u16(),
            detail: detail_from_body(&body),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(req).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Pull a readable message out of an error body.
///
/// Understands `{"detail": "..."}` and validation errors shaped like
/// `{"detail": [{"msg": "..."}]}`; anything else is returned trimmed.
fn detail_from_body(body: &str) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Detail {
        Text(String),
        Items(Vec<DetailItem>),
    }

    #[derive(Deserialize)]
    struct DetailItem {
        msg: String,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Detail,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Detail::Text(text),
        }) => text,
        Ok(ErrorBody {
            detail: Detail::Items(items),
        }) => items
            .into_iter()
            .map(|i| i.msg)
            .collect::<Vec<_>>()
            .join("; "),
        Err(_) => body.trim().to_string(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionsPayload {
    Wrapped { questions: Vec<Question> },
    Bare(Vec<Question>),
}

#[derive(Serialize)]
struct StartTestRequest<'a> {
    user_id: &'a str,
}

#[derive(Deserialize)]
struct TestIdPayload {
    #[serde(default)]
    test_id: Option<TestId>,
}

#[derive(Serialize)]
struct SaveResponseRequest<'a> {
    test_id: &'a TestId,
    question_id: QuestionId,
    score: Score,
}

#[derive(Deserialize)]
struct ProgressPayload {
    #[serde(default)]
    responses: Option<StoredResponses>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredResponses {
    Map(HashMap<String, i64>),
    List(Vec<ResponseEntry>),
}

impl StoredResponses {
    fn into_responses(self) -> Responses {
        match self {
            StoredResponses::Map(map) => map
                .into_iter()
                .filter_map(|(key, value)| {
                    let id = match key.parse::<QuestionId>() {
                        Ok(id) => id,
                        Err(_) => {
                            warn!(key = %key, "ignoring stored response with non-numeric question id");
                            return None;
                        }
                    };
                    match Score::try_from(value) {
                        Ok(score) => Some((id, score)),
                        Err(e) => {
                            warn!(question = %id, "ignoring stored response: {e}");
                            None
                        }
                    }
                })
                .collect(),
            StoredResponses::List(entries) => entries
                .into_iter()
                .map(|e| (e.question_id, e.score))
                .collect(),
        }
    }
}

#[async_trait]
impl AssessmentApi for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all)]
    async fn fetch_questions(&self) -> Result<Vec<Question>, ApiError> {
        let payload: QuestionsPayload = self.send_json(self.get(&["test"])).await?;
        Ok(match payload {
            QuestionsPayload::Wrapped { questions } => questions,
            QuestionsPayload::Bare(questions) => questions,
        })
    }

    #[instrument(skip_all, fields(user = %user.user_id))]
    async fn start_test(&self, user: &UserContext) -> Result<TestId, ApiError> {
        let body = StartTestRequest {
            user_id: &user.user_id,
        };
        let payload: TestIdPayload = self.send_json(self.post(&["start-test"], &body)).await?;
        payload
            .test_id
            .ok_or_else(|| ApiError::Decode("start-test response has no test_id".to_string()))
    }

    #[instrument(skip_all, fields(test_id = %test_id, question = %question_id))]
    async fn save_response(
        &self,
        test_id: &TestId,
        question_id: QuestionId,
        score: Score,
    ) -> Result<(), ApiError> {
        let body = SaveResponseRequest {
            test_id,
            question_id,
            score,
        };
        self.send(self.post(&["save-response"], &body)).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(test_id = %test_id))]
    async fn test_progress(&self, test_id: &TestId) -> Result<Responses, ApiError> {
        let payload: ProgressPayload = self
            .send_json(self.get(&["test-progress", test_id.as_str()]))
            .await?;
        Ok(payload
            .responses
            .map(StoredResponses::into_responses)
            .unwrap_or_default())
    }

    #[instrument(skip_all, fields(user = %user.user_id))]
    async fn in_progress_test(&self, user: &UserContext) -> Result<Option<TestId>, ApiError> {
        let response = match self.send(self.get(&["in-progress-test", user.user_id.as_str()])).await {
            Ok(response) => response,
            Err(ApiError::Rejected { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let payload: Option<TestIdPayload> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(payload.and_then(|p| p.test_id))
    }

    #[instrument(skip_all, fields(answers = submission.responses.len()))]
    async fn submit(&self, submission: &Submission) -> Result<ScoreReport, ApiError> {
        self.send_json(self.post(&["submit"], submission)).await
    }
}
