//! Core data model types for burnwell.
//!
//! Questions, scores, the response mapping, and the scoring result the
//! backend returns after a submission.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScoreError;

/// Identifier of a single questionnaire item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QuestionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(QuestionId)
    }
}

/// Opaque identifier of one assessment attempt, issued by the backend.
///
/// The backend may hand out integers or strings; both decode to the same
/// textual form and are sent back as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Ok(TestId(s)),
            Raw::Number(n) => Ok(TestId(n.to_string())),
        }
    }
}

/// Identity of the user taking the assessment.
///
/// Passed explicitly to the session controller instead of being read from
/// shared global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: String,
    pub display_name: Option<String>,
}

impl UserContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name to address the user by: the display name, else the id.
    pub fn name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.user_id)
    }
}

/// Subscale a question contributes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EmotionalExhaustion,
    Depersonalization,
    PersonalAccomplishment,
    #[default]
    #[serde(other)]
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::EmotionalExhaustion => write!(f, "emotional_exhaustion"),
            Category::Depersonalization => write!(f, "depersonalization"),
            Category::PersonalAccomplishment => write!(f, "personal_accomplishment"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// A single questionnaire item. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    #[serde(default)]
    pub category: Category,
}

/// A Likert answer in `0..=6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 6;

    /// Answer labels, indexed by score.
    pub const LABELS: [&'static str; 7] = [
        "Never",
        "A few times a year",
        "Once a month or less",
        "A few times a month",
        "Once a week",
        "A few times a week",
        "Every day",
    ];

    pub fn new(value: u8) -> Result<Self, ScoreError> {
        if value <= Self::MAX {
            Ok(Score(value))
        } else {
            Err(ScoreError::OutOfRange(i64::from(value)))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        Self::LABELS[self.0 as usize]
    }

    /// Every valid score, lowest first.
    pub fn all() -> impl Iterator<Item = Score> {
        (Self::MIN..=Self::MAX).map(Score)
    }
}

impl TryFrom<i64> for Score {
    type Error = ScoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| ScoreError::OutOfRange(value))
            .and_then(Score::new)
    }
}

impl FromStr for Score {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ScoreError::NotANumber(s.trim().to_string()))?;
        Score::try_from(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Score::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Question id → score associations collected during a session.
///
/// Keys are unique; overwriting a key replaces the previous score.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Responses {
    scores: HashMap<QuestionId, Score>,
}

impl Responses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score, returning the value it replaced.
    pub fn insert(&mut self, question: QuestionId, score: Score) -> Option<Score> {
        self.scores.insert(question, score)
    }

    pub fn get(&self, question: QuestionId) -> Option<Score> {
        self.scores.get(&question).copied()
    }

    pub fn contains(&self, question: QuestionId) -> bool {
        self.scores.contains_key(&question)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Drop every entry whose question is not in `questions`.
    pub fn retain_known(&mut self, questions: &[Question]) {
        self.scores
            .retain(|id, _| questions.iter().any(|q| q.id == *id));
    }

    /// Entries in question-list order, skipping unanswered questions.
    pub fn ordered_entries(&self, questions: &[Question]) -> Vec<ResponseEntry> {
        questions
            .iter()
            .filter_map(|q| {
                self.get(q.id).map(|score| ResponseEntry {
                    question_id: q.id,
                    score,
                })
            })
            .collect()
    }

    /// Index of the first question in list order without an answer.
    pub fn first_unanswered(&self, questions: &[Question]) -> Option<usize> {
        questions.iter().position(|q| !self.contains(q.id))
    }
}

impl FromIterator<(QuestionId, Score)> for Responses {
    fn from_iter<T: IntoIterator<Item = (QuestionId, Score)>>(iter: T) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// One answered question, as sent to the backend on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEntry {
    pub question_id: QuestionId,
    pub score: Score,
}

/// Answered-count over total-count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.answered as f64 / self.total as f64
        }
    }

    /// Completion percentage rounded to the nearest whole number.
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.answered, self.total, self.percent())
    }
}

/// Severity band reported by the scoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Level {
    Low,
    Moderate,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "Low"),
            Level::Moderate => write!(f, "Moderate"),
            Level::High => write!(f, "High"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Level::Low),
            "moderate" | "medium" => Ok(Level::Moderate),
            "high" => Ok(Level::High),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of a successful submission, computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub burnout_level: Level,
    pub emotional_exhaustion_score: i64,
    pub depersonalization_score: i64,
    pub personal_accomplishment_score: i64,
    #[serde(default)]
    pub emotional_exhaustion_level: Option<Level>,
    #[serde(default)]
    pub depersonalization_level: Option<Level>,
    #[serde(default)]
    pub personal_accomplishment_level: Option<Level>,
    #[serde(default)]
    pub test_id: Option<TestId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: u32) -> Vec<Question> {
        (1..=n)
            .map(|i| Question {
                id: QuestionId(i),
                text: format!("q{i}"),
                category: Category::EmotionalExhaustion,
            })
            .collect()
    }

    #[test]
    fn score_range_is_enforced() {
        assert_eq!(Score::new(0).unwrap().value(), 0);
        assert_eq!(Score::new(6).unwrap().label(), "Every day");
        assert!(Score::new(7).is_err());
        assert!(Score::try_from(-1).is_err());
        assert!("x".parse::<Score>().is_err());
        assert_eq!(" 3 ".parse::<Score>().unwrap().value(), 3);
        assert_eq!(Score::all().count(), 7);
    }

    #[test]
    fn score_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Score>("9").is_err());
        assert_eq!(serde_json::from_str::<Score>("2").unwrap().value(), 2);
    }

    #[test]
    fn test_id_accepts_numbers_and_strings() {
        let from_num: TestId = serde_json::from_str("42").unwrap();
        let from_str: TestId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_num, from_str);
        assert_eq!(from_num.as_str(), "42");
    }

    #[test]
    fn unknown_category_decodes_as_other() {
        let q: Question =
            serde_json::from_str(r#"{"id": 1, "text": "t", "category": "sleep"}"#).unwrap();
        assert_eq!(q.category, Category::Other);
    }

    #[test]
    fn user_name_falls_back_to_id() {
        assert_eq!(UserContext::new("42").name(), "42");
        assert_eq!(UserContext::new("42").with_display_name("Dr. Lee").name(), "Dr. Lee");
        assert_eq!(UserContext::new("42").with_display_name(" ").name(), "42");
    }

    #[test]
    fn overwrite_keeps_single_entry() {
        let mut responses = Responses::new();
        responses.insert(QuestionId(1), Score::new(2).unwrap());
        let previous = responses.insert(QuestionId(1), Score::new(5).unwrap());
        assert_eq!(previous, Some(Score::new(2).unwrap()));
        assert_eq!(responses.len(), 1);
        assert_eq!(responses.get(QuestionId(1)), Some(Score::new(5).unwrap()));
    }

    #[test]
    fn first_unanswered_follows_list_order() {
        let qs = questions(4);
        let responses: Responses = [
            (QuestionId(1), Score::new(1).unwrap()),
            (QuestionId(3), Score::new(1).unwrap()),
        ]
        .into_iter()
        .collect();
        assert_eq!(responses.first_unanswered(&qs), Some(1));
    }

    #[test]
    fn ordered_entries_skip_gaps() {
        let qs = questions(3);
        let responses: Responses = [
            (QuestionId(3), Score::new(6).unwrap()),
            (QuestionId(1), Score::new(4).unwrap()),
        ]
        .into_iter()
        .collect();
        let entries = responses.ordered_entries(&qs);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].question_id, QuestionId(1));
        assert_eq!(entries[1].question_id, QuestionId(3));
    }

    #[test]
    fn retain_known_drops_foreign_ids() {
        let qs = questions(2);
        let mut responses: Responses = [
            (QuestionId(1), Score::new(1).unwrap()),
            (QuestionId(99), Score::new(1).unwrap()),
        ]
        .into_iter()
        .collect();
        responses.retain_known(&qs);
        assert_eq!(responses.len(), 1);
        assert!(!responses.contains(QuestionId(99)));
    }

    #[test]
    fn progress_percent_and_fraction() {
        let p = Progress {
            answered: 1,
            total: 3,
        };
        assert!((p.fraction() - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(p.percent(), 33);
        assert_eq!(p.to_string(), "1/3 (33%)");

        let empty = Progress {
            answered: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 0);
        assert!(!empty.is_complete());
    }

    #[test]
    fn score_report_parses_backend_payload() {
        let json = r#"{
            "user_id": 123,
            "test_id": 7,
            "emotional_exhaustion_score": 30,
            "depersonalization_score": 4,
            "personal_accomplishment_score": 41,
            "emotional_exhaustion_level": "Moderate",
            "depersonalization_level": "Low",
            "personal_accomplishment_level": "High",
            "burnout_level": "High"
        }"#;
        let report: ScoreReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.burnout_level, Level::High);
        assert_eq!(report.emotional_exhaustion_level, Some(Level::Moderate));
        assert_eq!(report.test_id, Some(TestId::new("7")));
    }
}
