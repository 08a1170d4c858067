//! Maslach Burnout Inventory question bank and scoring.
//!
//! Used by the offline backend so the full flow works without a server.

use burnwell_core::error::ApiError;
use burnwell_core::model::{Category, Level, Question, QuestionId, ResponseEntry, ScoreReport};

const BANK: [(u32, &str, Category); 22] = [
    (1, "I feel emotionally drained from my work.", Category::EmotionalExhaustion),
    (2, "I feel used up at the end of the workday.", Category::EmotionalExhaustion),
    (3, "I feel fatigued when I get up in the morning and have to face another day on the job.", Category::EmotionalExhaustion),
    (4, "I can easily understand how my patients feel about things.", Category::PersonalAccomplishment),
    (5, "I feel I treat some patients as if they were impersonal objects.", Category::Depersonalization),
    (6, "Working with people all day is really a strain for me.", Category::EmotionalExhaustion),
    (7, "I deal very effectively with the problems of my patients.", Category::PersonalAccomplishment),
    (8, "I feel burned out from my work.", Category::EmotionalExhaustion),
    (9, "I feel I'm positively influencing other people's lives through my work.", Category::PersonalAccomplishment),
    (10, "I've become more callous toward people since I took this job.", Category::Depersonalization),
    (11, "I worry that this job is hardening me emotionally.", Category::Depersonalization),
    (12, "I feel very energetic.", Category::PersonalAccomplishment),
    (13, "I feel frustrated by my job.", Category::EmotionalExhaustion),
    (14, "I feel I'm working too hard on my job.", Category::EmotionalExhaustion),
    (15, "I don't really care what happens to some of my patients.", Category::Depersonalization),
    (16, "Working with people directly puts too much stress on me.", Category::EmotionalExhaustion),
    (17, "I can easily create a relaxed atmosphere with my patients.", Category::PersonalAccomplishment),
    (18, "I feel exhilarated after working closely with my patients.", Category::PersonalAccomplishment),
    (19, "I have accomplished many worthwhile things in this job.", Category::PersonalAccomplishment),
    (20, "I feel like I'm at the end of my rope.", Category::EmotionalExhaustion),
    (21, "In my work, I deal with emotional problems very calmly.", Category::PersonalAccomplishment),
    (22, "I feel patients blame me for some of their problems.", Category::Depersonalization),
];

/// The 22 MBI items in presentation order.
pub fn questions() -> Vec<Question> {
    BANK.iter()
        .map(|(id, text, category)| Question {
            id: QuestionId(*id),
            text: (*text).to_string(),
            category: *category,
        })
        .collect()
}

/// Per-subscale sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscaleTotals {
    pub emotional_exhaustion: i64,
    pub depersonalization: i64,
    pub personal_accomplishment: i64,
}

impl SubscaleTotals {
    pub fn emotional_exhaustion_level(&self) -> Level {
        match self.emotional_exhaustion {
            s if s <= 18 => Level::Low,
            s if s <= 33 => Level::Moderate,
            _ => Level::High,
        }
    }

    pub fn depersonalization_level(&self) -> Level {
        match self.depersonalization {
            s if s <= 5 => Level::Low,
            s if s <= 11 => Level::Moderate,
            _ => Level::High,
        }
    }

    /// Higher accomplishment is better, so the bands run the other way.
    pub fn personal_accomplishment_level(&self) -> Level {
        match self.personal_accomplishment {
            s if s >= 40 => Level::High,
            s if s >= 31 => Level::Moderate,
            _ => Level::Low,
        }
    }

    pub fn burnout_level(&self) -> Level {
        if self.emotional_exhaustion > 26 || self.depersonalization > 12 {
            Level::High
        } else if self.emotional_exhaustion > 18 || self.depersonalization > 9 {
            Level::Moderate
        } else {
            Level::Low
        }
    }
}

/// Sum answers by subscale. Unknown question ids are rejected the way the
/// server rejects them.
pub fn totals(questions: &[Question], entries: &[ResponseEntry]) -> Result<SubscaleTotals, ApiError> {
    let mut totals = SubscaleTotals::default();
    for entry in entries {
        let question = questions
            .iter()
            .find(|q| q.id == entry.question_id)
            .ok_or_else(|| ApiError::Rejected {
                status: 400,
                detail: "Invalid question ID".to_string(),
            })?;
        let value = i64::from(entry.score.value());
        match question.category {
            Category::EmotionalExhaustion => totals.emotional_exhaustion += value,
            Category::Depersonalization => totals.depersonalization += value,
            Category::PersonalAccomplishment => totals.personal_accomplishment += value,
            Category::Other => {}
        }
    }
    Ok(totals)
}

/// Score a submission into the report the backend would return.
pub fn score(questions: &[Question], entries: &[ResponseEntry]) -> Result<ScoreReport, ApiError> {
    let totals = totals(questions, entries)?;
    Ok(ScoreReport {
        burnout_level: totals.burnout_level(),
        emotional_exhaustion_score: totals.emotional_exhaustion,
        depersonalization_score: totals.depersonalization,
        personal_accomplishment_score: totals.personal_accomplishment,
        emotional_exhaustion_level: Some(totals.emotional_exhaustion_level()),
        depersonalization_level: Some(totals.depersonalization_level()),
        personal_accomplishment_level: Some(totals.personal_accomplishment_level()),
        test_id: None,
    })
}
