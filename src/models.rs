use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::scoring;

/// One graded question. Immutable once the grade is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    #[serde(rename = "question")]
    pub prompt: String,
    pub notes: Vec<String>,
    #[serde(rename = "question score")]
    pub score: u8,
}

/// One completed examination.
///
/// `total_score`, `band`, and `eap_requirement` are pure functions of
/// `questions`, computed once by [`ExaminationRecord::new`]. They are
/// persisted redundantly for downstream consumers but never trusted on
/// re-ingest; the store recomputes and cross-checks them on load.
/// Corrections mean creating a new record, not mutating an old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExaminationRecord {
    pub examiner: String,
    pub student: String,
    #[serde(rename = "date")]
    pub taken_at: NaiveDateTime,
    pub questions: Vec<QuestionResult>,
    #[serde(rename = "total score")]
    pub total_score: f64,
    pub band: Band,
    #[serde(rename = "EAP requirement")]
    pub eap_requirement: EapRequirement,
}

impl ExaminationRecord {
    /// Scores the exam and seals the derived fields.
    pub fn new(
        examiner: String,
        student: String,
        taken_at: NaiveDateTime,
        questions: Vec<QuestionResult>,
    ) -> Result<Self, EngineError> {
        let outcome = scoring::score_questions(&questions)?;
        Ok(Self {
            examiner,
            student,
            taken_at,
            questions,
            total_score: outcome.total_score,
            band: outcome.band,
            eap_requirement: outcome.eap_requirement,
        })
    }
}

/// Categorical exam outcome derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "No Pass")]
    NoPass,
    #[serde(rename = "Low Pass")]
    LowPass,
    #[serde(rename = "High Pass")]
    HighPass,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Band::NoPass => "No Pass",
            Band::LowPass => "Low Pass",
            Band::HighPass => "High Pass",
        };
        f.write_str(label)
    }
}

/// Whether the student must take the EAP 6016 remedial course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EapRequirement {
    #[serde(rename = "EAP 6016 REQUIRED")]
    Required,
    #[serde(rename = "EAP 6016 NOT REQUIRED")]
    NotRequired,
}

impl fmt::Display for EapRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EapRequirement::Required => "EAP 6016 REQUIRED",
            EapRequirement::NotRequired => "EAP 6016 NOT REQUIRED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BandCounts {
    pub no_pass: usize,
    pub low_pass: usize,
    pub high_pass: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EapCounts {
    pub required: usize,
    pub not_required: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Total scores awarded by one examiner, in encounter order, with their mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExaminerStats {
    pub scores: Vec<f64>,
    pub average: f64,
}

/// Exam count for one (year, calendar quarter) bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuarterBucket {
    pub year: i32,
    pub quarter: u32,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    InsufficientData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Increasing => "Increasing",
            TrendDirection::Decreasing => "Decreasing",
            TrendDirection::InsufficientData => "insufficient data",
        };
        f.write_str(label)
    }
}

/// The aggregator's single output value, rebuilt fresh on every call.
///
/// Examiner keys are exact strings; case and whitespace variants count as
/// distinct examiners.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_exams: usize,
    pub band_counts: BandCounts,
    pub pass_rate: f64,
    pub score_stats: ScoreStats,
    pub question_averages: [f64; 3],
    pub eap_counts: EapCounts,
    pub examiner_stats: BTreeMap<String, ExaminerStats>,
    pub quarterly_counts: Vec<QuarterBucket>,
    pub trend: TrendDirection,
    pub busiest_quarter: Option<QuarterBucket>,
}
