use chrono::NaiveDateTime;
use thiserror::Error;

/// Failures of the scoring and aggregation engine.
///
/// Every variant is a deterministic function of bad input; none are
/// transient, so callers surface them rather than retry.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A rating outside {1, 2, 3} or a question count other than 3.
    #[error("invalid score input: {0}")]
    InvalidScoreInput(String),

    /// The rounded total landed between the Low Pass ceiling and the High
    /// Pass floor.
    #[error("total score {0:.2} cannot be classified into a band")]
    UnclassifiableScore(f64),

    /// Strict aggregation over a window that matched no records.
    #[error("no examinations recorded between {start} and {end}")]
    EmptyRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}
