use crate::error::EngineError;
use crate::models::{Band, EapRequirement, QuestionResult};

/// Positional question weights. Index 0 is question 1; question order on a
/// record is semantically meaningful because it selects the weight.
pub const QUESTION_WEIGHTS: [f64; 3] = [0.20, 0.30, 0.50];

/// The derived outcome of one examination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub total_score: f64,
    pub band: Band,
    pub eap_requirement: EapRequirement,
}

/// Scores a finished set of graded questions.
///
/// The weighted total is rounded to 2 decimal places before band and EAP
/// classification. With ratings in {1, 2, 3} the achievable total range is
/// exactly [1.00, 3.00].
pub fn score_questions(questions: &[QuestionResult]) -> Result<ScoreOutcome, EngineError> {
    if questions.len() != QUESTION_WEIGHTS.len() {
        return Err(EngineError::InvalidScoreInput(format!(
            "expected {} graded questions, got {}",
            QUESTION_WEIGHTS.len(),
            questions.len()
        )));
    }
    for (position, question) in questions.iter().enumerate() {
        if !(1..=3).contains(&question.score) {
            return Err(EngineError::InvalidScoreInput(format!(
                "question {} has rating {}, expected 1-3",
                position + 1,
                question.score
            )));
        }
    }

    let weighted: f64 = questions
        .iter()
        .zip(QUESTION_WEIGHTS)
        .map(|(question, weight)| f64::from(question.score) * weight)
        .sum();
    let total_score = round2(weighted);

    Ok(ScoreOutcome {
        total_score,
        band: classify_band(total_score)?,
        eap_requirement: eap_requirement(total_score),
    })
}

/// Rounds to 2 decimal places, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Classifies a rounded total score into a band.
///
/// Totals in [2.99, 3.00) fall between the Low Pass ceiling and the High
/// Pass floor and surface as [`EngineError::UnclassifiableScore`] rather
/// than a label.
pub fn classify_band(total_score: f64) -> Result<Band, EngineError> {
    if (0.0..=1.99).contains(&total_score) {
        Ok(Band::NoPass)
    } else if (2.0..2.99).contains(&total_score) {
        Ok(Band::LowPass)
    } else if total_score == 3.0 {
        Ok(Band::HighPass)
    } else {
        Err(EngineError::UnclassifiableScore(total_score))
    }
}

/// EAP 6016 is mandatory below a 2.00 total. 2.00 itself is simultaneously
/// the Low Pass floor and the not-required floor.
pub fn eap_requirement(total_score: f64) -> EapRequirement {
    if total_score < 2.0 {
        EapRequirement::Required
    } else {
        EapRequirement::NotRequired
    }
}
