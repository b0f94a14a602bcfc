use anyhow::bail;
use chrono::NaiveDateTime;

use crate::error::EngineError;
use crate::models::{ExaminationRecord, QuestionResult};

/// Prompt bank for the three exam questions, indexed by position.
pub const QUESTION_BANK: [&[&str]; 3] = [
    &[
        "Can you give us a brief professional introduction, including your academic background and current research focus?",
        "How would you describe your primary research interests and their significance in the broader context of your field?",
        "What motivated you to pursue your specific area of study within your field?",
        "Can you share a recent project you worked on, highlighting your role and contributions?",
        "What are your future career aspirations, and how do you see your current research contributing to those goals?",
    ],
    &[
        "Can you explain the procedure for submitting assignments in your course?",
        "How do you handle late submissions or requests for extensions?",
        "What is your policy on academic integrity and plagiarism?",
        "How are grades determined in your course?",
        "What should a student do if they need extra help outside of class?",
    ],
    &[
        "Please begin your mini-lesson now. I'll ask a few Q & A questions at the end. You have 5-6 minutes for your demo mini-lesson.",
    ],
];

/// Deterministic rotation through the prompts for one position.
pub fn prompt_for(position: usize, rotation: usize) -> &'static str {
    let prompts = QUESTION_BANK[position];
    prompts[rotation % prompts.len()]
}

/// Examiner and student names: at least 2 characters, letters, spaces, and
/// hyphens only.
pub fn validate_name(role: &str, name: &str) -> anyhow::Result<()> {
    let trimmed = name.trim();
    let significant: String = trimmed
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    if trimmed.chars().count() < 2
        || significant.is_empty()
        || !significant.chars().all(char::is_alphabetic)
    {
        bail!(
            "{role} name {name:?} must be at least 2 characters using letters, spaces, and hyphens only"
        );
    }
    Ok(())
}

/// Assembles a scored record from bare ratings, drawing prompts from the
/// bank. `rotation` (typically the current store size) selects which prompt
/// each position gets.
pub fn build_record(
    examiner: &str,
    student: &str,
    taken_at: NaiveDateTime,
    ratings: [u8; 3],
    notes: [Vec<String>; 3],
    rotation: usize,
) -> Result<ExaminationRecord, EngineError> {
    let questions = ratings
        .iter()
        .zip(notes)
        .enumerate()
        .map(|(position, (&score, notes))| QuestionResult {
            prompt: prompt_for(position, rotation).to_string(),
            notes,
            score,
        })
        .collect();
    ExaminationRecord::new(
        examiner.to_string(),
        student.to_string(),
        taken_at,
        questions,
    )
}
