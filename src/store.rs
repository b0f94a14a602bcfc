use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::NaiveDateTime;

use crate::capture;
use crate::models::ExaminationRecord;
use crate::scoring;

/// Loads the whole record snapshot. A missing file is an empty collection.
///
/// Persisted derived fields are redundant copies; every record is re-scored
/// from its raw ratings and rejected if the stored copy disagrees.
pub fn load(path: &Path) -> anyhow::Result<Vec<ExaminationRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<ExaminationRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("malformed record snapshot in {}", path.display()))?;
    for (index, record) in records.iter().enumerate() {
        revalidate(record).with_context(|| {
            format!(
                "record {index} ({}) in {} failed re-validation",
                record.student,
                path.display()
            )
        })?;
    }
    Ok(records)
}

fn revalidate(record: &ExaminationRecord) -> anyhow::Result<()> {
    let outcome = scoring::score_questions(&record.questions)?;
    if (outcome.total_score - record.total_score).abs() > 1e-9 {
        bail!(
            "stored total score {} does not match recomputed {}",
            record.total_score,
            outcome.total_score
        );
    }
    if outcome.band != record.band {
        bail!(
            "stored band {} does not match recomputed {}",
            record.band,
            outcome.band
        );
    }
    if outcome.eap_requirement != record.eap_requirement {
        bail!(
            "stored EAP requirement {} does not match recomputed {}",
            record.eap_requirement,
            outcome.eap_requirement
        );
    }
    Ok(())
}

/// Rewrites the whole snapshot.
pub fn save(path: &Path, records: &[ExaminationRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)
        .context("failed to serialize record snapshot")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Appends a small realistic fixture set.
pub fn seed(path: &Path) -> anyhow::Result<usize> {
    let fixtures = [
        (
            "Morgan Whitfield",
            "Avery Lee",
            "2026-02-02T10:30:00",
            [3u8, 3, 3],
            "Confident delivery throughout",
        ),
        (
            "Morgan Whitfield",
            "Jules Moreno",
            "2026-01-30T14:00:00",
            [2, 3, 2],
            "Hesitant on the grading policy details",
        ),
        (
            "Priya Raman",
            "Kiara Patel",
            "2026-01-28T09:15:00",
            [1, 2, 1],
            "Mini-lesson ran well under time",
        ),
    ];

    let mut records = load(path)?;
    for (examiner, student, taken_at, ratings, note) in fixtures {
        let taken_at = NaiveDateTime::parse_from_str(taken_at, "%Y-%m-%dT%H:%M:%S")
            .context("invalid seed date")?;
        let record = capture::build_record(
            examiner,
            student,
            taken_at,
            ratings,
            [Vec::new(), Vec::new(), vec![note.to_string()]],
            records.len(),
        )?;
        records.push(record);
    }
    save(path, &records)?;
    Ok(fixtures.len())
}

/// Appends examinations from a CSV file with the columns
/// `examiner,student,taken_at,score_1,score_2,score_3`. Every row is
/// validated and scored through the engine; returns the appended count.
pub fn import_csv(path: &Path, csv_path: &Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        examiner: String,
        student: String,
        taken_at: NaiveDateTime,
        score_1: u8,
        score_2: u8,
        score_3: u8,
    }

    let mut records = load(path)?;
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut appended = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV row {}", line + 1))?;
        capture::validate_name("examiner", &row.examiner)
            .with_context(|| format!("CSV row {}", line + 1))?;
        capture::validate_name("student", &row.student)
            .with_context(|| format!("CSV row {}", line + 1))?;
        let record = capture::build_record(
            &row.examiner,
            &row.student,
            row.taken_at,
            [row.score_1, row.score_2, row.score_3],
            Default::default(),
            records.len(),
        )
        .with_context(|| format!("CSV row {}", line + 1))?;
        records.push(record);
        appended += 1;
    }

    save(path, &records)?;
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::models::{Band, QuestionResult};

    fn at(timestamp: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn sample_record(student: &str, ratings: [u8; 3]) -> ExaminationRecord {
        capture::build_record(
            "Morgan Whitfield",
            student,
            at("2023-02-15T10:00:00"),
            ratings,
            Default::default(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn missing_snapshot_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = load(&dir.path().join("absent.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn snapshot_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let records = vec![
            sample_record("Avery Lee", [3, 3, 2]),
            sample_record("Jules Moreno", [1, 1, 1]),
        ];
        save(&path, &records).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn load_rejects_tampered_derived_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut record = sample_record("Avery Lee", [1, 1, 1]);
        record.band = Band::HighPass;
        save(&path, std::slice::from_ref(&record)).unwrap();
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("failed re-validation"));
    }

    #[test]
    fn load_rejects_invalid_persisted_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let mut record = sample_record("Avery Lee", [2, 2, 2]);
        record.questions[1] = QuestionResult {
            prompt: "edited".to_string(),
            notes: Vec::new(),
            score: 9,
        };
        save(&path, std::slice::from_ref(&record)).unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn csv_import_scores_each_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let csv_path = dir.path().join("exams.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "examiner,student,taken_at,score_1,score_2,score_3").unwrap();
        writeln!(
            file,
            "Morgan Whitfield,Avery Lee,2023-02-15T10:00:00,3,3,2"
        )
        .unwrap();
        writeln!(file, "Priya Raman,Jules Moreno,2023-04-01T09:00:00,1,1,1").unwrap();

        let appended = import_csv(&path, &csv_path).unwrap();
        assert_eq!(appended, 2);
        let records = load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total_score, 2.5);
        assert_eq!(records[0].band, Band::LowPass);
        assert_eq!(records[1].total_score, 1.0);
    }

    #[test]
    fn csv_import_rejects_out_of_range_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let csv_path = dir.path().join("exams.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "examiner,student,taken_at,score_1,score_2,score_3").unwrap();
        writeln!(
            file,
            "Morgan Whitfield,Avery Lee,2023-02-15T10:00:00,5,3,2"
        )
        .unwrap();
        assert!(import_csv(&path, &csv_path).is_err());
    }

    #[test]
    fn seed_appends_fixture_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let inserted = seed(&path).unwrap();
        assert_eq!(inserted, 3);
        let records = load(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|record| record.questions.len() == 3));
    }
}
