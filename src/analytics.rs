use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};

use crate::error::EngineError;
use crate::models::{
    AnalyticsSummary, Band, BandCounts, EapCounts, EapRequirement, ExaminationRecord,
    ExaminerStats, QuarterBucket, ScoreStats, TrendDirection,
};

/// How [`summarize`] treats a window that matches no records. The two report
/// types disagree on this point, so the choice is the caller's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyWindow {
    /// Produce an all-zero summary.
    Allow,
    /// Fail with [`EngineError::EmptyRange`].
    Reject,
}

/// Records with `start <= taken_at <= end`, both bounds inclusive, in the
/// input's order.
pub fn filter_by_window<'a>(
    records: &'a [ExaminationRecord],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<&'a ExaminationRecord> {
    records
        .iter()
        .filter(|record| start <= record.taken_at && record.taken_at <= end)
        .collect()
}

/// Builds the full analytics summary for a date window.
///
/// Pure over its inputs; identical inputs yield deep-equal summaries.
pub fn summarize(
    records: &[ExaminationRecord],
    start: NaiveDateTime,
    end: NaiveDateTime,
    on_empty: EmptyWindow,
) -> Result<AnalyticsSummary, EngineError> {
    let filtered = filter_by_window(records, start, end);
    if filtered.is_empty() && on_empty == EmptyWindow::Reject {
        return Err(EngineError::EmptyRange { start, end });
    }
    let total_exams = filtered.len();

    let mut band_counts = BandCounts::default();
    let mut eap_counts = EapCounts::default();
    for record in &filtered {
        match record.band {
            Band::NoPass => band_counts.no_pass += 1,
            Band::LowPass => band_counts.low_pass += 1,
            Band::HighPass => band_counts.high_pass += 1,
        }
        match record.eap_requirement {
            EapRequirement::Required => eap_counts.required += 1,
            EapRequirement::NotRequired => eap_counts.not_required += 1,
        }
    }
    let pass_rate = if total_exams == 0 {
        0.0
    } else {
        (band_counts.low_pass + band_counts.high_pass) as f64 / total_exams as f64
    };

    let totals: Vec<f64> = filtered.iter().map(|record| record.total_score).collect();

    let mut question_averages = [0.0f64; 3];
    for (position, average) in question_averages.iter_mut().enumerate() {
        let ratings: Vec<f64> = filtered
            .iter()
            .filter_map(|record| record.questions.get(position))
            .map(|question| f64::from(question.score))
            .collect();
        *average = mean(&ratings);
    }

    let mut examiner_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in &filtered {
        examiner_scores
            .entry(record.examiner.clone())
            .or_default()
            .push(record.total_score);
    }
    let examiner_stats = examiner_scores
        .into_iter()
        .map(|(examiner, scores)| {
            let average = mean(&scores);
            (examiner, ExaminerStats { scores, average })
        })
        .collect();

    let mut quarter_counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for record in &filtered {
        *quarter_counts.entry(quarter_key(record.taken_at)).or_default() += 1;
    }
    let quarterly_counts: Vec<QuarterBucket> = quarter_counts
        .into_iter()
        .map(|((year, quarter), count)| QuarterBucket {
            year,
            quarter,
            count,
        })
        .collect();

    Ok(AnalyticsSummary {
        total_exams,
        band_counts,
        pass_rate,
        score_stats: score_stats(&totals),
        question_averages,
        eap_counts,
        examiner_stats,
        trend: trend_direction(&quarterly_counts),
        busiest_quarter: busiest_quarter(&quarterly_counts),
        quarterly_counts,
    })
}

/// (year, quarter) bucket key; quarters are calendar quarters 1-4.
pub fn quarter_key(taken_at: NaiveDateTime) -> (i32, u32) {
    (taken_at.year(), taken_at.month0() / 3 + 1)
}

/// Compares the summed counts of the first and second halves of the
/// chronologically sorted buckets, split by bucket count. The comparison is
/// a strict `>`, so equal sums classify as Decreasing.
pub fn trend_direction(buckets: &[QuarterBucket]) -> TrendDirection {
    if buckets.len() < 2 {
        return TrendDirection::InsufficientData;
    }
    let mid = buckets.len() / 2;
    let first: usize = buckets[..mid].iter().map(|bucket| bucket.count).sum();
    let second: usize = buckets[mid..].iter().map(|bucket| bucket.count).sum();
    if second > first {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

/// Stable argmax over the sorted buckets; ties keep the earliest quarter.
pub fn busiest_quarter(buckets: &[QuarterBucket]) -> Option<QuarterBucket> {
    let mut busiest: Option<QuarterBucket> = None;
    for bucket in buckets {
        match busiest {
            Some(current) if bucket.count <= current.count => {}
            _ => busiest = Some(*bucket),
        }
    }
    busiest
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn score_stats(totals: &[f64]) -> ScoreStats {
    if totals.is_empty() {
        return ScoreStats::default();
    }
    ScoreStats {
        mean: mean(totals),
        median: median(totals),
        min: totals.iter().copied().fold(f64::INFINITY, f64::min),
        max: totals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionResult;

    fn at(timestamp: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn exam(examiner: &str, taken_at: &str, scores: [u8; 3]) -> ExaminationRecord {
        let questions = scores
            .iter()
            .map(|&score| QuestionResult {
                prompt: "sample prompt".to_string(),
                notes: Vec::new(),
                score,
            })
            .collect();
        ExaminationRecord::new(
            examiner.to_string(),
            "Avery Lee".to_string(),
            at(taken_at),
            questions,
        )
        .unwrap()
    }

    fn full_year() -> (NaiveDateTime, NaiveDateTime) {
        (at("2023-01-01T00:00:00"), at("2023-12-31T23:59:59"))
    }

    #[test]
    fn empty_window_allow_returns_all_zero_summary() {
        let (start, end) = full_year();
        let summary = summarize(&[], start, end, EmptyWindow::Allow).unwrap();
        assert_eq!(summary.total_exams, 0);
        assert_eq!(summary.pass_rate, 0.0);
        assert_eq!(summary.score_stats, ScoreStats::default());
        assert_eq!(summary.question_averages, [0.0, 0.0, 0.0]);
        assert!(summary.examiner_stats.is_empty());
        assert!(summary.quarterly_counts.is_empty());
        assert_eq!(summary.trend, TrendDirection::InsufficientData);
        assert_eq!(summary.busiest_quarter, None);
    }

    #[test]
    fn empty_window_reject_surfaces_an_error() {
        let (start, end) = full_year();
        let err = summarize(&[], start, end, EmptyWindow::Reject).unwrap_err();
        assert!(matches!(err, EngineError::EmptyRange { .. }));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let records = vec![
            exam("Morgan Whitfield", "2023-03-01T00:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-03-15T12:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-03-31T17:30:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-04-01T00:00:00", [2, 2, 2]),
        ];
        let filtered = filter_by_window(
            &records,
            at("2023-03-01T00:00:00"),
            at("2023-03-31T17:30:00"),
        );
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn quarters_follow_the_calendar() {
        assert_eq!(quarter_key(at("2023-02-15T10:00:00")), (2023, 1));
        assert_eq!(quarter_key(at("2023-04-01T00:00:00")), (2023, 2));
        assert_eq!(quarter_key(at("2023-12-31T23:59:59")), (2023, 4));
    }

    #[test]
    fn band_counts_and_pass_rate() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [1, 1, 1]),
            exam("Morgan Whitfield", "2023-02-10T09:00:00", [3, 3, 2]),
            exam("Priya Raman", "2023-03-10T09:00:00", [3, 3, 3]),
            exam("Priya Raman", "2023-04-10T09:00:00", [2, 2, 2]),
        ];
        let (start, end) = full_year();
        let summary = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        assert_eq!(summary.total_exams, 4);
        assert_eq!(summary.band_counts.no_pass, 1);
        assert_eq!(summary.band_counts.low_pass, 2);
        assert_eq!(summary.band_counts.high_pass, 1);
        assert_eq!(summary.pass_rate, 0.75);
        assert_eq!(summary.eap_counts.required, 1);
        assert_eq!(summary.eap_counts.not_required, 3);
    }

    #[test]
    fn question_averages_are_positional() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [3, 1, 1]),
            exam("Morgan Whitfield", "2023-01-11T09:00:00", [1, 3, 1]),
        ];
        let (start, end) = full_year();
        let summary = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        assert_eq!(summary.question_averages, [2.0, 2.0, 1.0]);
    }

    #[test]
    fn score_stats_cover_mean_median_and_range() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [1, 1, 1]), // 1.00
            exam("Morgan Whitfield", "2023-02-10T09:00:00", [2, 2, 2]), // 2.00
            exam("Morgan Whitfield", "2023-03-10T09:00:00", [3, 3, 2]), // 2.50
            exam("Morgan Whitfield", "2023-04-10T09:00:00", [3, 3, 3]), // 3.00
        ];
        let (start, end) = full_year();
        let summary = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        assert!((summary.score_stats.mean - 2.125).abs() < 1e-9);
        assert_eq!(summary.score_stats.median, 2.25);
        assert_eq!(summary.score_stats.min, 1.0);
        assert_eq!(summary.score_stats.max, 3.0);
    }

    #[test]
    fn examiner_keys_are_exact_strings() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [2, 2, 2]),
            exam("morgan whitfield", "2023-01-11T09:00:00", [3, 3, 3]),
            exam("Morgan Whitfield", "2023-01-12T09:00:00", [1, 1, 1]),
        ];
        let (start, end) = full_year();
        let summary = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        assert_eq!(summary.examiner_stats.len(), 2);
        let morgan = &summary.examiner_stats["Morgan Whitfield"];
        assert_eq!(morgan.scores, vec![2.0, 1.0]);
        assert_eq!(morgan.average, 1.5);
    }

    #[test]
    fn quarterly_buckets_sort_chronologically() {
        let records = vec![
            exam("Morgan Whitfield", "2024-01-10T09:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-11-10T09:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-02-10T09:00:00", [2, 2, 2]),
        ];
        let summary = summarize(
            &records,
            at("2023-01-01T00:00:00"),
            at("2024-12-31T23:59:59"),
            EmptyWindow::Reject,
        )
        .unwrap();
        let keys: Vec<(i32, u32)> = summary
            .quarterly_counts
            .iter()
            .map(|bucket| (bucket.year, bucket.quarter))
            .collect();
        assert_eq!(keys, vec![(2023, 1), (2023, 4), (2024, 1)]);
    }

    #[test]
    fn equal_half_sums_classify_as_decreasing() {
        let buckets = [
            QuarterBucket {
                year: 2023,
                quarter: 1,
                count: 5,
            },
            QuarterBucket {
                year: 2023,
                quarter: 2,
                count: 5,
            },
        ];
        assert_eq!(trend_direction(&buckets), TrendDirection::Decreasing);
    }

    #[test]
    fn growing_second_half_classifies_as_increasing() {
        let buckets = [
            QuarterBucket {
                year: 2023,
                quarter: 1,
                count: 2,
            },
            QuarterBucket {
                year: 2023,
                quarter: 2,
                count: 1,
            },
            QuarterBucket {
                year: 2023,
                quarter: 3,
                count: 4,
            },
        ];
        // Split by bucket count: first half is Q1 alone.
        assert_eq!(trend_direction(&buckets), TrendDirection::Increasing);
    }

    #[test]
    fn single_bucket_has_insufficient_trend_data() {
        let buckets = [QuarterBucket {
            year: 2023,
            quarter: 1,
            count: 9,
        }];
        assert_eq!(trend_direction(&buckets), TrendDirection::InsufficientData);
    }

    #[test]
    fn busiest_quarter_keeps_the_earliest_on_ties() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-02-10T09:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-05-10T09:00:00", [2, 2, 2]),
            exam("Morgan Whitfield", "2023-06-10T09:00:00", [2, 2, 2]),
        ];
        let (start, end) = full_year();
        let summary = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        let busiest = summary.busiest_quarter.unwrap();
        assert_eq!((busiest.year, busiest.quarter, busiest.count), (2023, 1, 2));
    }

    #[test]
    fn identical_inputs_yield_deep_equal_summaries() {
        let records = vec![
            exam("Morgan Whitfield", "2023-01-10T09:00:00", [3, 2, 1]),
            exam("Priya Raman", "2023-07-10T09:00:00", [2, 3, 3]),
        ];
        let (start, end) = full_year();
        let first = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        let second = summarize(&records, start, end, EmptyWindow::Reject).unwrap();
        assert_eq!(first, second);
    }
}
