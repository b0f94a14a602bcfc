use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{AnalyticsSummary, EapRequirement, ExaminationRecord};

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Renders every facet of the analytics summary as markdown. Chart and PDF
/// rendering belong to downstream consumers of the same summary.
pub fn assessment_report(
    summary: &AnalyticsSummary,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> String {
    let mut output = String::new();
    let total = summary.total_exams;

    let _ = writeln!(output, "# ITA Assessment Report");
    let _ = writeln!(output, "Window: {} to {}", start.date(), end.date());
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary Statistics");
    let _ = writeln!(output, "- Total Examinations: {total}");
    let _ = writeln!(output, "- Pass Rate: {:.2}%", summary.pass_rate * 100.0);
    let _ = writeln!(output, "- Band Distribution:");
    for (label, count) in [
        ("No Pass", summary.band_counts.no_pass),
        ("Low Pass", summary.band_counts.low_pass),
        ("High Pass", summary.band_counts.high_pass),
    ] {
        let _ = writeln!(
            output,
            "  - {label}: {count} ({:.2}%)",
            percent(count, total)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Statistics");
    let _ = writeln!(output, "- Average Score: {:.2}", summary.score_stats.mean);
    let _ = writeln!(output, "- Median Score: {:.2}", summary.score_stats.median);
    let _ = writeln!(
        output,
        "- Score Range: {:.2} - {:.2}",
        summary.score_stats.min, summary.score_stats.max
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Question Averages");
    for (position, average) in summary.question_averages.iter().enumerate() {
        let _ = writeln!(output, "- Question {} Average: {average:.2}", position + 1);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## EAP Requirement Summary");
    for (label, count) in [
        ("EAP 6016 REQUIRED", summary.eap_counts.required),
        ("EAP 6016 NOT REQUIRED", summary.eap_counts.not_required),
    ] {
        let _ = writeln!(
            output,
            "- {label}: {count} ({:.2}%)",
            percent(count, total)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Examiner Scoring Analysis");
    if summary.examiner_stats.is_empty() {
        let _ = writeln!(output, "No examinations in this window.");
    } else {
        for (examiner, stats) in &summary.examiner_stats {
            let _ = writeln!(
                output,
                "- {examiner}: average {:.2} across {} exams",
                stats.average,
                stats.scores.len()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Temporal Analysis");
    let _ = writeln!(output, "- Exams per Quarter:");
    if summary.quarterly_counts.is_empty() {
        let _ = writeln!(output, "  - none");
    } else {
        for bucket in &summary.quarterly_counts {
            let _ = writeln!(
                output,
                "  - {} Q{}: {}",
                bucket.year, bucket.quarter, bucket.count
            );
        }
    }
    let _ = writeln!(output, "- Trend: {}", summary.trend);
    match &summary.busiest_quarter {
        Some(bucket) => {
            let _ = writeln!(
                output,
                "- Busiest Quarter: {} Q{} ({} exams)",
                bucket.year, bucket.quarter, bucket.count
            );
        }
        None => {
            let _ = writeln!(output, "- Busiest Quarter: N/A");
        }
    }

    output
}

/// One placement row per examination in the window, sorted so students who
/// must take EAP 6016 come first. The sort is stable, so input order is
/// preserved within each group.
pub fn placement_report(records: &[&ExaminationRecord]) -> String {
    let mut rows: Vec<(&str, EapRequirement)> = records
        .iter()
        .map(|record| (record.student.as_str(), record.eap_requirement))
        .collect();
    rows.sort_by_key(|(_, requirement)| match requirement {
        EapRequirement::Required => 0,
        EapRequirement::NotRequired => 1,
    });

    let mut output = String::new();
    let _ = writeln!(output, "# EAP Requirements Report");
    let _ = writeln!(output);

    if rows.is_empty() {
        let _ = writeln!(output, "No examinations in this window.");
        return output;
    }

    let _ = writeln!(output, "| Student | EAP Requirement |");
    let _ = writeln!(output, "| --- | --- |");
    for (student, requirement) in rows {
        let _ = writeln!(output, "| {student} | {requirement} |");
    }
    output
}
