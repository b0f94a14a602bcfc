use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgGroup, Args, Parser, Subcommand};

mod analytics;
mod capture;
mod error;
mod models;
mod report;
mod scoring;
mod store;

#[derive(Parser)]
#[command(name = "oral-exam-tracker")]
#[command(about = "Oral examination scoring and placement analytics", long_about = None)]
struct Cli {
    /// Path to the JSON record snapshot
    #[arg(long, default_value = "exam_records.json")]
    data_file: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty record snapshot
    Init,
    /// Load realistic seed data
    Seed,
    /// Record a completed examination
    Record {
        #[arg(long)]
        examiner: String,
        #[arg(long)]
        student: String,
        /// Ratings for questions 1-3, e.g. --scores 3,2,3
        #[arg(long, value_delimiter = ',', num_args = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
        scores: Vec<u8>,
        /// Examiner note on question 1 (repeatable)
        #[arg(long)]
        note1: Vec<String>,
        /// Examiner note on question 2 (repeatable)
        #[arg(long)]
        note2: Vec<String>,
        /// Examiner note on question 3 (repeatable)
        #[arg(long)]
        note3: Vec<String>,
        /// Exam date-time (ISO-8601), defaults to now
        #[arg(long)]
        taken_at: Option<NaiveDateTime>,
    },
    /// Import examinations from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the analytics summary for a reporting window
    Summary {
        #[command(flatten)]
        period: PeriodArgs,
        /// Emit the summary as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Write the full assessment report as markdown
    Report {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "assessment_report.md")]
        out: PathBuf,
    },
    /// Write the EAP placement report as markdown
    Placements {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, default_value = "placement_report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("period")
        .args(["last_days", "start_year"])
        .multiple(false)
))]
struct PeriodArgs {
    /// Window ending now and spanning this many days back (default 365)
    #[arg(long)]
    last_days: Option<i64>,
    /// First year of a calendar-year window
    #[arg(long, requires = "end_year")]
    start_year: Option<i32>,
    /// Last year of a calendar-year window
    #[arg(long, requires = "start_year")]
    end_year: Option<i32>,
}

impl PeriodArgs {
    fn resolve(&self) -> anyhow::Result<(NaiveDateTime, NaiveDateTime)> {
        if let (Some(start_year), Some(end_year)) = (self.start_year, self.end_year) {
            if start_year > end_year {
                anyhow::bail!("start year must be less than or equal to end year");
            }
            let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
                .context("invalid start year")?
                .and_time(NaiveTime::MIN);
            let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
                .context("invalid end year")?
                .and_time(NaiveTime::MIN);
            return Ok((start, end));
        }
        let end = Local::now().naive_local();
        let start = end - Duration::days(self.last_days.unwrap_or(365).max(1));
        Ok((start, end))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            if cli.data_file.exists() {
                println!("Snapshot already exists at {}.", cli.data_file.display());
            } else {
                store::save(&cli.data_file, &[])?;
                println!("Empty snapshot created at {}.", cli.data_file.display());
            }
        }
        Commands::Seed => {
            let inserted = store::seed(&cli.data_file)?;
            println!("Seed data inserted ({inserted} records).");
        }
        Commands::Record {
            examiner,
            student,
            scores,
            note1,
            note2,
            note3,
            taken_at,
        } => {
            capture::validate_name("examiner", &examiner)?;
            capture::validate_name("student", &student)?;
            let ratings: [u8; 3] = scores
                .as_slice()
                .try_into()
                .context("exactly three scores are required")?;
            let taken_at = taken_at.unwrap_or_else(|| Local::now().naive_local());

            let mut records = store::load(&cli.data_file)?;
            let record = capture::build_record(
                &examiner,
                &student,
                taken_at,
                ratings,
                [note1, note2, note3],
                records.len(),
            )?;
            println!(
                "{} scored {:.2} ({}) - {}",
                record.student, record.total_score, record.band, record.eap_requirement
            );
            records.push(record);
            store::save(&cli.data_file, &records)?;
        }
        Commands::Import { csv } => {
            let appended = store::import_csv(&cli.data_file, &csv)?;
            println!("Appended {appended} examinations from {}.", csv.display());
        }
        Commands::Summary { period, json } => {
            let (start, end) = period.resolve()?;
            let records = store::load(&cli.data_file)?;
            let summary =
                analytics::summarize(&records, start, end, analytics::EmptyWindow::Allow)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", report::assessment_report(&summary, start, end));
            }
        }
        Commands::Report { period, out } => {
            let (start, end) = period.resolve()?;
            let records = store::load(&cli.data_file)?;
            let summary =
                analytics::summarize(&records, start, end, analytics::EmptyWindow::Reject)?;
            std::fs::write(&out, report::assessment_report(&summary, start, end))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Placements { period, out } => {
            let (start, end) = period.resolve()?;
            let records = store::load(&cli.data_file)?;
            let in_window = analytics::filter_by_window(&records, start, end);
            std::fs::write(&out, report::placement_report(&in_window))?;
            println!("Placement report written to {}.", out.display());
        }
    }

    Ok(())
}
