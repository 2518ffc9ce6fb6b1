use std::fmt;

use assess_core::model::AssessmentId;
use storage::fixtures::sample_assessment;
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    assessment_id: AssessmentId,
    title: String,
    duration_minutes: u32,
    with_practical: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAssessmentId { raw: String },
    InvalidDuration { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidAssessmentId { raw } => {
                write!(f, "invalid --assessment-id value: {raw}")
            }
            ArgsError::InvalidDuration { raw } => write!(f, "invalid --minutes value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("ASSESS_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut assessment_id = std::env::var("ASSESS_ASSESSMENT_ID")
            .ok()
            .and_then(|value| value.parse::<AssessmentId>().ok())
            .unwrap_or_else(|| AssessmentId::new(1));
        let mut title =
            std::env::var("ASSESS_TITLE").unwrap_or_else(|_| "Sample Assessment".into());
        let mut duration_minutes = std::env::var("ASSESS_MINUTES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(1);
        let mut with_practical = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--assessment-id" => {
                    let value = require_value(&mut args, "--assessment-id")?;
                    assessment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAssessmentId { raw: value.clone() })?;
                }
                "--title" => {
                    title = require_value(&mut args, "--title")?;
                }
                "--minutes" => {
                    let value = require_value(&mut args, "--minutes")?;
                    duration_minutes = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidDuration { raw: value.clone() })?;
                }
                "--with-practical" => with_practical = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            assessment_id,
            title,
            duration_minutes,
            with_practical,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --assessment-id <id>      Assessment id to upsert (default: 1)");
    eprintln!("  --title <text>            Assessment title (default: Sample Assessment)");
    eprintln!("  --minutes <n>             Allotted duration in minutes (default: 1)");
    eprintln!("  --with-practical          Append a practical question");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  ASSESS_DB_URL, ASSESS_ASSESSMENT_ID, ASSESS_TITLE, ASSESS_MINUTES");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let assessment = sample_assessment(
        args.assessment_id,
        args.title.clone(),
        args.duration_minutes,
        args.with_practical,
    )?;
    storage.assessments.upsert_assessment(&assessment).await?;

    println!(
        "Seeded assessment {} ({} questions, {} min) into {}",
        assessment.id(),
        assessment.question_count(),
        assessment.duration_minutes(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
