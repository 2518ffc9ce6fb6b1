use std::fmt;

use assess_core::model::{Actor, ActorId, ActorRole, AssessmentId};
use services::{AppServices, Clock};
use storage::fixtures::sample_assessment;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidAssessmentId { raw: String },
    InvalidActorId { raw: String },
    InvalidRole { raw: String },
    InvalidLimit { raw: String },
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
            ArgsError::InvalidActorId { raw } => write!(f, "invalid --actor-id value: {raw}"),
            ArgsError::InvalidRole { raw } => write!(f, "invalid --role value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Take,
    Seed,
    Results,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "seed" => Some(Self::Seed),
            "results" => Some(Self::Results),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    assessment_id: AssessmentId,
    actor_id: ActorId,
    actor_name: String,
    actor_role: ActorRole,
    limit: u32,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- take    [--db <url>] [--assessment-id <id>] [--actor-id <id>] [--name <text>] [--role <role>]");
    eprintln!("  cargo run -p app -- seed    [--db <url>] [--assessment-id <id>]");
    eprintln!("  cargo run -p app -- results [--db <url>] [--assessment-id <id>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --assessment-id 1");
    eprintln!("  --actor-id 1 --name student --role student (student|instructor|admin)");
    eprintln!("  --limit 20");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ASSESS_DB_URL, ASSESS_ASSESSMENT_ID, ASSESS_ACTOR_ID, ASSESS_ACTOR_NAME,");
    eprintln!("  ASSESS_ACTOR_ROLE");
    eprintln!("  ASSESS_LOG (tracing filter, default: info)");
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("ASSESS_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:dev.sqlite3".into()), normalize_sqlite_url);
        let mut assessment_id = std::env::var("ASSESS_ASSESSMENT_ID")
            .ok()
            .and_then(|value| value.parse::<AssessmentId>().ok())
            .unwrap_or_else(|| AssessmentId::new(1));
        let mut actor_id = std::env::var("ASSESS_ACTOR_ID")
            .ok()
            .and_then(|value| value.parse::<ActorId>().ok())
            .unwrap_or_else(|| ActorId::new(1));
        let mut actor_name =
            std::env::var("ASSESS_ACTOR_NAME").unwrap_or_else(|_| "student".into());
        let mut actor_role = std::env::var("ASSESS_ACTOR_ROLE")
            .ok()
            .and_then(|value| ActorRole::parse(&value))
            .unwrap_or(ActorRole::Student);
        let mut limit = 20;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--assessment-id" => {
                    let value = require_value(args, "--assessment-id")?;
                    assessment_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidAssessmentId { raw: value.clone() })?;
                }
                "--actor-id" => {
                    let value = require_value(args, "--actor-id")?;
                    actor_id = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidActorId { raw: value.clone() })?;
                }
                "--name" => {
                    actor_name = require_value(args, "--name")?;
                }
                "--role" => {
                    let value = require_value(args, "--role")?;
                    actor_role = ActorRole::parse(&value)
                        .ok_or_else(|| ArgsError::InvalidRole { raw: value.clone() })?;
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    limit = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
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
            actor_id,
            actor_name,
            actor_role,
            limit,
        })
    }

    fn actor(&self) -> Actor {
        Actor::new(self.actor_id, self.actor_name.clone(), self.actor_role)
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ASSESS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn take(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let actor = args.actor();
    let attempts = services.attempts();
    let session = attempts.start_attempt(args.assessment_id, &actor).await?;
    terminal::run_attempt(&attempts, &actor, session).await
}

async fn seed(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let assessment = sample_assessment(args.assessment_id, "Sample Assessment", 1, false)?;
    services
        .storage()
        .assessments
        .upsert_assessment(&assessment)
        .await?;
    println!(
        "Seeded assessment {} ({} questions, {} min) into {}",
        assessment.id(),
        assessment.question_count(),
        assessment.duration_minutes(),
        args.db_url
    );
    Ok(())
}

async fn results(services: &AppServices, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let items = services
        .submissions()
        .recent_for_assessment(args.assessment_id, args.limit)
        .await?;
    if items.is_empty() {
        println!("no submissions for assessment {}", args.assessment_id);
        return Ok(());
    }

    for item in items {
        println!(
            "#{:<5} {:<16} {:<10} {}  {}  {}/{} answered  {}",
            item.id,
            item.actor_name,
            item.actor_role.as_str(),
            item.ended_at.format("%Y-%m-%d %H:%M:%S"),
            terminal::format_clock(item.elapsed_seconds),
            item.answered,
            item.total,
            item.trigger.as_str()
        );
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means take.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Take,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Take,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();

    // Open + migrate SQLite in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Take => take(&services, &parsed).await,
        Command::Seed => seed(&services, &parsed).await,
        Command::Results => results(&services, &parsed).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/dev.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/dev.sqlite3"));
    }

    #[test]
    fn memory_and_absolute_urls_pass_through() {
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/a.sqlite3".into()),
            "sqlite:///tmp/a.sqlite3"
        );
    }

    #[test]
    fn parses_flags() {
        let mut argv = [
            "--assessment-id",
            "7",
            "--actor-id",
            "3",
            "--name",
            "Gil",
            "--limit",
            "5",
            "--role",
            "Instructor",
        ]
        .into_iter()
        .map(String::from);
        let args = Args::parse(&mut argv).unwrap();
        assert_eq!(args.assessment_id, AssessmentId::new(7));
        assert_eq!(args.actor().id, ActorId::new(3));
        assert_eq!(args.actor().display_name, "Gil");
        assert_eq!(args.limit, 5);
        assert_eq!(args.actor().role, ActorRole::Instructor);
    }

    #[test]
    fn rejects_bad_values() {
        let mut argv = ["--limit", "-1"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut argv),
            Err(ArgsError::InvalidLimit { .. })
        ));

        let mut argv = ["--role", "guest"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut argv),
            Err(ArgsError::InvalidRole { .. })
        ));

        let mut argv = ["--actor-id"].into_iter().map(String::from);
        assert!(matches!(
            Args::parse(&mut argv),
            Err(ArgsError::MissingValue { flag: "--actor-id" })
        ));
    }
}
