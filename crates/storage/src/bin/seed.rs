use std::fmt;

use exam_core::model::{
    Category, DEFAULT_FREE_QUESTIONS, Entitlement, Question, QuestionId, RewardRate, Test, TestId,
    UserId,
};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    category: String,
    test_id: TestId,
    questions: u32,
    user_id: Option<UserId>,
    free_questions: u32,
    subscribed: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidTestId { raw: String },
    InvalidQuestions { raw: String },
    InvalidUserId { raw: String },
    InvalidFreeQuestions { raw: String },
    InvalidDbUrl { raw: String },
    InvalidCategory { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidTestId { raw } => write!(f, "invalid --test-id value: {raw}"),
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
            ArgsError::InvalidUserId { raw } => write!(f, "invalid --user value: {raw}"),
            ArgsError::InvalidFreeQuestions { raw } => {
                write!(f, "invalid --free-questions value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCategory { raw } => write!(f, "invalid --category value: {raw}"),
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
        let mut db_url = std::env::var("EXAM_DB_URL")
            .unwrap_or_else(|_| "sqlite:exam.sqlite3?mode=rwc".into());
        let mut category = std::env::var("EXAM_CATEGORY").unwrap_or_else(|_| "networking".into());
        let mut test_id = std::env::var("EXAM_TEST_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| TestId::new(1), TestId::new);
        let mut questions = std::env::var("EXAM_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(4);
        let mut user_id = std::env::var("EXAM_USER_ID")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(UserId::new);
        let mut free_questions = std::env::var("EXAM_FREE_QUESTIONS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(DEFAULT_FREE_QUESTIONS);
        let mut subscribed = false;

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
                "--category" => {
                    let value = require_value(&mut args, "--category")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCategory { raw: value });
                    }
                    category = value;
                }
                "--test-id" => {
                    let value = require_value(&mut args, "--test-id")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTestId { raw: value.clone() })?;
                    test_id = TestId::new(parsed);
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    let parsed: UserId = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUserId { raw: value.clone() })?;
                    user_id = Some(parsed);
                }
                "--free-questions" => {
                    let value = require_value(&mut args, "--free-questions")?;
                    free_questions = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidFreeQuestions { raw: value.clone() })?;
                }
                "--subscribed" => subscribed = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            category,
            test_id,
            questions,
            user_id,
            free_questions,
            subscribed,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:exam.sqlite3?mode=rwc)");
    eprintln!("  --category <name>         Category of the seeded test (default: networking)");
    eprintln!("  --test-id <id>            Test id to upsert (default: 1)");
    eprintln!("  --questions <n>           Number of sample questions (default: 4)");
    eprintln!("  --user <id>               Also write an entitlement record for this user");
    eprintln!("  --free-questions <n>      Free allowance for --user (default: 20)");
    eprintln!("  --subscribed              Mark --user as subscribed");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!(
        "  EXAM_DB_URL, EXAM_CATEGORY, EXAM_TEST_ID, EXAM_QUESTIONS, EXAM_USER_ID, EXAM_FREE_QUESTIONS"
    );
}

const SAMPLES: [(&str, [&str; 4], usize); 4] = [
    (
        "Which layer of the OSI model handles routing?",
        ["Physical", "Data link", "Network", "Transport"],
        2,
    ),
    (
        "Which port does HTTPS use by default?",
        ["21", "80", "443", "8080"],
        2,
    ),
    (
        "Which protocol resolves names to addresses?",
        ["DNS", "DHCP", "ARP", "NTP"],
        0,
    ),
    (
        "Which address is the IPv4 loopback?",
        ["10.0.0.1", "127.0.0.1", "192.168.0.1", "0.0.0.0"],
        1,
    ),
];

fn sample_test(args: &Args) -> Result<Test, Box<dyn std::error::Error>> {
    let mut questions = Vec::with_capacity(args.questions as usize);
    for i in 0..args.questions {
        let (prompt, options, correct) = SAMPLES[(i as usize) % SAMPLES.len()];
        let question = Question::new(
            QuestionId::new(u64::from(i + 1)),
            format!("{prompt} (#{})", i + 1),
            options.iter().map(ToString::to_string).collect(),
            correct,
        )?
        .with_explanation(format!("The answer is {}.", options[correct]))
        .with_exam_tip("Eliminate the obviously wrong options first.");
        questions.push(question);
    }
    Ok(Test::new(
        args.test_id,
        Category::new(args.category.clone())?,
        questions,
        RewardRate::new(10, 1),
    )?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let test = sample_test(&args)?;
    storage.content.upsert_test(&test).await?;
    tracing::info!(
        category = %test.category(),
        test_id = %test.id(),
        questions = test.question_count(),
        "seeded test"
    );

    if let Some(user_id) = args.user_id {
        let entitlement = if args.subscribed {
            Entitlement::subscribed()
        } else {
            Entitlement::free(args.free_questions)
        };
        storage
            .entitlements
            .save_entitlement(user_id, &entitlement)
            .await?;
        tracing::info!(%user_id, subscribed = args.subscribed, "seeded entitlement");
    }

    println!(
        "Seeded test {} ({}) with {} questions into {}",
        args.test_id, args.category, args.questions, args.db_url
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
