use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use practice_core::adaptive::AnswerSignals;
use practice_core::model::{
    BlockId, Difficulty, LessonTemplateId, PracticeSettings, PracticeSettingsDraft, QuestionId,
};
use services::logging::{init_tracing, level_from_env};
use services::{Clock, InMemoryQuestionBank, SessionLoopService};

const DEMO_LESSON: &str = "demo-lesson";
const DEMO_BLOCKS: [&str; 3] = ["foundations", "practice", "review"];
const QUESTIONS_PER_DIFFICULTY: usize = 5;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSeed { raw: String },
    InvalidAccuracy { raw: String },
    InvalidQuestions { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidAccuracy { raw } => {
                write!(f, "invalid --accuracy value: {raw} (expected 0..=1)")
            }
            ArgsError::InvalidQuestions { raw } => write!(f, "invalid --questions value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- simulate [--settings <path>] [--seed <u64>] [--accuracy <0..=1>] [--questions <n>]");
    eprintln!("  cargo run -p app -- settings [--settings <path>]");
    eprintln!();
    eprintln!("Defaults for simulate:");
    eprintln!("  --seed 42");
    eprintln!("  --accuracy 0.8");
    eprintln!("  --questions 60");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PRACTICE_SETTINGS, PRACTICE_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Simulate,
    Settings,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "simulate" => Some(Self::Simulate),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

struct Args {
    settings_path: Option<PathBuf>,
    seed: u64,
    accuracy: f64,
    max_questions: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            settings_path: std::env::var("PRACTICE_SETTINGS").ok().map(PathBuf::from),
            seed: 42,
            accuracy: 0.8,
            max_questions: 60,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => {
                    parsed.settings_path = Some(PathBuf::from(require_value(args, "--settings")?));
                }
                "--seed" => {
                    let value = require_value(args, "--seed")?;
                    parsed.seed = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                }
                "--accuracy" => {
                    let value = require_value(args, "--accuracy")?;
                    parsed.accuracy = value
                        .parse::<f64>()
                        .ok()
                        .filter(|a| (0.0..=1.0).contains(a))
                        .ok_or_else(|| ArgsError::InvalidAccuracy { raw: value.clone() })?;
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    parsed.max_questions = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidQuestions { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<PracticeSettings, Box<dyn std::error::Error>> {
    let draft = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<PracticeSettingsDraft>(&raw)?
        }
        None => PracticeSettingsDraft::new(),
    };
    Ok(draft.validate()?)
}

fn demo_bank(lesson: &LessonTemplateId) -> Result<InMemoryQuestionBank, Box<dyn std::error::Error>> {
    let bank = InMemoryQuestionBank::new();
    for block in DEMO_BLOCKS {
        let block_id = BlockId::new(block)?;
        bank.add_block(lesson, &block_id, block.to_uppercase())?;
        for difficulty in Difficulty::ALL {
            for i in 0..QUESTIONS_PER_DIFFICULTY {
                let question = QuestionId::new(format!("{block}-{difficulty}-{i}"))?;
                bank.add_question(lesson, &block_id, difficulty, question)?;
            }
        }
    }
    Ok(bank)
}

/// Drive a scripted learner through the demo lesson.
async fn simulate(args: &Args, settings: PracticeSettings) -> Result<(), Box<dyn std::error::Error>> {
    let lesson = LessonTemplateId::new(DEMO_LESSON)?;
    let bank = demo_bank(&lesson)?;
    let session_loop =
        SessionLoopService::new(Clock::default(), settings, Arc::new(bank)).with_seed(args.seed);
    let mut learner = StdRng::seed_from_u64(args.seed.wrapping_add(1));

    let mut session = session_loop.start_session(&lesson, None, None).await?;
    let mut answered = 0;
    while !session.is_complete() && answered < args.max_questions {
        let served = session_loop.next_question(&mut session).await?;
        let is_correct = learner.random_bool(args.accuracy);
        let signals = AnswerSignals::new(
            learner.random_range(5.0..60.0),
            u32::from(learner.random_bool(0.2)),
        );
        let outcome = session_loop.answer_current(&mut session, is_correct, &signals)?;
        answered += 1;

        tracing::info!(
            question = answered,
            question_id = %served.question_id,
            difficulty = %outcome.difficulty,
            is_correct,
            next_difficulty = %outcome.next_difficulty,
            block_index = outcome.new_block_index,
            "answered"
        );
    }

    println!("{}", serde_json::to_string_pretty(&session.progress())?);
    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Simulate,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Simulate,
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

    init_tracing(&level_from_env());
    let settings = load_settings(parsed.settings_path.as_ref())?;

    match cmd {
        Command::Simulate => simulate(&parsed, settings).await,
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
