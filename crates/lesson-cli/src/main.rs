//! `lessons` CLI — run lesson-engine checks against JSON schedule snapshots.
//!
//! ## Usage
//!
//! ```sh
//! # Would this lesson be accepted? (request on stdin, response on stdout)
//! lessons check < check.json
//!
//! # Exit with status 2 when the candidate is rejected
//! lessons check -i check.json --fail-on-reject
//!
//! # Bookable starts on one teacher-local date
//! lessons slots -i slots.json -o slots.out.json
//!
//! # Notifications a confirmation would schedule
//! lessons reminders -i reminder.json
//!
//! # Price a 45-minute lesson at 60.00/h
//! lessons quote --rate 6000 --minutes 45 --human
//!
//! # Override engine defaults
//! lessons --config engine.json check -i check.json
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change verbosity.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lesson_engine::api::{self, CheckRequest, QuoteRequest, ReminderPreviewRequest, SlotsRequest};
use lesson_engine::{EngineConfig, Money};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{self, Read};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "lessons",
    version,
    about = "Lesson booking checks, slot listings and quotes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine config JSON file (product defaults if omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a candidate lesson can be booked
    Check {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Exit with status 2 if the candidate is rejected
        #[arg(long)]
        fail_on_reject: bool,
    },
    /// List bookable lesson starts on a teacher-local date
    Slots {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Preview the notifications a confirmation would schedule
    Reminders {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Price a lesson and break down the platform commission
    Quote {
        /// Hourly rate in minor units (e.g. 6000 for 60.00)
        #[arg(long)]
        rate: i64,
        /// Lesson length in minutes
        #[arg(long)]
        minutes: i64,
        /// Print formatted amounts instead of JSON
        #[arg(long)]
        human: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Check {
            input,
            output,
            fail_on_reject,
        } => {
            let request: CheckRequest = parse_request(input.as_deref(), "check request")?;
            let response =
                api::check(&config, &request).context("Failed to check booking request")?;
            if let Some(reason) = &response.reason {
                tracing::info!(reason = %reason, "candidate rejected");
            }
            write_json(output.as_deref(), &serde_json::to_value(&response)?)?;
            if fail_on_reject && !response.ok {
                process::exit(2);
            }
        }
        Commands::Slots { input, output } => {
            let request: SlotsRequest = parse_request(input.as_deref(), "slots request")?;
            let response = api::slots(&config, &request).context("Failed to list slots")?;
            tracing::info!(
                teacher_id = %response.teacher_id,
                count = response.slots.len(),
                "listed bookable slots"
            );
            write_json(output.as_deref(), &serde_json::to_value(&response)?)?;
        }
        Commands::Reminders { input, output } => {
            let request: ReminderPreviewRequest =
                parse_request(input.as_deref(), "reminder preview request")?;
            let preview = api::preview_reminders(&config, &request)
                .context("Failed to preview reminders")?;
            write_json(output.as_deref(), &serde_json::to_value(&preview)?)?;
        }
        Commands::Quote {
            rate,
            minutes,
            human,
        } => {
            let request = QuoteRequest {
                hourly_rate: Money::from_minor(rate),
                duration_minutes: minutes,
            };
            let quote = api::quote_lesson(&config, &request).context("Failed to quote lesson")?;
            if human {
                let currency = &config.currency;
                println!("Lesson:        {}", quote.lesson_amount.format(currency));
                println!("Platform fee:  {}", quote.platform_fee.format(currency));
                println!("Student pays:  {}", quote.student_pays.format(currency));
                println!("Teacher earns: {}", quote.teacher_earns.format(currency));
            } else {
                write_json(None, &serde_json::to_value(&quote)?)?;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lesson_engine=info,lessons=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            EngineConfig::from_json_str(&json)
                .with_context(|| format!("Invalid config file: {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn parse_request<T: DeserializeOwned>(path: Option<&str>, what: &str) -> Result<T> {
    let json = read_input(path)?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", what))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json(path: Option<&str>, value: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
