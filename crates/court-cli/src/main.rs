//! `courtctl` - operate the court booking engine against a JSON store snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Effective hours of court 1 on a date
//! courtctl --store store.json hours --court 1 --date 2024-06-03
//!
//! # Book a single slot
//! courtctl --store store.json book --court 1 --user 20 \
//!     --start 2024-06-03T01:00:00Z --end 2024-06-03T03:00:00Z
//!
//! # Mondays and Wednesdays 08:00-10:00 for four weeks
//! courtctl --store store.json book-fixed --court 1 --user 20 \
//!     --anchor 2024-06-03 --days 1,3 --start-hour 8 --duration 2 --weeks 4
//!
//! # Monthly statistics, for the court's owner
//! courtctl --store store.json stats --court 1 --user 10 --role owner --year 2024 --month 6
//!
//! # Raise the hourly price; existing bookings keep theirs
//! courtctl --store store.json update-court --court 1 --user 10 --role owner --price 120000
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr. Engine rejections
//! print `error[<kind>]: <message>` and exit with status 2.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use court_engine::hours::{self, weekday_index};
use court_engine::court::hhmm;
use court_engine::{
    Actor, BookingError, BookingScheduler, BookingStatus, CourtAdmin, CourtPatch, CourtQuery,
    CourtStore, CreateBooking, CreateFixedBooking, MemoryStore, RecurrenceSpec, Role,
    StatisticsEngine,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{CliConfig, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "courtctl", version, about = "Court booking engine operator CLI")]
struct Cli {
    /// Configuration file (defaults to ./courtctl.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON store snapshot (overrides store.path from the configuration)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ActorArgs {
    /// Acting user id
    #[arg(long)]
    user: u64,
    /// Acting role: user, owner or admin
    #[arg(long, default_value = "user")]
    role: Role,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        Actor::new(self.user, self.role)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show a court's effective business hours on a local date
    Hours {
        #[arg(long)]
        court: u64,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Book a single slot
    Book {
        #[arg(long)]
        court: u64,
        #[command(flatten)]
        actor: ActorArgs,
        /// RFC 3339 start instant
        #[arg(long)]
        start: String,
        /// RFC 3339 end instant
        #[arg(long)]
        end: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Book a weekly recurring slot, all occurrences or none
    BookFixed {
        #[arg(long)]
        court: u64,
        #[command(flatten)]
        actor: ActorArgs,
        /// First local date of the pattern
        #[arg(long)]
        anchor: NaiveDate,
        /// Comma-separated weekdays, Sunday = 0
        #[arg(long, value_delimiter = ',', required = true)]
        days: Vec<u8>,
        #[arg(long)]
        start_hour: u32,
        /// Duration in hours
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        weeks: u32,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel a booking
    Cancel {
        #[arg(long)]
        booking: u64,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// List bookings visible to the actor, newest first
    Bookings {
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        status: Option<BookingStatus>,
    },
    /// Show one booking
    Detail {
        #[arg(long)]
        booking: u64,
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Monthly occupancy statistics (defaults to the court's current month)
    Stats {
        #[arg(long)]
        court: u64,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
    },
    /// List courts visible to the actor, newest first
    Courts {
        #[command(flatten)]
        actor: ActorArgs,
        /// Case-insensitive part of the location
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Change a court's settings; omitted options stay as they are
    UpdateCourt {
        #[arg(long)]
        court: u64,
        #[command(flatten)]
        actor: ActorArgs,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        /// Default opening time, HH:MM
        #[arg(long, value_parser = parse_hhmm)]
        open: Option<u16>,
        /// Default closing time, HH:MM (24:00 for midnight)
        #[arg(long, value_parser = parse_hhmm)]
        close: Option<u16>,
        /// Price per hour
        #[arg(long)]
        price: Option<Decimal>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Bookings on a court within an instant range
    Schedule {
        #[arg(long)]
        court: u64,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[derive(Serialize)]
struct HoursReport {
    court_id: u64,
    date: NaiveDate,
    weekday: u8,
    hours: hours::DayHours,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<BookingError>() {
            Some(rejection) => {
                eprintln!("error[{}]: {}", rejection.kind(), rejection);
                ExitCode::from(2)
            }
            None => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging);

    let store_path = cli.store.unwrap_or(config.store.path);
    let store = Arc::new(load_store(&store_path)?);
    let scheduler = BookingScheduler::new(store.clone(), store.clone()).with_limits(config.engine);

    match cli.command {
        Commands::Hours { court, date } => {
            let found = store.find_by_id(court)?.ok_or(BookingError::CourtNotFound(court))?;
            print_json(&HoursReport {
                court_id: court,
                date,
                weekday: weekday_index(date),
                hours: hours::resolve(&found, date)?,
            })?;
        }
        Commands::Book {
            court,
            actor,
            start,
            end,
            notes,
        } => {
            let booking = scheduler.create_once(
                &actor.actor(),
                CreateBooking {
                    court_id: court,
                    start_time: start,
                    end_time: end,
                    notes,
                },
            )?;
            save_store(&store, &store_path)?;
            print_json(&booking)?;
        }
        Commands::BookFixed {
            court,
            actor,
            anchor,
            days,
            start_hour,
            duration,
            weeks,
            notes,
        } => {
            let outcome = scheduler.create_fixed(
                &actor.actor(),
                CreateFixedBooking {
                    court_id: court,
                    recurrence: RecurrenceSpec {
                        anchor_date: anchor,
                        weekdays: days,
                        start_hour,
                        duration_hours: duration,
                        week_count: weeks,
                    },
                    notes,
                },
            )?;
            save_store(&store, &store_path)?;
            print_json(&outcome)?;
        }
        Commands::Cancel { booking, actor } => {
            let cancelled = scheduler.cancel(&actor.actor(), booking)?;
            save_store(&store, &store_path)?;
            print_json(&cancelled)?;
        }
        Commands::Bookings { actor, status } => {
            print_json(&scheduler.get_my_bookings(&actor.actor(), status)?)?;
        }
        Commands::Detail { booking, actor } => {
            print_json(&scheduler.get_detail(&actor.actor(), booking)?)?;
        }
        Commands::Stats {
            court,
            actor,
            year,
            month,
        } => {
            let engine = StatisticsEngine::new(store.clone(), store.clone());
            print_json(&engine.compute_monthly(&actor.actor(), court, year, month)?)?;
        }
        Commands::Courts {
            actor,
            location,
            page,
            limit,
        } => {
            let admin = CourtAdmin::new(store.clone(), store.clone());
            let query = CourtQuery {
                location,
                page,
                limit,
            };
            print_json(&admin.list_courts(&actor.actor(), &query)?)?;
        }
        Commands::UpdateCourt {
            court,
            actor,
            name,
            timezone,
            open,
            close,
            price,
            location,
            description,
        } => {
            let admin = CourtAdmin::new(store.clone(), store.clone());
            let patch = CourtPatch {
                name,
                timezone,
                default_open_time: open,
                default_close_time: close,
                price_per_hour: price,
                location,
                description,
            };
            let updated = admin.update_court(&actor.actor(), court, patch)?;
            save_store(&store, &store_path)?;
            print_json(&updated)?;
        }
        Commands::Schedule { court, from, to } => {
            let admin = CourtAdmin::new(store.clone(), store.clone());
            print_json(&admin.court_schedule(court, &from, &to)?)?;
        }
    }

    Ok(())
}

fn parse_hhmm(raw: &str) -> std::result::Result<u16, String> {
    hhmm::parse(raw).ok_or_else(|| format!("expected HH:MM, got {raw:?}"))
}

/// Logs go to stderr so stdout carries only results. `RUST_LOG` wins over
/// the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn load_store(path: &Path) -> Result<MemoryStore> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read store: {}", path.display()))?;
    let store = MemoryStore::from_json(&json)
        .with_context(|| format!("Failed to parse store: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "store loaded");
    Ok(store)
}

fn save_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = store.to_json()?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write store: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "store saved");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
