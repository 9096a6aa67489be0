//! `slots` CLI — query availability and book appointments from the command line.
//!
//! The datastore is a JSON snapshot file (businesses, services, staff, bookings).
//! Reads print JSON to stdout; `book` and `cancel` write the snapshot back.
//! Writers hold an exclusive lock on `<data>.lock` from load through save, so
//! concurrent invocations against one file commit one after another.
//!
//! ## Usage
//!
//! ```sh
//! # Open haircut windows for a business day
//! slots --data shop.json availability --business 1 --service 10 --date 2026-03-16
//!
//! # Same, but only against one staff member's calendar
//! slots --data shop.json availability --business 1 --service 10 --date 2026-03-16 --staff 100
//!
//! # Book a slot (fails with "Slot no longer available" on overlap)
//! slots --data shop.json book --business 1 --service 10 --staff 100 \
//!   --date 2026-03-16 --start 09:30 --client "Pedro" --phone 123456789
//!
//! # The day's agenda
//! slots --data shop.json agenda --business 1 --date 2026-03-16
//!
//! # Cancel a booking
//! slots --data shop.json cancel --booking 3
//! ```
//!
//! `SLOTS_DATA` and `SLOTS_LOG` may be used instead of `--data` and `--log`.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_engine::interval::parse_time;
use slot_engine::{BookingRequest, InMemoryStore, ScheduleQuery, Snapshot};
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Appointment availability and booking CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Snapshot file holding businesses, services, staff and bookings
    #[arg(long, global = true, env = "SLOTS_DATA", default_value = "slots.json")]
    data: PathBuf,

    /// Log filter written to stderr (e.g. "info", "slot_engine=debug")
    #[arg(long, global = true, env = "SLOTS_LOG", default_value = "warn")]
    log: String,
}

#[derive(Subcommand)]
enum Commands {
    /// List open windows for a service on a date
    Availability {
        #[arg(long)]
        business: u32,
        #[arg(long)]
        service: u32,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Only consider this staff member's bookings
        #[arg(long)]
        staff: Option<u32>,
    },
    /// Book a service with a staff member
    Book {
        #[arg(long)]
        business: u32,
        #[arg(long)]
        service: u32,
        #[arg(long)]
        staff: u32,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Start time as HH:MM
        #[arg(long, value_parser = parse_time)]
        start: NaiveTime,
        /// Client name
        #[arg(long)]
        client: String,
        /// Client phone number
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show every booking of a business on a date
    Agenda {
        #[arg(long)]
        business: u32,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Cancel a booking by id
    Cancel {
        #[arg(long)]
        booking: u64,
    },
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
struct CliConfig {
    data: PathBuf,
    log_filter: String,
}

impl From<&Cli> for CliConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            data: cli.data.clone(),
            log_filter: cli.log.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::from(&cli);
    init_logging(&config.log_filter)?;

    match cli.command {
        Commands::Availability {
            business,
            service,
            date,
            staff,
        } => {
            let store = load_store(&config.data)?;
            let service = slot_engine::offered_service(&store, business, service)
                .context("Failed to compute availability")?;
            let query = ScheduleQuery::for_service(&service, date);
            let windows = match staff {
                Some(staff_id) => slot_engine::staff_availability(&store, &query, staff_id),
                None => slot_engine::availability(&store, &query),
            }
            .context("Failed to compute availability")?;
            print_json(&windows)?;
        }
        Commands::Book {
            business,
            service,
            staff,
            date,
            start,
            client,
            phone,
        } => {
            let _lock = lock_snapshot(&config.data)?;
            let store = load_store(&config.data)?;
            let request = BookingRequest {
                business_id: business,
                service_id: service,
                staff_id: staff,
                date,
                start,
                client_name: client,
                client_phone: phone,
            };
            let booked = slot_engine::book(&store, request).context("Booking rejected")?;
            save_store(&config.data, &store)?;
            print_json(&booked)?;
        }
        Commands::Agenda { business, date } => {
            let store = load_store(&config.data)?;
            let bookings =
                slot_engine::agenda(&store, business, date).context("Failed to load agenda")?;
            print_json(&bookings)?;
        }
        Commands::Cancel { booking } => {
            let _lock = lock_snapshot(&config.data)?;
            let store = load_store(&config.data)?;
            let cancelled = store.cancel(booking).context("Cancellation failed")?;
            save_store(&config.data, &store)?;
            print_json(&cancelled)?;
        }
    }

    Ok(())
}

fn init_logging(filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("Invalid log filter: {}", filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

/// Block until this process holds the writer lock for `path`.
///
/// The lock lives on a sibling file because saving replaces the data file.
/// It is released when the returned handle is dropped.
fn lock_snapshot(path: &Path) -> Result<File> {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    let lock_path = PathBuf::from(name);

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;
    file.lock()
        .with_context(|| format!("Failed to lock file: {}", lock_path.display()))?;
    debug!(lock = %lock_path.display(), "snapshot locked");
    Ok(file)
}

fn load_store(path: &Path) -> Result<InMemoryStore> {
    debug!(data = %path.display(), "loading snapshot");
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid snapshot: {}", path.display()))?;
    InMemoryStore::from_snapshot(snapshot)
        .with_context(|| format!("Inconsistent snapshot: {}", path.display()))
}

/// Writes a uniquely named temp file next to `path`, then renames it over
/// `path`. Readers never see a partial snapshot.
fn save_store(path: &Path, store: &InMemoryStore) -> Result<()> {
    let snapshot = store.snapshot()?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, &snapshot)
        .with_context(|| format!("Failed to write file: {}", tmp.path().display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace file: {}", path.display()))?;
    debug!(path = %path.display(), bookings = snapshot.bookings.len(), "snapshot saved");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
