use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use ulid::Ulid;

use turfslot::clock::SystemClock;
use turfslot::config::Config;
use turfslot::engine::Engine;
use turfslot::limits::DEFAULT_PAGE_SIZE;
use turfslot::model::{BookingFilter, BookingInterval, BookingStatus, OperatingWindow};
use turfslot::notify::NotifyHub;
use turfslot::time::{TimeOfDay, format_time_of_day};
use turfslot::{compactor, observability};

#[derive(Parser)]
#[command(name = "turfslot", version, about = "Turf slot booking ledger")]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered turfs
    Turfs,
    /// Register a turf
    RegisterTurf {
        #[arg(long)]
        name: Option<String>,
        /// Opening time, HH:MM
        #[arg(long)]
        opens: TimeOfDay,
        /// Closing time, HH:MM
        #[arg(long)]
        closes: TimeOfDay,
        /// Price per hour in minor currency units
        #[arg(long)]
        price: u64,
    },
    /// Change a turf's hours, price, name or active flag
    UpdateTurf {
        turf: Ulid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        opens: Option<TimeOfDay>,
        #[arg(long)]
        closes: Option<TimeOfDay>,
        #[arg(long)]
        price: Option<u64>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Hourly availability for a turf on a date
    Grid { turf: Ulid, date: NaiveDate },
    /// Contiguous free ranges for a turf on a date
    Free { turf: Ulid, date: NaiveDate },
    /// Book a slot
    Book {
        turf: Ulid,
        date: NaiveDate,
        start: String,
        end: String,
        #[arg(long)]
        booker: Option<String>,
    },
    /// Cancel a booking
    Cancel { booking: Ulid },
    /// List bookings
    Bookings {
        #[arg(long)]
        turf: Option<Ulid>,
        #[arg(long)]
        booker: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
    },
    /// Rewrite the journal with only the live state
    Compact,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Booked,
    Cancelled,
}

impl From<StatusArg> for BookingStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Booked => BookingStatus::Booked,
            StatusArg::Cancelled => BookingStatus::Cancelled,
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn print_booking(b: &BookingInterval) {
    println!(
        "{}  turf {}  {}  {}-{}  {:?}/{:?}  amount {}  {}",
        b.id,
        b.turf_id,
        b.date,
        format_time_of_day(b.span.start).unwrap_or_default(),
        format_time_of_day(b.span.end).unwrap_or_default(),
        b.status,
        b.payment,
        b.total_amount,
        b.booker.as_deref().unwrap_or("-"),
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = cli.config;
    observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let journal_path = config.journal_path();
    let engine = Engine::new(journal_path.clone(), Arc::new(NotifyHub::new()), Arc::new(SystemClock))?;
    debug!("journal: {}", journal_path.display());

    let json = cli.json;
    let mutated = match cli.command {
        Command::Turfs => {
            let now = engine.now();
            emit(json, &engine.list_turfs(), |turfs| {
                for t in turfs {
                    println!(
                        "{}  {}  {}-{}  {}/h  {}  {}",
                        t.id,
                        t.name.as_deref().unwrap_or("-"),
                        t.window.opening(),
                        t.window.closing(),
                        t.price_per_hour,
                        if t.active { "active" } else { "inactive" },
                        if t.is_open_at(now) { "open now" } else { "closed" },
                    );
                }
            })?;
            false
        }
        Command::RegisterTurf { name, opens, closes, price } => {
            let window = OperatingWindow::new(opens, closes)?;
            let turf = engine.register_turf(Ulid::new(), name, window, price).await?;
            emit(json, &turf, |t| println!("{}", t.id))?;
            true
        }
        Command::UpdateTurf { turf, name, opens, closes, price, active } => {
            let current = engine
                .get_turf(&turf)
                .ok_or(turfslot::engine::EngineError::NotFound(turf))?;
            let window = OperatingWindow::new(
                opens.unwrap_or(current.window.opening()),
                closes.unwrap_or(current.window.closing()),
            )?;
            let updated = engine
                .update_turf(
                    turf,
                    name.or(current.name),
                    window,
                    price.unwrap_or(current.price_per_hour),
                    active.unwrap_or(current.active),
                )
                .await?;
            emit(json, &updated, |t| println!("{} updated", t.id))?;
            true
        }
        Command::Grid { turf, date } => {
            let grid = engine.availability_grid(turf, date).await?;
            emit(json, &grid, |grid| {
                for slot in grid {
                    println!("{}-{}  {:?}", slot.start, slot.end, slot.classification);
                }
            })?;
            false
        }
        Command::Free { turf, date } => {
            let free = engine.free_windows(turf, date).await?;
            emit(json, &free, |free| {
                for span in free {
                    println!(
                        "{}-{}",
                        format_time_of_day(span.start).unwrap_or_default(),
                        format_time_of_day(span.end).unwrap_or_default(),
                    );
                }
            })?;
            false
        }
        Command::Book { turf, date, start, end, booker } => {
            let booking = engine.book_slot(Ulid::new(), turf, date, &start, &end, booker).await?;
            emit(json, &booking, print_booking)?;
            true
        }
        Command::Cancel { booking } => {
            let booking = engine.cancel_booking(booking).await?;
            emit(json, &booking, print_booking)?;
            true
        }
        Command::Bookings { turf, booker, status, from, to, page, limit } => {
            let filter = BookingFilter {
                turf_id: turf,
                booker,
                status: status.map(Into::into),
                from,
                to,
                page,
                limit,
            };
            let page = engine.list_bookings(&filter).await?;
            emit(json, &page, |p| {
                for b in &p.items {
                    print_booking(b);
                }
                println!("page {}/{} ({} total)", p.page, p.pages.max(1), p.total);
            })?;
            false
        }
        Command::Compact => {
            engine.compact_journal().await?;
            false
        }
    };

    if mutated && compactor::compact_if_needed(&engine, config.compact_threshold).await {
        info!("journal compacted");
    }
    Ok(())
}
