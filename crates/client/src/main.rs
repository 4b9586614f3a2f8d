use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use studionavi_client::{
    AvailabilityAggregator, CardStatus, ClientConfig, ConfigOverrides, HttpStudioApi, SearchSession, StudioCard,
};
use studionavi_common::{validate_selection, SearchWindow, Studio, StudioId};
use tracing::warn;

#[derive(Parser)]
#[command(author, version, about = "Compare rehearsal studio availability", long_about = None)]
struct Cli {
    /// Base URL of the studio API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Studios requested concurrently
    #[arg(long, global = true)]
    batch_size: Option<usize>,

    /// Pause between batches in milliseconds
    #[arg(long, global = true)]
    batch_delay_ms: Option<u64>,

    /// Config file (default: <config dir>/studionavi/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search studios by name or address
    Search { query: String },
    /// Show one studio
    Studio { id: StudioId },
    /// Check free time at up to five studios
    Availability {
        /// Studio id, repeat for each studio
        #[arg(long = "studio", required = true)]
        studios: Vec<StudioId>,

        /// Date as YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Earliest start, HH:MM
        #[arg(long)]
        start: String,

        /// Latest end, HH:MM (00:00 means midnight at the end of the day)
        #[arg(long)]
        end: String,

        /// Hours needed
        #[arg(long)]
        duration: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        api_url: cli.api_url,
        timeout_secs: cli.timeout_secs,
        batch_size: cli.batch_size,
        batch_delay_ms: cli.batch_delay_ms,
        config_path: cli.config,
    };
    let config = ClientConfig::resolve(&overrides).context("invalid configuration")?;
    let api = Arc::new(HttpStudioApi::new(&config)?);

    match cli.command {
        Commands::Search { query } => match api.search_studios(&query).await {
            Ok(studios) if studios.is_empty() => println!("No studios match '{}'", query),
            Ok(studios) => {
                for studio in studios {
                    print_studio(&studio);
                }
            }
            Err(e) => {
                eprintln!("Search failed: {}", e.user_message());
                std::process::exit(1);
            }
        },
        Commands::Studio { id } => match api.get_studio(id).await {
            Ok(studio) => print_studio(&studio),
            Err(e) => {
                eprintln!("Failed to load studio {}: {}", id, e.user_message());
                std::process::exit(1);
            }
        },
        Commands::Availability {
            studios,
            date,
            start,
            end,
            duration,
        } => {
            let mut ids = Vec::with_capacity(studios.len());
            for id in studios {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            validate_selection(ids.len())?;
            let date = date.unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
            let window = SearchWindow::parse(&date, &start, &end, duration)?;
            window.validate()?;

            let mut selected = Vec::with_capacity(ids.len());
            for id in ids {
                match api.get_studio(id).await {
                    Ok(studio) => selected.push(studio),
                    Err(e) => {
                        warn!(studio_id = id, "studio lookup failed: {}", e);
                        selected.push(Studio::placeholder(id));
                    }
                }
            }

            let aggregator = AvailabilityAggregator::new(api, config.batch);
            let mut session = SearchSession::new();
            let mut run = aggregator.start(selected.clone(), window);
            session.begin(run.id(), selected);

            eprintln!(
                "Checking {} studio(s) on {} {}-{} for {}h...",
                run.total(),
                window.date,
                window.start_time,
                window.end_time,
                window.duration_hours
            );
            loop {
                tokio::select! {
                    event = run.next_event() => {
                        let Some(event) = event else { break };
                        let name = event.outcome.studio_name().to_string();
                        let percent = event.progress.percent();
                        if session.apply(event) {
                            eprintln!("[{:>3}%] {}", percent, name);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        run.cancel();
                        eprintln!("Cancelled");
                        break;
                    }
                }
            }

            for card in session.cards() {
                print_card(&card);
            }
            if let Some(banner) = session.failure_banner() {
                println!();
                println!("{}", banner);
            }
        }
    }

    Ok(())
}

fn print_studio(studio: &Studio) {
    println!("#{} {}", studio.id, studio.name);
    if !studio.address.is_empty() {
        println!("    {}", studio.address);
    }
    if !studio.hours.is_empty() {
        println!("    営業時間: {}", studio.hours);
    }
    if !studio.self_booking_start.is_empty() {
        println!("    予約開始: {}", studio.self_booking_start);
    }
    if !studio.has_availability {
        println!("    (空き状況確認には未対応)");
    }
}

fn print_card(card: &StudioCard) {
    println!("{} [{}]", card.studio_name, card.status.label());
    match &card.status {
        CardStatus::Available(groups) => {
            for group in groups {
                println!("    {}: {}", group.room_name, group.time_ranges.join(", "));
            }
        }
        CardStatus::FetchFailed { message, code } => println!("    {} ({})", message, code),
        CardStatus::Pending | CardStatus::Full => {}
    }
}
