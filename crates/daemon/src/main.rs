use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use studionavi_daemon::{build_router, db, AppState};
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "StudioNavi studio API", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "STUDIONAVI_BIND", default_value = "127.0.0.1:3030")]
    bind: SocketAddr,

    /// SQLite database path (default: ~/.studionavi/studios.db)
    #[arg(long, env = "STUDIONAVI_DB")]
    db: Option<PathBuf>,

    /// Insert demo studios with open slots for today when the database is empty
    #[arg(long)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let db_path = args.db.unwrap_or_else(db::default_db_path);
    info!("Using database: {}", db_path.display());
    let conn = db::init_db(&db_path).with_context(|| format!("failed to open {}", db_path.display()))?;

    let studio_count = db::count_studios(&conn)?;
    if args.seed_demo {
        if studio_count == 0 {
            let today = Local::now().date_naive();
            let ids = db::seed_demo(&conn, today)?;
            info!(studios = ids.len(), date = %today, "seeded demo studios");
        } else {
            warn!(studios = studio_count, "database not empty, skipping demo seed");
        }
    } else {
        info!(studios = studio_count, "loaded studio directory");
    }

    let app = build_router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!("Listening on {}", args.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
