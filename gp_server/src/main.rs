//! Attendance server: geofence plus network or face verification.
//!
//! Wires the PostgreSQL store, the face scoring client and the admission
//! engine behind the HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use geo_presence::{
    admission::AdmissionPolicy,
    db::Database,
    face::{FaceScorer, HttpFaceClient},
    ledger::SystemClock,
};
use gp_server::{
    api::{self, AppState, FaceBackend},
    config::{Overrides, ServerConfig},
    logging, metrics,
};
use log::info;
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Run the geofenced attendance server

USAGE:
  gp_server [OPTIONS]

OPTIONS:
  --bind           IP:PORT   Server socket bind address    [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url         URL       Database connection string    [default: env DATABASE_URL or postgres://postgres@localhost/presence_db]
  --second-factor  FACTOR    network or face               [default: env SECOND_FACTOR or network]
  --face-url       URL       Face scoring service root     [default: env FACE_SERVICE_URL or http://127.0.0.1:8001]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  SERVER_BIND                Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL               PostgreSQL connection string
  SECOND_FACTOR              network | face
  FACE_MATCH_THRESHOLD       Cosine distance for a match (default 0.45)
  ATTENDANCE_UTC_OFFSET      Reference offset for calendar days, e.g. +08:00
  METRICS_BIND               Prometheus listener (disabled when unset)
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        second_factor: pargs.opt_value_from_str("--second-factor")?,
        face_service_url: pargs.opt_value_from_str("--face-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    // Catching signals for a graceful exit.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics on http://{}/metrics", addr);
    }

    info!("Starting attendance server at {}", config.bind);
    info!(
        "Second factor: {}, reference offset {}",
        config.admission.second_factor, config.admission.utc_offset
    );

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    let face_client = HttpFaceClient::new(
        config.admission.face_service_url.clone(),
        config.admission.face_config().timeout,
    )
    .context("Failed to build face service client")?;
    let scorer: Arc<dyn FaceScorer> =
        Arc::new(metrics::InstrumentedScorer::new(Arc::new(face_client)));
    info!("Face service at {}", config.admission.face_service_url);

    let state = AppState::new(
        Arc::new(db.store()),
        AdmissionPolicy {
            second_factor: config.admission.second_factor,
        },
        config.admission.utc_offset,
        Some(FaceBackend {
            scorer,
            config: config.admission.face_config(),
        }),
        Arc::new(SystemClock),
    );

    match state.admission.offices().list().await {
        Ok(offices) => {
            info!("Serving {} office(s):", offices.len());
            for office in offices {
                info!(
                    "  - {} (ID: {}) radius {}m, {} allowed range(s)",
                    office.name,
                    office.id,
                    office.radius_meters,
                    office.allowed_ranges.len()
                );
            }
        }
        Err(e) => {
            log::error!("Failed to list offices: {}", e);
        }
    }

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_rx))
    .await
    .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Resolves once the signal handler flips the flag
async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        log::warn!("Shutdown channel closed");
    }
}
