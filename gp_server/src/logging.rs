//! Structured logging configuration.
//!
//! Library crates log through the `log` facade; those records are bridged
//! into the same subscriber so everything shares one format and filter.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// - Configurable log levels via `RUST_LOG`
/// - `log` records from `geo_presence` forwarded to tracing
///
/// # Example
///
/// ```no_run
/// use gp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // `init` also installs the `log` -> tracing bridge
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Example
///
/// ```
/// use gp_server::logging::log_security_event;
///
/// log_security_event(
///     "admin_denied",
///     Some(12),
///     Some("192.168.1.1"),
///     "Non-admin user requested an admin route"
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    user_id: Option<i64>,
    ip_address: Option<&str>,
    message: &str,
) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        ip_address = ip_address,
        "SECURITY: {}",
        message
    );
}

/// Log an admission decision
pub fn log_admission(
    user_id: i64,
    office_id: Option<i64>,
    kind: &str,
    outcome: &str,
    distance_m: Option<f64>,
) {
    tracing::info!(
        user_id = user_id,
        office_id = office_id,
        kind = kind,
        outcome = outcome,
        distance_m = distance_m,
        "Attendance attempt"
    );
}

/// Log API request/response
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow request"
        );
    } else {
        tracing::debug!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}
