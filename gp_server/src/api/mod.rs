//! HTTP API for the attendance server.
//!
//! # Modules
//!
//! - [`attendance`]: Check-in, check-out and the caller's day
//! - [`face`]: Face enrollment and status
//! - [`admin`]: Attendance reports and office settings
//! - [`middleware`]: Identity and admin gates
//! - [`request_context`]: Request ID and client address
//! - [`error`]: JSON error bodies
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Store and scoring service health
//! - `GET /offices` - Office list
//!
//! ## Requires `x-user-id`
//! - `POST /checkin`, `POST /checkout` - Attendance attempts
//! - `GET /attendance/today` - Caller's records and session state
//! - `GET /face/status`, `POST /face/enroll` - Face templates
//!
//! ## Requires the admin role
//! - `GET /admin/attendance?date=&officeId=` - Records for a day
//! - `PATCH /admin/offices/{id}` - Radius and allow-list
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod admin;
pub mod attendance;
pub mod error;
pub mod face;
pub mod middleware;
pub mod request_context;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use chrono::FixedOffset;
use geo_presence::{
    admission::{AdmissionController, AdmissionPolicy, SecondFactor},
    db::Store,
    face::{FaceConfig, FaceManager, FaceScorer},
    ledger::{AttendanceLedger, Clock},
    office::{Office, OfficeDirectory},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use error::ApiError;

/// Scoring service wiring
pub struct FaceBackend {
    pub scorer: Arc<dyn FaceScorer>,
    pub config: FaceConfig,
}

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub admission: AdmissionController,
    pub store: Arc<dyn Store>,
}

impl AppState {
    /// Wire the engine against one store.
    ///
    /// # Arguments
    ///
    /// - `store`: Backing store for offices, users, templates and records
    /// - `policy`: Second factor selection
    /// - `zone`: Reference offset deciding calendar days
    /// - `face`: Scoring service; face endpoints answer 503 without it
    /// - `clock`: Time source for record timestamps
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        policy: AdmissionPolicy,
        zone: FixedOffset,
        face: Option<FaceBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let offices = OfficeDirectory::new(store.clone());
        let ledger = Arc::new(AttendanceLedger::new(store.clone(), zone));

        let mut admission = AdmissionController::new(offices, ledger, policy, clock);
        if let Some(face) = face {
            admission =
                admission.with_face(FaceManager::new(face.scorer, store.clone(), face.config));
        }

        Self { admission, store }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use gp_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/offices", get(list_offices));

    let admin_routes = Router::new()
        .route("/admin/attendance", get(admin::records))
        .route("/admin/offices/{office_id}", patch(admin::update_office))
        .layer(axum::middleware::from_fn(middleware::require_admin));

    // Identity runs before the admin gate
    let protected_routes = Router::new()
        .route("/checkin", post(attendance::checkin))
        .route("/checkout", post(attendance::checkout))
        .route("/attendance/today", get(attendance::today))
        .route("/face/status", get(face::status))
        .route("/face/enroll", post(face::enroll))
        .merge(admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::identity_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(
            request_context::request_id_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// All offices ordered by ID.
async fn list_offices(State(state): State<AppState>) -> Result<Json<Vec<Office>>, ApiError> {
    let offices = state.admission.offices().list().await?;
    Ok(Json(offices))
}

/// Health check endpoint for monitoring and load balancers.
///
/// The scoring service is only part of overall health when the second
/// factor is `face`.
///
/// # Response
///
/// `200 OK` if all components are healthy, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"faceService":null,"secondFactor":"network",...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let second_factor = state.admission.policy().second_factor;
    let face_healthy = match (second_factor, state.admission.face()) {
        (SecondFactor::Network, _) => None,
        (SecondFactor::Face, None) => Some(false),
        (SecondFactor::Face, Some(face)) => match face.health().await {
            Ok(()) => Some(true),
            Err(e) => {
                tracing::warn!("Face service health check failed: {}", e);
                Some(false)
            }
        },
    };

    let overall_healthy = db_healthy && face_healthy.unwrap_or(true);
    let status_code = if overall_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if overall_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "faceService": face_healthy,
        "secondFactor": second_factor.to_string(),
        "timestamp": state.admission.clock().now().to_rfc3339(),
    });

    (status_code, Json(response))
}
