//! Integration tests for the HTTP surface.
//!
//! The router is driven with `oneshot` against the in-memory store. The
//! client address comes from `x-forwarded-for` since there is no socket peer.

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{FixedOffset, TimeZone, Utc};
use geo_presence::{
    admission::{AdmissionPolicy, SecondFactor},
    auth::{Role, User},
    db::MemoryStore,
    face::{
        Embedding, FaceConfig, FaceImage, FaceResult, FaceScorer, FaceTemplate, VerifyOutcome,
    },
    ledger::FixedClock,
    office::Office,
};
use gp_server::api::{AppState, FaceBackend, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const OFFICE_LAT: f64 = -5.170628;
const OFFICE_LON: f64 = 119.415447;

/// About 500m due north of the office
const FAR_LAT: f64 = -5.1661314;

const EMPLOYEE: i64 = 7;
const ADMIN: i64 = 1;

const OFFICE_NETWORK: &str = "192.168.1.20";
const GUEST_NETWORK: &str = "10.0.0.5";

struct MatchingScorer;

#[async_trait]
impl FaceScorer for MatchingScorer {
    async fn embed(&self, _image: &FaceImage) -> FaceResult<Embedding> {
        Ok(Embedding {
            bytes: vec![1; 8],
            model_id: "stub/model".to_string(),
        })
    }

    async fn verify(
        &self,
        _image: &FaceImage,
        _templates: &[FaceTemplate],
        threshold: f64,
    ) -> FaceResult<VerifyOutcome> {
        Ok(VerifyOutcome {
            is_match: true,
            best_distance: 0.21,
            threshold,
            model_id: "stub/model".to_string(),
        })
    }

    async fn health(&self) -> FaceResult<()> {
        Ok(())
    }
}

fn create_test_app(second_factor: SecondFactor, with_face: bool) -> Router {
    let store = Arc::new(MemoryStore::new());
    store.insert_office(Office {
        id: 1,
        name: "Makassar".to_string(),
        latitude: OFFICE_LAT,
        longitude: OFFICE_LON,
        radius_meters: 20.0,
        allowed_ranges: vec!["192.168.1.0/24".to_string()],
    });
    store.insert_user(User {
        id: ADMIN,
        display_name: "Admin".to_string(),
        role: Role::Admin,
    });
    store.insert_user(User {
        id: EMPLOYEE,
        display_name: "Ayu".to_string(),
        role: Role::Employee,
    });

    let face = with_face.then(|| FaceBackend {
        scorer: Arc::new(MatchingScorer),
        config: FaceConfig::default(),
    });

    let state = AppState::new(
        store,
        AdmissionPolicy { second_factor },
        FixedOffset::east_opt(8 * 3600).unwrap(),
        face,
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 10, 1, 0, 0).unwrap(),
        )),
    );

    create_router(state)
}

fn network_app() -> Router {
    create_test_app(SecondFactor::Network, false)
}

fn request(
    method: &str,
    uri: &str,
    user: Option<i64>,
    client: &str,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", client);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn at_office() -> Value {
    json!({"latitude": OFFICE_LAT, "longitude": OFFICE_LON, "officeId": 1})
}

#[tokio::test]
async fn test_health_check_network_mode() {
    let app = network_app();
    let (status, body) = call(&app, request("GET", "/health", None, OFFICE_NETWORK, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
    assert!(body["faceService"].is_null());
    assert_eq!(body["secondFactor"], "network");
}

#[tokio::test]
async fn test_health_check_face_mode_without_backend_is_unhealthy() {
    let app = create_test_app(SecondFactor::Face, false);
    let (status, body) = call(&app, request("GET", "/health", None, OFFICE_NETWORK, None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["faceService"], false);
}

#[tokio::test]
async fn test_offices_are_public() {
    let app = network_app();
    let (status, body) = call(&app, request("GET", "/offices", None, GUEST_NETWORK, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Makassar");
    assert_eq!(body[0]["radiusMeters"], 20.0);
    assert_eq!(body[0]["allowedRanges"][0], "192.168.1.0/24");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = network_app();
    let mut req = request("GET", "/offices", None, OFFICE_NETWORK, None);
    req.headers_mut()
        .insert("x-request-id", "req-42".parse().unwrap());

    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_identity_required() {
    let app = network_app();

    let (status, body) = call(
        &app,
        request("POST", "/checkin", None, OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = call(
        &app,
        request("POST", "/checkin", Some(999), OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut req = request("GET", "/attendance/today", None, OFFICE_NETWORK, None);
    req.headers_mut()
        .insert("x-user-id", "seven".parse().unwrap());
    let (status, _) = call(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkin_admitted() {
    let app = network_app();
    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["recordId"], 1);
    assert_eq!(body["type"], "checkin");
    assert_eq!(body["timestamp"], "2024-05-10T01:00:00Z");
    assert_eq!(body["distanceMeters"], 0.0);
    assert_eq!(body["officeRadiusMeters"], 20.0);
    assert_eq!(body["geofence"], "PASS");
    assert_eq!(body["network"], "PASS");
    assert_eq!(body["face"]["verdict"], "NOT_EVALUATED");
}

#[tokio::test]
async fn test_checkin_out_of_range_carries_distance() {
    let app = network_app();
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/checkin",
            Some(EMPLOYEE),
            OFFICE_NETWORK,
            Some(json!({"latitude": FAR_LAT, "longitude": OFFICE_LON, "officeId": 1})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "OutOfRange");
    let distance = body["details"]["distanceMeters"].as_f64().unwrap();
    assert!((495.0..505.0).contains(&distance), "distance {distance}");
    assert_eq!(body["details"]["radiusMeters"], 20.0);
}

#[tokio::test]
async fn test_checkin_network_denied() {
    let app = network_app();
    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), GUEST_NETWORK, Some(at_office())),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NetworkDenied");
    assert!(!body["message"].as_str().unwrap().contains(GUEST_NETWORK));
}

#[tokio::test]
async fn test_forwarded_chain_uses_left_most_address() {
    let app = network_app();
    let client = format!("{OFFICE_NETWORK}, {GUEST_NETWORK}");
    let (status, _) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), &client, Some(at_office())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_input() {
    let app = network_app();

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/checkin",
            Some(EMPLOYEE),
            OFFICE_NETWORK,
            Some(json!({"latitude": 91.0, "longitude": OFFICE_LON, "officeId": 1})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");

    let mut req = request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, None);
    *req.body_mut() = Body::from("{not json");
    req.headers_mut()
        .insert("content-type", "application/json".parse().unwrap());
    let (status, body) = call(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");
}

#[tokio::test]
async fn test_unknown_office() {
    let app = network_app();
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/checkin",
            Some(EMPLOYEE),
            OFFICE_NETWORK,
            Some(json!({"latitude": OFFICE_LAT, "longitude": OFFICE_LON, "officeId": 9})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "OfficeNotFound");
}

#[tokio::test]
async fn test_session_workflow() {
    let app = network_app();

    let (status, body) = call(
        &app,
        request("POST", "/checkout", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NoOpenSession");

    let (status, _) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DuplicateCheckin");
    assert_eq!(body["details"]["since"], "2024-05-10T01:00:00Z");

    let (_, today) = call(
        &app,
        request("GET", "/attendance/today", Some(EMPLOYEE), OFFICE_NETWORK, None),
    )
    .await;
    assert_eq!(today["date"], "2024-05-10");
    assert_eq!(today["state"], "open_session");
    assert_eq!(today["recordId"], 1);
    assert_eq!(today["records"].as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        request("POST", "/checkout", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "checkout");

    let (_, today) = call(
        &app,
        request("GET", "/attendance/today", Some(EMPLOYEE), OFFICE_NETWORK, None),
    )
    .await;
    assert_eq!(today["state"], "closed_session");
    assert_eq!(today["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = network_app();

    let (status, body) = call(
        &app,
        request("GET", "/admin/attendance", Some(EMPLOYEE), OFFICE_NETWORK, None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, _) = call(
        &app,
        request(
            "PATCH",
            "/admin/offices/1",
            Some(EMPLOYEE),
            OFFICE_NETWORK,
            Some(json!({"radiusMeters": 1000.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        request("GET", "/admin/attendance", None, OFFICE_NETWORK, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_records_for_a_day() {
    let app = network_app();
    call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(at_office())),
    )
    .await;

    let (status, body) = call(
        &app,
        request(
            "GET",
            "/admin/attendance?date=2024-05-10&officeId=1",
            Some(ADMIN),
            OFFICE_NETWORK,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-05-10");
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["records"][0]["userId"], EMPLOYEE);

    // Defaults to today in the reference zone
    let (_, body) = call(
        &app,
        request("GET", "/admin/attendance", Some(ADMIN), OFFICE_NETWORK, None),
    )
    .await;
    assert_eq!(body["date"], "2024-05-10");

    let (_, body) = call(
        &app,
        request(
            "GET",
            "/admin/attendance?date=2024-05-09",
            Some(ADMIN),
            OFFICE_NETWORK,
            None,
        ),
    )
    .await;
    assert!(body["records"].as_array().unwrap().is_empty());

    let (status, body) = call(
        &app,
        request(
            "GET",
            "/admin/attendance?date=10-05-2024",
            Some(ADMIN),
            OFFICE_NETWORK,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");
}

#[tokio::test]
async fn test_admin_widens_radius() {
    let app = network_app();
    let far = json!({"latitude": FAR_LAT, "longitude": OFFICE_LON, "officeId": 1});

    let (status, _) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(far.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        request(
            "PATCH",
            "/admin/offices/1",
            Some(ADMIN),
            OFFICE_NETWORK,
            Some(json!({"radiusMeters": 600.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["radiusMeters"], 600.0);
    assert_eq!(body["allowedRanges"][0], "192.168.1.0/24");

    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), OFFICE_NETWORK, Some(far)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["officeRadiusMeters"], 600.0);
}

#[tokio::test]
async fn test_admin_update_validation() {
    let app = network_app();

    let (status, body) = call(
        &app,
        request(
            "PATCH",
            "/admin/offices/1",
            Some(ADMIN),
            OFFICE_NETWORK,
            Some(json!({"radiusMeters": -5.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");

    let (status, _) = call(
        &app,
        request("PATCH", "/admin/offices/1", Some(ADMIN), OFFICE_NETWORK, Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        request(
            "PATCH",
            "/admin/offices/9",
            Some(ADMIN),
            OFFICE_NETWORK,
            Some(json!({"radiusMeters": 50.0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "OfficeNotFound");
}

#[tokio::test]
async fn test_face_enroll_then_checkin() {
    let app = create_test_app(SecondFactor::Face, true);

    let (status, body) = call(
        &app,
        request("GET", "/face/status", Some(EMPLOYEE), GUEST_NETWORK, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"enrolled": false, "count": 0}));

    let mut capture = at_office();
    capture["faceImageBase64"] = json!("data:image/jpeg;base64,/9j/4AAQ");

    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), GUEST_NETWORK, Some(capture.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "FaceUnenrolled");

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/face/enroll",
            Some(EMPLOYEE),
            GUEST_NETWORK,
            Some(json!({"imageBase64": "data:image/jpeg;base64,/9j/4AAQ"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recordId"], 1);
    assert_eq!(body["modelId"], "stub/model");

    let (_, body) = call(
        &app,
        request("GET", "/face/status", Some(EMPLOYEE), GUEST_NETWORK, None),
    )
    .await;
    assert_eq!(body, json!({"enrolled": true, "count": 1}));

    // Face mode ignores the allow-list
    let (status, body) = call(
        &app,
        request("POST", "/checkin", Some(EMPLOYEE), GUEST_NETWORK, Some(capture)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["network"], "NOT_EVALUATED");
    assert_eq!(body["face"]["verdict"], "PASS");
    assert_eq!(body["face"]["distance"], 0.21);
    assert_eq!(body["face"]["modelId"], "stub/model");
}

#[tokio::test]
async fn test_face_enroll_requires_image() {
    let app = create_test_app(SecondFactor::Face, true);

    for payload in [json!({}), json!({"imageBase64": "   "})] {
        let (status, body) = call(
            &app,
            request("POST", "/face/enroll", Some(EMPLOYEE), GUEST_NETWORK, Some(payload)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidInput");
    }
}

#[tokio::test]
async fn test_face_routes_without_backend() {
    let app = network_app();
    let (status, body) = call(
        &app,
        request("GET", "/face/status", Some(EMPLOYEE), OFFICE_NETWORK, None),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "FaceServiceUnavailable");
}

#[tokio::test]
async fn test_health_check_face_mode() {
    let app = create_test_app(SecondFactor::Face, true);
    let (status, body) = call(&app, request("GET", "/health", None, OFFICE_NETWORK, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["faceService"], true);
    assert_eq!(body["secondFactor"], "face");
}
