//! HTTP tests driving the router against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_api::{build_router, ApiConfig, AppState};
use parking_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::util::ServiceExt;

const TENANT: &str = "tenant-a";
const OTHER_TENANT: &str = "tenant-b";

struct TestApp {
    router: Router,
    state: AppState,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = ApiConfig {
            jwt_secret: "test-secret".to_string(),
            ..ApiConfig::default()
        };
        let state = AppState::new(db, config);
        let token = state
            .jwt
            .generate_access_token("operator-1", TENANT, "Ana")
            .unwrap();
        let router = build_router(state.clone());

        TestApp {
            router,
            state,
            token,
        }
    }

    fn token_for(&self, tenant_id: &str) -> String {
        self.state
            .jwt
            .generate_access_token("operator-2", tenant_id, "Luis")
            .unwrap()
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&self.token), None).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&self.token), Some(body))
            .await
    }

    async fn hourly_car_tariff(&self) {
        let (status, _) = self
            .post(
                "/tariffs",
                json!({"category": "car", "billingMode": "hour", "perHourRate": 2000}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

// =============================================================================
// Health & Auth
// =============================================================================

#[tokio::test]
async fn health_needs_no_token() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
    assert_eq!(body["service"], "parking-api");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::GET, "/tariffs/current", None, None)
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn forged_token_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(Method::GET, "/shifts/current", Some("not.a.jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Tariffs
// =============================================================================

#[tokio::test]
async fn tariff_update_keeps_one_active_rule() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (status, _) = app
        .post(
            "/tariffs",
            json!({"category": "car", "billingMode": "minute", "perMinuteRate": 50}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, current) = app.get("/tariffs/current").await;
    let rules = current.as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["billingMode"], "minute");

    let (_, history) = app.get("/tariffs/history?category=car").await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn movement_snapshot_tariff_is_retrievable() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (_, receipt) = app
        .post("/movements/check-in", json!({"plate": "ABC123", "category": "car"}))
        .await;
    let movement_id = receipt["movementId"].as_str().unwrap();

    // a newer version does not change what the stay was priced with
    app.post(
        "/tariffs",
        json!({"category": "car", "billingMode": "minute", "perMinuteRate": 50}),
    )
    .await;

    let (_, movement) = app.get(&format!("/movements/{}", movement_id)).await;
    let rule_id = movement["tariffRuleId"].as_str().unwrap();

    let (status, rule) = app.get(&format!("/tariffs/{}", rule_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rule["billingMode"], "hour");
    assert_eq!(rule["active"], false);

    let other = app.token_for(OTHER_TENANT);
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/tariffs/{}", rule_id),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/tariffs/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_tariff_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post("/tariffs", json!({"category": "car", "billingMode": "hour"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TARIFF");
}

// =============================================================================
// Movements
// =============================================================================

#[tokio::test]
async fn immediate_check_out_is_free() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (status, receipt) = app
        .post(
            "/movements/check-in",
            json!({"plate": "abc123", "category": "car"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["plate"], "ABC123");
    assert_eq!(receipt["tariffSnapshot"]["perHourRate"], 2000);

    let (status, invoice) = app
        .post(
            "/movements/check-out",
            json!({"plate": "ABC123", "paymentMethod": "cash"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["amount"], 0);
    assert_eq!(invoice["elapsedMinutes"], 0);
    assert!(invoice["payment"].is_null());
    assert_eq!(invoice["movementId"], receipt["movementId"]);

    // Retried check-out
    let (status, body) = app
        .post("/movements/check-out", json!({"plate": "ABC123"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_ACTIVE_STAY");
}

#[tokio::test]
async fn second_check_in_conflicts() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let body = json!({"plate": "ABC123", "category": "car"});
    let (status, _) = app.post("/movements/check-in", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app.post("/movements/check-in", body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "VEHICLE_ALREADY_INSIDE");
}

#[tokio::test]
async fn check_in_without_tariff() {
    let app = TestApp::new().await;

    let (status, err) = app
        .post(
            "/movements/check-in",
            json!({"plate": "ABC123", "category": "truck"}),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "NO_ACTIVE_TARIFF");
}

#[tokio::test]
async fn check_out_of_unknown_vehicle() {
    let app = TestApp::new().await;

    let (status, err) = app
        .post("/movements/check-out", json!({"plate": "ZZZ999"}))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let app = TestApp::new().await;

    let (status, err) = app
        .post("/movements/check-in", json!({"plate": "ABC123"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn movements_are_tenant_scoped() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (_, receipt) = app
        .post(
            "/movements/check-in",
            json!({"plate": "ABC123", "category": "car"}),
        )
        .await;
    let uri = format!("/movements/{}", receipt["movementId"].as_str().unwrap());

    let (status, movement) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(movement["status"], "open");

    let other = app.token_for(OTHER_TENANT);
    let (status, _) = app.request(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, err) = app.get("/movements/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn receipt_of_open_movement_conflicts() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (_, receipt) = app
        .post(
            "/movements/check-in",
            json!({"plate": "ABC123", "category": "car"}),
        )
        .await;
    let id = receipt["movementId"].as_str().unwrap().to_string();

    let (status, err) = app.get(&format!("/movements/{}/receipt", id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "MOVEMENT_NOT_CLOSED");

    let (status, _) = app
        .post("/payments/bulk", json!({"movementId": id, "payments": [{"method": "cash", "amount": 100}]}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

// =============================================================================
// Payments & Shifts
// =============================================================================

/// Checks a car in and out and returns the closed movement id.
async fn closed_movement(app: &TestApp, plate: &str) -> String {
    let (_, receipt) = app
        .post("/movements/check-in", json!({"plate": plate, "category": "car"}))
        .await;
    let (status, _) = app
        .post("/movements/check-out", json!({"plate": plate}))
        .await;
    assert_eq!(status, StatusCode::OK);
    receipt["movementId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn bulk_payments_validation() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;
    let id = closed_movement(&app, "ABC123").await;

    let (status, _) = app
        .post("/payments/bulk", json!({"movementId": id, "payments": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/payments/bulk",
            json!({"movementId": id, "payments": [
                {"method": "cash", "amount": 500},
                {"method": "card", "amount": 0}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, receipt) = app.get(&format!("/movements/{}/receipt", id)).await;
    assert!(receipt["payments"].as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            "/payments/bulk",
            json!({"movementId": "00000000-0000-0000-0000-000000000000",
                   "payments": [{"method": "cash", "amount": 500}]}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_payment_amounts_are_rejected() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;
    let id = closed_movement(&app, "ABC123").await;

    let (status, err) = app
        .post(
            "/payments/bulk",
            json!({"movementId": id, "payments": [
                {"method": "cash", "amount": i64::MAX},
                {"method": "card", "amount": 1}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (_, receipt) = app.get(&format!("/movements/{}/receipt", id)).await;
    assert!(receipt["payments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_shift_amounts_are_rejected() {
    let app = TestApp::new().await;

    let (status, err) = app
        .post("/shifts/open", json!({"openingFloat": i64::MAX}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, _) = app.post("/shifts/open", json!({"openingFloat": 0})).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app
        .post(
            "/shifts/close",
            json!({"countedCash": i64::MAX, "countedCard": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (_, current) = app.get("/shifts/current").await;
    assert_eq!(current["status"], "open");
}

#[tokio::test]
async fn shift_close_balances_without_float() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    let (status, shift) = app
        .post("/shifts/open", json!({"openingFloat": 50000}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(shift["status"], "open");

    let (status, err) = app.post("/shifts/open", json!({"openingFloat": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "SHIFT_ALREADY_OPEN");

    let id = closed_movement(&app, "ABC123").await;
    let (status, payments) = app
        .post(
            "/payments/bulk",
            json!({"movementId": id, "payments": [
                {"method": "cash", "amount": 30000},
                {"method": "card", "amount": 20000}
            ]}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(payments.as_array().unwrap().len(), 2);

    let (status, live) = app.get("/shifts/expected-totals").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(live["expected"]["total"], 50000);

    let (status, closed) = app
        .post(
            "/shifts/close",
            json!({"countedCash": 30000, "countedCard": 20000, "countedQr": 0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["expected"]["total"], 50000);
    assert_eq!(closed["variance"], 0);
    assert_eq!(closed["expectedCashInDrawer"], 80000);
    assert_eq!(closed["ticketStats"][0]["category"], "car");
    assert!(closed.get("warning").is_none());
    assert_eq!(closed["shift"]["status"], "closed");

    let (_, current) = app.get("/shifts/current").await;
    assert!(current.is_null());

    let shift_id = closed["shift"]["id"].as_str().unwrap();
    let (status, detail) = app.get(&format!("/shifts/{}", shift_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["variance"], 0);
}

#[tokio::test]
async fn short_drawer_carries_a_warning() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    app.post("/shifts/open", json!({"openingFloat": 0})).await;
    let id = closed_movement(&app, "ABC123").await;
    app.post(
        "/payments/bulk",
        json!({"movementId": id, "payments": [{"method": "cash", "amount": 30000}]}),
    )
    .await;

    let (status, closed) = app
        .post("/shifts/close", json!({"countedCash": 28000}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["variance"], -2000);
    assert!(closed["warning"].as_str().unwrap().contains("short"));
}

#[tokio::test]
async fn close_without_open_shift() {
    let app = TestApp::new().await;

    let (status, err) = app.post("/shifts/close", json!({"countedCash": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "NO_OPEN_SHIFT");

    let (status, _) = app.get("/shifts/expected-totals").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn reports_default_to_today() {
    let app = TestApp::new().await;
    app.hourly_car_tariff().await;

    closed_movement(&app, "ABC123").await;
    app.post(
        "/movements/check-in",
        json!({"plate": "XYZ789", "category": "car"}),
    )
    .await;

    let (status, kpis) = app.get("/reports/kpis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(kpis["tickets"], 1);
    assert_eq!(kpis["activeNow"], 1);

    let (_, occupancy) = app.get("/reports/occupancy").await;
    assert_eq!(occupancy[0]["count"], 1);

    let (status, page) = app.get("/reports/movements?plate=xyz&pageSize=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["paging"]["total"], 1);
    assert_eq!(page["paging"]["pageSize"], 5);
    assert_eq!(page["items"][0]["plate"], "XYZ789");

    let (status, _) = app.get("/reports/top-plates?limit=500").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn report_range_must_be_ordered() {
    let app = TestApp::new().await;

    let (status, err) = app
        .get("/reports/kpis?from=2026-03-10&to=2026-03-01")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, _) = app.get("/reports/kpis?from=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
