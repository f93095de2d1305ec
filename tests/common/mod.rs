//! Minimal in-process backend for integration tests.
//!
//! Speaks just enough of the API to exercise the gateway's refresh
//! protocol and the typed endpoint groups: bearer-checked routes, a
//! rotating refresh endpoint, and per-route hit counters.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{Value, json};

use enerlytics_client::ApiConfig;

pub const PASSWORD: &str = "SecurePass123!";

pub struct BackendState {
    /// Access token the backend currently accepts.
    pub access_token: String,
    /// Refresh token the backend currently accepts.
    pub refresh_token: String,
    rotations: u32,
    hits: HashMap<String, u32>,
    /// Force the refresh endpoint to reject everything.
    pub refresh_rejects: bool,
    /// Force the logout endpoint to fail server-side.
    pub logout_fails: bool,
    /// Insight report still generating (202).
    pub report_pending: bool,
    /// Query string of the last bill listing.
    pub last_bill_query: HashMap<String, String>,
    /// JSON body of the last appliance creation.
    pub last_appliance_body: Option<Value>,
}

type Shared = Arc<Mutex<BackendState>>;

pub struct TestBackend {
    pub state: Shared,
    base_url: String,
}

impl TestBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            access_token: "A1".into(),
            refresh_token: "R1".into(),
            rotations: 1,
            hits: HashMap::new(),
            refresh_rejects: false,
            logout_fails: false,
            report_pending: false,
            last_bill_query: HashMap::new(),
            last_appliance_body: None,
        }));

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/logout", post(logout))
            .route("/auth/refresh", post(refresh))
            .route("/users/me", get(me).delete(deactivate))
            .route("/users/me/bills", get(list_bills))
            .route("/bills/confirm", post(confirm_bill))
            .route("/appliances/{bill_id}/create", post(create_appliance))
            .route("/insights/report/{bill_id}", get(insight_report))
            .with_state(state.clone());
        let app = Router::new().nest("/api/v1", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test backend");
        });

        Self {
            state,
            base_url: format!("http://{addr}/api/v1"),
        }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url.parse().expect("valid test URL"))
    }

    pub fn hits(&self, route: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .hits
            .get(route)
            .copied()
            .unwrap_or(0)
    }

    pub fn access_token(&self) -> String {
        self.state.lock().unwrap().access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.state.lock().unwrap().refresh_token.clone()
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn record(state: &Shared, route: &str) {
    *state
        .lock()
        .unwrap()
        .hits
        .entry(route.to_owned())
        .or_default() += 1;
}

fn authorized(state: &Shared, headers: &HeaderMap) -> bool {
    bearer(headers).as_deref() == Some(state.lock().unwrap().access_token.as_str())
}

fn rotate_tokens(state: &mut BackendState) -> Value {
    state.rotations += 1;
    state.access_token = format!("A{}", state.rotations);
    state.refresh_token = format!("R{}", state.rotations);
    json!({
        "access_token": state.access_token,
        "refresh_token": state.refresh_token,
        "token_type": "bearer",
    })
}

pub fn profile_body() -> Value {
    json!({
        "id": "6b7e1b62-0000-0000-0000-0000000000aa",
        "first_name": "Asha",
        "last_name": "Rao",
        "username": "asha_r",
        "email": "user@example.com",
        "timezone": "Delhi/Mumbai",
        "role": "user",
        "is_verified": true,
        "is_active": true,
        "created_at": "2025-01-15T10:00:00Z",
        "updated_at": "2025-06-01T08:30:00Z",
    })
}

fn bill_body(status: &str) -> Value {
    json!({
        "id": "6b7e1b62-0000-0000-0000-0000000000b1",
        "user_id": "6b7e1b62-0000-0000-0000-0000000000aa",
        "billing_period_start": "2025-03-01",
        "billing_period_end": "2025-03-31",
        "kwh_total": 412.5,
        "cost_total": 3187.0,
        "provider": "BESCOM",
        "source_type": "pdf",
        "confidence_score": 0.93,
        "parse_status": status,
        "created_at": "2025-04-02T09:15:00Z",
    })
}

async fn login(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    record(&state, "POST /auth/login");
    if form.get("password").map(String::as_str) != Some(PASSWORD) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response();
    }
    let mut s = state.lock().unwrap();
    let pair = rotate_tokens(&mut s);
    Json(pair).into_response()
}

async fn logout(State(state): State<Shared>) -> impl IntoResponse {
    record(&state, "POST /auth/logout");
    if state.lock().unwrap().logout_fails {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "logout failed"})),
        )
            .into_response();
    }
    Json(json!({"detail": "logged out"})).into_response()
}

async fn refresh(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    record(&state, "POST /auth/refresh");
    let mut s = state.lock().unwrap();
    if s.refresh_rejects || body["refresh_token"] != json!(s.refresh_token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid refresh token"})),
        )
            .into_response();
    }
    let pair = rotate_tokens(&mut s);
    Json(pair).into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    record(&state, "GET /users/me");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(profile_body()).into_response()
}

async fn deactivate(State(state): State<Shared>, headers: HeaderMap) -> impl IntoResponse {
    record(&state, "DELETE /users/me");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_bills(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    record(&state, "GET /users/me/bills");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let page: u32 = query.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    let size: u32 = query.get("size").and_then(|v| v.parse().ok()).unwrap_or(10);
    state.lock().unwrap().last_bill_query = query;
    Json(json!({
        "items": [bill_body("success")],
        "total": 1,
        "page": page,
        "pages": 1,
        "size": size,
    }))
    .into_response()
}

async fn confirm_bill(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(_body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "POST /bills/confirm");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(bill_body("processing")).into_response()
}

async fn create_appliance(
    State(state): State<Shared>,
    Path(_bill_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record(&state, "POST /appliances/create");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let response = json!({
        "id": "6b7e1b62-0000-0000-0000-0000000000c1",
        "user_id": "6b7e1b62-0000-0000-0000-0000000000aa",
        "custom_name": body["custom_name"],
        "appliance_catalog_id": body.get("appliance_catalog_id"),
        "count": body["count"],
        "custom_wattage": body.get("custom_wattage"),
        "hours_per_day": body["hours_per_day"],
        "days_per_week": body["days_per_week"],
        "created_at": "2025-06-01T08:30:00Z",
        "updated_at": "2025-06-01T08:30:00Z",
    });
    state.lock().unwrap().last_appliance_body = Some(body);
    Json(response).into_response()
}

async fn insight_report(
    State(state): State<Shared>,
    Path(_bill_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    record(&state, "GET /insights/report");
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if state.lock().unwrap().report_pending {
        return (
            StatusCode::ACCEPTED,
            Json(json!({"detail": "Insight generation is still pending."})),
        )
            .into_response();
    }
    Json(json!({
        "summary": { "headline": "Cooling dominates this bill" },
        "consumption_trends": [
            { "month": "2025-03", "kwh": 412.5, "cost": 3187.0, "percentage_change": 12.0 },
        ],
        "appliance_breakdown": [
            {
                "appliance_name": "Living Room AC",
                "category": "cooling",
                "kwh": 210.0,
                "cost": 1620.0,
                "percentage_of_total": 50.9,
                "icon_emoji": "❄️",
            },
        ],
        "recommendations": [
            {
                "id": "rec-1",
                "title": "Raise AC setpoint",
                "description": "Each degree saves roughly 6% of cooling energy.",
                "potential_savings_kwh": 18.0,
                "priority": "high",
                "difficulty": "easy",
                "action_type": "behavioral",
            },
        ],
        "carbon_footprint": { "total_co2_kg": 338.0, "equivalent_trees_needed": 16 },
    }))
    .into_response()
}
