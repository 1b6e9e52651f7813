// Barangay Resource Distribution - Web Server
// REST API with Axum over the same data directory as the CLI

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use barangay_distribution::audit::{
    self, BUDGET_UPDATED, HOUSEHOLD_ADDED, HOUSEHOLD_REMOVED, RESOURCES_ALLOCATED,
};
use barangay_distribution::{
    init_tracing, store, Config, DistributionRegistry, Event, Household, HouseholdDetails,
    HouseholdInput, RegistryError, Resource,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Registry and audit connection share one lock so each request sees
/// a consistent pair.
struct Inner {
    registry: DistributionRegistry,
    audit: Connection,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<Inner>>,
    data_dir: PathBuf,
    actor: String,
}

impl AppState {
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, ApiError> {
        self.inner
            .lock()
            .map_err(|_| ApiError::internal("state lock poisoned"))
    }

    fn event(&self, event_type: &str, entity_type: &str, entity_id: &str, data: serde_json::Value) -> Event {
        Event::new(event_type, entity_type, entity_id, data, &self.actor)
    }
}

impl Inner {
    /// Persist and audit `next`, then make it the live registry. On
    /// failure the live registry is left as it was.
    fn commit(&mut self, data_dir: &std::path::Path, next: DistributionRegistry, event: &Event) -> Result<(), ApiError> {
        store::commit(data_dir, &next, &self.audit, event).map_err(ApiError::from_anyhow)?;
        self.registry = next;
        Ok(())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    fn from_anyhow(err: anyhow::Error) -> Self {
        error!("{:#}", err);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", err),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::UnknownHousehold(_) => StatusCode::NOT_FOUND,
            RegistryError::NoHouseholds => StatusCode::CONFLICT,
            RegistryError::Household(_) | RegistryError::Budget(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Request / Response bodies
// ============================================================================

/// POST /api/households body. `ages` is the form text, e.g. "30,25,5".
#[derive(Deserialize)]
struct NewHousehold {
    name: String,
    ages: String,
    members: Option<u32>,
}

#[derive(Deserialize)]
struct BudgetUpdate {
    budget: i64,
}

#[derive(Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct AllocationResponse {
    served: usize,
    total_cost: i64,
    remaining_budget: i64,
    order: Vec<u32>,
}

#[derive(Serialize)]
struct BudgetResponse {
    budget: i64,
    total_cost: i64,
    remaining_budget: i64,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/households - Households by priority
async fn list_households(State(state): State<AppState>) -> ApiResult<Vec<Household>> {
    let inner = state.lock()?;
    let households = inner
        .registry
        .households_by_priority()
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ApiResponse::ok(households)))
}

/// POST /api/households - Register a household
async fn add_household(
    State(state): State<AppState>,
    Json(body): Json<NewHousehold>,
) -> Result<(StatusCode, Json<ApiResponse<Household>>), ApiError> {
    let input = HouseholdInput::from_form(&body.name, &body.ages, body.members)
        .map_err(RegistryError::from)?;

    let mut inner = state.lock()?;
    let mut next = inner.registry.clone();
    let household = next.add_household(input)?.clone();
    let event = state.event(
        HOUSEHOLD_ADDED,
        "household",
        &household.id.to_string(),
        json!({ "name": household.name, "ages": household.ages }),
    );
    inner.commit(&state.data_dir, next, &event)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(household))))
}

/// GET /api/households/:id - Household with age groups and allocation
async fn get_household(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<HouseholdDetails> {
    let inner = state.lock()?;
    let details = inner.registry.household_details(id)?;
    Ok(Json(ApiResponse::ok(details)))
}

/// DELETE /api/households/:id
async fn remove_household(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Household> {
    let mut inner = state.lock()?;
    let mut next = inner.registry.clone();
    let removed = next.remove_household(id)?;
    let event = state.event(
        HOUSEHOLD_REMOVED,
        "household",
        &id.to_string(),
        json!({ "name": removed.name }),
    );
    inner.commit(&state.data_dir, next, &event)?;
    Ok(Json(ApiResponse::ok(removed)))
}

/// GET /api/resources - Current stock
async fn list_resources(State(state): State<AppState>) -> ApiResult<Vec<Resource>> {
    let inner = state.lock()?;
    Ok(Json(ApiResponse::ok(inner.registry.catalog.iter().cloned().collect())))
}

/// PUT /api/budget
async fn update_budget(
    State(state): State<AppState>,
    Json(body): Json<BudgetUpdate>,
) -> ApiResult<BudgetResponse> {
    let mut inner = state.lock()?;
    let mut next = inner.registry.clone();
    next.update_budget(body.budget)?;
    let event = state.event(
        BUDGET_UPDATED,
        "budget",
        "barangay",
        json!({ "previous": inner.registry.budget, "budget": body.budget }),
    );
    inner.commit(&state.data_dir, next, &event)?;

    Ok(Json(ApiResponse::ok(BudgetResponse {
        budget: inner.registry.budget,
        total_cost: inner.registry.total_cost(),
        remaining_budget: inner.registry.remaining_budget(),
    })))
}

/// POST /api/allocate - Run the allocation engine
async fn allocate(State(state): State<AppState>) -> ApiResult<AllocationResponse> {
    let mut inner = state.lock()?;
    let mut next = inner.registry.clone();
    let outcome = next.allocate()?;

    let response = AllocationResponse {
        served: outcome.served_count(),
        total_cost: outcome.total_cost,
        remaining_budget: outcome.remaining_budget,
        order: outcome.order,
    };
    let event = state.event(
        RESOURCES_ALLOCATED,
        "plan",
        "current",
        json!({
            "served": response.served,
            "total_cost": response.total_cost,
            "remaining_budget": response.remaining_budget,
        }),
    );
    inner.commit(&state.data_dir, next, &event)?;

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /api/summary - Rendered summary report
async fn summary(State(state): State<AppState>) -> ApiResult<String> {
    let inner = state.lock()?;
    let report = inner
        .registry
        .summary(chrono::Local::now().date_naive())
        .render();
    Ok(Json(ApiResponse::ok(report)))
}

/// GET /api/audit?limit=n - Recent audit events
async fn audit_events(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<Event>> {
    let inner = state.lock()?;
    let events = audit::recent_events(&inner.audit, query.limit.unwrap_or(50))
        .map_err(ApiError::from_anyhow)?;
    Ok(Json(ApiResponse::ok(events)))
}

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/households", get(list_households).post(add_household))
        .route("/households/:id", get(get_household).delete(remove_household))
        .route("/resources", get(list_resources))
        .route("/budget", put(update_budget))
        .route("/allocate", post(allocate))
        .route("/summary", get(summary))
        .route("/audit", get(audit_events))
        .with_state(state)
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("🌐 Barangay Resource Distribution - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // BARANGAY_CONFIG names the file; barangay.toml otherwise
    let config = Config::load(None)?;
    let registry = store::load(&config.data_dir, config.default_budget)
        .context("Failed to load registry data")?;
    let audit = audit::open_audit(&config.data_dir)?;
    println!(
        "✓ Loaded {} households from {:?}",
        registry.households.len(),
        config.data_dir
    );

    let state = AppState {
        inner: Arc::new(Mutex::new(Inner { registry, audit })),
        data_dir: config.data_dir.clone(),
        actor: "server".to_string(),
    };

    let app = Router::new()
        .nest("/api", api_routes(state))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.bind))?;

    info!(bind = %config.server.bind, "server listening");
    println!("\n🚀 Server running on http://{}", config.server.bind);
    println!("   API: http://{}/api/households", config.server.bind);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
