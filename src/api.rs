//! REST API for the stowage simulation service.
//!
//! Provides HTTP endpoints for communication with the frontend.
//! Uses Axum as the web framework and supports CORS.
//!
//! The stateful endpoints mutate one shared stowage session behind a mutex;
//! the plan/audit/level endpoints are pure compute and never touch it.

use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::ApiConfig;
use crate::model::{Batch, CargoItem, Container, Shape, ValidationError};
use crate::planner::{Overflow, PlannerConfig, plan_placements, plan_with_progress};
use crate::progression::{LevelInfo, level_for};
use crate::session::{Session, SessionError, SessionStats};
use crate::types::Vec3;

#[derive(Clone)]
struct ApiState {
    session: Arc<Mutex<Session>>,
    planner_config: PlannerConfig,
}

impl ApiState {
    fn new(planner_config: PlannerConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new(planner_config))),
            planner_config,
        }
    }

    /// Runs a closure against the shared session.
    ///
    /// A poisoned mutex is recovered by taking the inner value; session
    /// operations never leave the state half-mutated.
    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut guard = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>stowsim API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

fn default_color() -> String {
    "#0077ff".to_string()
}

/// Container dimensions in meters.
#[derive(Deserialize, Clone, Copy, ToSchema)]
#[schema(example = json!({ "l": 6.058, "w": 2.438, "h": 2.591 }))]
pub struct ContainerRequest {
    pub l: f64,
    pub w: f64,
    pub h: f64,
}

impl ContainerRequest {
    fn into_container(self) -> Result<Container, ValidationError> {
        Container::new(self.l, self.w, self.h)
    }
}

/// One pending batch of identical cargo units.
#[derive(Deserialize, Clone, ToSchema)]
#[schema(
    example = json!({
        "shape": { "type": "box", "l": 1.0, "w": 1.0, "h": 1.0 },
        "qty": 4,
        "color": "#8B4513"
    })
)]
pub struct BatchRequest {
    pub shape: Shape,
    pub qty: u32,
    #[serde(default = "default_color")]
    pub color: String,
}

/// A pending batch as stored in the queue.
#[derive(Serialize, ToSchema)]
pub struct BatchResponse {
    pub id: u64,
    pub shape: Shape,
    pub qty: u32,
    pub color: String,
}

impl BatchResponse {
    fn from_batch(batch: &Batch) -> Self {
        Self {
            id: batch.id,
            shape: batch.shape,
            qty: batch.qty,
            color: batch.color.clone(),
        }
    }
}

/// Manual placement of a single cargo item.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ItemRequest {
    pub shape: Shape,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.5, 0.0]))]
    pub pos: (f64, f64, f64),
    #[serde(default = "default_color")]
    pub color: String,
}

/// A placed cargo item.
#[derive(Serialize, ToSchema)]
pub struct ItemResponse {
    pub id: u64,
    pub shape: Shape,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.5, 0.0]))]
    pub pos: (f64, f64, f64),
    pub color: String,
}

impl ItemResponse {
    fn from_item(item: &CargoItem) -> Self {
        Self {
            id: item.id,
            shape: item.shape,
            pos: item.position.as_tuple(),
            color: item.color.clone(),
        }
    }
}

/// New position for a manual drag.
#[derive(Deserialize, Clone, Copy, ToSchema)]
pub struct MoveRequest {
    #[schema(value_type = [f64; 3], example = json!([1.0, 0.5, 0.0]))]
    pub pos: (f64, f64, f64),
}

/// Pallet quantity for the floor grid.
#[derive(Deserialize, Clone, Copy, ToSchema)]
pub struct PalletRequest {
    pub qty: u32,
}

/// Capacity-exceeded report in responses.
#[derive(Serialize, ToSchema)]
pub struct OverflowResponse {
    pub batch_id: u64,
    pub placed_from_batch: u32,
    pub requested: u32,
}

impl OverflowResponse {
    fn from_overflow(overflow: &Overflow) -> Self {
        Self {
            batch_id: overflow.batch_id,
            placed_from_batch: overflow.placed_from_batch,
            requested: overflow.requested,
        }
    }
}

/// Volume accounting for the stats panel.
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub container_volume: f64,
    pub cargo_volume: f64,
    pub pallet_volume: f64,
    pub occupancy_pct: f64,
    pub item_count: usize,
    pub pallet_count: usize,
}

impl StatsResponse {
    fn from_stats(stats: SessionStats) -> Self {
        Self {
            container_volume: stats.container_volume,
            cargo_volume: stats.cargo_volume,
            pallet_volume: stats.pallet_volume,
            occupancy_pct: stats.occupancy_pct,
            item_count: stats.item_count,
            pallet_count: stats.pallet_count,
        }
    }
}

/// Ids of items participating in at least one colliding pair.
#[derive(Serialize, ToSchema)]
pub struct CollisionResponse {
    pub colliding_ids: Vec<u64>,
}

/// Response of a consume-all load run.
#[derive(Serialize, ToSchema)]
pub struct LoadResponse {
    pub placed: Vec<ItemResponse>,
    pub overflow: Option<OverflowResponse>,
    pub colliding_ids: Vec<u64>,
    pub is_complete: bool,
    pub stats: StatsResponse,
}

/// Response after a cargo mutation (add, move, delete).
#[derive(Serialize, ToSchema)]
pub struct MutationResponse {
    pub id: u64,
    pub colliding_ids: Vec<u64>,
}

/// Stateless plan preview request: full scene description in the body.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": { "l": 6.058, "w": 2.438, "h": 2.591 },
        "batches": [
            { "shape": { "type": "box", "l": 1.0, "w": 1.0, "h": 1.0 }, "qty": 4 }
        ],
        "pallet_qty": 0
    })
)]
pub struct PlanRequest {
    pub container: ContainerRequest,
    pub batches: Vec<BatchRequest>,
    #[serde(default)]
    pub pallet_qty: u32,
}

struct ValidatedPlanRequest {
    container: Container,
    batches: Vec<Batch>,
    pallet_qty: u32,
}

impl PlanRequest {
    fn into_validated(self) -> Result<ValidatedPlanRequest, ValidationError> {
        let container = self.container.into_container()?;
        let batches = self
            .batches
            .into_iter()
            .enumerate()
            .map(|(idx, entry)| Batch::new(idx as u64, entry.shape, entry.qty, entry.color))
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok(ValidatedPlanRequest {
            container,
            batches,
            pallet_qty: self.pallet_qty,
        })
    }
}

/// One planned placement in a preview response.
#[derive(Serialize, ToSchema)]
pub struct PlannedPlacement {
    pub batch_id: u64,
    pub shape: Shape,
    #[schema(value_type = [f64; 3], example = json!([-2.529, 0.5, -0.719]))]
    pub pos: (f64, f64, f64),
    pub color: String,
}

/// Response of a stateless plan preview.
#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    pub placements: Vec<PlannedPlacement>,
    pub overflow: Option<OverflowResponse>,
    pub is_complete: bool,
}

/// One item in a stateless audit request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct AuditItem {
    pub id: u64,
    pub shape: Shape,
    #[schema(value_type = [f64; 3], example = json!([0.0, 0.5, 0.0]))]
    pub pos: (f64, f64, f64),
}

/// Stateless collision audit request.
#[derive(Deserialize, ToSchema)]
pub struct AuditRequest {
    pub items: Vec<AuditItem>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn session_error(err: SessionError) -> Response {
    match err {
        SessionError::Validation(inner) => validation_error(inner.to_string()),
        SessionError::UnknownItem(_) | SessionError::UnknownBatch(_) => {
            error_response(StatusCode::NOT_FOUND, "Not found", err.to_string())
        }
    }
}

/// Unwraps a JSON body or produces the matching error response.
fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_resize_container,
        handle_list_batches,
        handle_add_batch,
        handle_remove_batch,
        handle_load,
        handle_list_items,
        handle_add_item,
        handle_move_item,
        handle_delete_item,
        handle_clear_items,
        handle_set_pallets,
        handle_stats,
        handle_collisions,
        handle_plan,
        handle_plan_stream,
        handle_audit,
        handle_level
    ),
    components(
        schemas(
            ContainerRequest,
            BatchRequest,
            BatchResponse,
            ItemRequest,
            ItemResponse,
            MoveRequest,
            PalletRequest,
            OverflowResponse,
            StatsResponse,
            CollisionResponse,
            LoadResponse,
            MutationResponse,
            PlanRequest,
            PlannedPlacement,
            PlanResponse,
            AuditItem,
            AuditRequest,
            LevelInfo,
            ErrorResponse,
            Shape
        )
    ),
    tags(
        (name = "session", description = "Stateful stowage session"),
        (name = "planning", description = "Stateless placement planning"),
        (name = "audit", description = "Stateless collision audit"),
        (name = "progression", description = "XP leveling")
    )
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, planner_config: PlannerConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState::new(planner_config);

    let app = Router::new()
        // Session endpoints
        .route("/container", put(handle_resize_container))
        .route(
            "/batches",
            get(handle_list_batches).post(handle_add_batch),
        )
        .route("/batches/{id}", delete(handle_remove_batch))
        .route("/load", post(handle_load))
        .route(
            "/items",
            get(handle_list_items)
                .post(handle_add_item)
                .delete(handle_clear_items),
        )
        .route("/items/{id}", delete(handle_delete_item))
        .route("/items/{id}/position", patch(handle_move_item))
        .route("/pallets", put(handle_set_pallets))
        .route("/stats", get(handle_stats))
        .route("/collisions", get(handle_collisions))
        // Stateless compute endpoints
        .route("/plan", post(handle_plan))
        .route("/plan_stream", post(handle_plan_stream))
        .route("/audit", post(handle_audit))
        .route("/level/{xp}", get(handle_level))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("❌ Could not bind API server to {}: {}", addr, err);
        }
    };

    let display_host = config.display_host().to_string();
    println!(
        "🚀 Server running on http://{}:{}",
        display_host,
        config.port()
    );
    if config.binds_to_all_interfaces() && config.uses_default_host() {
        println!("💡 Local access: http://localhost:{}", config.port());
    }
    println!("📦 Session endpoints:");
    println!("   - PUT /container, PUT /pallets");
    println!("   - GET|POST /batches, DELETE /batches/{{id}}");
    println!("   - POST /load");
    println!("   - GET|POST|DELETE /items, PATCH /items/{{id}}/position");
    println!("   - GET /stats, GET /collisions");
    println!("🧮 Compute endpoints:");
    println!("   - POST /plan, POST /plan_stream, POST /audit");
    println!("   - GET /level/{{xp}}");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for PUT /container.
///
/// Replaces the container wholesale; all placed cargo is discarded because
/// positions are container-relative.
#[utoipa::path(
    put,
    path = "/container",
    request_body = ContainerRequest,
    responses(
        (status = 200, description = "Container replaced, cargo cleared", body = StatsResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid dimensions", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_resize_container(
    State(state): State<ApiState>,
    payload: Result<Json<ContainerRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    state.with_session(|session| {
        match session.resize_container(request.l, request.w, request.h) {
            Ok(()) => (
                StatusCode::OK,
                Json(StatsResponse::from_stats(session.stats())),
            )
                .into_response(),
            Err(err) => session_error(err),
        }
    })
}

/// Handler for GET /batches.
#[utoipa::path(
    get,
    path = "/batches",
    responses((status = 200, description = "Pending batch queue", body = [BatchResponse])),
    tag = "session"
)]
async fn handle_list_batches(State(state): State<ApiState>) -> impl IntoResponse {
    let batches = state.with_session(|session| {
        session
            .batches()
            .iter()
            .map(BatchResponse::from_batch)
            .collect::<Vec<_>>()
    });
    Json(batches)
}

/// Handler for POST /batches.
#[utoipa::path(
    post,
    path = "/batches",
    request_body = BatchRequest,
    responses(
        (status = 200, description = "Batch appended to the queue", body = BatchResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid batch", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_add_batch(
    State(state): State<ApiState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    state.with_session(
        |session| match session.add_batch(request.shape, request.qty, request.color.clone()) {
            Ok(id) => Json(BatchResponse {
                id,
                shape: request.shape,
                qty: request.qty,
                color: request.color,
            })
            .into_response(),
            Err(err) => session_error(err),
        },
    )
}

/// Handler for DELETE /batches/{id}.
#[utoipa::path(
    delete,
    path = "/batches/{id}",
    params(("id" = u64, Path, description = "Batch id")),
    responses(
        (status = 204, description = "Batch removed"),
        (status = NOT_FOUND, description = "Unknown batch id", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_remove_batch(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    state.with_session(|session| match session.remove_batch(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => session_error(err),
    })
}

/// Handler for POST /load.
///
/// Consume-all: plans every pending batch, materializes cargo and clears the
/// queue. Capacity-exceeded is data in the response, never an error status;
/// partial placements are kept.
#[utoipa::path(
    post,
    path = "/load",
    responses((status = 200, description = "Load run finished", body = LoadResponse)),
    tag = "session"
)]
async fn handle_load(State(state): State<ApiState>) -> impl IntoResponse {
    let response = state.with_session(|session| {
        let batch_count = session.batches().len();
        println!("📥 Load request: {} pending batches", batch_count);

        let report = session.load_all();
        println!(
            "📦 Result: {} items placed, overflow: {}",
            report.created.len(),
            report.overflow.is_some()
        );

        LoadResponse {
            placed: report.created.iter().map(ItemResponse::from_item).collect(),
            overflow: report.overflow.as_ref().map(OverflowResponse::from_overflow),
            colliding_ids: report.collisions.iter().copied().collect(),
            is_complete: report.overflow.is_none(),
            stats: StatsResponse::from_stats(session.stats()),
        }
    });
    Json(response)
}

/// Handler for GET /items.
#[utoipa::path(
    get,
    path = "/items",
    responses((status = 200, description = "All placed cargo items", body = [ItemResponse])),
    tag = "session"
)]
async fn handle_list_items(State(state): State<ApiState>) -> impl IntoResponse {
    let items = state.with_session(|session| {
        session
            .items()
            .iter()
            .map(ItemResponse::from_item)
            .collect::<Vec<_>>()
    });
    Json(items)
}

/// Handler for POST /items (manual single-item add).
#[utoipa::path(
    post,
    path = "/items",
    request_body = ItemRequest,
    responses(
        (status = 200, description = "Item placed", body = MutationResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid item", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_add_item(
    State(state): State<ApiState>,
    payload: Result<Json<ItemRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    state.with_session(|session| {
        match session.add_item(
            request.shape,
            Vec3::from_tuple(request.pos),
            request.color.clone(),
        ) {
            Ok((id, collisions)) => Json(MutationResponse {
                id,
                colliding_ids: collisions.iter().copied().collect(),
            })
            .into_response(),
            Err(err) => session_error(err),
        }
    })
}

/// Handler for PATCH /items/{id}/position (manual drag release).
#[utoipa::path(
    patch,
    path = "/items/{id}/position",
    params(("id" = u64, Path, description = "Cargo item id")),
    request_body = MoveRequest,
    responses(
        (status = 200, description = "Item moved", body = MutationResponse),
        (status = NOT_FOUND, description = "Unknown item id", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_move_item(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    state.with_session(
        |session| match session.move_item(id, Vec3::from_tuple(request.pos)) {
            Ok(collisions) => Json(MutationResponse {
                id,
                colliding_ids: collisions.iter().copied().collect(),
            })
            .into_response(),
            Err(err) => session_error(err),
        },
    )
}

/// Handler for DELETE /items/{id}.
#[utoipa::path(
    delete,
    path = "/items/{id}",
    params(("id" = u64, Path, description = "Cargo item id")),
    responses(
        (status = 200, description = "Item deleted", body = CollisionResponse),
        (status = NOT_FOUND, description = "Unknown item id", body = ErrorResponse)
    ),
    tag = "session"
)]
async fn handle_delete_item(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    state.with_session(|session| match session.delete_item(id) {
        Ok(collisions) => Json(CollisionResponse {
            colliding_ids: collisions.iter().copied().collect(),
        })
        .into_response(),
        Err(err) => session_error(err),
    })
}

/// Handler for DELETE /items (clear-all).
#[utoipa::path(
    delete,
    path = "/items",
    responses((status = 200, description = "All cargo cleared", body = StatsResponse)),
    tag = "session"
)]
async fn handle_clear_items(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.with_session(|session| {
        session.clear_items();
        session.stats()
    });
    Json(StatsResponse::from_stats(stats))
}

/// Handler for PUT /pallets.
#[utoipa::path(
    put,
    path = "/pallets",
    request_body = PalletRequest,
    responses((status = 200, description = "Pallet grid laid out", body = StatsResponse)),
    tag = "session"
)]
async fn handle_set_pallets(
    State(state): State<ApiState>,
    payload: Result<Json<PalletRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let stats = state.with_session(|session| {
        session.set_pallets(request.qty);
        session.stats()
    });
    Json(StatsResponse::from_stats(stats)).into_response()
}

/// Handler for GET /stats.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Volume accounting", body = StatsResponse)),
    tag = "session"
)]
async fn handle_stats(State(state): State<ApiState>) -> impl IntoResponse {
    let stats = state.with_session(|session| session.stats());
    Json(StatsResponse::from_stats(stats))
}

/// Handler for GET /collisions.
#[utoipa::path(
    get,
    path = "/collisions",
    responses((status = 200, description = "Current collision set", body = CollisionResponse)),
    tag = "session"
)]
async fn handle_collisions(State(state): State<ApiState>) -> impl IntoResponse {
    let collisions = state.with_session(|session| session.collisions());
    Json(CollisionResponse {
        colliding_ids: collisions.iter().copied().collect(),
    })
}

/// Handler for POST /plan.
///
/// Pure plan preview: the full scene comes in the request, the session is
/// not touched.
#[utoipa::path(
    post,
    path = "/plan",
    request_body = PlanRequest,
    responses(
        (status = 200, description = "Placement plan", body = PlanResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_plan(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let validated = match request.into_validated() {
        Ok(validated) => validated,
        Err(err) => return validation_error(err.to_string()),
    };

    println!(
        "📥 Plan request: {} batches, {} pallets",
        validated.batches.len(),
        validated.pallet_qty
    );

    let pallet_offset = if validated.pallet_qty > 0 {
        crate::model::PALLET_DIMENSIONS.y
    } else {
        0.0
    };
    let outcome = plan_placements(
        &validated.container,
        &validated.batches,
        pallet_offset,
        &state.planner_config,
    );

    let response = PlanResponse {
        is_complete: outcome.is_complete(),
        overflow: outcome.overflow.as_ref().map(OverflowResponse::from_overflow),
        placements: outcome
            .placements
            .into_iter()
            .map(|p| PlannedPlacement {
                batch_id: p.batch_id,
                shape: p.shape,
                pos: p.position.as_tuple(),
                color: p.color,
            })
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /plan_stream (SSE).
///
/// Streams plan events in real-time as Server-Sent Events
/// (text/event-stream). The frontend can animate each unit as it is placed
/// without waiting for the complete result.
#[utoipa::path(
    post,
    path = "/plan_stream",
    request_body = PlanRequest,
    responses(
        (
            status = 200,
            description = "Streams plan events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "planning"
)]
async fn handle_plan_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let validated = match request.into_validated() {
        Ok(validated) => validated,
        Err(err) => return validation_error(err.to_string()),
    };

    let (tx, rx) = mpsc::channel::<String>(32);
    let planner_config = state.planner_config;

    tokio::task::spawn_blocking(move || {
        let pallet_offset = if validated.pallet_qty > 0 {
            crate::model::PALLET_DIMENSIONS.y
        } else {
            0.0
        };
        let _ = plan_with_progress(
            &validated.container,
            &validated.batches,
            pallet_offset,
            &planner_config,
            |evt| {
                if let Ok(json) = serde_json::to_string(evt) {
                    if tx.blocking_send(json).is_err() {
                        // Receiver has closed the stream; remaining events are discarded.
                        return;
                    }
                }
            },
        );
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /audit.
///
/// Pure collision audit over the posted items; the session is not touched.
#[utoipa::path(
    post,
    path = "/audit",
    request_body = AuditRequest,
    responses(
        (status = 200, description = "Colliding item ids", body = CollisionResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "audit"
)]
async fn handle_audit(
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let mut items = Vec::with_capacity(request.items.len());
    for entry in request.items {
        if let Err(err) = entry.shape.validate() {
            return validation_error(err.to_string());
        }
        items.push(CargoItem {
            id: entry.id,
            shape: entry.shape,
            position: Vec3::from_tuple(entry.pos),
            color: String::new(),
        });
    }

    let collisions = crate::auditor::audit_collisions(&items);
    Json(CollisionResponse {
        colliding_ids: collisions.iter().copied().collect(),
    })
    .into_response()
}

/// Handler for GET /level/{xp}.
#[utoipa::path(
    get,
    path = "/level/{xp}",
    params(("xp" = u64, Path, description = "Experience points")),
    responses((status = 200, description = "Resolved level", body = LevelInfo)),
    tag = "progression"
)]
async fn handle_level(Path(xp): Path<u64>) -> impl IntoResponse {
    Json(level_for(xp))
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
