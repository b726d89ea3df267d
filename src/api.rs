//! REST API for the load planning service.
//!
//! Provides HTTP endpoints for communication with the frontend.
//! Uses Axum as the web framework and supports CORS.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::config::{ApiConfig, EngineConfig};
use crate::engine::{PlanDiagnostics, audit_plan, pack_with_config, pack_with_progress};
use crate::model::{
    CartonType, Container, PackStatus, PackingResult, PlacedItem, TypeBreakdown, ValidationError,
};

#[derive(Clone)]
struct ApiState {
    engine_config: EngineConfig,
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>stowplan API Docs</title>
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

/// Embedded Web Assets (HTML, CSS, JS)
#[derive(RustEmbed)]
#[folder = "web/"]
struct WebAssets;

/// Container specification in a pack request.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ContainerRequest {
    pub label: Option<String>,
    #[schema(value_type = [f64; 3], example = json!([5.898, 2.352, 2.393]))]
    pub dims: (f64, f64, f64),
    pub max_weight: f64,
}

impl ContainerRequest {
    fn into_container(self) -> Result<Container, ValidationError> {
        Container::new(self.label, self.dims, self.max_weight)
    }
}

/// Request structure for the packing endpoints.
///
/// `container` is the single loading space for this computation; `cartons`
/// lists the SKUs with their requested quantities.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": {
            "label": "20' Standard",
            "dims": [5.898, 2.352, 2.393],
            "max_weight": 28200.0
        },
        "cartons": [
            {
                "id": "c1",
                "name": "Euro pallet box",
                "dims": [0.8, 0.6, 0.6],
                "weight": 25.0,
                "quantity": 20,
                "color": "#f97316"
            }
        ]
    })
)]
pub struct PackRequest {
    pub container: ContainerRequest,
    pub cartons: Vec<CartonType>,
}

#[derive(Debug)]
struct ValidatedPackRequest {
    container: Container,
    cartons: Vec<CartonType>,
}

impl ValidatedPackRequest {
    fn carton_type_count(&self) -> usize {
        self.cartons.len()
    }

    fn requested_units(&self) -> u64 {
        self.cartons.iter().map(|c| c.quantity as u64).sum()
    }

    fn into_parts(self) -> (Container, Vec<CartonType>) {
        (self.container, self.cartons)
    }
}

#[derive(Debug)]
enum PackRequestValidationError {
    InvalidContainer(ValidationError),
    InvalidCarton(ValidationError),
}

impl PackRequest {
    fn into_validated(self) -> Result<ValidatedPackRequest, PackRequestValidationError> {
        let container = self
            .container
            .into_container()
            .map_err(PackRequestValidationError::InvalidContainer)?;

        let cartons = self
            .cartons
            .into_iter()
            .map(|c| CartonType::new(c.id, c.name, c.dims, c.weight, c.quantity, c.color))
            .collect::<Result<Vec<_>, ValidationError>>()
            .map_err(PackRequestValidationError::InvalidCarton)?;

        Ok(ValidatedPackRequest { container, cartons })
    }
}

/// Response structure with the full load plan.
///
/// # Fields
/// * `placed_items` - Placements in placement order
/// * `total_weight` - Cumulative weight of all placed units
/// * `volume_utilization` - Placed volume as a percentage of container volume
/// * `weight_utilization` - Placed weight as a percentage of the weight limit
/// * `status` - Outcome classification
/// * `message` - Human-readable summary
/// * `breakdown` - Per-type packed/requested counts, keyed by carton id
/// * `diagnostics` - Structural audit of the returned plan
#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub placed_items: Vec<PlacedItem>,
    pub total_weight: f64,
    pub volume_utilization: f64,
    pub weight_utilization: f64,
    pub status: PackStatus,
    pub message: String,
    pub breakdown: BTreeMap<String, TypeBreakdown>,
    pub diagnostics: PlanDiagnostics,
}

impl PackResponse {
    /// Creates a PackResponse from a PackingResult and its audit.
    pub fn from_result(result: PackingResult, diagnostics: PlanDiagnostics) -> Self {
        let PackingResult {
            placed_items,
            total_weight,
            volume_utilization,
            weight_utilization,
            status,
            message,
            breakdown,
        } = result;

        Self {
            placed_items,
            total_weight,
            volume_utilization,
            weight_utilization,
            status,
            message,
            breakdown,
            diagnostics,
        }
    }
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

fn container_config_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid container configuration",
        details,
    )
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return Err(json_deserialize_error(err)),
    };

    match payload.into_validated() {
        Ok(validated) => Ok(validated),
        Err(PackRequestValidationError::InvalidContainer(err)) => {
            Err(container_config_error(err.to_string()))
        }
        Err(PackRequestValidationError::InvalidCarton(err)) => {
            Err(validation_error(err.to_string()))
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handle_pack, handle_pack_stream, handle_containers),
    components(
        schemas(
            PackRequest,
            ContainerRequest,
            CartonType,
            Container,
            PackResponse,
            PlacedItem,
            PackStatus,
            TypeBreakdown,
            PlanDiagnostics,
            ErrorResponse
        )
    ),
    tags((name = "packing", description = "Endpoints for container load planning"))
)]
struct ApiDoc;

/// Starts the API server.
///
/// Configures CORS for cross-origin requests from the frontend.
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, engine_config: EngineConfig) {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let state = ApiState { engine_config };

    let app = Router::new()
        // API endpoints
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/containers", get(handle_containers))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        // Web-UI (embedded)
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_static))
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
    println!("📦 API Endpoints:");
    println!("   - POST /pack");
    println!("   - POST /pack_stream");
    println!("   - GET /containers");
    println!("📑 Documentation:");
    println!("   - GET /docs");
    println!("   - GET /docs/openapi.json");
    println!("🌐 Web-UI: http://{}:{}", display_host, config.port());

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("❌ API server terminated with an error: {err}");
    }
}

/// Handler for POST /pack endpoint.
///
/// Computes a load plan for the requested container and carton types.
///
/// # Parameters
/// * `payload` - JSON payload with the container and the carton types
///
/// # Returns
/// JSON response with all placements, utilization metrics, and the plan audit
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Load plan computed", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let type_count = request.carton_type_count();
    let requested_units = request.requested_units();
    let (container, cartons) = request.into_parts();

    println!(
        "📥 New pack request: {} carton types, {} units",
        type_count, requested_units
    );
    let packing_config = state.engine_config.packing_config();
    let result = pack_with_config(&container, &cartons, packing_config);
    let diagnostics = audit_plan(&container, &cartons, &result);
    println!(
        "📦 Result: {}/{} units placed, volume {:.1}%, weight {:.1}%",
        result.placed_count(),
        requested_units,
        result.volume_utilization,
        result.weight_utilization
    );

    let response = PackResponse::from_result(result, diagnostics);
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
/// The frontend can visualize the placements live without waiting for the
/// complete result.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "packing"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (container, cartons) = request.into_parts();

    let (tx, rx) = mpsc::channel::<String>(32);

    let packing_config = state.engine_config.packing_config();

    tokio::task::spawn_blocking(move || {
        let _ = pack_with_progress(&container, &cartons, packing_config, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                if tx.blocking_send(json).is_err() {
                    // Receiver has closed the stream; remaining events are discarded.
                    return;
                }
            }
        });
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

/// Handler for GET /containers endpoint.
///
/// Lists the standard ISO container presets.
#[utoipa::path(
    get,
    path = "/containers",
    responses(
        (status = 200, description = "Standard container presets", body = Vec<Container>)
    ),
    tag = "packing"
)]
async fn handle_containers() -> impl IntoResponse {
    Json(Container::standard_presets())
}

/// Serves the index.html main page
async fn serve_index() -> Response {
    match WebAssets::get("index.html") {
        Some(content) => Html(content.data).into_response(),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// Serves static assets (JS, CSS, etc.)
async fn serve_static(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    match WebAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}
