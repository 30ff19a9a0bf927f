use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::ledger::filter::OrderFilter;
use crate::ledger::summary::DashboardReport;
use crate::output::charts::{render_chart, ChartKind};
use crate::output::pdf::render_pdf;

const LOGIN_REQUIRED: &str = "Por favor, entre com usuário e senha válidos.";
const PROCESSING_FAILED: &str = "Erro ao processar a planilha";
const AUTH_REALM: &str = "Basic realm=\"sales-dashboard\", charset=\"UTF-8\"";

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: LOGIN_REQUIRED.to_string(),
        }
    }

    fn not_found(message: impl Display) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.to_string(),
        }
    }

    /// Any failure while turning an upload into a report.
    fn processing(error: impl Display) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: format!("{PROCESSING_FAILED}: {error}"),
        }
    }

    fn internal(error: impl Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, AUTH_REALM)], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// A workbook upload together with the filter fields sent alongside it.
struct Upload {
    file: Vec<u8>,
    filter: OrderFilter,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

pub fn router(config: Config) -> Router {
    let body_limit = config.server.max_upload_mb.saturating_mul(1024 * 1024);
    let state = ApiState {
        config: Arc::new(config),
    };

    let protected = Router::new()
        .route("/v1/dashboard", post(dashboard))
        .route("/v1/report.pdf", post(report_pdf))
        .route("/v1/charts/:chart", post(chart))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    if !config.auth.enabled {
        warn!("authentication is disabled, every upload is accepted");
    }
    let app = router(config);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("dashboard API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn require_basic_auth(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, ApiError> {
    let auth = &state.config.auth;
    if !auth.enabled {
        return Ok(next.run(request).await);
    }

    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_credentials);
    let Some((username, password)) = credentials else {
        return Err(ApiError::unauthorized());
    };

    match auth.find_user(&username, &password) {
        Some(user) => {
            debug!(user = %user.username, "authenticated request");
            Ok(next.run(request).await)
        }
        None => {
            warn!(user = %username, "rejected credentials");
            Err(ApiError::unauthorized())
        }
    }
}

/// Splits an `Authorization: Basic ...` value into user and password.
fn parse_basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn dashboard(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> ApiResult<DashboardReport> {
    let (_, report) = build_upload_report(&state, multipart).await?;
    Ok(ok(report))
}

async fn report_pdf(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let (config, report) = build_upload_report(&state, multipart).await?;
    let bytes = render_pdf(&report, &config.report).map_err(ApiError::processing)?;
    let disposition = format!("attachment; filename=\"{}\"", config.report.pdf_file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn chart(
    State(state): State<ApiState>,
    Path(chart): Path<String>,
    multipart: Multipart,
) -> std::result::Result<Response, ApiError> {
    let kind: ChartKind = chart.parse().map_err(ApiError::not_found)?;
    let (config, report) = build_upload_report(&state, multipart).await?;
    let svg = render_chart(kind, &report, &config.report.currency_symbol)
        .map_err(ApiError::processing)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn build_upload_report(
    state: &ApiState,
    multipart: Multipart,
) -> std::result::Result<(Arc<Config>, DashboardReport), ApiError> {
    let upload = read_upload(multipart).await?;
    let config = Arc::clone(&state.config);
    let size = upload.file.len();

    let worker_config = Arc::clone(&config);
    let filter = upload.filter;
    let file = upload.file;
    let report = tokio::task::spawn_blocking(move || {
        Dashboard::from_bytes(file, &worker_config.workbook).map(|d| d.report(&filter))
    })
    .await
    .map_err(ApiError::internal)?
    .map_err(|e| {
        warn!(error = %e, bytes = size, "failed processing upload");
        ApiError::processing(e)
    })?;

    info!(
        bytes = size,
        lines = report.line_count,
        "processed upload"
    );
    Ok((config, report))
}

async fn read_upload(mut multipart: Multipart) -> std::result::Result<Upload, ApiError> {
    let mut file = None;
    let mut from = None;
    let mut to = None;
    let mut categories = Vec::new();
    let mut clients = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(ApiError::bad_request)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => file = Some(field.bytes().await.map_err(ApiError::bad_request)?.to_vec()),
            "from" => from = Some(field.text().await.map_err(ApiError::bad_request)?),
            "to" => to = Some(field.text().await.map_err(ApiError::bad_request)?),
            "category" => categories.push(field.text().await.map_err(ApiError::bad_request)?),
            "client" => clients.push(field.text().await.map_err(ApiError::bad_request)?),
            other => debug!(field = other, "ignoring multipart field"),
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("missing multipart field 'file'"))?;
    let filter = OrderFilter::from_inputs(from.as_deref(), to.as_deref(), categories, clients)
        .map_err(ApiError::bad_request)?;
    Ok(Upload { file, filter })
}
