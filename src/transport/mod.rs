//! HTTP transport.
//!
//! Serves `GET /api/ship/parties` and `GET /health` with axum. Engine work
//! is synchronous and runs on the blocking pool; dropping the request
//! future (client disconnect) trips the request's cancel token.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::cancel::CancelToken;
use crate::engine::PartiesEngine;
use crate::error::{PartiesError, ValidationError};
use crate::legacy::LegacyPartiesView;
use crate::request::{PartiesQuery, PartiesRequest, ResponseVersion};

// ----------------------------------------------------------------------------
// Limits (DoS protection)
// ----------------------------------------------------------------------------

/// Maximum size of the raw query string, checked before it is parsed.
pub const MAX_QUERY_BYTES: usize = 32 * 1024;

/// Response header carrying the per-request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct AppState {
    engine: Arc<PartiesEngine>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn parties_error_response(err: &PartiesError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, err.to_string())
}

fn with_request_id(mut response: Response, request_id: Uuid) -> Response {
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Builds the application router.
pub fn router(engine: Arc<PartiesEngine>) -> Router {
    Router::new()
        .route("/api/ship/parties", get(get_parties))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

/// Serves the router on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the listener's I/O error.
pub async fn serve<F>(
    engine: Arc<PartiesEngine>,
    listener: TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn get_parties(
    State(state): State<AppState>,
    uri: Uri,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("ship_parties_request", request_id = %request_id);

    let response = async move {
        if uri.query().map_or(0, str::len) > MAX_QUERY_BYTES {
            let err = ValidationError::FieldTooLong {
                field: "query".to_string(),
                max_length: MAX_QUERY_BYTES,
            };
            return error_response(StatusCode::BAD_REQUEST, err.to_string());
        }

        let query: PartiesQuery = match Query::try_from_uri(&uri) {
            Ok(Query(query)) => query,
            Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        let request = match PartiesRequest::from_query(&query, state.engine.default_mode()) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(error = %err, "rejecting request");
                return parties_error_response(&PartiesError::Validation(err));
            }
        };
        let version = request.version;

        let cancel = CancelToken::new();
        let guard = cancel.drop_guard();
        let engine = Arc::clone(&state.engine);
        let current = tracing::Span::current();
        let joined = tokio::task::spawn_blocking(move || {
            current.in_scope(|| engine.resolve_with_cancel(&request, &cancel))
        })
        .await;
        guard.disarm();

        match joined {
            Ok(Ok(report)) => match version {
                ResponseVersion::V2 => Json(report).into_response(),
                ResponseVersion::V1 => Json(LegacyPartiesView::from(&report.result)).into_response(),
            },
            Ok(Err(err)) => parties_error_response(&err),
            Err(join_err) => {
                tracing::error!(error = %join_err, "resolution task failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }
    .instrument(span)
    .await;

    with_request_id(response, request_id)
}
