//! HTTP gateway over `FetchService`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use fetchd_core::app::{DispatchCounts, DispatchMode, FetchService, Submission};
use fetchd_core::domain::{FetchRequest, FetchSpec, Paginator, Request, RequestId};
use fetchd_core::{Error, ErrorKind};
use serde::{Deserialize, Serialize};

pub fn app(service: Arc<FetchService>) -> Router {
    Router::new()
        .route(
            "/v1/requests/request",
            post(submit_request).delete(delete_request),
        )
        .route("/v1/requests/list", get(list_requests))
        .route("/v1/requests/{id}", get(get_request))
        .route("/v1/health", get(health))
        .with_state(service)
}

/// Error body: `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Error::invalid_input(rejection.body_text()))
    }
}

pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::WrongMethod => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Closed => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(self.0.kind());
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn submit_request(
    State(service): State<Arc<FetchService>>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(raw) = body?;
    let spec = FetchSpec::try_from(raw)?;

    match service.submit(spec).await? {
        Submission::Completed(response) => Ok((StatusCode::OK, Json(response)).into_response()),
        Submission::Accepted => Ok(StatusCode::ACCEPTED.into_response()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteBody {
    pub id: String,
}

async fn delete_request(
    State(service): State<Arc<FetchService>>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(DeleteBody { id }) = body?;
    service.delete(id.parse()?).await?;
    Ok(StatusCode::OK)
}

/// `?page=&requestsPerPage=`; both optional, missing `requestsPerPage` lists
/// everything.
async fn list_requests(
    State(service): State<Arc<FetchService>>,
    query: Result<Query<Paginator>, QueryRejection>,
) -> Result<Json<Vec<Request>>, ApiError> {
    let Query(paginator) = query?;
    Ok(Json(service.list(Some(paginator)).await?))
}

async fn get_request(
    State(service): State<Arc<FetchService>>,
    Path(id): Path<String>,
) -> Result<Json<Request>, ApiError> {
    let id: RequestId = id.parse()?;
    Ok(Json(service.get(id).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    /// "sync" or "async".
    pub dispatch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatcher: Option<DispatchCounts>,
}

async fn health(State(service): State<Arc<FetchService>>) -> Json<Health> {
    let dispatch = match service.mode() {
        DispatchMode::Sync => "sync",
        DispatchMode::Async { .. } => "async",
    };
    Json(Health {
        status: "ok".to_string(),
        dispatch: dispatch.to_string(),
        dispatcher: service.counts(),
    })
}
