use super::auth::JwtAuth;
use super::AppState;
use crate::components::ai_schedule::{
    unavailable_response, AiScheduleResponse, ExecutionRequest, ExecutionResult, Intent,
    ParseRequest, ProposalPayload,
};
use crate::components::schedule_store::{EventRange, ScheduleEvent};
use crate::error::{validation_error, AssistantResult, Error};
use crate::utils::time::{parse_timestamp, shift};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

/// Error wrapper that maps crate errors to HTTP responses
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            Error::Validation(message) | Error::NotFound(message) => message.clone(),
            other => {
                error!("Request failed: {:?}", other);
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Health check
pub async fn health_handler() -> &'static str {
    "OK"
}

/// Optional window for listing schedules
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// A calendar day (`YYYY-MM-DD`, UTC)
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ListQuery {
    /// Resolve to a `[start, end)` window; explicit bounds override the day
    pub fn to_range(&self) -> AssistantResult<EventRange> {
        let mut range = EventRange::default();

        if let Some(date) = self.date.as_deref().filter(|d| !d.trim().is_empty()) {
            let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|_| validation_error("Invalid date, expected YYYY-MM-DD"))?;
            let start = day
                .and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .filter(|t| (1..=9999).contains(&t.year()))
                .ok_or_else(|| validation_error("Invalid date, expected YYYY-MM-DD"))?;
            range.start = Some(start);
            range.end = Some(shift(start, Duration::days(1))?);
        }

        if let Some(start) = self.start.as_deref().filter(|s| !s.trim().is_empty()) {
            range.start = Some(
                parse_timestamp(start, None).ok_or_else(|| validation_error("Invalid start time"))?,
            );
        }
        if let Some(end) = self.end.as_deref().filter(|e| !e.trim().is_empty()) {
            range.end =
                Some(parse_timestamp(end, None).ok_or_else(|| validation_error("Invalid end time"))?);
        }

        if let (Some(start), Some(end)) = (range.start, range.end) {
            if start > end {
                range = EventRange::new(end, start);
            }
        }

        Ok(range)
    }
}

/// List live schedules of the caller
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ScheduleEvent>>> {
    let range = query.to_range()?;
    let events = state.assistant.list(auth.owner_id(), range).await?;
    Ok(Json(events))
}

fn expect_event(result: ExecutionResult) -> ApiResult<ScheduleEvent> {
    match result.event() {
        Some(event) => Ok(event.clone()),
        None => Err(ApiError(Error::Store(
            "Execution did not return the affected schedule".to_string(),
        ))),
    }
}

/// Create a schedule from explicit fields
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Json(payload): Json<ProposalPayload>,
) -> ApiResult<(StatusCode, Json<ScheduleEvent>)> {
    let request = ExecutionRequest::new(Intent::Create).with_data(payload);
    let result = state.assistant.execute(auth.owner_id(), &request).await?;
    Ok((StatusCode::CREATED, Json(expect_event(result)?)))
}

/// Partially update a schedule
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
    Json(payload): Json<ProposalPayload>,
) -> ApiResult<Json<ScheduleEvent>> {
    let request = ExecutionRequest::new(Intent::Update)
        .with_schedule_id(id)
        .with_data(payload);
    let result = state.assistant.execute(auth.owner_id(), &request).await?;
    Ok(Json(expect_event(result)?))
}

/// Soft delete a schedule
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecutionResult>> {
    let request = ExecutionRequest::new(Intent::Delete).with_schedule_id(id);
    let result = state.assistant.execute(auth.owner_id(), &request).await?;
    Ok(Json(result))
}

/// Restore a soft-deleted schedule
pub async fn restore_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduleEvent>> {
    let restored = state.assistant.restore(auth.owner_id(), &id).await?;
    Ok(Json(restored))
}

/// Turn a chat message into a proposal
pub async fn parse_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Json(request): Json<ParseRequest>,
) -> ApiResult<Json<AiScheduleResponse>> {
    // The caller's clock is not trusted
    let request = ParseRequest {
        now: Some(Utc::now()),
        ..request
    };

    let parse = state.assistant.parse(auth.owner_id(), &request);
    match tokio::time::timeout(state.completion_timeout, parse).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => {
            warn!(
                "Parse for {} timed out after {:?}",
                auth.owner_id(),
                state.completion_timeout
            );
            Ok(Json(unavailable_response()))
        }
    }
}

/// Execute a confirmed proposal
pub async fn execute_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<JwtAuth>,
    Json(request): Json<ExecutionRequest>,
) -> ApiResult<Json<ExecutionResult>> {
    let result = state.assistant.execute(auth.owner_id(), &request).await?;
    Ok(Json(result))
}
