//! JSON-over-HTTP surface, one resource per operation.
//!
//! Authentication happens upstream; the proxy forwards the trusted user id in
//! the `x-user-id` header.

pub mod error;

use crate::application::Services;
use crate::application::order_manager::CaptureRequest;
use crate::domain::enrollment::ProgressRecord;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::payment::GatewayCallback;
use crate::domain::ports::CatalogRef;
use crate::error::LedgerError;
use crate::infrastructure::sandbox_gateway::SandboxGateway;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use error::{ApiError, ErrorBody};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub catalog: CatalogRef,
    /// Mounted under `/sandbox` when the sandbox gateway is in use.
    pub sandbox: Option<SandboxGateway>,
}

/// The user id vouched for by the authentication proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        error: "Unauthenticated",
                        message: format!("missing {} header", USER_HEADER),
                    }),
                )
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    pub course_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    pub gateway_order_ref: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            gateway_order_ref: order.gateway_order_ref,
            amount: order.amount,
            currency: order.currency.to_string(),
            status: order.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    pub enrolled: bool,
    pub course_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkViewedBody {
    pub course_id: String,
    pub lecture_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetBody {
    pub course_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedResponse {
    pub viewed_lecture_ids: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    #[serde(flatten)]
    pub record: ProgressRecord,
    /// Present when the catalog knows how many lectures the course has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percent: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxPayBody {
    pub gateway_order_ref: String,
}

pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/order", post(create_order))
        .route("/order/capture", post(capture_order))
        .route("/order/{order_id}", get(get_order))
        .route("/progress/mark", post(mark_viewed))
        .route("/progress/reset", post(reset_progress))
        .route("/progress/{course_id}", get(get_progress));
    if state.sandbox.is_some() {
        router = router.route("/sandbox/pay", post(sandbox_pay));
    }
    router.with_state(state)
}

async fn create_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<CreateOrderBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let listing = state
        .catalog
        .course(&body.course_id)
        .await?
        .ok_or_else(|| LedgerError::CourseNotFound(body.course_id.clone()))?;
    let order = state
        .services
        .orders
        .create_order(&user_id, &listing.course_id, listing.price, &listing.currency)
        .await?;
    Ok(Json(order.into()))
}

async fn capture_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CaptureRequest>,
) -> Result<Json<CaptureResponse>, ApiError> {
    let result = state
        .services
        .orders
        .capture_order(&user_id, &request)
        .await?;
    Ok(Json(CaptureResponse {
        enrolled: true,
        course_id: result.course_id,
    }))
}

async fn get_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(order_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.services.orders.get_order(&user_id, &order_id).await?;
    Ok(Json(order.into()))
}

async fn mark_viewed(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<MarkViewedBody>,
) -> Result<Json<ViewedResponse>, ApiError> {
    let record = state
        .services
        .progress
        .mark_viewed(&user_id, &body.course_id, &body.lecture_id)
        .await?;
    Ok(Json(ViewedResponse {
        viewed_lecture_ids: record.viewed_lecture_ids,
    }))
}

async fn reset_progress(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<ResetBody>,
) -> Result<Json<ViewedResponse>, ApiError> {
    let record = state
        .services
        .progress
        .reset_progress(&user_id, &body.course_id)
        .await?;
    Ok(Json(ViewedResponse {
        viewed_lecture_ids: record.viewed_lecture_ids,
    }))
}

async fn get_progress(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(course_id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(record) = state
        .services
        .progress
        .get_progress(&user_id, &course_id)
        .await?
    else {
        let body = ErrorBody {
            error: "NotFound",
            message: format!("no progress for course {}", course_id),
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    };
    let completion_percent = state
        .catalog
        .course(&course_id)
        .await?
        .map(|listing| record.completion_percent(listing.total_lectures));
    Ok(Json(ProgressResponse {
        record,
        completion_percent,
    })
    .into_response())
}

async fn sandbox_pay(
    State(state): State<AppState>,
    Json(body): Json<SandboxPayBody>,
) -> Result<Json<GatewayCallback>, ApiError> {
    let gateway = state
        .sandbox
        .as_ref()
        .ok_or_else(|| LedgerError::Gateway("sandbox gateway is disabled".to_string()))?;
    Ok(Json(gateway.pay(&body.gateway_order_ref).await?))
}
