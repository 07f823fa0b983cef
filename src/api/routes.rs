//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{
    OperationContext, TransactionStatus, TransferCategory, TransferRequest, TransferResult,
};
use crate::error::AppError;
use crate::orchestrator::TransferOrchestrator;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: TransferOrchestrator,
}

impl AppState {
    pub fn new(orchestrator: TransferOrchestrator) -> Self {
        Self { orchestrator }
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct BatchTransferRequest {
    pub transfers: Vec<TransferRequest>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemResponse {
    pub request: TransferRequest,
    pub result: TransferResult,
}

#[derive(Debug, Serialize)]
pub struct BatchTransferResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleTransferRequest {
    #[serde(flatten)]
    pub transfer: TransferRequest,
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleTransferResponse {
    pub scheduled_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CancelScheduledResponse {
    pub scheduled_id: Uuid,
    pub status: TransactionStatus,
}

#[derive(Debug, Serialize)]
pub struct TransferStatusResponse {
    pub transfer_id: Uuid,
    pub status: TransactionStatus,
}

#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub amount: String,
    #[serde(default)]
    pub category: TransferCategory,
}

#[derive(Debug, Serialize)]
pub struct FeeResponse {
    pub amount: Decimal,
    pub category: TransferCategory,
    pub fee: Decimal,
    pub total_debit: Decimal,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transfers", post(transfer))
        .route("/transfers/batch", post(batch_transfer))
        .route("/transfers/scheduled", post(schedule_transfer))
        .route("/transfers/scheduled/:scheduled_id", delete(cancel_scheduled))
        .route("/transfers/:transfer_id/status", get(transfer_status))
        .route("/fees", get(estimate_fee))
        .route("/health", get(health_check))
}

// =========================================================================
// POST /transfers
// =========================================================================

/// Execute a single transfer
///
/// A fraud rejection is a business outcome: 422 with the failure body.
async fn transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResult>), AppError> {
    let result = state
        .orchestrator
        .execute_transfer_with_context(&request, &context)
        .await?;

    let status = if result.is_success() {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(result)))
}

// =========================================================================
// POST /transfers/batch
// =========================================================================

async fn batch_transfer(
    State(state): State<AppState>,
    Json(request): Json<BatchTransferRequest>,
) -> Result<Json<BatchTransferResponse>, AppError> {
    let results = state.orchestrator.execute_batch(request.transfers).await?;

    let total = results.len();
    let succeeded = results.iter().filter(|(_, r)| r.is_success()).count();

    Ok(Json(BatchTransferResponse {
        total,
        succeeded,
        failed: total - succeeded,
        results: results
            .into_iter()
            .map(|(request, result)| BatchItemResponse { request, result })
            .collect(),
    }))
}

// =========================================================================
// POST /transfers/scheduled, DELETE /transfers/scheduled/:id
// =========================================================================

async fn schedule_transfer(
    State(state): State<AppState>,
    Json(request): Json<ScheduleTransferRequest>,
) -> Result<(StatusCode, Json<ScheduleTransferResponse>), AppError> {
    let scheduled_id = state
        .orchestrator
        .schedule_transfer(&request.transfer, request.scheduled_for)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleTransferResponse {
            scheduled_id,
            scheduled_for: request.scheduled_for,
        }),
    ))
}

async fn cancel_scheduled(
    State(state): State<AppState>,
    Path(scheduled_id): Path<Uuid>,
) -> Result<Json<CancelScheduledResponse>, AppError> {
    let cancelled = state.orchestrator.cancel_scheduled(scheduled_id).await?;

    Ok(Json(CancelScheduledResponse {
        scheduled_id: cancelled.transaction_id,
        status: cancelled.status,
    }))
}

// =========================================================================
// GET /transfers/:id/status
// =========================================================================

async fn transfer_status(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<TransferStatusResponse>, AppError> {
    let status = state.orchestrator.transfer_status(transfer_id).await?;
    Ok(Json(TransferStatusResponse {
        transfer_id,
        status,
    }))
}

// =========================================================================
// GET /fees
// =========================================================================

async fn estimate_fee(
    State(state): State<AppState>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<FeeResponse>, AppError> {
    let amount = Decimal::from_str(query.amount.trim())
        .map_err(|_| AppError::InvalidRequest(format!("Invalid amount: {}", query.amount)))?;

    let fee = state.orchestrator.estimate_fee(amount, query.category)?;

    Ok(Json(FeeResponse {
        amount,
        category: query.category,
        fee,
        total_debit: amount + fee,
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_schedule_request_deserialize() {
        let json = r#"{
            "source_account_number": "1234567899",
            "target_account_number": "1234567897",
            "amount": "1000",
            "category": "OTHER_BANK",
            "scheduled_for": "2030-01-15T10:00:00Z"
        }"#;

        let request: ScheduleTransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.transfer.amount, dec!(1000));
        assert_eq!(request.transfer.category, TransferCategory::OtherBank);
        assert!(request.transfer.description.is_none());
    }

    #[test]
    fn test_batch_request_deserialize() {
        let json = r#"{"transfers": [
            {"source_account_number": "1234567899", "target_account_number": "1234567897", "amount": "10"},
            {"source_account_number": "1234567897", "target_account_number": "1234567899", "amount": "5", "description": "Back"}
        ]}"#;

        let request: BatchTransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.transfers.len(), 2);
        assert_eq!(request.transfers[1].description.as_deref(), Some("Back"));
    }
}
