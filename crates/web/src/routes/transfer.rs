//! Stock transfers between storage locations.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use stockroom_core::{NewTransfer, ProductId, Quantity, StorageId, Transfer};

use super::page::PageData;
use crate::catalog::{self, LoadPlan};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::state::AppState;
use crate::store::Scope;

/// Transfer request body.
///
/// The acting user comes from the session, never from the body.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_storage_id: StorageId,
    pub to_storage_id: StorageId,
    /// Signed so a negative count gets a proper validation message.
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Transfer form data: active products and locations only.
///
/// GET /transfer
#[instrument(skip_all, fields(user = %current.user.email))]
pub async fn transfer_form(
    State(state): State<AppState>,
    RequireSession(current): RequireSession,
) -> Json<PageData> {
    let scope = Scope::user(current.access_token);
    let outcome = catalog::load(state.store(), &scope, LoadPlan::TRANSFER_FORM).await;

    Json(
        PageData::from_outcome(outcome, state.store().backend_name())
            .with_user_email(current.user.email),
    )
}

/// Record a transfer.
///
/// POST /transfer
#[instrument(skip_all, fields(user = %current.user.email, product_id = %request.product_id))]
pub async fn record_transfer(
    State(state): State<AppState>,
    RequireSession(current): RequireSession,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<Transfer>), AppError> {
    let quantity = Quantity::try_from(request.quantity)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let transfer = NewTransfer::new(
        request.product_id,
        request.from_storage_id,
        request.to_storage_id,
        quantity,
        current.user.email,
        request.notes,
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let scope = Scope::user(current.access_token);
    let stored = state.store().record_transfer(&scope, &transfer).await?;

    tracing::info!(
        transfer_id = %stored.id,
        quantity = %stored.quantity,
        from = %stored.from_storage_id,
        to = %stored.to_storage_id,
        "Transfer recorded"
    );

    Ok((StatusCode::CREATED, Json(stored)))
}
