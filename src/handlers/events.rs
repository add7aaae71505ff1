use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::models::NewTicket;
use crate::state::InventoryState;
use crate::telemetry::CallContext;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

#[derive(Serialize)]
struct PurchaseReceipt {
    event_id: i64,
    remaining_quota: i64,
}

#[derive(Debug, Deserialize)]
pub struct BuyV2Params {
    user_id: Option<String>,
}

fn parse_event_id(raw: &str) -> Result<i64, AppError> {
    raw.parse()
        .map_err(|_| AppError::ValidationError(format!("Invalid event id '{}'", raw)))
}

pub async fn get_event(
    State(state): State<InventoryState>,
    ctx: CallContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_event_id(&id)?;
    let ticket = state.engine.get_ticket(id).instrument(ctx.span()).await?;

    Ok(success(ticket, "Event retrieved").into_response())
}

pub async fn create_event(
    State(state): State<InventoryState>,
    ctx: CallContext,
    payload: Result<Json<NewTicket>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(ticket) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;
    let ticket = state.engine.create_ticket(ticket).instrument(ctx.span()).await?;

    Ok(created(ticket, "Event created").into_response())
}

/// Single-phase purchase: one unit off the quota, or 409 when none is left.
pub async fn buy_event(
    State(state): State<InventoryState>,
    ctx: CallContext,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_event_id(&id)?;
    let ticket = state.engine.purchase_one(id).instrument(ctx.span()).await?;

    let receipt = PurchaseReceipt {
        event_id: ticket.id,
        remaining_quota: ticket.quota,
    };
    Ok(success(receipt, "Ticket purchased successfully").into_response())
}

/// Balance-checked purchase. The user id is `?user_id=`, or the path segment
/// when the query parameter is absent. Does not reserve inventory.
///
/// A user id that is not an integer gets 400 `VALIDATION_ERROR` rather than a
/// 500. It is rejected before any remote call and reported as a client error.
pub async fn buy_event_v2(
    State(state): State<InventoryState>,
    ctx: CallContext,
    Path(id): Path<String>,
    Query(params): Query<BuyV2Params>,
) -> Result<Response, AppError> {
    let raw_user_id = params.user_id.unwrap_or(id);
    state
        .checkout
        .purchase_with_balance_check(&raw_user_id, &ctx)
        .instrument(ctx.span())
        .await?;

    Ok(empty_success("OK").into_response())
}
