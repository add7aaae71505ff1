use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::models::{BalanceRequest, BalanceResponse};
use crate::state::BalanceState;
use crate::telemetry::CallContext;
use crate::utils::error::AppError;

pub async fn balance_check(
    State(state): State<BalanceState>,
    ctx: CallContext,
    payload: Result<Json<BalanceRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let tagged_user = ctx.tag("user_id").unwrap_or_else(|| "-".to_string());
    let probe = ctx.tag("probe").unwrap_or_else(|| "-".to_string());
    ctx.span().in_scope(|| {
        info!(
            user_id = %tagged_user,
            probe = %probe,
            "Balance check received"
        )
    });

    let Json(request) =
        payload.map_err(|e| AppError::InternalServerError(format!("error when parsing body to json: {}", e)))?;
    let balance = state.ledger.check_balance(request.user_id)?;

    Ok(Json(BalanceResponse { balance }))
}
