use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use super::balance_client::{BalanceClient, RemoteCallError};
use crate::telemetry::CallContext;

/// Balance a buyer needs before the v2 purchase is accepted.
pub const MIN_BALANCE: i64 = 100_000;

const PROBE_TAG_KEY: &str = "probe";
const PROBE_TAG_VALUE: &str = "balance-precheck";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    #[error(transparent)]
    Remote(RemoteCallError),

    #[error("balance check timed out after {0:?}")]
    Timeout(Duration),

    #[error("balance {balance} is below the required {required}")]
    InsufficientBalance { balance: i64, required: i64 },
}

impl From<RemoteCallError> for CheckoutError {
    fn from(error: RemoteCallError) -> Self {
        match error {
            RemoteCallError::Timeout(after) => CheckoutError::Timeout(after),
            other => CheckoutError::Remote(other),
        }
    }
}

/// Purchase flow that asks the balance service first.
///
/// Known gap: an accepted purchase does not reserve inventory. Nothing here
/// touches the reservation engine, so a buyer can be told "OK" for a unit
/// that was never taken from the quota.
#[derive(Clone)]
pub struct CheckoutService {
    balances: BalanceClient,
}

impl CheckoutService {
    pub fn new(balances: BalanceClient) -> Self {
        Self { balances }
    }

    /// Returns the balance that passed the check.
    #[instrument(skip(self, ctx), fields(trace_id = %ctx.trace_id()))]
    pub async fn purchase_with_balance_check(&self, raw_user_id: &str, ctx: &CallContext) -> Result<i64, CheckoutError> {
        let user_id: i64 = raw_user_id
            .parse()
            .map_err(|_| CheckoutError::InvalidUserId(raw_user_id.to_string()))?;

        let outgoing = ctx
            .clone()
            .with_tag("user_id", user_id.to_string())
            .with_tag(PROBE_TAG_KEY, PROBE_TAG_VALUE);

        let balance = self.balances.check_balance(&outgoing, user_id).await?;

        if balance < MIN_BALANCE {
            warn!(user_id, balance, "Balance is not enough");
            return Err(CheckoutError::InsufficientBalance {
                balance,
                required: MIN_BALANCE,
            });
        }

        info!(user_id, balance, "Balance check passed");
        Ok(balance)
    }
}
