use thiserror::Error;

/// The only user the mock ledger knows about.
pub const MOCK_USER_ID: i64 = 1;
pub const MOCK_BALANCE: i64 = 100_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("user {0} not found")]
    UserNotFound(i64),
}

/// Read-only, stateless balance lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceLedger;

impl BalanceLedger {
    pub fn new() -> Self {
        Self
    }

    pub fn check_balance(&self, user_id: i64) -> Result<i64, BalanceError> {
        if user_id != MOCK_USER_ID {
            return Err(BalanceError::UserNotFound(user_id));
        }
        Ok(MOCK_BALANCE)
    }
}
