pub mod balance;
pub mod balance_client;
pub mod checkout;
pub mod reservation;

pub use balance::{BalanceError, BalanceLedger};
pub use balance_client::{BalanceClient, RemoteCallError};
pub use checkout::{CheckoutError, CheckoutService, MIN_BALANCE};
pub use reservation::{ReservationEngine, ReservationError};
