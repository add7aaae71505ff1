pub mod balance;
pub mod ticket;

pub use balance::{BalanceRequest, BalanceResponse};
pub use ticket::{NewTicket, Ticket};
