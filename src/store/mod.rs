//! Ticket persistence.
//!
//! A [`TicketStore`] hands out [`TicketTransaction`]s. Inside a transaction,
//! [`TicketTransaction::lock_for_update`] takes a row-exclusive lock that is
//! held until the transaction commits, rolls back, or is dropped. Dropping a
//! transaction without committing discards its writes.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewTicket, Ticket};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Plain read of the last committed state. Never waits on row locks.
    async fn find(&self, id: i64) -> Result<Option<Ticket>, StoreError>;

    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError>;

    async fn begin(&self) -> Result<Box<dyn TicketTransaction>, StoreError>;
}

#[async_trait]
pub trait TicketTransaction: Send {
    /// Reads the row and locks it for the rest of the transaction.
    /// Blocks while another transaction holds the same row.
    async fn lock_for_update(&mut self, id: i64) -> Result<Option<Ticket>, StoreError>;

    /// Writes a new quota to a row previously locked by this transaction.
    async fn set_quota(&mut self, id: i64, quota: i64) -> Result<Ticket, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
