use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::models::{NewTicket, Ticket};
use crate::store::{StoreError, TicketStore, TicketTransaction};

const BUY_ENDPOINT: &str = "/event/:id/buy";

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("invalid ticket: {0}")]
    Validation(String),

    #[error("event {0} not found")]
    NotFound(i64),

    #[error("event {0} is sold out")]
    SoldOut(i64),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("purchase did not finish within {0:?}")]
    Timeout(Duration),
}

/// Sells tickets one unit at a time without overselling.
///
/// Each purchase locks the ticket row, re-reads the quota under the lock and
/// only then decrements it, so concurrent buyers of the same event are
/// serialized by the store while buyers of other events are not.
#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn TicketStore>,
    deadline: Duration,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn TicketStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    #[instrument(skip(self))]
    pub async fn get_ticket(&self, id: i64) -> Result<Ticket, ReservationError> {
        self.store
            .find(id)
            .await?
            .ok_or(ReservationError::NotFound(id))
    }

    #[instrument(skip(self, ticket), fields(title = %ticket.title))]
    pub async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, ReservationError> {
        ticket.validate().map_err(ReservationError::Validation)?;

        let created = self.store.insert(&ticket).await?;
        info!(id = created.id, quota = created.quota, "Event created");
        Ok(created)
    }

    /// Creates `seed` unless an event with `id` already exists.
    pub async fn ensure_seeded(&self, id: i64, seed: NewTicket) -> Result<Ticket, ReservationError> {
        match self.get_ticket(id).await {
            Ok(existing) => Ok(existing),
            Err(ReservationError::NotFound(_)) => {
                info!(id, "Seed event missing, creating it");
                self.create_ticket(seed).await
            }
            Err(e) => Err(e),
        }
    }

    /// Takes one unit of quota. Returns the ticket as committed.
    ///
    /// If the deadline passes first, the transaction is dropped mid-flight and
    /// rolled back by the store.
    #[instrument(skip(self))]
    pub async fn purchase_one(&self, id: i64) -> Result<Ticket, ReservationError> {
        match tokio::time::timeout(self.deadline, self.purchase_in_transaction(id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(id, deadline = ?self.deadline, "Purchase timed out, transaction rolled back");
                Err(ReservationError::Timeout(self.deadline))
            }
        }
    }

    async fn purchase_in_transaction(&self, id: i64) -> Result<Ticket, ReservationError> {
        let mut tx = self.store.begin().await?;

        let ticket = match tx.lock_for_update(id).await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => return Err(abort(tx, ReservationError::NotFound(id)).await),
            Err(e) => return Err(abort(tx, e.into()).await),
        };

        if ticket.quota <= 0 {
            return Err(abort(tx, ReservationError::SoldOut(id)).await);
        }

        let updated = match tx.set_quota(id, ticket.quota - 1).await {
            Ok(updated) => updated,
            Err(e) => return Err(abort(tx, e.into()).await),
        };

        // A failed commit leaves nothing behind; the store discards the write.
        tx.commit().await?;

        record_purchase();
        info!(id, remaining = updated.quota, "Ticket purchased");
        Ok(updated)
    }
}

fn record_purchase() {
    metrics::counter!("api_counter", "method" => "POST", "endpoint" => BUY_ENDPOINT, "status" => "success").increment(1);
}

async fn abort(tx: Box<dyn TicketTransaction>, error: ReservationError) -> ReservationError {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback failed");
    }
    error
}
