use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{StoreError, TicketStore, TicketTransaction};
use crate::models::{NewTicket, Ticket};

const IDLE_CONNECTIONS: u32 = 10;
const CONNECTION_LIFETIME: Duration = Duration::from_secs(30 * 60);

const TICKET_COLUMNS: &str = "id, title, description, quota, price, created_at, updated_at";

#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = pool_options(max_connections).connect(database_url).await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(IDLE_CONNECTIONS.min(max_connections))
        .max_lifetime(CONNECTION_LIFETIME)
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find(&self, id: i64) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError> {
        let created = sqlx::query_as::<_, Ticket>(&format!(
            "INSERT INTO events (title, description, quota, price) VALUES ($1, $2, $3, $4) RETURNING {TICKET_COLUMNS}"
        ))
        .bind(&ticket.title)
        .bind(&ticket.description)
        .bind(ticket.quota)
        .bind(ticket.price)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn begin(&self) -> Result<Box<dyn TicketTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTicketTransaction { tx }))
    }
}

struct PgTicketTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TicketTransaction for PgTicketTransaction {
    async fn lock_for_update(&mut self, id: i64) -> Result<Option<Ticket>, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(ticket)
    }

    async fn set_quota(&mut self, id: i64, quota: i64) -> Result<Ticket, StoreError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!(
            "UPDATE events SET quota = $2, updated_at = NOW() WHERE id = $1 RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id)
        .bind(quota)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(ticket)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let PgTicketTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let PgTicketTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
