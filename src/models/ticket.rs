use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A sellable event with a remaining quota. Stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub quota: i64,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub quota: i64,
    pub price: i64,
}

impl NewTicket {
    /// The record created on first boot when ticket 1 does not exist yet.
    pub fn seed() -> Self {
        Self {
            title: "Coldplay Jakarta".to_string(),
            description: "Coldplay's first concert in Indonesia".to_string(),
            quota: 1_000_000,
            price: 800_000,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.quota < 0 {
            return Err("quota must not be negative".to_string());
        }
        if self.price < 0 {
            return Err("price must not be negative".to_string());
        }
        Ok(())
    }
}
