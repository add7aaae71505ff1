use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{StoreError, TicketStore, TicketTransaction};
use crate::models::{NewTicket, Ticket};

/// Process-local ticket store.
///
/// Every row has its own lock, so transactions on different ids never wait
/// on each other, and plain reads see the last committed value without
/// touching the row lock. With the `test-util` feature, faults and latency
/// can be injected to exercise the failure paths of callers.
#[derive(Clone, Default)]
pub struct InMemoryTicketStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: RwLock<BTreeMap<i64, Arc<Row>>>,
    last_id: AtomicI64,
    fail_commits: AtomicBool,
    fail_writes: AtomicBool,
    write_latency_ms: AtomicU64,
}

struct Row {
    lock: Arc<Mutex<()>>,
    committed: RwLock<Ticket>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps inside every quota write, between the locked read and the update.
    #[cfg(any(test, feature = "test-util"))]
    pub fn set_write_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.inner.write_latency_ms.store(millis, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_commits(&self, fail: bool) {
        self.inner.fail_commits.store(fail, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrites a quota the way an operator would: waits for the row lock.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn force_quota(&self, id: i64, quota: i64) -> Result<(), StoreError> {
        let row = self
            .row(id)
            .await
            .ok_or_else(|| StoreError::Unavailable(format!("no event with id {id}")))?;

        let _guard = row.lock.lock().await;
        let mut committed = row.committed.write().await;
        committed.quota = quota;
        committed.updated_at = Utc::now();
        Ok(())
    }

    async fn row(&self, id: i64) -> Option<Arc<Row>> {
        self.inner.rows.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn find(&self, id: i64) -> Result<Option<Ticket>, StoreError> {
        match self.row(id).await {
            Some(row) => Ok(Some(row.committed.read().await.clone())),
            None => Ok(None),
        }
    }

    async fn insert(&self, ticket: &NewTicket) -> Result<Ticket, StoreError> {
        if ticket.quota < 0 || ticket.price < 0 {
            return Err(StoreError::Constraint("quota and price must be >= 0".to_string()));
        }

        let now = Utc::now();
        let id = self.inner.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = Ticket {
            id,
            title: ticket.title.clone(),
            description: ticket.description.clone(),
            quota: ticket.quota,
            price: ticket.price,
            created_at: now,
            updated_at: now,
        };

        let row = Row {
            lock: Arc::new(Mutex::new(())),
            committed: RwLock::new(created.clone()),
        };
        self.inner.rows.write().await.insert(id, Arc::new(row));

        Ok(created)
    }

    async fn begin(&self) -> Result<Box<dyn TicketTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            locked: HashMap::new(),
            staged: HashMap::new(),
        }))
    }
}

struct InMemoryTransaction {
    store: InMemoryTicketStore,
    locked: HashMap<i64, (Arc<Row>, OwnedMutexGuard<()>)>,
    staged: HashMap<i64, Ticket>,
}

#[async_trait]
impl TicketTransaction for InMemoryTransaction {
    async fn lock_for_update(&mut self, id: i64) -> Result<Option<Ticket>, StoreError> {
        if let Some(staged) = self.staged.get(&id) {
            return Ok(Some(staged.clone()));
        }
        if let Some((row, _)) = self.locked.get(&id) {
            return Ok(Some(row.committed.read().await.clone()));
        }

        let Some(row) = self.store.row(id).await else {
            return Ok(None);
        };

        let guard = Arc::clone(&row.lock).lock_owned().await;
        let ticket = row.committed.read().await.clone();
        self.locked.insert(id, (row, guard));

        Ok(Some(ticket))
    }

    async fn set_quota(&mut self, id: i64, quota: i64) -> Result<Ticket, StoreError> {
        let latency = self.store.inner.write_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.store.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        if quota < 0 {
            return Err(StoreError::Constraint(format!("quota for event {id} would be {quota}")));
        }

        let current = match self.staged.get(&id) {
            Some(staged) => staged.clone(),
            None => {
                let (row, _) = self
                    .locked
                    .get(&id)
                    .ok_or_else(|| StoreError::Unavailable(format!("event {id} is not locked by this transaction")))?;
                row.committed.read().await.clone()
            }
        };

        let updated = Ticket {
            quota,
            updated_at: Utc::now(),
            ..current
        };
        self.staged.insert(id, updated.clone());

        Ok(updated)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.store.inner.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }

        let InMemoryTransaction { locked, mut staged, .. } = *self;
        for (id, (row, guard)) in locked {
            if let Some(ticket) = staged.remove(&id) {
                *row.committed.write().await = ticket;
            }
            drop(guard);
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
