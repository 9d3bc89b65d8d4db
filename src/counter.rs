//! Capacity counter: a single persisted record gating downstream concurrency.
//!
//! Invariant: `min <= count <= max` at all times. `acquire` and `release`
//! refuse any mutation that would leave the bound, and report that refusal
//! as `SlotGrant::OutOfRange` rather than an error. Any other failure
//! (missing record, storage, decode) propagates as `StoreError` so callers
//! can tell capacity exhaustion apart from a broken store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slatedb::{Db, WriteBatch};
use tokio::sync::Mutex;

use crate::store::StoreError;

/// Outcome of a conditional counter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotGrant {
    /// The mutation applied; carries the new count.
    Granted(i64),
    /// The bound would have been violated; nothing was written.
    OutOfRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterRecord {
    pub count: i64,
    pub min: i64,
    pub max: i64,
}

pub struct SlotCounter {
    db: Arc<Db>,
    key: String,
    // Counter mutations serialize through this gate so the bound check and
    // the write land as a single conditional operation against the store.
    gate: Mutex<()>,
}

impl SlotCounter {
    pub fn new(db: Arc<Db>, key: String) -> Self {
        Self {
            db,
            key,
            gate: Mutex::new(()),
        }
    }

    /// Write `{count: 0, min, max}` iff no counter record exists yet.
    pub async fn seed(&self, min: i64, max: i64) -> Result<(), StoreError> {
        let _g = self.gate.lock().await;
        if self.db.get(self.key.as_bytes()).await?.is_some() {
            return Ok(());
        }
        let record = CounterRecord { count: 0, min, max };
        self.put(&record).await
    }

    /// Atomically increment `count` when `count < max`.
    pub async fn acquire(&self) -> Result<SlotGrant, StoreError> {
        let _g = self.gate.lock().await;
        let mut record = self.load().await?;
        if record.count >= record.max {
            return Ok(SlotGrant::OutOfRange);
        }
        record.count += 1;
        self.put(&record).await?;
        Ok(SlotGrant::Granted(record.count))
    }

    /// Atomically decrement `count` when `count > min`.
    pub async fn release(&self) -> Result<SlotGrant, StoreError> {
        let _g = self.gate.lock().await;
        let mut record = self.load().await?;
        if record.count <= record.min {
            return Ok(SlotGrant::OutOfRange);
        }
        record.count -= 1;
        self.put(&record).await?;
        Ok(SlotGrant::Granted(record.count))
    }

    /// Read the current record without mutating it.
    pub async fn read(&self) -> Result<CounterRecord, StoreError> {
        self.load().await
    }

    async fn load(&self) -> Result<CounterRecord, StoreError> {
        let raw = self
            .db
            .get(self.key.as_bytes())
            .await?
            .ok_or(StoreError::CounterMissing)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn put(&self, record: &CounterRecord) -> Result<(), StoreError> {
        let value = serde_json::to_vec(record)?;
        let mut batch = WriteBatch::new();
        batch.put(self.key.as_bytes(), &value);
        self.db.write(batch).await?;
        self.db.flush().await?;
        Ok(())
    }
}
