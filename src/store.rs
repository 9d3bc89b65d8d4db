//! Job store: per-job records plus the capacity counter, on one slatedb
//! handle opened once per process.
//!
//! Jobs live at `jobs/<uuid>`. A secondary index entry at
//! `status/<status>/<uuid>` (value: the uuid) keeps an ordered view of every
//! job in a given status, maintained in the same write batch as the record
//! itself.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use slatedb::{Db, DbIterator, WriteBatch};
use thiserror::Error;
use tracing::debug;

use crate::counter::{SlotCounter, SlotGrant};
use crate::job::{JobPatch, JobRecord, JobStatus};
use crate::keys::{job_key, prefix_end, status_key, status_prefix};
use crate::settings::AppConfig;
use crate::storage::{resolve_object_store, BackendError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] BackendError),
    #[error(transparent)]
    Slate(#[from] slatedb::Error),
    #[error("json serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("malformed continuation token: {0}")]
    BadToken(String),
    #[error("capacity counter record not found; store was never seeded")]
    CounterMissing,
}

/// One page of a status scan.
#[derive(Debug)]
pub struct ScanPage {
    pub items: Vec<JobRecord>,
    /// Present iff more matching items exist beyond this page.
    pub next_token: Option<String>,
}

/// Owns the slatedb instance and the capacity counter.
pub struct QueueStore {
    db: Arc<Db>,
    counter: SlotCounter,
}

impl QueueStore {
    /// Open the store and seed the capacity counter if it is absent.
    pub async fn open(cfg: &AppConfig) -> Result<Self, StoreError> {
        let resolved = resolve_object_store(&cfg.store.backend, &cfg.store.path)?;
        let db = slatedb::DbBuilder::new(resolved.canonical_path.as_str(), resolved.store)
            .build()
            .await?;
        let db = Arc::new(db);
        let counter = SlotCounter::new(Arc::clone(&db), cfg.counter.key.clone());
        counter.seed(cfg.counter.min, cfg.counter.max).await?;
        Ok(Self { db, counter })
    }

    /// Close the underlying slatedb instance gracefully.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.db.close().await.map_err(StoreError::from)
    }

    pub fn counter(&self) -> &SlotCounter {
        &self.counter
    }

    pub async fn acquire_slot(&self) -> Result<SlotGrant, StoreError> {
        self.counter.acquire().await
    }

    pub async fn release_slot(&self) -> Result<SlotGrant, StoreError> {
        self.counter.release().await
    }

    pub async fn get_job(&self, uuid: &str) -> Result<Option<JobRecord>, StoreError> {
        let maybe = self.db.get(job_key(uuid).as_bytes()).await?;
        match maybe {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    /// Merge `patch` into the job record, creating it if absent. Fields the
    /// patch leaves unset are preserved. Record and status index entry are
    /// written in one batch; a stale index entry for the previous status is
    /// deleted in the same batch.
    pub async fn upsert_job(&self, uuid: &str, patch: JobPatch) -> Result<JobRecord, StoreError> {
        let previous = self.get_job(uuid).await?;
        let prior_status = previous.as_ref().map(|r| r.status);

        let mut record = match previous {
            Some(record) => record,
            None => JobRecord::new(uuid, patch.status.unwrap_or(JobStatus::Queued)),
        };
        patch.apply(&mut record);

        let value = serde_json::to_vec(&record)?;
        let mut batch = WriteBatch::new();
        batch.put(job_key(uuid).as_bytes(), &value);
        if let Some(prior) = prior_status {
            if prior != record.status {
                batch.delete(status_key(prior, uuid).as_bytes());
            }
        }
        batch.put(status_key(record.status, uuid).as_bytes(), uuid.as_bytes());
        self.db.write(batch).await?;
        self.db.flush().await?;

        debug!(uuid = %uuid, status = %record.status, "upserted job");
        Ok(record)
    }

    /// Delete a job record and its index entry. Not part of the normal
    /// admission flow; kept for operational cleanup.
    pub async fn delete_job(&self, uuid: &str) -> Result<(), StoreError> {
        let existing = self.get_job(uuid).await?;
        let mut batch = WriteBatch::new();
        batch.delete(job_key(uuid).as_bytes());
        if let Some(record) = existing {
            batch.delete(status_key(record.status, uuid).as_bytes());
        }
        self.db.write(batch).await?;
        self.db.flush().await?;
        Ok(())
    }

    /// Return up to `page_size` jobs in `status`, ordered by the secondary
    /// index (status then uuid). `token` continues a previous scan; a token
    /// that does not decode fails with `BadToken`.
    pub async fn scan_by_status(
        &self,
        status: JobStatus,
        page_size: usize,
        ascending: bool,
        token: Option<&str>,
    ) -> Result<ScanPage, StoreError> {
        let prefix = status_prefix(status);
        let token_key = token.map(decode_token).transpose()?;

        let (uuids, next_key) = if ascending {
            self.scan_forward(prefix.as_bytes(), page_size, token_key)
                .await?
        } else {
            self.scan_backward(prefix.as_bytes(), page_size, token_key)
                .await?
        };

        let mut items = Vec::with_capacity(uuids.len());
        for uuid in uuids {
            // Hydrate from the primary record; skip entries whose record was
            // deleted between index write and this read.
            if let Some(record) = self.get_job(&uuid).await? {
                items.push(record);
            }
        }

        Ok(ScanPage {
            items,
            next_token: next_key.map(|k| encode_token(&k)),
        })
    }

    /// Forward index order: resume strictly after the token key.
    async fn scan_forward(
        &self,
        prefix: &[u8],
        page_size: usize,
        token_key: Option<Vec<u8>>,
    ) -> Result<(Vec<String>, Option<Vec<u8>>), StoreError> {
        let start = match token_key {
            Some(mut key) => {
                key.push(0);
                key
            }
            None => prefix.to_vec(),
        };
        let end = prefix_end(prefix);

        let mut iter: DbIterator = self.db.scan::<Vec<u8>, _>(start..end).await?;
        let mut uuids: Vec<String> = Vec::new();
        let mut last_key: Option<Vec<u8>> = None;
        let mut more = false;
        loop {
            let Some(kv) = iter.next().await? else { break };
            if uuids.len() == page_size {
                more = true;
                break;
            }
            uuids.push(String::from_utf8_lossy(&kv.value).to_string());
            last_key = Some(kv.key.to_vec());
        }

        Ok((uuids, if more { last_key } else { None }))
    }

    /// Reverse index order. slatedb iterates forward only, so the page is
    /// assembled from a bounded prefix scan ending before the token key.
    async fn scan_backward(
        &self,
        prefix: &[u8],
        page_size: usize,
        token_key: Option<Vec<u8>>,
    ) -> Result<(Vec<String>, Option<Vec<u8>>), StoreError> {
        let start = prefix.to_vec();
        let end = match token_key {
            Some(key) => key,
            None => prefix_end(prefix),
        };
        if end <= start {
            return Ok((Vec::new(), None));
        }

        let mut iter: DbIterator = self.db.scan::<Vec<u8>, _>(start..end).await?;
        let mut entries: Vec<(Vec<u8>, String)> = Vec::new();
        loop {
            let Some(kv) = iter.next().await? else { break };
            entries.push((
                kv.key.to_vec(),
                String::from_utf8_lossy(&kv.value).to_string(),
            ));
        }

        let more = entries.len() > page_size;
        let page: Vec<(Vec<u8>, String)> = entries
            .split_off(entries.len().saturating_sub(page_size))
            .into_iter()
            .rev()
            .collect();
        let next_key = if more {
            page.last().map(|(k, _)| k.clone())
        } else {
            None
        };
        let uuids = page.into_iter().map(|(_, uuid)| uuid).collect();
        Ok((uuids, next_key))
    }
}

fn encode_token(key: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(key)
}

fn decode_token(token: &str) -> Result<Vec<u8>, StoreError> {
    URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| StoreError::BadToken(e.to_string()))
}
