pub mod admission;
pub mod counter;
pub mod invoker;
pub mod job;
pub mod keys;
pub mod notify;
pub mod reconcile;
pub mod server;
pub mod settings;
pub mod storage;
pub mod store;
pub mod trace;

pub use admission::{AdmissionController, AdmissionError, AdmitOutcome, EnqueueOutcome};
pub use counter::SlotGrant;
pub use job::{JobRecord, JobStatus};
pub use store::{QueueStore, StoreError};
