#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRepository, AwardReceipt, ContentRepository, EntitlementRepository,
    InMemoryRepository, LedgerRepository, Storage, StorageError,
};
