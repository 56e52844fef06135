//! # camp-storage
//!
//! Keyed byte storage for uploaded documents (signed venue contracts and the
//! like). Keys are relative, slash-separated paths; backends must refuse
//! anything that could escape their root.

pub mod keys;
pub mod storage;

pub use keys::contract_document_key;
pub use storage::{
    storage_from_config, FileMetadata, LocalStorage, MemoryStorage, Storage, StorageError,
    StorageResult,
};
