//! # Natural Rights Store
//!
//! Storage abstraction for the Natural Rights key graph, with SQLite and
//! in-memory implementations.
//!
//! ## Overview
//!
//! The key graph is a set of versioned records: accounts, clients, groups
//! and documents. Edges (client bindings, memberships, admin copies and
//! grants) live inside the record that owns them. The [`GraphStore`] trait
//! exposes record reads, two lookup indexes, and an atomic batch commit with
//! per-record compare-and-swap.
//!
//! ## Key Types
//!
//! - [`GraphStore`] - The async trait for all storage operations
//! - [`GraphStoreExt`] - Typed getters for each record kind
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`WriteBatch`] / [`CommitResult`] - Optimistic atomic writes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use natural_rights_core::{AccountId, ClientId};
//! use natural_rights_store::{
//!     ClientRecord, CommitResult, GraphStore, GraphStoreExt, SqliteStore, WriteBatch,
//! };
//!
//! async fn example() -> natural_rights_store::Result<()> {
//!     let store = SqliteStore::open("graph.db")?;
//!
//!     let client = ClientRecord::enrolled(ClientId::from("client-sign-pub"));
//!     let result = store.commit(WriteBatch::new().insert(client)).await?;
//!     assert_eq!(result, CommitResult::Committed);
//!
//!     let stored = store.get_client(&ClientId::from("client-sign-pub")).await?;
//!     assert_eq!(stored.map(|c| c.version), Some(1));
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Compare-and-swap**: every write names the version it was computed
//!   from; a mismatch anywhere returns `Conflict` and applies nothing
//! - **Guards**: records that only authorized a batch are pinned to the
//!   version that was read
//! - **Unique crypt keys**: two accounts can never share a crypt public key
//! - **Derived indexes**: the SQLite membership index is rewritten with each
//!   group write, inside the same transaction

pub mod error;
pub mod memory;
pub mod migration;
pub mod records;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use records::{
    AccountRecord, ClientBinding, ClientRecord, DocumentRecord, Grant, Grantee, GroupRecord,
    Membership, Record, RecordKey, RecordKind, Versioned,
};
pub use sqlite::SqliteStore;
pub use traits::{CommitResult, GraphStore, GraphStoreExt, Guard, Write, WriteBatch};
