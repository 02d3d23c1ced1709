//! # Natural Rights Testkit
//!
//! Testing utilities for the Natural Rights service.
//!
//! ## Overview
//!
//! - **Fixtures**: a service over an in-memory graph and identity
//!   primitives, clients that sign their own requests, and payload builders
//!   with readable keys
//! - **Generators**: proptest strategies for ids and whole action batches
//!
//! ## Test Fixtures
//!
//! ```rust
//! use natural_rights::core::Action;
//! use natural_rights_testkit::fixtures::{document_payload, TestClient, TestFixture};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let fixture = TestFixture::new();
//! let alice = TestClient::new("alice");
//! fixture.bootstrap(&alice, "a1").await;
//!
//! let response = fixture
//!     .send(&alice, vec![Action::CreateDocument(document_payload("notes", "a1", "a1"))])
//!     .await;
//! assert!(response.all_succeeded());
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use natural_rights_testkit::generators::batch;
//!
//! proptest! {
//!     #[test]
//!     fn one_result_per_action(actions in batch(16)) {
//!         // run the batch, compare lengths
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    account_payload, document_payload, group_payload, root_document_id, transform_key,
    TestClient, TestFixture, TestService,
};
pub use generators::{action, batch};
