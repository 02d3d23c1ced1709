//! # Natural Rights
//!
//! An access-control service built on proxy re-encryption. Documents are
//! encrypted client side; the service stores the key graph that says who
//! may decrypt or sign what, and re-encrypts document keys toward the
//! requesting client without ever holding a private key in the clear.
//!
//! ## Overview
//!
//! A request names a client, carries a signature over its body, and lists
//! actions. The service:
//!
//! 1. Authenticates the client ([`RequestAuthenticator`]), enrolling
//!    unknown clients whose signature verifies under their own id
//! 2. Runs the actions in order ([`ActionDispatcher`]), each committing on
//!    its own and each getting its own result slot
//! 3. Authorizes every action by walking the key graph from the client
//!    ([`Reach`]): `Client → Account → Group → Document`
//!
//! ## Key Types
//!
//! - [`NaturalRightsService`] - Entry point: request in, response out
//! - [`ActionHandlers`] - One handler per action kind
//! - [`ServiceConfig`] - Enrollment policy and limits
//!
//! ## Usage
//!
//! ```rust,no_run
//! use natural_rights::{NaturalRightsService, ServiceConfig};
//! use natural_rights::core::Request;
//! use natural_rights::primitives::KeyWrapPrimitives;
//! use natural_rights::store::SqliteStore;
//!
//! async fn example(request: Request) -> natural_rights::Result<()> {
//!     let store = SqliteStore::open("rights.db")?;
//!     let service =
//!         NaturalRightsService::new(store, KeyWrapPrimitives::new(), ServiceConfig::default())
//!             .await?;
//!
//!     let response = service.handle_request(&request).await?;
//!     for result in &response.results {
//!         println!("{:?}: {}", result.action_type, result.success);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `natural_rights::core` - Ids, actions, results, request envelope
//! - `natural_rights::primitives` - The cryptographic provider boundary
//! - `natural_rights::store` - Key graph storage, memory and SQLite

pub mod auth;
pub mod authz;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod service;

pub use natural_rights_core as core;
pub use natural_rights_primitives as primitives;
pub use natural_rights_store as store;

pub use auth::{resolve_identity, ActingIdentity, RequestAuthenticator};
pub use authz::{Principal, Reach};
pub use config::ServiceConfig;
pub use dispatch::ActionDispatcher;
pub use error::{ActionError, AuthError, HandlerResult, Result, ServiceError};
pub use handlers::ActionHandlers;
pub use service::NaturalRightsService;

pub use natural_rights_core::{
    Action, ActionResult, ActionType, ErrorKind, KeyPair, Request, Response,
};
