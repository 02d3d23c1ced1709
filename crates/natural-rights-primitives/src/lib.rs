//! # Natural Rights Primitives
//!
//! The cryptographic boundary of the Natural Rights service.
//!
//! ## Overview
//!
//! The service never performs cryptography itself. It asks a [`Primitives`]
//! provider to generate keys, build transform keys, re-encrypt ciphertexts
//! along a delegation chain and sign or verify texts. Everything crossing
//! the boundary is an opaque string, so providers can be swapped freely.
//!
//! ## Providers
//!
//! - [`KeyWrapPrimitives`] - X25519 + ChaCha20-Poly1305 key wrapping with
//!   Ed25519 signatures. Transform keys wrap the delegator's secret for the
//!   delegatee; ciphertexts collect one layer per transform.
//! - [`IdentityPrimitives`] - Deterministic test double. Ciphertexts pass
//!   through unchanged and applied transform keys are recorded.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use natural_rights_primitives::{KeyWrapPrimitives, Primitives};
//!
//! # async fn demo() -> natural_rights_primitives::Result<()> {
//! let p = KeyWrapPrimitives::new();
//! let signer = p.sign_key_gen().await?;
//! let doc = p.crypt_key_gen().await?;
//! let reader = p.crypt_key_gen().await?;
//!
//! let tk = p.crypt_transform_key_gen(&doc, &reader.pub_key, &signer).await?;
//! let ct = p.encrypt(&doc.pub_key, "secret", &signer).await?;
//! let ct = p.crypt_transform(&tk, &ct, &signer).await?;
//! assert_eq!(p.decrypt(&reader, &ct).await?, "secret");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;
pub mod keywrap;
pub mod sealed;
pub mod traits;

pub use error::{PrimitivesError, Result};
pub use identity::IdentityPrimitives;
pub use keywrap::KeyWrapPrimitives;
pub use sealed::SealedBox;
pub use traits::Primitives;
