//! The primitives boundary.
//!
//! The service orchestrates these calls but never inspects what flows
//! through them: keys, transform keys, ciphertexts and signatures are all
//! opaque strings. Every call is async because real providers may be slow
//! or remote, and callers must never hold a store lock across one.

use std::sync::Arc;

use async_trait::async_trait;
use natural_rights_core::KeyPair;

use crate::error::Result;

/// Proxy re-encryption and signature primitives.
#[async_trait]
pub trait Primitives: Send + Sync {
    /// Generate a transformable encryption key pair.
    async fn crypt_key_gen(&self) -> Result<KeyPair>;

    /// Generate a transform key from one key pair to another public key.
    async fn crypt_transform_key_gen(
        &self,
        from: &KeyPair,
        to_pub_key: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String>;

    /// Generate a signing key pair.
    async fn sign_key_gen(&self) -> Result<KeyPair>;

    /// Encrypt a plaintext to a public key.
    async fn encrypt(&self, pub_key: &str, plaintext: &str, sign_keypair: &KeyPair)
        -> Result<String>;

    /// Re-encrypt a ciphertext with a transform key.
    async fn crypt_transform(
        &self,
        transform_key: &str,
        ciphertext: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String>;

    /// Decrypt a ciphertext, following any transforms applied to it.
    async fn decrypt(&self, keypair: &KeyPair, ciphertext: &str) -> Result<String>;

    /// Sign a text.
    async fn sign(&self, keypair: &KeyPair, text: &str) -> Result<String>;

    /// Verify a signature. Malformed inputs verify as `false`.
    async fn verify(&self, pub_key: &str, signature: &str, text: &str) -> Result<bool>;
}

#[async_trait]
impl<P: Primitives + ?Sized> Primitives for Arc<P> {
    async fn crypt_key_gen(&self) -> Result<KeyPair> {
        (**self).crypt_key_gen().await
    }

    async fn crypt_transform_key_gen(
        &self,
        from: &KeyPair,
        to_pub_key: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String> {
        (**self)
            .crypt_transform_key_gen(from, to_pub_key, sign_keypair)
            .await
    }

    async fn sign_key_gen(&self) -> Result<KeyPair> {
        (**self).sign_key_gen().await
    }

    async fn encrypt(
        &self,
        pub_key: &str,
        plaintext: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String> {
        (**self).encrypt(pub_key, plaintext, sign_keypair).await
    }

    async fn crypt_transform(
        &self,
        transform_key: &str,
        ciphertext: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String> {
        (**self)
            .crypt_transform(transform_key, ciphertext, sign_keypair)
            .await
    }

    async fn decrypt(&self, keypair: &KeyPair, ciphertext: &str) -> Result<String> {
        (**self).decrypt(keypair, ciphertext).await
    }

    async fn sign(&self, keypair: &KeyPair, text: &str) -> Result<String> {
        (**self).sign(keypair, text).await
    }

    async fn verify(&self, pub_key: &str, signature: &str, text: &str) -> Result<bool> {
        (**self).verify(pub_key, signature, text).await
    }
}
