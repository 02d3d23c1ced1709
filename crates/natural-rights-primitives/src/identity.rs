//! Deterministic identity primitives for tests.
//!
//! Encryption, transformation and decryption return their input unchanged,
//! key generation hands out sequential names, and signatures are a blake3
//! digest of the public key and text. Nothing here is secret. The provider
//! records every transform key it applies so tests can assert on the
//! delegation path the service chose.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use natural_rights_core::KeyPair;

use crate::error::Result;
use crate::traits::Primitives;

/// Derivation context for identity signatures.
const IDENTITY_SIGNATURE_CONTEXT: &str = "natural-rights 2024-01-01 identity signature v1";

/// Test double implementing [`Primitives`] without any cryptography.
#[derive(Debug, Default)]
pub struct IdentityPrimitives {
    counter: AtomicU64,
    transforms: Mutex<Vec<String>>,
}

impl IdentityPrimitives {
    pub fn new() -> Self {
        Self::default()
    }

    /// A named crypt key pair, for fixtures that want readable keys.
    pub fn crypt_keypair(name: &str) -> KeyPair {
        KeyPair::new(format!("crypt-pub-{name}"), format!("crypt-priv-{name}"))
    }

    /// A named sign key pair, for fixtures that want readable keys.
    pub fn sign_keypair(name: &str) -> KeyPair {
        KeyPair::new(format!("sign-pub-{name}"), format!("sign-priv-{name}"))
    }

    /// The transform key this provider generates from `from` to `to_pub_key`.
    pub fn transform_key(from_pub_key: &str, to_pub_key: &str) -> String {
        format!("transform:{from_pub_key}:{to_pub_key}")
    }

    /// The signature this provider produces, computable without a runtime.
    pub fn signature(pub_key: &str, text: &str) -> String {
        let mut hasher = blake3::Hasher::new_derive_key(IDENTITY_SIGNATURE_CONTEXT);
        hasher.update(&(pub_key.len() as u64).to_le_bytes());
        hasher.update(pub_key.as_bytes());
        hasher.update(text.as_bytes());
        format!("signed:{}", hex::encode(hasher.finalize().as_bytes()))
    }

    /// Transform keys applied so far, in order.
    pub fn applied_transforms(&self) -> Vec<String> {
        self.transforms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forget the recorded transforms.
    pub fn clear_transforms(&self) {
        self.transforms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[async_trait]
impl Primitives for IdentityPrimitives {
    async fn crypt_key_gen(&self) -> Result<KeyPair> {
        Ok(Self::crypt_keypair(&self.next().to_string()))
    }

    async fn crypt_transform_key_gen(
        &self,
        from: &KeyPair,
        to_pub_key: &str,
        _sign_keypair: &KeyPair,
    ) -> Result<String> {
        Ok(Self::transform_key(&from.pub_key, to_pub_key))
    }

    async fn sign_key_gen(&self) -> Result<KeyPair> {
        Ok(Self::sign_keypair(&self.next().to_string()))
    }

    async fn encrypt(&self, _pub_key: &str, plaintext: &str, _sign_keypair: &KeyPair) -> Result<String> {
        Ok(plaintext.to_owned())
    }

    async fn crypt_transform(
        &self,
        transform_key: &str,
        ciphertext: &str,
        _sign_keypair: &KeyPair,
    ) -> Result<String> {
        self.transforms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(transform_key.to_owned());
        Ok(ciphertext.to_owned())
    }

    async fn decrypt(&self, _keypair: &KeyPair, ciphertext: &str) -> Result<String> {
        Ok(ciphertext.to_owned())
    }

    async fn sign(&self, keypair: &KeyPair, text: &str) -> Result<String> {
        Ok(Self::signature(&keypair.pub_key, text))
    }

    async fn verify(&self, pub_key: &str, signature: &str, text: &str) -> Result<bool> {
        Ok(Self::signature(pub_key, text) == signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_are_sequential_and_distinct() {
        let p = IdentityPrimitives::new();
        let a = p.crypt_key_gen().await.unwrap();
        let b = p.sign_key_gen().await.unwrap();
        assert_eq!(a.pub_key, "crypt-pub-1");
        assert_eq!(b.pub_key, "sign-pub-2");
    }

    #[tokio::test]
    async fn test_transform_is_identity_and_logged() {
        let p = IdentityPrimitives::new();
        let signer = IdentityPrimitives::sign_keypair("svc");

        let out = p.crypt_transform("tk-1", "ct", &signer).await.unwrap();
        let out = p.crypt_transform("tk-2", &out, &signer).await.unwrap();

        assert_eq!(out, "ct");
        assert_eq!(p.applied_transforms(), vec!["tk-1", "tk-2"]);
        p.clear_transforms();
        assert!(p.applied_transforms().is_empty());
    }

    #[tokio::test]
    async fn test_signatures_bind_key_and_text() {
        let p = IdentityPrimitives::new();
        let kp = IdentityPrimitives::sign_keypair("c1");

        let sig = p.sign(&kp, "body").await.unwrap();
        assert!(p.verify(&kp.pub_key, &sig, "body").await.unwrap());
        assert!(!p.verify(&kp.pub_key, &sig, "body2").await.unwrap());
        assert!(!p.verify("sign-pub-c2", &sig, "body").await.unwrap());
    }
}
