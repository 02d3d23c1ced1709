//! Key-wrapping proxy re-encryption.
//!
//! [`KeyWrapPrimitives`] realizes the primitives boundary with X25519,
//! ChaCha20-Poly1305 and Ed25519:
//!
//! - A crypt key pair is an X25519 secret and its public key, hex encoded.
//! - A sign key pair is an Ed25519 seed and its verifying key, hex encoded.
//! - A transform key from `A` to `B` is `A`'s secret sealed to `B`.
//! - Transforming a ciphertext wraps it together with the transform key.
//!   The ciphertext body is never re-encrypted, so the proxy learns nothing,
//!   and the holder of `B`'s secret unwraps layer by layer.
//!
//! Ciphertexts and transform keys travel as hex-encoded CBOR.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use natural_rights_core::KeyPair;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use x25519_dalek::StaticSecret;

use crate::error::{PrimitivesError, Result};
use crate::sealed::{crypt_public, generate_crypt_secret, generate_signing_key, SealedBox};
use crate::traits::Primitives;

/// A delegation from one crypt key to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TransformKey {
    from: [u8; 32],
    to: [u8; 32],
    sealed_secret: SealedBox,
}

impl TransformKey {
    /// Recover the delegator's secret with the delegatee's secret.
    fn open(&self, secret: &StaticSecret) -> Result<StaticSecret> {
        let bytes = self.sealed_secret.open(secret)?;
        let from = StaticSecret::from(to_key_bytes(&bytes)?);
        if crypt_public(&from) != self.from {
            return Err(PrimitivesError::TransformMismatch(
                "transform key does not carry the secret it claims".into(),
            ));
        }
        Ok(from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
enum Ciphertext {
    Sealed(SealedBox),
    Transformed {
        transform_key: TransformKey,
        inner: Box<Ciphertext>,
    },
}

impl Ciphertext {
    /// The key that can currently open this ciphertext.
    fn recipient(&self) -> [u8; 32] {
        match self {
            Ciphertext::Sealed(sealed) => sealed.recipient,
            Ciphertext::Transformed { transform_key, .. } => transform_key.to,
        }
    }

    fn open(&self, secret: &StaticSecret) -> Result<Vec<u8>> {
        match self {
            Ciphertext::Sealed(sealed) => sealed.open(secret),
            Ciphertext::Transformed {
                transform_key,
                inner,
            } => {
                let from = transform_key.open(secret)?;
                inner.open(&from)
            }
        }
    }
}

/// Production primitives provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyWrapPrimitives;

impl KeyWrapPrimitives {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Primitives for KeyWrapPrimitives {
    async fn crypt_key_gen(&self) -> Result<KeyPair> {
        let secret = generate_crypt_secret();
        Ok(KeyPair::new(
            hex::encode(crypt_public(&secret)),
            hex::encode(secret.to_bytes()),
        ))
    }

    async fn crypt_transform_key_gen(
        &self,
        from: &KeyPair,
        to_pub_key: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String> {
        let secret = crypt_secret(from)?;
        let to = decode_key(to_pub_key)?;
        let signer = signing_key(sign_keypair)?;

        let transform_key = TransformKey {
            from: crypt_public(&secret),
            to,
            sealed_secret: SealedBox::seal(&secret.to_bytes(), &to, &signer)?,
        };
        encode(&transform_key)
    }

    async fn sign_key_gen(&self) -> Result<KeyPair> {
        let key = generate_signing_key();
        Ok(KeyPair::new(
            hex::encode(key.verifying_key().to_bytes()),
            hex::encode(key.to_bytes()),
        ))
    }

    async fn encrypt(
        &self,
        pub_key: &str,
        plaintext: &str,
        sign_keypair: &KeyPair,
    ) -> Result<String> {
        let recipient = decode_key(pub_key)?;
        let signer = signing_key(sign_keypair)?;
        let sealed = SealedBox::seal(plaintext.as_bytes(), &recipient, &signer)?;
        encode(&Ciphertext::Sealed(sealed))
    }

    async fn crypt_transform(
        &self,
        transform_key: &str,
        ciphertext: &str,
        _sign_keypair: &KeyPair,
    ) -> Result<String> {
        let transform_key: TransformKey = decode(transform_key)
            .map_err(|e| PrimitivesError::InvalidKey(format!("transform key: {e}")))?;
        let ciphertext: Ciphertext =
            decode(ciphertext).map_err(|e| PrimitivesError::InvalidCiphertext(e.to_string()))?;

        if ciphertext.recipient() != transform_key.from {
            return Err(PrimitivesError::TransformMismatch(format!(
                "ciphertext is addressed to {}, transform key starts at {}",
                hex::encode(ciphertext.recipient()),
                hex::encode(transform_key.from)
            )));
        }

        encode(&Ciphertext::Transformed {
            transform_key,
            inner: Box::new(ciphertext),
        })
    }

    async fn decrypt(&self, keypair: &KeyPair, ciphertext: &str) -> Result<String> {
        let secret = crypt_secret(keypair)?;
        let ciphertext: Ciphertext =
            decode(ciphertext).map_err(|e| PrimitivesError::InvalidCiphertext(e.to_string()))?;

        let plaintext = ciphertext.open(&secret)?;
        String::from_utf8(plaintext).map_err(|e| PrimitivesError::DecryptionError(e.to_string()))
    }

    async fn sign(&self, keypair: &KeyPair, text: &str) -> Result<String> {
        let key = signing_key(keypair)?;
        Ok(hex::encode(key.sign(text.as_bytes()).to_bytes()))
    }

    async fn verify(&self, pub_key: &str, signature: &str, text: &str) -> Result<bool> {
        let Ok(key_bytes) = decode_key(pub_key) else {
            return Ok(false);
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return Ok(false);
        };
        let Ok(sig_bytes) = hex::decode(signature) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::from_slice(&sig_bytes) else {
            return Ok(false);
        };
        Ok(key.verify(text.as_bytes(), &signature).is_ok())
    }
}

fn to_key_bytes(bytes: &[u8]) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| PrimitivesError::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))
}

fn decode_key(encoded: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(encoded).map_err(|e| PrimitivesError::InvalidKey(e.to_string()))?;
    to_key_bytes(&bytes)
}

/// Decode a crypt secret and check it matches the public half.
fn crypt_secret(keypair: &KeyPair) -> Result<StaticSecret> {
    let secret = StaticSecret::from(decode_key(&keypair.priv_key)?);
    if crypt_public(&secret) != decode_key(&keypair.pub_key)? {
        return Err(PrimitivesError::InvalidKey(
            "private key does not match public key".into(),
        ));
    }
    Ok(secret)
}

fn signing_key(keypair: &KeyPair) -> Result<SigningKey> {
    let key = SigningKey::from_bytes(&decode_key(&keypair.priv_key)?);
    if key.verifying_key().to_bytes() != decode_key(&keypair.pub_key)? {
        return Err(PrimitivesError::InvalidKey(
            "signing key does not match public key".into(),
        ));
    }
    Ok(key)
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| PrimitivesError::SerializationError(e.to_string()))?;
    Ok(hex::encode(buf))
}

fn decode<T: DeserializeOwned>(encoded: &str) -> Result<T> {
    let bytes =
        hex::decode(encoded).map_err(|e| PrimitivesError::SerializationError(e.to_string()))?;
    ciborium::from_reader(bytes.as_slice())
        .map_err(|e| PrimitivesError::SerializationError(e.to_string()))
}
