//! Signed sealed boxes.
//!
//! A sealed box encrypts bytes to an X25519 public key: an ephemeral key
//! agreement feeds a blake3-derived ChaCha20-Poly1305 key. Every box is
//! signed by an Ed25519 key over its recipient, ephemeral key, nonce and
//! ciphertext, so a box cannot be re-addressed or altered in transit.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{PrimitivesError, Result};

/// Derivation context for box encryption keys.
const SEAL_KEY_CONTEXT: &str = "natural-rights 2024-01-01 sealed box key v1";

/// Domain prefix for box signatures.
const SEAL_SIGNATURE_DOMAIN: &[u8] = b"natural-rights/sealed-box/v1";

/// Generate a fresh X25519 secret.
pub fn generate_crypt_secret() -> StaticSecret {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    StaticSecret::from(bytes)
}

/// Public half of an X25519 secret.
pub fn crypt_public(secret: &StaticSecret) -> [u8; 32] {
    *PublicKey::from(secret).as_bytes()
}

/// Generate a fresh Ed25519 signing key.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

/// A ciphertext addressed to one X25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBox {
    /// Public key the box is addressed to.
    pub recipient: [u8; 32],

    /// Sender's side of the key agreement.
    pub ephemeral_public: [u8; 32],

    pub nonce: [u8; 12],

    pub ciphertext: Vec<u8>,

    /// Ed25519 public key of the signer.
    pub signer: [u8; 32],

    /// Ed25519 signature over [`SealedBox::signed_bytes`].
    pub signature: Vec<u8>,
}

impl SealedBox {
    /// Seal `plaintext` to `recipient` and sign the result.
    pub fn seal(plaintext: &[u8], recipient: &[u8; 32], signer: &SigningKey) -> Result<Self> {
        let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
        let ephemeral_public = *PublicKey::from(&ephemeral).as_bytes();
        let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient));

        let key = box_key(shared.as_bytes(), &ephemeral_public, recipient);
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| PrimitivesError::EncryptionError(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| PrimitivesError::EncryptionError(e.to_string()))?;

        let mut sealed = Self {
            recipient: *recipient,
            ephemeral_public,
            nonce,
            ciphertext,
            signer: signer.verifying_key().to_bytes(),
            signature: Vec::new(),
        };
        sealed.signature = signer.sign(&sealed.signed_bytes()).to_bytes().to_vec();
        Ok(sealed)
    }

    /// Check the box signature against its embedded signer.
    pub fn verify_signature(&self) -> Result<()> {
        let signer = VerifyingKey::from_bytes(&self.signer)
            .map_err(|e| PrimitivesError::SignatureError(e.to_string()))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|e| PrimitivesError::SignatureError(e.to_string()))?;
        signer
            .verify(&self.signed_bytes(), &signature)
            .map_err(|e| PrimitivesError::SignatureError(e.to_string()))
    }

    /// Verify and open the box with the recipient's secret.
    pub fn open(&self, secret: &StaticSecret) -> Result<Vec<u8>> {
        self.verify_signature()?;

        if crypt_public(secret) != self.recipient {
            return Err(PrimitivesError::DecryptionError(
                "box is addressed to a different key".into(),
            ));
        }

        let shared = secret.diffie_hellman(&PublicKey::from(self.ephemeral_public));
        let key = box_key(shared.as_bytes(), &self.ephemeral_public, &self.recipient);

        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|e| PrimitivesError::DecryptionError(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
            .map_err(|e| PrimitivesError::DecryptionError(e.to_string()))
    }

    fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            SEAL_SIGNATURE_DOMAIN.len() + 32 + 32 + 12 + self.ciphertext.len(),
        );
        bytes.extend_from_slice(SEAL_SIGNATURE_DOMAIN);
        bytes.extend_from_slice(&self.recipient);
        bytes.extend_from_slice(&self.ephemeral_public);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }
}

fn box_key(shared: &[u8; 32], ephemeral_public: &[u8; 32], recipient: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(SEAL_KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral_public);
    hasher.update(recipient);
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open() {
        let recipient = generate_crypt_secret();
        let signer = generate_signing_key();

        let sealed = SealedBox::seal(b"document key", &crypt_public(&recipient), &signer).unwrap();
        assert_eq!(sealed.open(&recipient).unwrap(), b"document key");
    }

    #[test]
    fn test_wrong_recipient_cannot_open() {
        let recipient = generate_crypt_secret();
        let other = generate_crypt_secret();
        let signer = generate_signing_key();

        let sealed = SealedBox::seal(b"secret", &crypt_public(&recipient), &signer).unwrap();
        assert!(sealed.open(&other).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let recipient = generate_crypt_secret();
        let signer = generate_signing_key();

        let mut sealed = SealedBox::seal(b"secret", &crypt_public(&recipient), &signer).unwrap();
        sealed.ciphertext[0] ^= 0xff;

        let err = sealed.open(&recipient).unwrap_err();
        assert!(matches!(err, PrimitivesError::SignatureError(_)));
    }

    #[test]
    fn test_readdressed_box_rejected() {
        let recipient = generate_crypt_secret();
        let attacker = generate_crypt_secret();
        let signer = generate_signing_key();

        let mut sealed = SealedBox::seal(b"secret", &crypt_public(&recipient), &signer).unwrap();
        sealed.recipient = crypt_public(&attacker);

        assert!(sealed.verify_signature().is_err());
    }
}
