//! Signature schemes keyed by numeric scheme id.
//!
//! Microblocks are sealed by [`PrivateSignatureKey`] implementations and
//! verified through [`PublicSignatureKey`]. The scheme id travels inside the
//! signature section, and [`public_key_from_bytes`] dispatches on it.

use std::fmt;

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::{Signer as _, Verifier as _};

use crate::error::{CoreError, Result};

/// Numeric identifier of a signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignatureSchemeId {
    /// ECDSA over secp256k1 with SHA-256 message hashing.
    Secp256k1 = 0,
    /// ML-DSA, Dilithium level 3 parameter set.
    MlDsa65 = 1,
    /// Ed25519.
    Ed25519 = 2,
}

impl SignatureSchemeId {
    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Secp256k1),
            1 => Some(Self::MlDsa65),
            2 => Some(Self::Ed25519),
            _ => None,
        }
    }
}

impl fmt::Display for SignatureSchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secp256k1 => f.write_str("secp256k1"),
            Self::MlDsa65 => f.write_str("ml-dsa-65"),
            Self::Ed25519 => f.write_str("ed25519"),
        }
    }
}

/// A key able to produce signatures.
pub trait PrivateSignatureKey: Send + Sync {
    /// The scheme of this key.
    fn scheme_id(&self) -> SignatureSchemeId;

    /// Sign a message, returning the raw signature bytes.
    fn sign(&self, message: &[u8]) -> Vec<u8>;

    /// The matching public key.
    fn public_key(&self) -> Box<dyn PublicSignatureKey>;
}

/// A key able to verify signatures.
pub trait PublicSignatureKey: Send + Sync {
    /// The scheme of this key.
    fn scheme_id(&self) -> SignatureSchemeId;

    /// Verify a signature. Malformed signatures verify as `false`.
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;

    /// Encoded public key bytes.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Rebuild a public key from its scheme id and encoded bytes.
pub fn public_key_from_bytes(
    scheme_id: u8,
    bytes: &[u8],
) -> Result<Box<dyn PublicSignatureKey>> {
    match SignatureSchemeId::from_u8(scheme_id) {
        Some(SignatureSchemeId::Secp256k1) => {
            Ok(Box::new(Secp256k1PublicKey::from_sec1_bytes(bytes)?))
        }
        Some(SignatureSchemeId::Ed25519) => Ok(Box::new(Ed25519PublicKey::from_slice(bytes)?)),
        #[cfg(feature = "ml-dsa")]
        Some(SignatureSchemeId::MlDsa65) => Ok(Box::new(ml_dsa::MlDsa65PublicKey::from_slice(
            bytes,
        )?)),
        _ => Err(CoreError::UnsupportedSignatureScheme(scheme_id)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// secp256k1
// ─────────────────────────────────────────────────────────────────────────────

/// secp256k1 ECDSA signing key. Signatures are 64-byte `r || s`.
#[derive(Clone)]
pub struct Secp256k1PrivateKey {
    signing_key: k256::ecdsa::SigningKey,
}

impl Secp256k1PrivateKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let signing_key = k256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = k256::ecdsa::SigningKey::from_bytes(bytes.into())
            .map_err(|_| CoreError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// The verifying half of this key.
    pub fn verifying_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey {
            verifying_key: *self.signing_key.verifying_key(),
        }
    }
}

impl PrivateSignatureKey for Secp256k1PrivateKey {
    fn scheme_id(&self) -> SignatureSchemeId {
        SignatureSchemeId::Secp256k1
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: k256::ecdsa::Signature = self.signing_key.sign(message);
        signature.to_bytes().to_vec()
    }

    fn public_key(&self) -> Box<dyn PublicSignatureKey> {
        Box::new(self.verifying_key())
    }
}

impl fmt::Debug for Secp256k1PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PrivateKey({:?})", self.verifying_key())
    }
}

/// secp256k1 ECDSA verifying key, encoded as a compressed SEC1 point.
#[derive(Clone, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    verifying_key: k256::ecdsa::VerifyingKey,
}

impl Secp256k1PublicKey {
    /// Parse a SEC1-encoded point (compressed or not).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self { verifying_key })
    }
}

impl PublicSignatureKey for Secp256k1PublicKey {
    fn scheme_id(&self) -> SignatureSchemeId {
        SignatureSchemeId::Secp256k1
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match k256::ecdsa::Signature::from_slice(signature) {
            Ok(sig) => self.verifying_key.verify(message, &sig).is_ok(),
            Err(_) => false,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.verifying_key.to_encoded_point(true).as_bytes().to_vec()
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1Pub({})", &hex::encode(self.to_bytes())[..16])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ed25519
// ─────────────────────────────────────────────────────────────────────────────

/// Ed25519 signing key.
#[derive(Clone)]
pub struct Ed25519PrivateKey {
    signing_key: ed25519_dalek::SigningKey,
}

impl Ed25519PrivateKey {
    /// Generate a random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The verifying half of this key.
    pub fn verifying_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }
}

impl PrivateSignatureKey for Ed25519PrivateKey {
    fn scheme_id(&self) -> SignatureSchemeId {
        SignatureSchemeId::Ed25519
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    fn public_key(&self) -> Box<dyn PublicSignatureKey> {
        Box::new(self.verifying_key())
    }
}

impl fmt::Debug for Ed25519PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519PrivateKey({:?})", self.verifying_key())
    }
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

impl Ed25519PublicKey {
    /// Parse from a 32-byte slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(Self(arr))
    }
}

impl PublicSignatureKey for Ed25519PublicKey {
    fn scheme_id(&self) -> SignatureSchemeId {
        SignatureSchemeId::Ed25519
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(message, &sig).is_ok()
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Pub({})", &hex::encode(self.0)[..16])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ML-DSA
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "ml-dsa")]
pub use ml_dsa::{MlDsa65PrivateKey, MlDsa65PublicKey};

#[cfg(feature = "ml-dsa")]
mod ml_dsa {
    use pqcrypto_dilithium::dilithium3;
    use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};

    use super::{PrivateSignatureKey, PublicSignatureKey, SignatureSchemeId};
    use crate::error::{CoreError, Result};

    /// ML-DSA signing key (Dilithium level 3).
    #[derive(Clone)]
    pub struct MlDsa65PrivateKey {
        public_key: dilithium3::PublicKey,
        secret_key: dilithium3::SecretKey,
    }

    impl MlDsa65PrivateKey {
        /// Generate a random key pair.
        pub fn generate() -> Self {
            let (public_key, secret_key) = dilithium3::keypair();
            Self {
                public_key,
                secret_key,
            }
        }
    }

    impl PrivateSignatureKey for MlDsa65PrivateKey {
        fn scheme_id(&self) -> SignatureSchemeId {
            SignatureSchemeId::MlDsa65
        }

        fn sign(&self, message: &[u8]) -> Vec<u8> {
            dilithium3::detached_sign(message, &self.secret_key)
                .as_bytes()
                .to_vec()
        }

        fn public_key(&self) -> Box<dyn PublicSignatureKey> {
            Box::new(MlDsa65PublicKey(self.public_key.clone()))
        }
    }

    /// ML-DSA verifying key.
    #[derive(Clone)]
    pub struct MlDsa65PublicKey(dilithium3::PublicKey);

    impl MlDsa65PublicKey {
        /// Parse from encoded bytes.
        pub fn from_slice(bytes: &[u8]) -> Result<Self> {
            dilithium3::PublicKey::from_bytes(bytes)
                .map(Self)
                .map_err(|_| CoreError::InvalidPublicKey)
        }
    }

    impl PublicSignatureKey for MlDsa65PublicKey {
        fn scheme_id(&self) -> SignatureSchemeId {
            SignatureSchemeId::MlDsa65
        }

        fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
            match dilithium3::DetachedSignature::from_bytes(signature) {
                Ok(sig) => dilithium3::verify_detached_signature(&sig, message, &self.0).is_ok(),
                Err(_) => false,
            }
        }

        fn to_bytes(&self) -> Vec<u8> {
            self.0.as_bytes().to_vec()
        }
    }
}
