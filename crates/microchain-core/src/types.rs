//! Strong type definitions for microchain.
//!
//! Digests and account references are newtypes over 32-byte arrays so they
//! cannot be swapped by accident, and serialize as CBOR byte strings.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte SHA-256 digest.
///
/// Used for body hashes, microblock hashes and previous-hash links.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The all-zero digest.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha256Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Sha256Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Sha256Hash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Identifier of a virtual blockchain: the hash of its genesis microblock.
pub type VirtualBlockchainId = Sha256Hash;

/// A 32-byte account reference, as carried in the header's fees-payer field.
///
/// The all-zero value is the null sentinel meaning "unset".
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The null account (fees payer not set).
    pub const NULL: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the null sentinel.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "AccountId(null)")
        } else {
            write!(f, "AccountId({})", &self.to_hex()[..16])
        }
    }
}

impl From<Sha256Hash> for AccountId {
    /// Accounts are virtual blockchains, so their id is a genesis hash.
    fn from(hash: Sha256Hash) -> Self {
        Self(hash.0)
    }
}

/// Visitor accepting exactly 32 bytes from a byte string.
struct Bytes32Visitor;

impl<'de> de::Visitor<'de> for Bytes32Visitor {
    type Value = [u8; 32];

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 32-byte string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        v.try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        self.visit_bytes(&v)
    }
}

macro_rules! bytes32_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_bytes(Bytes32Visitor).map($ty)
            }
        }
    };
}

bytes32_serde!(Sha256Hash);
bytes32_serde!(AccountId);

/// The kind of a virtual blockchain, which is also the microblock type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum VirtualBlockchainType {
    /// Protocol parameters chain.
    Protocol = 0,
    /// Token account.
    Account = 1,
    /// Validator node registration.
    ValidatorNode = 2,
    /// Organization identity.
    Organization = 3,
    /// Application definition.
    Application = 4,
    /// Per-use ledger of an application (actors, channels, data).
    ApplicationLedger = 5,
}

impl VirtualBlockchainType {
    /// All known types, in discriminant order.
    pub const ALL: [Self; 6] = [
        Self::Protocol,
        Self::Account,
        Self::ValidatorNode,
        Self::Organization,
        Self::Application,
        Self::ApplicationLedger,
    ];

    /// Convert to u8 for serialization.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from u8.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.to_u8() == value)
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Protocol => "protocol",
            Self::Account => "account",
            Self::ValidatorNode => "validator node",
            Self::Organization => "organization",
            Self::Application => "application",
            Self::ApplicationLedger => "application ledger",
        }
    }
}

impl fmt::Display for VirtualBlockchainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<VirtualBlockchainType> for u8 {
    fn from(t: VirtualBlockchainType) -> Self {
        t.to_u8()
    }
}

impl TryFrom<u8> for VirtualBlockchainType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(CoreError::UnknownVirtualBlockchainType(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_digest() {
        // SHA-256 of the empty string.
        let h = Sha256Hash::hash(b"");
        assert_eq!(
            h.to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = Sha256Hash::hash(b"microchain");
        assert_eq!(Sha256Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert!(Sha256Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_hash_display() {
        let h = Sha256Hash::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", h), "abababababababab");
        assert!(format!("{:?}", h).starts_with("Sha256("));
    }

    #[test]
    fn test_account_null_sentinel() {
        assert!(AccountId::NULL.is_null());
        assert!(AccountId::default().is_null());
        assert!(!AccountId::from_bytes([1; 32]).is_null());
        assert_eq!(format!("{:?}", AccountId::NULL), "AccountId(null)");
    }

    #[test]
    fn test_chain_type_u8_mapping() {
        for t in VirtualBlockchainType::ALL {
            assert_eq!(VirtualBlockchainType::from_u8(t.to_u8()), Some(t));
        }
        assert_eq!(VirtualBlockchainType::from_u8(6), None);
        assert!(matches!(
            VirtualBlockchainType::try_from(42u8),
            Err(CoreError::UnknownVirtualBlockchainType(42))
        ));
    }
}
