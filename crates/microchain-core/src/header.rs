//! Microblock header: the fixed-width record that is hashed and signed.

use serde::{Deserialize, Serialize};

use crate::canonical::encode_header;
use crate::error::Result;
use crate::types::{AccountId, Sha256Hash, VirtualBlockchainType};

/// Magic string opening every header.
pub const MAGIC_STRING: [u8; 4] = *b"CMTS";

/// The current protocol version written into new headers.
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest height representable in 48 bits.
pub const MAX_HEIGHT: u64 = (1 << 48) - 1;

/// Largest timestamp (seconds) representable in 48 bits.
pub const MAX_TIMESTAMP: u64 = (1 << 48) - 1;

/// Largest gas amount representable in 24 bits.
pub const MAX_GAS: u32 = (1 << 24) - 1;

/// The header of a microblock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroblockHeader {
    /// Always [`MAGIC_STRING`] for well-formed microblocks.
    pub magic_string: [u8; 4],

    /// Protocol version the microblock was produced under.
    pub protocol_version: u16,

    /// Type of the owning virtual blockchain.
    pub microblock_type: VirtualBlockchainType,

    /// Position in the virtual blockchain (1 for genesis).
    pub height: u64,

    /// Hash of the predecessor, or the synthetic genesis seed.
    pub previous_hash: Sha256Hash,

    /// Unix seconds. Author-claimed.
    pub timestamp: u64,

    /// Gas units (24 bits).
    pub gas: u32,

    /// Price per gas unit.
    pub gas_price: u32,

    /// SHA-256 of the encoded body.
    pub body_hash: Sha256Hash,

    /// Account paying the fees, or [`AccountId::NULL`].
    pub fees_payer_account: AccountId,
}

impl MicroblockHeader {
    /// Create a header with default values for the given type and height.
    pub fn new(
        microblock_type: VirtualBlockchainType,
        height: u64,
        previous_hash: Sha256Hash,
        timestamp: u64,
    ) -> Self {
        Self {
            magic_string: MAGIC_STRING,
            protocol_version: PROTOCOL_VERSION,
            microblock_type,
            height,
            previous_hash,
            timestamp,
            gas: 0,
            gas_price: 0,
            body_hash: Sha256Hash::ZERO,
            fees_payer_account: AccountId::NULL,
        }
    }

    /// Canonical bytes of this header.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_header(self)
    }

    /// SHA-256 of the canonical bytes, which is the microblock hash.
    pub fn hash(&self) -> Result<Sha256Hash> {
        Ok(Sha256Hash::hash(&self.to_bytes()?))
    }

    /// Whether the magic string is the expected one.
    pub fn has_valid_magic(&self) -> bool {
        self.magic_string == MAGIC_STRING
    }

    /// Copy of this header with the gas fields zeroed.
    pub(crate) fn without_gas(&self) -> Self {
        Self {
            gas: 0,
            gas_price: 0,
            ..self.clone()
        }
    }
}
