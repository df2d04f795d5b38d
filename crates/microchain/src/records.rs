//! Records persisted by the ledger.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use microchain_core::{Sha256Hash, VirtualBlockchainId, VirtualBlockchainType};
use microchain_state::LocalState;

/// Where a microblock sits, keyed by microblock hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicroblockInformation {
    pub virtual_blockchain_id: VirtualBlockchainId,
    pub virtual_blockchain_type: VirtualBlockchainType,
    pub height: u64,
    pub previous_hash: Sha256Hash,
    /// Canonical header bytes.
    pub header: Bytes,
}

/// Head of a virtual blockchain, keyed by virtual blockchain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualBlockchainState {
    pub virtual_blockchain_type: VirtualBlockchainType,
    pub height: u64,
    pub last_microblock_hash: Sha256Hash,
    pub expiration_day: u32,
    pub local_state: LocalState,
}
