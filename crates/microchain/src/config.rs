//! Ledger configuration.

use serde::{Deserialize, Serialize};

use microchain_core::{TimestampBounds, VirtualBlockchainType, PROTOCOL_VERSION};
use microchain_state::DEFAULT_LOCAL_STATE_VERSION;

use crate::error::{LedgerError, Result};

/// Local-state version to use for one chain type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalStateVersion {
    pub chain_type: VirtualBlockchainType,
    pub version: u16,
}

/// Configuration for a [`Ledger`](crate::Ledger).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use microchain::LedgerConfig;
///
/// let config = LedgerConfig::from_json(r#"{ "check_timestamps": false }"#).unwrap();
/// assert!(!config.check_timestamps);
/// assert!(config.check_structure);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Protocol version a submitted header must declare.
    pub protocol_version: u16,

    /// Accepted distance between a microblock timestamp and the submission
    /// time.
    pub timestamp_bounds: TimestampBounds,

    /// Reject microblocks outside `timestamp_bounds`.
    pub check_timestamps: bool,

    /// Reject microblocks whose sections do not follow their type's grammar.
    pub check_structure: bool,

    /// Per-type local-state versions. Types not listed use the default.
    pub local_state_versions: Vec<LocalStateVersion>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            timestamp_bounds: TimestampBounds::default(),
            check_timestamps: true,
            check_structure: true,
            local_state_versions: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Local-state version configured for `chain_type`.
    pub fn version_for(&self, chain_type: VirtualBlockchainType) -> u16 {
        self.local_state_versions
            .iter()
            .rev()
            .find(|v| v.chain_type == chain_type)
            .map(|v| v.version)
            .unwrap_or(DEFAULT_LOCAL_STATE_VERSION)
    }
}
