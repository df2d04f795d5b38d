//! Account chain: the signature key controlling a token account.

use serde::{Deserialize, Serialize};
use tracing::debug;

use microchain_core::{Microblock, SectionPayload, VirtualBlockchainType};

use crate::error::Result;
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLocalState {
    version: u16,
    signature_scheme_id: Option<u8>,
    public_key_height: Option<u64>,
}

impl Default for AccountLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
            signature_scheme_id: None,
            public_key_height: None,
        }
    }
}

impl AccountLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn signature_scheme_id(&self) -> Option<u8> {
        self.signature_scheme_id
    }

    /// Height of the microblock that declared the current public key.
    pub fn public_key_height(&self) -> Option<u64> {
        self.public_key_height
    }

    pub fn with_public_key(self, scheme_id: u8, height: u64) -> Self {
        Self {
            signature_scheme_id: Some(scheme_id),
            public_key_height: Some(height),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountLocalStateUpdater;

impl LocalStateUpdater for AccountLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Account
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let mut state = expect_state!(previous, microblock, Account).clone();
        for section in microblock.sections() {
            match section.payload() {
                SectionPayload::AccountPublicKey(key) => {
                    state = state.with_public_key(key.scheme_id, microblock.height());
                }
                _ => debug!(section = %section.section_type(), "no effect on account state"),
            }
        }
        Ok(LocalState::Account(state))
    }
}
