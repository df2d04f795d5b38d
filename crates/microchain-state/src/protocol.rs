//! Protocol chain: network-wide variables.

use serde::{Deserialize, Serialize};
use tracing::debug;

use microchain_core::{Microblock, ProtocolVariables, SectionPayload, VirtualBlockchainType};

use crate::error::Result;
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLocalState {
    version: u16,
    variables: ProtocolVariables,
}

impl Default for ProtocolLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
            variables: ProtocolVariables::default(),
        }
    }
}

impl ProtocolLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn variables(&self) -> &ProtocolVariables {
        &self.variables
    }

    pub fn with_variables(self, variables: ProtocolVariables) -> Self {
        Self { variables, ..self }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolLocalStateUpdater;

impl LocalStateUpdater for ProtocolLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Protocol
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let mut state = expect_state!(previous, microblock, Protocol).clone();
        for section in microblock.sections() {
            match section.payload() {
                SectionPayload::ProtocolUpdate(update) => {
                    state = state.with_variables(update.variables.clone());
                }
                _ => debug!(section = %section.section_type(), "no effect on protocol state"),
            }
        }
        Ok(LocalState::Protocol(state))
    }
}
