//! Validator node chain. Its local state carries no fields yet.

use serde::{Deserialize, Serialize};

use microchain_core::{Microblock, VirtualBlockchainType};

use crate::error::Result;
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorNodeLocalState {
    version: u16,
}

impl Default for ValidatorNodeLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
        }
    }
}

impl ValidatorNodeLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorNodeLocalStateUpdater;

impl LocalStateUpdater for ValidatorNodeLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::ValidatorNode
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let state = expect_state!(previous, microblock, ValidatorNode);
        Ok(LocalState::ValidatorNode(state.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;

    #[test]
    fn test_state_carries_through() {
        let genesis = Microblock::create_genesis(VirtualBlockchainType::ValidatorNode, 0).unwrap();
        let initial = LocalState::create_initial_state(VirtualBlockchainType::ValidatorNode);

        let next = ValidatorNodeLocalStateUpdater
            .update_state(&initial, &genesis)
            .unwrap();
        assert_eq!(next, initial);
        assert_eq!(
            next.as_validator_node().unwrap().version(),
            DEFAULT_LOCAL_STATE_VERSION
        );
    }

    #[test]
    fn test_rejects_other_chain_types() {
        let genesis = Microblock::create_genesis(VirtualBlockchainType::Account, 0).unwrap();
        let initial = LocalState::create_initial_state(VirtualBlockchainType::ValidatorNode);

        assert!(matches!(
            ValidatorNodeLocalStateUpdater.update_state(&initial, &genesis),
            Err(StateError::TypeMismatch { .. })
        ));
    }
}
