//! Local-state updaters and the factory selecting them.

use microchain_core::{Microblock, VirtualBlockchainType};

use crate::account::AccountLocalStateUpdater;
use crate::application::ApplicationLocalStateUpdater;
use crate::application_ledger::ApplicationLedgerLocalStateUpdater;
use crate::error::{Result, StateError};
use crate::local_state::LocalState;
use crate::organization::OrganizationLocalStateUpdater;
use crate::protocol::ProtocolLocalStateUpdater;
use crate::validator_node::ValidatorNodeLocalStateUpdater;

/// The only local-state layout defined so far.
pub const DEFAULT_LOCAL_STATE_VERSION: u16 = 1;

/// Folds one microblock into the local state of its virtual blockchain.
pub trait LocalStateUpdater: Send + Sync {
    fn chain_type(&self) -> VirtualBlockchainType;

    /// Return the state after `microblock`. `previous` is never modified; on
    /// error no partial state escapes.
    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState>;
}

/// Select the updater for a chain type and local-state version.
pub fn local_state_updater(
    chain_type: VirtualBlockchainType,
    version: u16,
) -> Result<Box<dyn LocalStateUpdater>> {
    if version != DEFAULT_LOCAL_STATE_VERSION {
        return Err(StateError::IllegalParameter(format!(
            "no {} local state updater for version {}",
            chain_type, version
        )));
    }
    Ok(match chain_type {
        VirtualBlockchainType::Protocol => Box::new(ProtocolLocalStateUpdater),
        VirtualBlockchainType::Account => Box::new(AccountLocalStateUpdater),
        VirtualBlockchainType::ValidatorNode => Box::new(ValidatorNodeLocalStateUpdater),
        VirtualBlockchainType::Organization => Box::new(OrganizationLocalStateUpdater),
        VirtualBlockchainType::Application => Box::new(ApplicationLocalStateUpdater),
        VirtualBlockchainType::ApplicationLedger => Box::new(ApplicationLedgerLocalStateUpdater),
    })
}

pub(crate) fn check_microblock_type(
    microblock: &Microblock,
    expected: VirtualBlockchainType,
) -> Result<()> {
    if microblock.microblock_type() != expected {
        return Err(StateError::TypeMismatch {
            expected,
            found: microblock.microblock_type(),
        });
    }
    Ok(())
}

pub(crate) fn check_version(version: u16) -> Result<()> {
    if version != DEFAULT_LOCAL_STATE_VERSION {
        return Err(StateError::IllegalParameter(format!(
            "unsupported local state version {}",
            version
        )));
    }
    Ok(())
}

/// Borrow the `$variant` state out of `$previous`, after checking that the
/// microblock and the state both belong to that chain type.
macro_rules! expect_state {
    ($previous:expr, $microblock:expr, $variant:ident) => {{
        $crate::updater::check_microblock_type(
            $microblock,
            ::microchain_core::VirtualBlockchainType::$variant,
        )?;
        match $previous {
            $crate::local_state::LocalState::$variant(state) => {
                $crate::updater::check_version(state.version())?;
                state
            }
            other => {
                return Err($crate::error::StateError::TypeMismatch {
                    expected: ::microchain_core::VirtualBlockchainType::$variant,
                    found: other.chain_type(),
                })
            }
        }
    }};
}

pub(crate) use expect_state;
