//! The local state of a virtual blockchain, one variant per chain type.

use serde::{Deserialize, Serialize};

use microchain_core::VirtualBlockchainType;

use crate::account::AccountLocalState;
use crate::application::ApplicationLocalState;
use crate::application_ledger::ApplicationLedgerLocalState;
use crate::organization::OrganizationLocalState;
use crate::protocol::ProtocolLocalState;
use crate::validator_node::ValidatorNodeLocalState;

/// Immutable snapshot of a virtual blockchain's state after some height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalState {
    Protocol(ProtocolLocalState),
    Account(AccountLocalState),
    ValidatorNode(ValidatorNodeLocalState),
    Organization(OrganizationLocalState),
    Application(ApplicationLocalState),
    ApplicationLedger(ApplicationLedgerLocalState),
}

impl LocalState {
    /// State of a virtual blockchain before its genesis microblock.
    pub fn create_initial_state(chain_type: VirtualBlockchainType) -> Self {
        match chain_type {
            VirtualBlockchainType::Protocol => Self::Protocol(Default::default()),
            VirtualBlockchainType::Account => Self::Account(Default::default()),
            VirtualBlockchainType::ValidatorNode => Self::ValidatorNode(Default::default()),
            VirtualBlockchainType::Organization => Self::Organization(Default::default()),
            VirtualBlockchainType::Application => Self::Application(Default::default()),
            VirtualBlockchainType::ApplicationLedger => {
                Self::ApplicationLedger(Default::default())
            }
        }
    }

    pub fn chain_type(&self) -> VirtualBlockchainType {
        match self {
            Self::Protocol(_) => VirtualBlockchainType::Protocol,
            Self::Account(_) => VirtualBlockchainType::Account,
            Self::ValidatorNode(_) => VirtualBlockchainType::ValidatorNode,
            Self::Organization(_) => VirtualBlockchainType::Organization,
            Self::Application(_) => VirtualBlockchainType::Application,
            Self::ApplicationLedger(_) => VirtualBlockchainType::ApplicationLedger,
        }
    }

    pub fn version(&self) -> u16 {
        match self {
            Self::Protocol(s) => s.version(),
            Self::Account(s) => s.version(),
            Self::ValidatorNode(s) => s.version(),
            Self::Organization(s) => s.version(),
            Self::Application(s) => s.version(),
            Self::ApplicationLedger(s) => s.version(),
        }
    }

    pub fn as_protocol(&self) -> Option<&ProtocolLocalState> {
        match self {
            Self::Protocol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_account(&self) -> Option<&AccountLocalState> {
        match self {
            Self::Account(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_validator_node(&self) -> Option<&ValidatorNodeLocalState> {
        match self {
            Self::ValidatorNode(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_organization(&self) -> Option<&OrganizationLocalState> {
        match self {
            Self::Organization(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_application(&self) -> Option<&ApplicationLocalState> {
        match self {
            Self::Application(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_application_ledger(&self) -> Option<&ApplicationLedgerLocalState> {
        match self {
            Self::ApplicationLedger(s) => Some(s),
            _ => None,
        }
    }
}
