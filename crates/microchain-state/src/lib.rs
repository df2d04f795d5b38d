//! # Microchain State
//!
//! Local state of virtual blockchains.
//!
//! A local state is an immutable value. Applying a microblock through its
//! [`LocalStateUpdater`] yields a new state and leaves the previous one as it
//! was; a microblock that breaks a business rule yields an error and no state.
//!
//! ## Chain types
//!
//! | type | tracked |
//! |------|---------|
//! | protocol | protocol variables |
//! | account | signature scheme, public-key height |
//! | validator node | nothing yet |
//! | organization | signature scheme, public-key and description heights |
//! | application | signature scheme, organization, description height |
//! | application ledger | allow-lists, application, actors, channels |

pub mod account;
pub mod application;
pub mod application_ledger;
pub mod error;
pub mod local_state;
pub mod organization;
pub mod protocol;
pub mod updater;
pub mod validator_node;

pub use account::{AccountLocalState, AccountLocalStateUpdater};
pub use application::{ApplicationLocalState, ApplicationLocalStateUpdater};
pub use application_ledger::{
    Actor, ApplicationLedgerLocalState, ApplicationLedgerLocalStateUpdater, Channel,
    InvitationRecord, SharedSecretRecord,
};
pub use error::{Result, StateError};
pub use local_state::LocalState;
pub use organization::{OrganizationLocalState, OrganizationLocalStateUpdater};
pub use protocol::{ProtocolLocalState, ProtocolLocalStateUpdater};
pub use updater::{local_state_updater, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};
pub use validator_node::{ValidatorNodeLocalState, ValidatorNodeLocalStateUpdater};
