//! Error types for local-state updates.

use thiserror::Error;

use microchain_core::VirtualBlockchainType;

/// Errors raised while folding a microblock into a local state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid actor id: expected {expected}, got {got}")]
    InvalidActor { expected: u32, got: u32 },

    #[error("actor '{name}' is already defined")]
    ActorAlreadyDefined { name: String },

    #[error("actor {0} is not defined")]
    ActorNotDefined(u32),

    #[error("cannot subscribe unknown actor {actor_id}")]
    CannotSubscribe { actor_id: u32 },

    #[error("actor {actor_id} is already subscribed")]
    AlreadySubscribed { actor_id: u32 },

    #[error("signature scheme {0} is not allowed on this ledger")]
    NotAllowedSignatureScheme(u8),

    #[error("PKE scheme {0} is not allowed on this ledger")]
    NotAllowedPkeScheme(u8),

    #[error("invalid channel id: expected {expected}, got {got}")]
    InvalidChannel { expected: u32, got: u32 },

    #[error("channel '{name}' is already defined")]
    ChannelAlreadyDefined { name: String },

    #[error("channel {0} is not defined")]
    ChannelNotDefined(u32),

    #[error("actor {0} cannot share a secret with itself")]
    SharedSecretWithSelf(u32),

    #[error("local state type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: VirtualBlockchainType,
        found: VirtualBlockchainType,
    },

    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("core error: {0}")]
    Core(#[from] microchain_core::CoreError),
}

impl StateError {
    /// Whether the error is a business-rule violation of the microblock
    /// content, as opposed to a caller mistake.
    pub fn is_rule_violation(&self) -> bool {
        !matches!(
            self,
            StateError::TypeMismatch { .. } | StateError::IllegalParameter(_) | StateError::Core(_)
        )
    }
}

/// Result type for local-state operations.
pub type Result<T> = std::result::Result<T, StateError>;
