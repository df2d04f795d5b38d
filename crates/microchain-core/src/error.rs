//! Error types for microchain core.

use thiserror::Error;

use crate::section::SectionType;
use crate::types::{Sha256Hash, VirtualBlockchainType};

/// Errors raised by the codec, the microblock engine and the signature layer.
#[derive(Debug, Error)]
pub enum CoreError {
    // Integrity errors: the microblock must be rejected.
    #[error("magic string mismatch: got {found:?}")]
    MagicStringMismatch { found: [u8; 4] },

    #[error("body hash mismatch: declared {declared}, computed {computed}")]
    BodyHashMismatch {
        declared: Sha256Hash,
        computed: Sha256Hash,
    },

    #[error("microblock type mismatch: expected {expected}, got {found}")]
    MicroblockTypeMismatch {
        expected: VirtualBlockchainType,
        found: VirtualBlockchainType,
    },

    // Codec errors.
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("unknown virtual blockchain type: {0}")]
    UnknownVirtualBlockchainType(u8),

    #[error("unknown section type: {0:#06x}")]
    UnknownSectionType(u16),

    #[error("section {section_type} is not allowed in a {chain_type} microblock")]
    SchemaMismatch {
        section_type: SectionType,
        chain_type: VirtualBlockchainType,
    },

    // Usage errors.
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("section not found: {0}")]
    SectionNotFound(String),

    // Signature layer.
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("unsupported signature scheme: {0}")]
    UnsupportedSignatureScheme(u8),
}

impl CoreError {
    /// Whether the error signals tampering or a protocol mismatch.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            CoreError::MagicStringMismatch { .. }
                | CoreError::BodyHashMismatch { .. }
                | CoreError::MicroblockTypeMismatch { .. }
        )
    }

    /// Whether the error is a programmer error on the microblock API.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            CoreError::IllegalParameter(_) | CoreError::IllegalState(_)
        )
    }

    /// Whether the error comes from malformed or non-canonical bytes.
    pub fn is_decoding(&self) -> bool {
        matches!(
            self,
            CoreError::DecodingError(_)
                | CoreError::UnknownVirtualBlockchainType(_)
                | CoreError::UnknownSectionType(_)
                | CoreError::SchemaMismatch { .. }
        )
    }
}

/// A microblock does not follow the section grammar of its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("microblock structure checking failed at section {position}: {reason}")]
pub struct StructureError {
    /// Cursor position when the check failed.
    pub position: usize,
    pub reason: String,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
