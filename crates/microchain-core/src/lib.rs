//! # Microchain Core
//!
//! Pure primitives for microchain ledgers: microblocks, sections, canonical
//! encoding, signatures and structure checking.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Microblock`] - A header plus an ordered list of typed sections
//! - [`MicroblockHeader`] - The fixed 122-byte record that is hashed and signed
//! - [`Section`] / [`SectionPayload`] - Typed payloads, one schema per [`SectionType`]
//! - [`VirtualBlockchainType`] - Kind of chain a microblock belongs to
//! - [`MicroblockStructureChecker`] - Per-type section grammar
//!
//! ## Canonicalization
//!
//! Hashes and signatures are computed over canonical bytes. See the
//! [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod header;
pub mod microblock;
pub mod section;
pub mod structure;
pub mod types;

pub use crypto::{
    public_key_from_bytes, Ed25519PrivateKey, Ed25519PublicKey, PrivateSignatureKey,
    PublicSignatureKey, Secp256k1PrivateKey, Secp256k1PublicKey, SignatureSchemeId,
};
#[cfg(feature = "ml-dsa")]
pub use crypto::{MlDsa65PrivateKey, MlDsa65PublicKey};
pub use error::{CoreError, Result, StructureError};
pub use header::{MicroblockHeader, MAGIC_STRING, PROTOCOL_VERSION};
pub use microblock::{
    now_seconds, GenesisSeed, Microblock, SealOptions, SignatureIndex, SignatureRole,
    TemporalValidity, TimestampBounds, VerifyOptions,
};
pub use section::{ProtocolVariables, Section, SectionPayload, SectionType, SignaturePayload};
pub use structure::{
    check_microblock_structure, structure_checker_for, Constraint, MicroblockStructureChecker,
    StructureChecker,
};
pub use types::{AccountId, Sha256Hash, VirtualBlockchainId, VirtualBlockchainType};
