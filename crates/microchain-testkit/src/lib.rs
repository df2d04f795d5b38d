//! # Microchain Testkit
//!
//! Testing utilities for microchain.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: header and body encodings with expected bytes and hashes
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic keys and sealed microblocks for every chain type
//!
//! ## Golden Vectors
//!
//! ```rust
//! use microchain_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_empty());
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use microchain_testkit::fixtures::TestFixture;
//!
//! let mut fixture = TestFixture::new();
//! let genesis = fixture.make_account_genesis(1_000);
//! assert!(genesis.is_signed());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{ed25519_key, memory_ledger, secp256k1_key, TestFixture, FIXED_TIMESTAMP};
pub use generators::SectionEdit;
pub use vectors::{body_vectors, header_vectors, verify_all_vectors, BodyVector, HeaderVector};
