//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use microchain_core::header::{MAX_GAS, MAX_HEIGHT, MAX_TIMESTAMP};
use microchain_core::section::{TokenIssuancePayload, TransferPayload};
use microchain_core::{
    AccountId, MicroblockHeader, SectionPayload, Sha256Hash, VirtualBlockchainType,
};

/// Generate a chain type.
pub fn chain_type() -> impl Strategy<Value = VirtualBlockchainType> {
    prop::sample::select(VirtualBlockchainType::ALL.to_vec())
}

/// Generate a random Sha256Hash.
pub fn sha256_hash() -> impl Strategy<Value = Sha256Hash> {
    any::<[u8; 32]>().prop_map(Sha256Hash::from_bytes)
}

/// Generate a random AccountId.
pub fn account_id() -> impl Strategy<Value = AccountId> {
    any::<[u8; 32]>().prop_map(AccountId::from_bytes)
}

/// Generate a header whose every field is within its encoded width.
pub fn header() -> impl Strategy<Value = MicroblockHeader> {
    (
        chain_type(),
        1u64..=MAX_HEIGHT,
        sha256_hash(),
        0u64..=MAX_TIMESTAMP,
        0u32..=MAX_GAS,
        any::<u32>(),
        sha256_hash(),
        account_id(),
    )
        .prop_map(
            |(
                microblock_type,
                height,
                previous_hash,
                timestamp,
                gas,
                gas_price,
                body_hash,
                fees_payer_account,
            )| {
                let mut header =
                    MicroblockHeader::new(microblock_type, height, previous_hash, timestamp);
                header.gas = gas;
                header.gas_price = gas_price;
                header.body_hash = body_hash;
                header.fees_payer_account = fees_payer_account;
                header
            },
        )
}

/// Generate an account transfer section.
pub fn transfer() -> impl Strategy<Value = SectionPayload> {
    (account_id(), any::<u64>(), "[a-z0-9 ]{0,16}", "[a-z0-9 ]{0,16}").prop_map(
        |(account, amount, public_reference, private_reference)| {
            SectionPayload::AccountTransfer(TransferPayload {
                account,
                amount,
                public_reference,
                private_reference,
            })
        },
    )
}

/// Generate an account section that is not a signature.
pub fn account_section() -> impl Strategy<Value = SectionPayload> {
    prop_oneof![
        transfer(),
        any::<u64>().prop_map(|amount| {
            SectionPayload::AccountTokenIssuance(TokenIssuancePayload { amount })
        }),
    ]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

/// One step of a section edit sequence.
#[derive(Debug, Clone)]
pub enum SectionEdit {
    Add(SectionPayload),
    Pop,
}

/// Generate a sequence of account section additions and removals.
pub fn section_edits(max_len: usize) -> impl Strategy<Value = Vec<SectionEdit>> {
    prop::collection::vec(
        prop_oneof![
            3 => account_section().prop_map(SectionEdit::Add),
            1 => Just(SectionEdit::Pop),
        ],
        0..=max_len,
    )
}
