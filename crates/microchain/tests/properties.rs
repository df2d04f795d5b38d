//! Property tests over encoding, hashing and submission.

use proptest::prelude::*;

use microchain::core::canonical::decode_header;
use microchain::core::{AccountId, Microblock, VirtualBlockchainType};
use microchain_testkit::generators::{self, SectionEdit};
use microchain_testkit::{memory_ledger, TestFixture, FIXED_TIMESTAMP};

proptest! {
    #[test]
    fn header_round_trip_is_stable(header in generators::header()) {
        let bytes = header.to_bytes().unwrap();
        let decoded = decode_header(&bytes).unwrap();
        prop_assert_eq!(&decoded, &header);
        prop_assert_eq!(decoded.to_bytes().unwrap(), bytes);
        prop_assert_eq!(header.hash().unwrap(), header.hash().unwrap());
    }

    #[test]
    fn body_hash_follows_section_edits(edits in generators::section_edits(24)) {
        let mut mb = Microblock::create_genesis(VirtualBlockchainType::Account, 0).unwrap();
        let mut expected_len = 0usize;

        for edit in edits {
            match edit {
                SectionEdit::Add(payload) => {
                    mb.add_section(payload).unwrap();
                    expected_len += 1;
                }
                SectionEdit::Pop if expected_len == 0 => {
                    prop_assert!(mb.pop_section().is_err());
                }
                SectionEdit::Pop => {
                    mb.pop_section().unwrap();
                    expected_len -= 1;
                }
            }
            prop_assert_eq!(mb.sections().len(), expected_len);
            prop_assert!(mb.is_declaring_consistent_body_hash());
        }

        let reloaded = Microblock::from_bytes(&mb.to_bytes().unwrap(), None).unwrap();
        prop_assert_eq!(reloaded.body_hash(), mb.body_hash());
        prop_assert_eq!(reloaded.hash(), mb.hash());
    }

    #[test]
    fn successors_chain_hashes(transfers in prop::collection::vec(generators::transfer(), 1..6)) {
        let mut fixture = TestFixture::new();
        let mut previous = fixture.make_account_genesis(1);

        for transfer in transfers {
            let next = fixture.seal(fixture.successor(&previous, vec![transfer]));
            prop_assert_eq!(next.previous_hash(), previous.hash());
            prop_assert_eq!(next.height(), previous.height() + 1);
            previous = next;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn accepted_chain_head_matches_last_microblock(amounts in prop::collection::vec(any::<u64>(), 0..5)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let ledger = memory_ledger();
            let mut fixture = TestFixture::new();
            let mut previous = fixture.make_account_genesis(1_000);
            ledger
                .submit_microblock(&previous.to_bytes().unwrap(), FIXED_TIMESTAMP)
                .await
                .unwrap();

            for amount in amounts {
                let next = fixture.make_account_transfer(&previous, AccountId::NULL, amount);
                ledger
                    .submit_microblock(&next.to_bytes().unwrap(), FIXED_TIMESTAMP)
                    .await
                    .unwrap();
                previous = next;
            }

            let information = ledger
                .microblock_information(&previous.hash())
                .await
                .unwrap()
                .unwrap();
            let state = ledger
                .virtual_blockchain_state(&information.virtual_blockchain_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(state.last_microblock_hash, previous.hash());
            assert_eq!(state.height, previous.height());

            let hashes = ledger
                .microblock_hashes(&information.virtual_blockchain_id)
                .await
                .unwrap();
            assert_eq!(hashes.len() as u64, state.height);
            assert_eq!(hashes.last(), Some(&previous.hash()));
        });
    }
}
