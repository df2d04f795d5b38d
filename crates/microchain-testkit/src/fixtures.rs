//! Test fixtures and helpers.
//!
//! Builders for sealed microblocks of every chain type. All microblocks
//! carry [`FIXED_TIMESTAMP`] and deterministic genesis seeds, so a fixture
//! created from the same seed always produces the same hashes.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::SeedableRng;

use microchain::{Ledger, LedgerConfig};
use microchain_core::section::{
    ActorCreationPayload, AllowedSchemesPayload, AppLedgerDeclarationPayload,
    ApplicationDescriptionPayload, ChannelCreationPayload, OrganizationDescriptionPayload,
    OrganizationReferencePayload, ProtocolUpdatePayload, PublicKeyPayload,
    SignatureSchemePayload, TokenIssuancePayload, TransferPayload,
};
use microchain_core::{
    AccountId, Ed25519PrivateKey, Microblock, PrivateSignatureKey, ProtocolVariables,
    PublicSignatureKey, SealOptions, SectionPayload, Secp256k1PrivateKey, Sha256Hash,
    VirtualBlockchainType,
};
use microchain_store::MemoryStore;

/// 2025-01-14T16:00:00Z, the timestamp of every fixture microblock.
pub const FIXED_TIMESTAMP: u64 = 1_736_870_400;

/// Deterministic secp256k1 key. `seed` must not be zero.
pub fn secp256k1_key(seed: u8) -> Secp256k1PrivateKey {
    Secp256k1PrivateKey::from_bytes(&[seed; 32]).expect("nonzero scalar is a valid key")
}

/// Deterministic Ed25519 key.
pub fn ed25519_key(seed: u8) -> Ed25519PrivateKey {
    Ed25519PrivateKey::from_seed(&[seed; 32])
}

/// A ledger over a fresh in-memory store with the default configuration.
pub fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new(), LedgerConfig::default())
}

/// A signing key and a seeded source for genesis seeds.
pub struct TestFixture {
    pub key: Secp256k1PrivateKey,
    rng: StdRng,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_seed(0x42)
    }

    /// Fixture with a key and genesis seeds derived from `seed`.
    pub fn with_seed(seed: u8) -> Self {
        Self {
            key: secp256k1_key(seed),
            rng: StdRng::seed_from_u64(u64::from(seed)),
        }
    }

    /// The fixture key as an account public-key section payload.
    pub fn public_key_payload(&self) -> PublicKeyPayload {
        PublicKeyPayload {
            scheme_id: self.key.scheme_id().to_u8(),
            public_key: Bytes::from(self.key.public_key().to_bytes()),
        }
    }

    /// Unsealed genesis microblock of `chain_type` holding `payloads`.
    pub fn genesis(
        &mut self,
        chain_type: VirtualBlockchainType,
        payloads: Vec<SectionPayload>,
    ) -> Microblock {
        let mut mb = Microblock::create_genesis_with_rng(chain_type, 0, &mut self.rng)
            .expect("genesis header");
        mb.set_timestamp(FIXED_TIMESTAMP).expect("timestamp in range");
        mb.add_sections(payloads).expect("sections match the chain type");
        mb
    }

    /// Unsealed microblock extending `previous` with `payloads`.
    pub fn successor(&self, previous: &Microblock, payloads: Vec<SectionPayload>) -> Microblock {
        let mut mb = Microblock::create_successor(
            previous.microblock_type(),
            previous.height() + 1,
            previous.hash(),
        )
        .expect("successor header");
        mb.set_timestamp(FIXED_TIMESTAMP).expect("timestamp in range");
        mb.add_sections(payloads).expect("sections match the chain type");
        mb
    }

    /// Seal `mb` with the fixture key as author.
    pub fn seal(&self, mut mb: Microblock) -> Microblock {
        mb.seal(&self.key, SealOptions::default()).expect("seal");
        mb
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Per-type builders
    // ─────────────────────────────────────────────────────────────────────────

    pub fn make_protocol_update(&mut self, variables: ProtocolVariables) -> Microblock {
        let mb = self.genesis(
            VirtualBlockchainType::Protocol,
            vec![SectionPayload::ProtocolUpdate(ProtocolUpdatePayload { variables })],
        );
        self.seal(mb)
    }

    /// Account genesis declaring the fixture key and issuing `amount` tokens.
    pub fn make_account_genesis(&mut self, amount: u64) -> Microblock {
        let public_key = self.public_key_payload();
        let mb = self.genesis(
            VirtualBlockchainType::Account,
            vec![
                SectionPayload::AccountPublicKey(public_key),
                SectionPayload::AccountTokenIssuance(TokenIssuancePayload { amount }),
            ],
        );
        self.seal(mb)
    }

    pub fn make_account_transfer(
        &self,
        previous: &Microblock,
        to: AccountId,
        amount: u64,
    ) -> Microblock {
        let mb = self.successor(
            previous,
            vec![SectionPayload::AccountTransfer(TransferPayload {
                account: to,
                amount,
                public_reference: String::new(),
                private_reference: String::new(),
            })],
        );
        self.seal(mb)
    }

    pub fn make_organization_genesis(&mut self, name: &str) -> Microblock {
        let public_key = self.public_key_payload();
        let mb = self.genesis(
            VirtualBlockchainType::Organization,
            vec![
                SectionPayload::OrganizationPublicKey(public_key),
                organization_description(name),
            ],
        );
        self.seal(mb)
    }

    pub fn make_application_genesis(&mut self, organization_id: Sha256Hash) -> Microblock {
        let scheme_id = self.key.scheme_id().to_u8();
        let mb = self.genesis(
            VirtualBlockchainType::Application,
            vec![
                SectionPayload::ApplicationSignatureScheme(SignatureSchemePayload { scheme_id }),
                SectionPayload::ApplicationDeclaration(OrganizationReferencePayload {
                    organization_id,
                }),
                application_description("notary"),
            ],
        );
        self.seal(mb)
    }

    /// Application ledger genesis creating one actor per name, with ids in
    /// order starting at 0.
    pub fn make_app_ledger_genesis(
        &mut self,
        application_id: Sha256Hash,
        actors: &[&str],
    ) -> Microblock {
        let mut payloads = vec![
            SectionPayload::AppLedgerAllowedSignatureSchemes(AllowedSchemesPayload {
                scheme_ids: vec![0, 2],
            }),
            SectionPayload::AppLedgerAllowedPkeSchemes(AllowedSchemesPayload {
                scheme_ids: vec![0],
            }),
            SectionPayload::AppLedgerDeclaration(AppLedgerDeclarationPayload { application_id }),
        ];
        payloads.extend(
            actors
                .iter()
                .enumerate()
                .map(|(id, name)| actor_creation(id as u32, name)),
        );
        let mb = self.genesis(VirtualBlockchainType::ApplicationLedger, payloads);
        self.seal(mb)
    }

    pub fn make_app_ledger_successor(
        &self,
        previous: &Microblock,
        payloads: Vec<SectionPayload>,
    ) -> Microblock {
        let mb = self.successor(previous, payloads);
        self.seal(mb)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn organization_description(name: &str) -> SectionPayload {
    SectionPayload::OrganizationDescription(OrganizationDescriptionPayload {
        name: name.into(),
        city: "Paris".into(),
        country_code: "FR".into(),
        website: "https://example.org".into(),
    })
}

pub fn application_description(name: &str) -> SectionPayload {
    SectionPayload::ApplicationDescription(ApplicationDescriptionPayload {
        name: name.into(),
        logo_url: String::new(),
        homepage_url: "https://example.org".into(),
        description: String::new(),
    })
}

pub fn actor_creation(id: u32, name: &str) -> SectionPayload {
    SectionPayload::AppLedgerActorCreation(ActorCreationPayload {
        id,
        name: name.into(),
    })
}

pub fn channel_creation(id: u32, name: &str, creator_id: u32) -> SectionPayload {
    SectionPayload::AppLedgerChannelCreation(ChannelCreationPayload {
        id,
        name: name.into(),
        is_private: false,
        creator_id,
    })
}
