//! Organization chain: signature key and public description.

use serde::{Deserialize, Serialize};
use tracing::debug;

use microchain_core::{Microblock, SectionPayload, VirtualBlockchainType};

use crate::error::Result;
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationLocalState {
    version: u16,
    signature_scheme_id: Option<u8>,
    public_key_height: Option<u64>,
    description_height: Option<u64>,
}

impl Default for OrganizationLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
            signature_scheme_id: None,
            public_key_height: None,
            description_height: None,
        }
    }
}

impl OrganizationLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn signature_scheme_id(&self) -> Option<u8> {
        self.signature_scheme_id
    }

    pub fn public_key_height(&self) -> Option<u64> {
        self.public_key_height
    }

    /// Height of the microblock holding the current description.
    pub fn description_height(&self) -> Option<u64> {
        self.description_height
    }

    pub fn with_public_key(self, scheme_id: u8, height: u64) -> Self {
        Self {
            signature_scheme_id: Some(scheme_id),
            public_key_height: Some(height),
            ..self
        }
    }

    pub fn with_description(self, height: u64) -> Self {
        Self {
            description_height: Some(height),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationLocalStateUpdater;

impl LocalStateUpdater for OrganizationLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Organization
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let mut state = expect_state!(previous, microblock, Organization).clone();
        let height = microblock.height();
        for section in microblock.sections() {
            state = match section.payload() {
                SectionPayload::OrganizationPublicKey(key) => {
                    state.with_public_key(key.scheme_id, height)
                }
                SectionPayload::OrganizationDescription(_) => state.with_description(height),
                _ => {
                    debug!(section = %section.section_type(), "no effect on organization state");
                    state
                }
            };
        }
        Ok(LocalState::Organization(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use microchain_core::section::{OrganizationDescriptionPayload, PublicKeyPayload};
    use microchain_core::Sha256Hash;

    fn description() -> SectionPayload {
        SectionPayload::OrganizationDescription(OrganizationDescriptionPayload {
            name: "Acme".into(),
            city: "Paris".into(),
            country_code: "FR".into(),
            website: "https://acme.example".into(),
        })
    }

    #[test]
    fn test_genesis_then_description_update() {
        let mut genesis =
            Microblock::create_genesis(VirtualBlockchainType::Organization, 0).unwrap();
        genesis
            .add_sections(vec![
                SectionPayload::OrganizationPublicKey(PublicKeyPayload {
                    scheme_id: 0,
                    public_key: Bytes::from_static(&[2; 33]),
                }),
                description(),
            ])
            .unwrap();

        let initial = LocalState::create_initial_state(VirtualBlockchainType::Organization);
        let first = OrganizationLocalStateUpdater
            .update_state(&initial, &genesis)
            .unwrap();

        let mut update = Microblock::create_successor(
            VirtualBlockchainType::Organization,
            2,
            Sha256Hash::ZERO,
        )
        .unwrap();
        update.add_section(description()).unwrap();
        let second = OrganizationLocalStateUpdater
            .update_state(&first, &update)
            .unwrap();

        let org = second.as_organization().unwrap();
        assert_eq!(org.public_key_height(), Some(1));
        assert_eq!(org.description_height(), Some(2));
        assert_eq!(first.as_organization().unwrap().description_height(), Some(1));
    }
}
