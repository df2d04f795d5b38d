//! Application chain: declaration, signature scheme and description.

use serde::{Deserialize, Serialize};

use microchain_core::{Microblock, SectionPayload, SectionType, Sha256Hash, VirtualBlockchainType};

use crate::error::Result;
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationLocalState {
    version: u16,
    signature_scheme_id: Option<u8>,
    organization_id: Option<Sha256Hash>,
    description_height: Option<u64>,
}

impl Default for ApplicationLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
            signature_scheme_id: None,
            organization_id: None,
            description_height: None,
        }
    }
}

impl ApplicationLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn signature_scheme_id(&self) -> Option<u8> {
        self.signature_scheme_id
    }

    /// Organization that declared the application.
    pub fn organization_id(&self) -> Option<Sha256Hash> {
        self.organization_id
    }

    pub fn description_height(&self) -> Option<u64> {
        self.description_height
    }

    pub fn with_signature_scheme(self, scheme_id: u8) -> Self {
        Self {
            signature_scheme_id: Some(scheme_id),
            ..self
        }
    }

    pub fn with_organization(self, organization_id: Sha256Hash) -> Self {
        Self {
            organization_id: Some(organization_id),
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

/// Looks up each relevant section once; an absent section leaves the state
/// unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationLocalStateUpdater;

impl LocalStateUpdater for ApplicationLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Application
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let mut state = expect_state!(previous, microblock, Application).clone();

        if let Some(section) = microblock.find_section_by_type(SectionType::ApplicationSignatureScheme)
        {
            if let SectionPayload::ApplicationSignatureScheme(p) = section.payload() {
                state = state.with_signature_scheme(p.scheme_id);
            }
        }

        if let Some(section) = microblock.find_section_by_type(SectionType::ApplicationDeclaration) {
            if let SectionPayload::ApplicationDeclaration(p) = section.payload() {
                state = state.with_organization(p.organization_id);
            }
        }

        if microblock
            .find_section_by_type(SectionType::ApplicationDescription)
            .is_some()
        {
            state = state.with_description(microblock.height());
        }

        Ok(LocalState::Application(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use microchain_core::section::{
        ApplicationDescriptionPayload, OrganizationReferencePayload, SignatureSchemePayload,
    };

    fn description() -> SectionPayload {
        SectionPayload::ApplicationDescription(ApplicationDescriptionPayload {
            name: "notary".into(),
            logo_url: String::new(),
            homepage_url: "https://notary.example".into(),
            description: "document notarization".into(),
        })
    }

    #[test]
    fn test_genesis_sets_everything() {
        let org = Sha256Hash::hash(b"organization");
        let mut mb = Microblock::create_genesis(VirtualBlockchainType::Application, 0).unwrap();
        mb.add_sections(vec![
            SectionPayload::ApplicationSignatureScheme(SignatureSchemePayload { scheme_id: 1 }),
            SectionPayload::ApplicationDeclaration(OrganizationReferencePayload {
                organization_id: org,
            }),
            description(),
        ])
        .unwrap();

        let initial = LocalState::create_initial_state(VirtualBlockchainType::Application);
        let next = ApplicationLocalStateUpdater.update_state(&initial, &mb).unwrap();
        let app = next.as_application().unwrap();
        assert_eq!(app.signature_scheme_id(), Some(1));
        assert_eq!(app.organization_id(), Some(org));
        assert_eq!(app.description_height(), Some(1));
    }

    #[test]
    fn test_absent_sections_are_no_ops() {
        let mut mb = Microblock::create_successor(
            VirtualBlockchainType::Application,
            4,
            Sha256Hash::ZERO,
        )
        .unwrap();
        mb.add_section(description()).unwrap();

        let initial =
            LocalState::Application(ApplicationLocalState::default().with_signature_scheme(0));
        let next = ApplicationLocalStateUpdater.update_state(&initial, &mb).unwrap();
        let app = next.as_application().unwrap();
        assert_eq!(app.signature_scheme_id(), Some(0));
        assert_eq!(app.organization_id(), None);
        assert_eq!(app.description_height(), Some(4));
    }
}
