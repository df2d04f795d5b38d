//! Application ledger chain: actors, channels and their key exchanges.
//!
//! Actors and channels are numbered densely from zero in creation order, so
//! an id is also the position in its list.

use serde::{Deserialize, Serialize};
use tracing::debug;

use microchain_core::section::{
    ActorCreationPayload, ActorSubscriptionPayload, ChannelCreationPayload,
    ChannelInvitationPayload, SharedSecretPayload,
};
use microchain_core::{Microblock, SectionPayload, Sha256Hash, VirtualBlockchainType};

use crate::error::{Result, StateError};
use crate::local_state::LocalState;
use crate::updater::{expect_state, LocalStateUpdater, DEFAULT_LOCAL_STATE_VERSION};

/// A shared secret established with another actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSecretRecord {
    pub peer_actor_id: u32,
    pub height: u64,
}

/// An invitation received into a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationRecord {
    pub channel_id: u32,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    name: String,
    subscribed: bool,
    organization_id: Option<Sha256Hash>,
    signature_key_height: Option<u64>,
    pke_key_height: Option<u64>,
    shared_secrets: Vec<SharedSecretRecord>,
    invitations: Vec<InvitationRecord>,
}

impl Actor {
    fn new(name: String) -> Self {
        Self {
            name,
            subscribed: false,
            organization_id: None,
            signature_key_height: None,
            pke_key_height: None,
            shared_secrets: Vec::new(),
            invitations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn organization_id(&self) -> Option<Sha256Hash> {
        self.organization_id
    }

    /// Height where the actor's signature key was published.
    pub fn signature_key_height(&self) -> Option<u64> {
        self.signature_key_height
    }

    /// Height where the actor's PKE key was published.
    pub fn pke_key_height(&self) -> Option<u64> {
        self.pke_key_height
    }

    pub fn shared_secrets(&self) -> &[SharedSecretRecord] {
        &self.shared_secrets
    }

    pub fn invitations(&self) -> &[InvitationRecord] {
        &self.invitations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    name: String,
    is_private: bool,
    creator_id: u32,
}

impl Channel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn creator_id(&self) -> u32 {
        self.creator_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationLedgerLocalState {
    version: u16,
    allowed_signature_schemes: Vec<u8>,
    allowed_pke_schemes: Vec<u8>,
    application_id: Option<Sha256Hash>,
    actors: Vec<Actor>,
    channels: Vec<Channel>,
}

impl Default for ApplicationLedgerLocalState {
    fn default() -> Self {
        Self {
            version: DEFAULT_LOCAL_STATE_VERSION,
            allowed_signature_schemes: Vec::new(),
            allowed_pke_schemes: Vec::new(),
            application_id: None,
            actors: Vec::new(),
            channels: Vec::new(),
        }
    }
}

impl ApplicationLedgerLocalState {
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Allowed signature schemes. Empty means any.
    pub fn allowed_signature_schemes(&self) -> &[u8] {
        &self.allowed_signature_schemes
    }

    /// Allowed PKE schemes. Empty means any.
    pub fn allowed_pke_schemes(&self) -> &[u8] {
        &self.allowed_pke_schemes
    }

    pub fn application_id(&self) -> Option<Sha256Hash> {
        self.application_id
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn actor(&self, id: u32) -> Option<&Actor> {
        self.actors.get(id as usize)
    }

    pub fn channel(&self, id: u32) -> Option<&Channel> {
        self.channels.get(id as usize)
    }

    pub fn actor_id_by_name(&self, name: &str) -> Option<u32> {
        self.actors
            .iter()
            .position(|a| a.name == name)
            .map(|i| i as u32)
    }

    pub fn with_allowed_signature_schemes(self, scheme_ids: Vec<u8>) -> Self {
        Self {
            allowed_signature_schemes: scheme_ids,
            ..self
        }
    }

    pub fn with_allowed_pke_schemes(self, scheme_ids: Vec<u8>) -> Self {
        Self {
            allowed_pke_schemes: scheme_ids,
            ..self
        }
    }

    pub fn with_application_id(self, application_id: Sha256Hash) -> Self {
        Self {
            application_id: Some(application_id),
            ..self
        }
    }

    pub fn with_actor(mut self, creation: &ActorCreationPayload) -> Result<Self> {
        let expected = self.actors.len() as u32;
        if creation.id != expected {
            return Err(StateError::InvalidActor {
                expected,
                got: creation.id,
            });
        }
        if self.actor_id_by_name(&creation.name).is_some() {
            return Err(StateError::ActorAlreadyDefined {
                name: creation.name.clone(),
            });
        }
        self.actors.push(Actor::new(creation.name.clone()));
        Ok(self)
    }

    pub fn with_subscription(
        mut self,
        subscription: &ActorSubscriptionPayload,
        height: u64,
    ) -> Result<Self> {
        let actor_id = subscription.actor_id;
        let allowed_signature = &self.allowed_signature_schemes;
        let allowed_pke = &self.allowed_pke_schemes;

        let actor = self
            .actors
            .get_mut(actor_id as usize)
            .ok_or(StateError::CannotSubscribe { actor_id })?;
        if actor.subscribed {
            return Err(StateError::AlreadySubscribed { actor_id });
        }
        if !allows(allowed_signature, subscription.signature_scheme_id) {
            return Err(StateError::NotAllowedSignatureScheme(
                subscription.signature_scheme_id,
            ));
        }
        if !allows(allowed_pke, subscription.pke_scheme_id) {
            return Err(StateError::NotAllowedPkeScheme(subscription.pke_scheme_id));
        }

        actor.subscribed = true;
        actor.organization_id = Some(subscription.organization_id);
        actor.signature_key_height = Some(height);
        actor.pke_key_height = Some(height);
        Ok(self)
    }

    pub fn with_channel(mut self, creation: &ChannelCreationPayload) -> Result<Self> {
        let expected = self.channels.len() as u32;
        if creation.id != expected {
            return Err(StateError::InvalidChannel {
                expected,
                got: creation.id,
            });
        }
        if self.channels.iter().any(|c| c.name == creation.name) {
            return Err(StateError::ChannelAlreadyDefined {
                name: creation.name.clone(),
            });
        }
        self.channels.push(Channel {
            name: creation.name.clone(),
            is_private: creation.is_private,
            creator_id: creation.creator_id,
        });
        Ok(self)
    }

    pub fn with_shared_secret(mut self, secret: &SharedSecretPayload, height: u64) -> Result<Self> {
        self.require_actor(secret.host_id)?;
        self.require_actor(secret.guest_id)?;
        if secret.host_id == secret.guest_id {
            return Err(StateError::SharedSecretWithSelf(secret.host_id));
        }
        self.actors[secret.host_id as usize]
            .shared_secrets
            .push(SharedSecretRecord {
                peer_actor_id: secret.guest_id,
                height,
            });
        self.actors[secret.guest_id as usize]
            .shared_secrets
            .push(SharedSecretRecord {
                peer_actor_id: secret.host_id,
                height,
            });
        Ok(self)
    }

    pub fn with_invitation(
        mut self,
        invitation: &ChannelInvitationPayload,
        height: u64,
    ) -> Result<Self> {
        self.require_channel(invitation.channel_id)?;
        self.require_actor(invitation.host_id)?;
        self.require_actor(invitation.guest_id)?;
        self.actors[invitation.guest_id as usize]
            .invitations
            .push(InvitationRecord {
                channel_id: invitation.channel_id,
                height,
            });
        Ok(self)
    }

    fn require_actor(&self, id: u32) -> Result<()> {
        match self.actor(id) {
            Some(_) => Ok(()),
            None => Err(StateError::ActorNotDefined(id)),
        }
    }

    fn require_channel(&self, id: u32) -> Result<()> {
        match self.channel(id) {
            Some(_) => Ok(()),
            None => Err(StateError::ChannelNotDefined(id)),
        }
    }
}

fn allows(allow_list: &[u8], scheme_id: u8) -> bool {
    allow_list.is_empty() || allow_list.contains(&scheme_id)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationLedgerLocalStateUpdater;

impl LocalStateUpdater for ApplicationLedgerLocalStateUpdater {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::ApplicationLedger
    }

    fn update_state(&self, previous: &LocalState, microblock: &Microblock) -> Result<LocalState> {
        let mut state = expect_state!(previous, microblock, ApplicationLedger).clone();
        let height = microblock.height();

        for section in microblock.sections() {
            state = match section.payload() {
                SectionPayload::AppLedgerAllowedSignatureSchemes(p) => {
                    state.with_allowed_signature_schemes(p.scheme_ids.clone())
                }
                SectionPayload::AppLedgerAllowedPkeSchemes(p) => {
                    state.with_allowed_pke_schemes(p.scheme_ids.clone())
                }
                SectionPayload::AppLedgerDeclaration(p) => state.with_application_id(p.application_id),
                SectionPayload::AppLedgerActorCreation(p) => state.with_actor(p)?,
                SectionPayload::AppLedgerActorSubscription(p) => state.with_subscription(p, height)?,
                SectionPayload::AppLedgerChannelCreation(p) => state.with_channel(p)?,
                SectionPayload::AppLedgerSharedSecret(p) => state.with_shared_secret(p, height)?,
                SectionPayload::AppLedgerChannelInvitation(p) => state.with_invitation(p, height)?,
                SectionPayload::AppLedgerPublicChannelData(p) => {
                    state.require_channel(p.channel_id)?;
                    state
                }
                SectionPayload::AppLedgerPrivateChannelData(p) => {
                    state.require_channel(p.channel_id)?;
                    state
                }
                SectionPayload::AppLedgerEndorserSignature(_)
                | SectionPayload::AppLedgerAuthorSignature(_) => state,
                _ => {
                    debug!(section = %section.section_type(), "no effect on application ledger state");
                    state
                }
            };
        }

        Ok(LocalState::ApplicationLedger(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use microchain_core::section::{
        AllowedSchemesPayload, AppLedgerDeclarationPayload, PrivateChannelDataPayload,
        PublicChannelDataPayload,
    };
    use proptest::prelude::*;

    fn actor(id: u32, name: &str) -> SectionPayload {
        SectionPayload::AppLedgerActorCreation(ActorCreationPayload {
            id,
            name: name.into(),
        })
    }

    fn channel(id: u32, name: &str) -> SectionPayload {
        SectionPayload::AppLedgerChannelCreation(ChannelCreationPayload {
            id,
            name: name.into(),
            is_private: true,
            creator_id: 0,
        })
    }

    fn subscription(actor_id: u32, signature_scheme_id: u8, pke_scheme_id: u8) -> SectionPayload {
        SectionPayload::AppLedgerActorSubscription(ActorSubscriptionPayload {
            actor_id,
            organization_id: Sha256Hash::from_bytes([9; 32]),
            signature_scheme_id,
            signature_public_key: Bytes::from_static(&[1; 33]),
            pke_scheme_id,
            pke_public_key: Bytes::from_static(&[2; 32]),
        })
    }

    fn block(height: u64, payloads: Vec<SectionPayload>) -> Microblock {
        let mut mb = if height == 1 {
            Microblock::create_genesis(VirtualBlockchainType::ApplicationLedger, 0).unwrap()
        } else {
            Microblock::create_successor(
                VirtualBlockchainType::ApplicationLedger,
                height,
                Sha256Hash::ZERO,
            )
            .unwrap()
        };
        mb.add_sections(payloads).unwrap();
        mb
    }

    fn apply(state: &LocalState, payloads: Vec<SectionPayload>) -> Result<LocalState> {
        ApplicationLedgerLocalStateUpdater.update_state(state, &block(2, payloads))
    }

    fn initial() -> LocalState {
        LocalState::create_initial_state(VirtualBlockchainType::ApplicationLedger)
    }

    #[test]
    fn test_genesis_declaration_and_allow_lists() {
        let app = Sha256Hash::hash(b"app");
        let mb = block(
            1,
            vec![
                SectionPayload::AppLedgerAllowedSignatureSchemes(AllowedSchemesPayload {
                    scheme_ids: vec![0, 1],
                }),
                SectionPayload::AppLedgerDeclaration(AppLedgerDeclarationPayload {
                    application_id: app,
                }),
                actor(0, "alice"),
            ],
        );
        let state = ApplicationLedgerLocalStateUpdater
            .update_state(&initial(), &mb)
            .unwrap();
        let ledger = state.as_application_ledger().unwrap();
        assert_eq!(ledger.application_id(), Some(app));
        assert_eq!(ledger.allowed_signature_schemes(), &[0, 1]);
        assert!(ledger.allowed_pke_schemes().is_empty());
        assert_eq!(ledger.actor(0).unwrap().name(), "alice");
    }

    #[test]
    fn test_actor_ids_must_be_dense() {
        let err = apply(&initial(), vec![actor(1, "alice")]).unwrap_err();
        assert!(matches!(err, StateError::InvalidActor { expected: 0, got: 1 }));
    }

    #[test]
    fn test_actor_names_unique() {
        let err = apply(&initial(), vec![actor(0, "alice"), actor(1, "alice")]).unwrap_err();
        assert!(matches!(err, StateError::ActorAlreadyDefined { ref name } if name == "alice"));
    }

    #[test]
    fn test_subscription_lifecycle() {
        let state = apply(&initial(), vec![actor(0, "alice")]).unwrap();

        let err = apply(&state, vec![subscription(3, 0, 0)]).unwrap_err();
        assert!(matches!(err, StateError::CannotSubscribe { actor_id: 3 }));

        let subscribed = ApplicationLedgerLocalStateUpdater
            .update_state(&state, &block(5, vec![subscription(0, 0, 0)]))
            .unwrap();
        let alice = subscribed.as_application_ledger().unwrap().actor(0).unwrap();
        assert!(alice.is_subscribed());
        assert_eq!(alice.signature_key_height(), Some(5));
        assert_eq!(alice.pke_key_height(), Some(5));

        let err = apply(&subscribed, vec![subscription(0, 0, 0)]).unwrap_err();
        assert!(matches!(err, StateError::AlreadySubscribed { actor_id: 0 }));

        // The previous snapshot is untouched.
        assert!(!state
            .as_application_ledger()
            .unwrap()
            .actor(0)
            .unwrap()
            .is_subscribed());
    }

    #[test]
    fn test_subscription_scheme_allow_lists() {
        let state = LocalState::ApplicationLedger(
            ApplicationLedgerLocalState::default()
                .with_allowed_signature_schemes(vec![1])
                .with_allowed_pke_schemes(vec![4]),
        );
        let state = apply(&state, vec![actor(0, "alice")]).unwrap();

        let err = apply(&state, vec![subscription(0, 0, 4)]).unwrap_err();
        assert!(matches!(err, StateError::NotAllowedSignatureScheme(0)));

        let err = apply(&state, vec![subscription(0, 1, 5)]).unwrap_err();
        assert!(matches!(err, StateError::NotAllowedPkeScheme(5)));

        assert!(apply(&state, vec![subscription(0, 1, 4)]).is_ok());
    }

    #[test]
    fn test_channels() {
        let err = apply(&initial(), vec![channel(2, "main")]).unwrap_err();
        assert!(matches!(err, StateError::InvalidChannel { expected: 0, got: 2 }));

        let err = apply(&initial(), vec![channel(0, "main"), channel(1, "main")]).unwrap_err();
        assert!(matches!(err, StateError::ChannelAlreadyDefined { .. }));

        let state = apply(&initial(), vec![channel(0, "main"), channel(1, "audit")]).unwrap();
        let ledger = state.as_application_ledger().unwrap();
        assert_eq!(ledger.channels().len(), 2);
        assert_eq!(ledger.channel(1).unwrap().name(), "audit");
        assert!(ledger.channel(1).unwrap().is_private());
    }

    #[test]
    fn test_channel_data_requires_channel() {
        let public = SectionPayload::AppLedgerPublicChannelData(PublicChannelDataPayload {
            channel_id: 0,
            data: Bytes::from_static(b"{}"),
        });
        let err = apply(&initial(), vec![public.clone()]).unwrap_err();
        assert!(matches!(err, StateError::ChannelNotDefined(0)));

        let private = SectionPayload::AppLedgerPrivateChannelData(PrivateChannelDataPayload {
            channel_id: 1,
            merkle_root_hash: Sha256Hash::ZERO,
            encrypted_data: Bytes::from_static(b"..."),
        });
        let state = apply(&initial(), vec![channel(0, "main")]).unwrap();
        assert!(apply(&state, vec![public]).is_ok());
        assert!(matches!(
            apply(&state, vec![private]).unwrap_err(),
            StateError::ChannelNotDefined(1)
        ));
    }

    #[test]
    fn test_shared_secret_is_reciprocal() {
        let state = apply(&initial(), vec![actor(0, "alice"), actor(1, "bob")]).unwrap();
        let secret = SectionPayload::AppLedgerSharedSecret(SharedSecretPayload {
            host_id: 0,
            guest_id: 1,
            encapsulated_key: Bytes::from_static(&[5; 48]),
        });
        let state = apply(&state, vec![secret]).unwrap();
        let ledger = state.as_application_ledger().unwrap();
        assert_eq!(
            ledger.actor(0).unwrap().shared_secrets(),
            &[SharedSecretRecord { peer_actor_id: 1, height: 2 }]
        );
        assert_eq!(
            ledger.actor(1).unwrap().shared_secrets(),
            &[SharedSecretRecord { peer_actor_id: 0, height: 2 }]
        );

        let unknown = SectionPayload::AppLedgerSharedSecret(SharedSecretPayload {
            host_id: 0,
            guest_id: 7,
            encapsulated_key: Bytes::new(),
        });
        assert!(matches!(
            apply(&state, vec![unknown]).unwrap_err(),
            StateError::ActorNotDefined(7)
        ));
    }

    #[test]
    fn test_shared_secret_needs_two_actors() {
        let state = apply(&initial(), vec![actor(0, "alice"), actor(1, "bob")]).unwrap();
        let with_self = SectionPayload::AppLedgerSharedSecret(SharedSecretPayload {
            host_id: 1,
            guest_id: 1,
            encapsulated_key: Bytes::from_static(&[5; 48]),
        });
        assert!(matches!(
            apply(&state, vec![with_self]).unwrap_err(),
            StateError::SharedSecretWithSelf(1)
        ));
        assert!(state
            .as_application_ledger()
            .unwrap()
            .actor(1)
            .unwrap()
            .shared_secrets()
            .is_empty());
    }

    #[test]
    fn test_invitation_recorded_on_guest() {
        let state = apply(
            &initial(),
            vec![actor(0, "alice"), actor(1, "bob"), channel(0, "main")],
        )
        .unwrap();
        let invitation = |channel_id| {
            SectionPayload::AppLedgerChannelInvitation(ChannelInvitationPayload {
                channel_id,
                host_id: 0,
                guest_id: 1,
                encrypted_channel_key: Bytes::from_static(&[6; 32]),
            })
        };

        let invited = apply(&state, vec![invitation(0)]).unwrap();
        let ledger = invited.as_application_ledger().unwrap();
        assert_eq!(
            ledger.actor(1).unwrap().invitations(),
            &[InvitationRecord { channel_id: 0, height: 2 }]
        );
        assert!(ledger.actor(0).unwrap().invitations().is_empty());

        assert!(matches!(
            apply(&state, vec![invitation(3)]).unwrap_err(),
            StateError::ChannelNotDefined(3)
        ));
    }

    #[test]
    fn test_failure_leaves_previous_state() {
        let state = apply(&initial(), vec![actor(0, "alice")]).unwrap();
        let before = state.clone();
        // Valid first section, invalid second: nothing is applied.
        assert!(apply(&state, vec![actor(1, "bob"), actor(1, "carol")]).is_err());
        assert_eq!(state, before);
    }

    proptest! {
        #[test]
        fn prop_sequential_actor_creation(count in 1usize..20) {
            let payloads = (0..count)
                .map(|i| actor(i as u32, &format!("actor-{}", i)))
                .collect();
            let state = apply(&initial(), payloads).unwrap();
            let ledger = state.as_application_ledger().unwrap();
            prop_assert_eq!(ledger.actors().len(), count);
            for i in 0..count {
                prop_assert_eq!(
                    ledger.actor_id_by_name(&format!("actor-{}", i)),
                    Some(i as u32)
                );
            }
        }
    }
}
