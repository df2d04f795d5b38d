//! Sections: the typed, ordered payload units of a microblock body.
//!
//! Each section type is owned by one virtual blockchain type (high byte of the
//! type word minus one), except `SIGNATURE` which is common to every type but
//! the application ledger. Payloads are text-keyed canonical CBOR maps with a
//! fixed field set.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{from_canonical_cbor, to_canonical_cbor, RawSection, EXTERNAL_SCHEMA_FLAG};
use crate::error::{CoreError, Result};
use crate::types::{AccountId, Sha256Hash, VirtualBlockchainType};

macro_rules! section_types {
    ($( $(#[$doc:meta])* $variant:ident = $id:literal, $name:literal; )*) => {
        /// Discriminant of a section.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(into = "u16", try_from = "u16")]
        #[repr(u16)]
        pub enum SectionType {
            $( $(#[$doc])* $variant = $id, )*
        }

        impl SectionType {
            /// Every known section type, in discriminant order.
            pub const ALL: &'static [SectionType] = &[$( SectionType::$variant, )*];

            /// Try to parse from u16.
            pub fn from_u16(value: u16) -> Option<Self> {
                match value {
                    $( $id => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Wire name of the section type.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }
        }
    };
}

section_types! {
    /// Signature over the preceding sections (non-ledger chains).
    Signature = 0x0000, "SIGNATURE";

    ProtocolUpdate = 0x0100, "PROTOCOL_UPDATE";

    AccountPublicKey = 0x0200, "ACCOUNT_PUBLIC_KEY";
    AccountTokenIssuance = 0x0201, "ACCOUNT_TOKEN_ISSUANCE";
    AccountCreation = 0x0202, "ACCOUNT_CREATION";
    AccountTransfer = 0x0203, "ACCOUNT_TRANSFER";

    ValidatorNodeDeclaration = 0x0300, "VALIDATOR_NODE_DECLARATION";
    ValidatorNodeDescription = 0x0301, "VALIDATOR_NODE_DESCRIPTION";
    ValidatorNodeRpcEndpoint = 0x0302, "VALIDATOR_NODE_RPC_ENDPOINT";
    ValidatorNodeVotingPowerUpdate = 0x0303, "VALIDATOR_NODE_VOTING_POWER_UPDATE";

    OrganizationPublicKey = 0x0400, "ORGANIZATION_PUBLIC_KEY";
    OrganizationDescription = 0x0401, "ORGANIZATION_DESCRIPTION";

    ApplicationSignatureScheme = 0x0500, "APPLICATION_SIGNATURE_SCHEME";
    ApplicationDeclaration = 0x0501, "APPLICATION_DECLARATION";
    ApplicationDescription = 0x0502, "APPLICATION_DESCRIPTION";

    AppLedgerAllowedSignatureSchemes = 0x0600, "APP_LEDGER_ALLOWED_SIGNATURE_SCHEMES";
    AppLedgerAllowedPkeSchemes = 0x0601, "APP_LEDGER_ALLOWED_PKE_SCHEMES";
    AppLedgerDeclaration = 0x0602, "APP_LEDGER_DECLARATION";
    AppLedgerActorCreation = 0x0603, "APP_LEDGER_ACTOR_CREATION";
    AppLedgerChannelCreation = 0x0604, "APP_LEDGER_CHANNEL_CREATION";
    AppLedgerSharedSecret = 0x0605, "APP_LEDGER_SHARED_SECRET";
    AppLedgerChannelInvitation = 0x0606, "APP_LEDGER_CHANNEL_INVITATION";
    AppLedgerActorSubscription = 0x0607, "APP_LEDGER_ACTOR_SUBSCRIPTION";
    AppLedgerPublicChannelData = 0x0608, "APP_LEDGER_PUBLIC_CHANNEL_DATA";
    AppLedgerPrivateChannelData = 0x0609, "APP_LEDGER_PRIVATE_CHANNEL_DATA";
    /// Optional co-signature by an endorsing actor.
    AppLedgerEndorserSignature = 0x060A, "APP_LEDGER_ENDORSER_SIGNATURE";
    /// Mandatory closing signature of an application ledger microblock.
    AppLedgerAuthorSignature = 0x060B, "APP_LEDGER_AUTHOR_SIGNATURE";
}

impl SectionType {
    /// Convert to u16 for serialization.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// The owning chain type, or `None` for common sections.
    pub fn chain_type(self) -> Option<VirtualBlockchainType> {
        match self.to_u16() >> 8 {
            0 => None,
            high => VirtualBlockchainType::from_u8((high - 1) as u8),
        }
    }

    /// Whether this section carries a signature.
    pub fn is_signature(self) -> bool {
        matches!(
            self,
            Self::Signature | Self::AppLedgerEndorserSignature | Self::AppLedgerAuthorSignature
        )
    }

    /// Whether a microblock of `chain_type` may carry this section.
    pub fn is_allowed_in(self, chain_type: VirtualBlockchainType) -> bool {
        match self.chain_type() {
            Some(owner) => owner == chain_type,
            None => chain_type != VirtualBlockchainType::ApplicationLedger,
        }
    }

    /// Fail with a schema mismatch unless allowed in `chain_type`.
    pub fn check_allowed_in(self, chain_type: VirtualBlockchainType) -> Result<()> {
        if self.is_allowed_in(chain_type) {
            Ok(())
        } else {
            Err(CoreError::SchemaMismatch {
                section_type: self,
                chain_type,
            })
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<SectionType> for u16 {
    fn from(t: SectionType) -> Self {
        t.to_u16()
    }
}

impl TryFrom<u16> for SectionType {
    type Error = CoreError;

    fn try_from(value: u16) -> Result<Self> {
        Self::from_u16(value).ok_or(CoreError::UnknownSectionType(value))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Payload of every signature-kind section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignaturePayload {
    pub signature: Bytes,
    pub scheme_id: u8,
}

/// Network-wide parameters carried by the protocol chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolVariables {
    pub protocol_version: u16,
    pub minimum_gas_price: u32,
    pub max_microblock_past_delay: u32,
    pub max_microblock_future_delay: u32,
}

impl Default for ProtocolVariables {
    fn default() -> Self {
        Self {
            protocol_version: crate::header::PROTOCOL_VERSION,
            minimum_gas_price: 0,
            max_microblock_past_delay: 300,
            max_microblock_future_delay: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolUpdatePayload {
    pub variables: ProtocolVariables,
}

/// Public signature key declaration (accounts and organizations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyPayload {
    pub scheme_id: u8,
    pub public_key: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenIssuancePayload {
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountCreationPayload {
    pub seller_account: AccountId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferPayload {
    pub account: AccountId,
    pub amount: u64,
    pub public_reference: String,
    pub private_reference: String,
}

/// Link to an owning organization (validator nodes and applications).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationReferencePayload {
    pub organization_id: Sha256Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorNodeDescriptionPayload {
    pub consensus_public_key_type: String,
    pub consensus_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcEndpointPayload {
    pub rpc_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VotingPowerUpdatePayload {
    pub voting_power: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationDescriptionPayload {
    pub name: String,
    pub city: String,
    pub country_code: String,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureSchemePayload {
    pub scheme_id: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationDescriptionPayload {
    pub name: String,
    pub logo_url: String,
    pub homepage_url: String,
    pub description: String,
}

/// Allow-list of scheme ids. An empty list allows every scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowedSchemesPayload {
    pub scheme_ids: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppLedgerDeclarationPayload {
    pub application_id: Sha256Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorCreationPayload {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelCreationPayload {
    pub id: u32,
    pub name: String,
    pub is_private: bool,
    pub creator_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedSecretPayload {
    pub host_id: u32,
    pub guest_id: u32,
    pub encapsulated_key: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelInvitationPayload {
    pub channel_id: u32,
    pub host_id: u32,
    pub guest_id: u32,
    pub encrypted_channel_key: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorSubscriptionPayload {
    pub actor_id: u32,
    pub organization_id: Sha256Hash,
    pub signature_scheme_id: u8,
    pub signature_public_key: Bytes,
    pub pke_scheme_id: u8,
    pub pke_public_key: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicChannelDataPayload {
    pub channel_id: u32,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivateChannelDataPayload {
    pub channel_id: u32,
    pub merkle_root_hash: Sha256Hash,
    pub encrypted_data: Bytes,
}

macro_rules! section_payloads {
    ($( $variant:ident($payload:ty), )*) => {
        /// A decoded section payload, tagged by section type.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum SectionPayload {
            $( $variant($payload), )*
        }

        impl SectionPayload {
            /// The section type this payload is written under.
            pub fn section_type(&self) -> SectionType {
                match self {
                    $( Self::$variant(_) => SectionType::$variant, )*
                }
            }

            /// Canonical CBOR of the payload.
            pub fn encode(&self) -> Result<Vec<u8>> {
                match self {
                    $( Self::$variant(p) => to_canonical_cbor(p), )*
                }
            }

            /// Decode `data` under the schema of `section_type`.
            pub fn decode(section_type: SectionType, data: &[u8]) -> Result<Self> {
                match section_type {
                    $( SectionType::$variant => Ok(Self::$variant(from_canonical_cbor(data)?)), )*
                }
            }
        }
    };
}

section_payloads! {
    Signature(SignaturePayload),
    ProtocolUpdate(ProtocolUpdatePayload),
    AccountPublicKey(PublicKeyPayload),
    AccountTokenIssuance(TokenIssuancePayload),
    AccountCreation(AccountCreationPayload),
    AccountTransfer(TransferPayload),
    ValidatorNodeDeclaration(OrganizationReferencePayload),
    ValidatorNodeDescription(ValidatorNodeDescriptionPayload),
    ValidatorNodeRpcEndpoint(RpcEndpointPayload),
    ValidatorNodeVotingPowerUpdate(VotingPowerUpdatePayload),
    OrganizationPublicKey(PublicKeyPayload),
    OrganizationDescription(OrganizationDescriptionPayload),
    ApplicationSignatureScheme(SignatureSchemePayload),
    ApplicationDeclaration(OrganizationReferencePayload),
    ApplicationDescription(ApplicationDescriptionPayload),
    AppLedgerAllowedSignatureSchemes(AllowedSchemesPayload),
    AppLedgerAllowedPkeSchemes(AllowedSchemesPayload),
    AppLedgerDeclaration(AppLedgerDeclarationPayload),
    AppLedgerActorCreation(ActorCreationPayload),
    AppLedgerChannelCreation(ChannelCreationPayload),
    AppLedgerSharedSecret(SharedSecretPayload),
    AppLedgerChannelInvitation(ChannelInvitationPayload),
    AppLedgerActorSubscription(ActorSubscriptionPayload),
    AppLedgerPublicChannelData(PublicChannelDataPayload),
    AppLedgerPrivateChannelData(PrivateChannelDataPayload),
    AppLedgerEndorserSignature(SignaturePayload),
    AppLedgerAuthorSignature(SignaturePayload),
}

impl SectionPayload {
    /// The signature payload, for signature-kind sections.
    pub fn as_signature(&self) -> Option<&SignaturePayload> {
        match self {
            Self::Signature(p)
            | Self::AppLedgerEndorserSignature(p)
            | Self::AppLedgerAuthorSignature(p) => Some(p),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Section
// ─────────────────────────────────────────────────────────────────────────────

/// A section together with its encoded bytes and hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    index: usize,
    payload: SectionPayload,
    data: Bytes,
    hash: Sha256Hash,
}

impl Section {
    /// Encode a payload into a section. The index is set when the section is
    /// added to a microblock.
    pub fn new(payload: SectionPayload) -> Result<Self> {
        let data = Bytes::from(payload.encode()?);
        let hash = Sha256Hash::hash(&data);
        Ok(Self {
            index: 0,
            payload,
            data,
            hash,
        })
    }

    /// Decode a wire section found in a microblock of `chain_type`.
    pub fn from_raw(raw: RawSection, chain_type: VirtualBlockchainType) -> Result<Self> {
        if raw.section_type & EXTERNAL_SCHEMA_FLAG != 0 {
            return Err(CoreError::UnknownSectionType(raw.section_type));
        }
        let section_type = SectionType::try_from(raw.section_type)?;
        section_type.check_allowed_in(chain_type)?;
        let payload = SectionPayload::decode(section_type, &raw.data)?;
        let hash = Sha256Hash::hash(&raw.data);
        Ok(Self {
            index: 0,
            payload,
            data: Bytes::from(raw.data),
            hash,
        })
    }

    /// Position within the owning microblock.
    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn section_type(&self) -> SectionType {
        self.payload.section_type()
    }

    pub fn payload(&self) -> &SectionPayload {
        &self.payload
    }

    /// Encoded payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// SHA-256 of the encoded payload.
    pub fn hash(&self) -> Sha256Hash {
        self.hash
    }

    pub fn is_signature(&self) -> bool {
        self.section_type().is_signature()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ciborium::value::Value;

    use crate::canonical::encode_cbor_value_canonical;

    #[test]
    fn test_section_type_mapping() {
        for t in SectionType::ALL {
            assert_eq!(SectionType::from_u16(t.to_u16()), Some(*t));
        }
        assert_eq!(SectionType::from_u16(0x0700), None);
        assert_eq!(SectionType::ALL.len(), 27);
    }

    #[test]
    fn test_chain_ownership() {
        assert_eq!(SectionType::Signature.chain_type(), None);
        assert_eq!(
            SectionType::ProtocolUpdate.chain_type(),
            Some(VirtualBlockchainType::Protocol)
        );
        assert_eq!(
            SectionType::AccountTransfer.chain_type(),
            Some(VirtualBlockchainType::Account)
        );
        assert_eq!(
            SectionType::AppLedgerAuthorSignature.chain_type(),
            Some(VirtualBlockchainType::ApplicationLedger)
        );
    }

    #[test]
    fn test_admission_rule() {
        use VirtualBlockchainType::*;

        assert!(SectionType::Signature.is_allowed_in(Account));
        assert!(SectionType::Signature.is_allowed_in(Protocol));
        assert!(!SectionType::Signature.is_allowed_in(ApplicationLedger));
        assert!(SectionType::AppLedgerAuthorSignature.is_allowed_in(ApplicationLedger));
        assert!(!SectionType::AccountTransfer.is_allowed_in(Organization));

        assert!(matches!(
            SectionType::AccountTransfer.check_allowed_in(Organization),
            Err(CoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_signature_kinds() {
        let kinds: Vec<_> = SectionType::ALL
            .iter()
            .filter(|t| t.is_signature())
            .collect();
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_section_decodes_from_raw() {
        let payload = SectionPayload::AccountTransfer(TransferPayload {
            account: AccountId::from_bytes([0x07; 32]),
            amount: 1_000,
            public_reference: "invoice 42".into(),
            private_reference: String::new(),
        });
        let section = Section::new(payload.clone()).unwrap();
        assert_eq!(section.hash(), Sha256Hash::hash(section.data()));

        let raw = RawSection {
            section_type: 0x0203,
            data: section.data().to_vec(),
        };
        let decoded = Section::from_raw(raw, VirtualBlockchainType::Account).unwrap();
        assert_eq!(decoded.payload(), &payload);
        assert_eq!(decoded.hash(), section.hash());
    }

    #[test]
    fn test_payload_is_text_keyed_map() {
        let section = Section::new(SectionPayload::AccountTokenIssuance(TokenIssuancePayload {
            amount: 5,
        }))
        .unwrap();
        // {"amount": 5}
        assert_eq!(
            section.data(),
            &[0xa1, 0x66, b'a', b'm', b'o', b'u', b'n', b't', 0x05]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let value = Value::Map(vec![
            (Value::Text("amount".into()), Value::Integer(5.into())),
            (Value::Text("memo".into()), Value::Text("x".into())),
        ]);
        let data = encode_cbor_value_canonical(&value).unwrap();
        let result = SectionPayload::decode(SectionType::AccountTokenIssuance, &data);
        assert!(matches!(result, Err(CoreError::DecodingError(_))));
    }

    #[test]
    fn test_missing_field_rejected() {
        let value = Value::Map(vec![(Value::Text("id".into()), Value::Integer(0.into()))]);
        let data = encode_cbor_value_canonical(&value).unwrap();
        let result = SectionPayload::decode(SectionType::AppLedgerActorCreation, &data);
        assert!(matches!(result, Err(CoreError::DecodingError(_))));
    }

    #[test]
    fn test_external_schema_rejected() {
        let raw = RawSection {
            section_type: EXTERNAL_SCHEMA_FLAG | 0x0201,
            data: vec![0xa0],
        };
        assert!(matches!(
            Section::from_raw(raw, VirtualBlockchainType::Account),
            Err(CoreError::UnknownSectionType(_))
        ));
    }

    #[test]
    fn test_foreign_section_rejected() {
        let section = Section::new(SectionPayload::ProtocolUpdate(ProtocolUpdatePayload {
            variables: ProtocolVariables::default(),
        }))
        .unwrap();
        let raw = RawSection {
            section_type: SectionType::ProtocolUpdate.to_u16(),
            data: section.data().to_vec(),
        };
        assert!(matches!(
            Section::from_raw(raw, VirtualBlockchainType::Account),
            Err(CoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_as_signature() {
        let sig = SignaturePayload {
            signature: Bytes::from_static(&[1, 2, 3]),
            scheme_id: 0,
        };
        assert!(SectionPayload::AppLedgerEndorserSignature(sig.clone())
            .as_signature()
            .is_some());
        assert!(SectionPayload::AccountTokenIssuance(TokenIssuancePayload { amount: 1 })
            .as_signature()
            .is_none());
    }
}
