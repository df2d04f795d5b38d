//! Section grammar of each virtual blockchain type.
//!
//! A [`StructureChecker`] walks the section list with a cursor. Each
//! `expects` or `group` call greedily consumes the longest run of matching
//! sections and checks its count; `ends_here` then requires the whole list to
//! have been consumed.

use std::fmt;

use tracing::error;

use crate::error::StructureError;
use crate::microblock::Microblock;
use crate::section::{Section, SectionType};
use crate::types::VirtualBlockchainType;

/// Count constraint on a run of sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Any,
    Zero,
    One,
    AtMostOne,
    AtLeastOne,
}

impl Constraint {
    pub fn admits(self, count: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Zero => count == 0,
            Self::One => count == 1,
            Self::AtMostOne => count <= 1,
            Self::AtLeastOne => count >= 1,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any number of",
            Self::Zero => "no",
            Self::One => "exactly one",
            Self::AtMostOne => "at most one",
            Self::AtLeastOne => "at least one",
        })
    }
}

/// Cursor over the sections of one microblock.
#[derive(Debug)]
pub struct StructureChecker<'a> {
    sections: &'a [Section],
    height: u64,
    position: usize,
}

impl<'a> StructureChecker<'a> {
    pub fn new(microblock: &'a Microblock) -> Self {
        Self::from_sections(microblock.sections(), microblock.height())
    }

    pub fn from_sections(sections: &'a [Section], height: u64) -> Self {
        Self {
            sections,
            height,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_first_block(&self) -> bool {
        self.height == 1
    }

    /// Consume the run of `section_type` at the cursor and check its length.
    pub fn expects(
        &mut self,
        constraint: Constraint,
        section_type: SectionType,
    ) -> Result<(), StructureError> {
        let start = self.position;
        let count = self.consume_while(|t| t == section_type);
        if !constraint.admits(count) {
            return Err(self.fail_at(
                start,
                format!("expected {} {}, found {}", constraint, section_type, count),
            ));
        }
        Ok(())
    }

    /// Consume the run of sections whose type is listed, in any order.
    ///
    /// `group_constraint` applies to the run length, each listed constraint
    /// to the tally of its own type.
    pub fn group(
        &mut self,
        group_constraint: Constraint,
        members: &[(Constraint, SectionType)],
    ) -> Result<(), StructureError> {
        let start = self.position;
        let mut tallies = vec![0usize; members.len()];
        while let Some(section) = self.sections.get(self.position) {
            let Some(slot) = members
                .iter()
                .position(|(_, t)| *t == section.section_type())
            else {
                break;
            };
            tallies[slot] += 1;
            self.position += 1;
        }

        let total = self.position - start;
        if !group_constraint.admits(total) {
            return Err(self.fail_at(
                start,
                format!(
                    "expected {} section(s) from group [{}], found {}",
                    group_constraint,
                    members
                        .iter()
                        .map(|(_, t)| t.name())
                        .collect::<Vec<_>>()
                        .join(", "),
                    total
                ),
            ));
        }

        for ((constraint, section_type), count) in members.iter().zip(&tallies) {
            if !constraint.admits(*count) {
                return Err(self.fail_at(
                    start,
                    format!(
                        "expected {} {} in group, found {}",
                        constraint, section_type, count
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Fail unless every section has been consumed.
    pub fn ends_here(&self) -> Result<(), StructureError> {
        match self.sections.get(self.position) {
            None => Ok(()),
            Some(section) => Err(self.fail_at(
                self.position,
                format!("unexpected {}", section.section_type()),
            )),
        }
    }

    fn consume_while<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(SectionType) -> bool,
    {
        let start = self.position;
        while self
            .sections
            .get(self.position)
            .is_some_and(|s| predicate(s.section_type()))
        {
            self.position += 1;
        }
        self.position - start
    }

    fn fail_at(&self, position: usize, reason: String) -> StructureError {
        StructureError { position, reason }
    }
}

/// Grammar of one virtual blockchain type.
pub trait MicroblockStructureChecker: Send + Sync {
    fn chain_type(&self) -> VirtualBlockchainType;

    /// Run the grammar. Must end with [`StructureChecker::ends_here`].
    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError>;

    /// Verdict for a whole microblock. Failures are logged, not returned.
    fn check_microblock_structure(&self, microblock: &Microblock) -> bool {
        if microblock.microblock_type() != self.chain_type() {
            error!(
                expected = %self.chain_type(),
                found = %microblock.microblock_type(),
                "structure checker applied to a microblock of another type"
            );
            return false;
        }

        let mut checker = StructureChecker::new(microblock);
        match self.check_structure(&mut checker) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    chain_type = %self.chain_type(),
                    height = microblock.height(),
                    hash = %microblock.hash(),
                    error = %e,
                    "invalid microblock structure"
                );
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolMicroblockStructureChecker;

impl MicroblockStructureChecker for ProtocolMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Protocol
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        checker.expects(Constraint::One, SectionType::ProtocolUpdate)?;
        checker.expects(Constraint::One, SectionType::Signature)?;
        checker.ends_here()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccountMicroblockStructureChecker;

impl MicroblockStructureChecker for AccountMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Account
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        if checker.is_first_block() {
            checker.expects(Constraint::One, SectionType::AccountPublicKey)?;
            checker.group(
                Constraint::One,
                &[
                    (Constraint::AtMostOne, SectionType::AccountTokenIssuance),
                    (Constraint::AtMostOne, SectionType::AccountCreation),
                ],
            )?;
        } else {
            checker.expects(Constraint::Zero, SectionType::AccountPublicKey)?;
            checker.expects(Constraint::AtLeastOne, SectionType::AccountTransfer)?;
        }
        checker.expects(Constraint::One, SectionType::Signature)?;
        checker.ends_here()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorNodeMicroblockStructureChecker;

impl MicroblockStructureChecker for ValidatorNodeMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::ValidatorNode
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        let updates = if checker.is_first_block() {
            checker.expects(Constraint::One, SectionType::ValidatorNodeDeclaration)?;
            Constraint::Any
        } else {
            checker.expects(Constraint::Zero, SectionType::ValidatorNodeDeclaration)?;
            Constraint::AtLeastOne
        };
        checker.group(
            updates,
            &[
                (Constraint::AtMostOne, SectionType::ValidatorNodeDescription),
                (Constraint::AtMostOne, SectionType::ValidatorNodeRpcEndpoint),
                (Constraint::AtMostOne, SectionType::ValidatorNodeVotingPowerUpdate),
            ],
        )?;
        checker.expects(Constraint::One, SectionType::Signature)?;
        checker.ends_here()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationMicroblockStructureChecker;

impl MicroblockStructureChecker for OrganizationMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Organization
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        if checker.is_first_block() {
            checker.expects(Constraint::One, SectionType::OrganizationPublicKey)?;
            checker.expects(Constraint::One, SectionType::OrganizationDescription)?;
        } else {
            checker.group(
                Constraint::AtLeastOne,
                &[
                    (Constraint::AtMostOne, SectionType::OrganizationPublicKey),
                    (Constraint::AtMostOne, SectionType::OrganizationDescription),
                ],
            )?;
        }
        checker.expects(Constraint::One, SectionType::Signature)?;
        checker.ends_here()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationMicroblockStructureChecker;

impl MicroblockStructureChecker for ApplicationMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::Application
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        if checker.is_first_block() {
            checker.expects(Constraint::AtMostOne, SectionType::ApplicationSignatureScheme)?;
            checker.expects(Constraint::One, SectionType::ApplicationDeclaration)?;
        } else {
            checker.expects(Constraint::Zero, SectionType::ApplicationSignatureScheme)?;
            checker.expects(Constraint::Zero, SectionType::ApplicationDeclaration)?;
        }
        checker.expects(Constraint::One, SectionType::ApplicationDescription)?;
        checker.expects(Constraint::One, SectionType::Signature)?;
        checker.ends_here()
    }
}

/// Sections an application ledger microblock may carry between its header
/// declarations and its signatures.
const APP_LEDGER_CONTENT: [SectionType; 7] = [
    SectionType::AppLedgerActorCreation,
    SectionType::AppLedgerChannelCreation,
    SectionType::AppLedgerSharedSecret,
    SectionType::AppLedgerChannelInvitation,
    SectionType::AppLedgerActorSubscription,
    SectionType::AppLedgerPublicChannelData,
    SectionType::AppLedgerPrivateChannelData,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationLedgerMicroblockStructureChecker;

impl MicroblockStructureChecker for ApplicationLedgerMicroblockStructureChecker {
    fn chain_type(&self) -> VirtualBlockchainType {
        VirtualBlockchainType::ApplicationLedger
    }

    fn check_structure(&self, checker: &mut StructureChecker<'_>) -> Result<(), StructureError> {
        let content = if checker.is_first_block() {
            checker.expects(Constraint::AtMostOne, SectionType::AppLedgerAllowedSignatureSchemes)?;
            checker.expects(Constraint::AtMostOne, SectionType::AppLedgerAllowedPkeSchemes)?;
            checker.expects(Constraint::One, SectionType::AppLedgerDeclaration)?;
            Constraint::Any
        } else {
            checker.expects(Constraint::Zero, SectionType::AppLedgerAllowedSignatureSchemes)?;
            checker.expects(Constraint::Zero, SectionType::AppLedgerAllowedPkeSchemes)?;
            checker.expects(Constraint::Zero, SectionType::AppLedgerDeclaration)?;
            Constraint::AtLeastOne
        };
        let members = APP_LEDGER_CONTENT.map(|t| (Constraint::Any, t));
        checker.group(content, &members)?;
        checker.expects(Constraint::AtMostOne, SectionType::AppLedgerEndorserSignature)?;
        checker.expects(Constraint::One, SectionType::AppLedgerAuthorSignature)?;
        checker.ends_here()
    }
}

/// The grammar for microblocks of `chain_type`.
pub fn structure_checker_for(chain_type: VirtualBlockchainType) -> Box<dyn MicroblockStructureChecker> {
    match chain_type {
        VirtualBlockchainType::Protocol => Box::new(ProtocolMicroblockStructureChecker),
        VirtualBlockchainType::Account => Box::new(AccountMicroblockStructureChecker),
        VirtualBlockchainType::ValidatorNode => Box::new(ValidatorNodeMicroblockStructureChecker),
        VirtualBlockchainType::Organization => Box::new(OrganizationMicroblockStructureChecker),
        VirtualBlockchainType::Application => Box::new(ApplicationMicroblockStructureChecker),
        VirtualBlockchainType::ApplicationLedger => {
            Box::new(ApplicationLedgerMicroblockStructureChecker)
        }
    }
}

/// Check a microblock against the grammar of its own type.
pub fn check_microblock_structure(microblock: &Microblock) -> bool {
    structure_checker_for(microblock.microblock_type()).check_microblock_structure(microblock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::section::{
        AccountCreationPayload, ActorCreationPayload, AppLedgerDeclarationPayload,
        PublicChannelDataPayload, PublicKeyPayload, SectionPayload, SignaturePayload,
        TokenIssuancePayload, TransferPayload,
    };
    use crate::types::{AccountId, Sha256Hash};

    fn signature() -> SignaturePayload {
        SignaturePayload {
            signature: Bytes::from_static(&[0xaa; 64]),
            scheme_id: 0,
        }
    }

    fn public_key() -> SectionPayload {
        SectionPayload::AccountPublicKey(PublicKeyPayload {
            scheme_id: 0,
            public_key: Bytes::from_static(&[0x02; 33]),
        })
    }

    fn issuance() -> SectionPayload {
        SectionPayload::AccountTokenIssuance(TokenIssuancePayload { amount: 1_000 })
    }

    fn transfer() -> SectionPayload {
        SectionPayload::AccountTransfer(TransferPayload {
            account: AccountId::from_bytes([0x01; 32]),
            amount: 5,
            public_reference: String::new(),
            private_reference: String::new(),
        })
    }

    fn account_block(height: u64, payloads: Vec<SectionPayload>) -> Microblock {
        let mut mb = if height == 1 {
            Microblock::create_genesis(VirtualBlockchainType::Account, 0).unwrap()
        } else {
            Microblock::create_successor(
                VirtualBlockchainType::Account,
                height,
                Sha256Hash::from_bytes([1; 32]),
            )
            .unwrap()
        };
        mb.add_sections(payloads).unwrap();
        mb
    }

    fn ledger_block(height: u64, payloads: Vec<SectionPayload>) -> Microblock {
        let mut mb = if height == 1 {
            Microblock::create_genesis(VirtualBlockchainType::ApplicationLedger, 0).unwrap()
        } else {
            Microblock::create_successor(
                VirtualBlockchainType::ApplicationLedger,
                height,
                Sha256Hash::from_bytes([1; 32]),
            )
            .unwrap()
        };
        mb.add_sections(payloads).unwrap();
        mb
    }

    #[test]
    fn test_constraints() {
        assert!(Constraint::Any.admits(0) && Constraint::Any.admits(9));
        assert!(Constraint::Zero.admits(0) && !Constraint::Zero.admits(1));
        assert!(Constraint::One.admits(1) && !Constraint::One.admits(2));
        assert!(Constraint::AtMostOne.admits(0) && !Constraint::AtMostOne.admits(2));
        assert!(Constraint::AtLeastOne.admits(3) && !Constraint::AtLeastOne.admits(0));
    }

    #[test]
    fn test_expects_is_greedy() {
        let mb = account_block(2, vec![transfer(), transfer(), transfer()]);
        let mut checker = StructureChecker::new(&mb);
        let err = checker
            .expects(Constraint::AtMostOne, SectionType::AccountTransfer)
            .unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.to_string().starts_with("microblock structure checking failed"));
    }

    #[test]
    fn test_ends_here_reports_leftover() {
        let mb = account_block(2, vec![transfer()]);
        let mut checker = StructureChecker::new(&mb);
        checker.expects(Constraint::Zero, SectionType::AccountPublicKey).unwrap();
        let err = checker.ends_here().unwrap_err();
        assert_eq!(err.position, 0);

        checker.expects(Constraint::One, SectionType::AccountTransfer).unwrap();
        assert_eq!(checker.position(), 1);
        assert!(checker.ends_here().is_ok());
    }

    #[test]
    fn test_group_counts_each_member() {
        let mb = account_block(
            1,
            vec![
                public_key(),
                SectionPayload::AccountCreation(AccountCreationPayload {
                    seller_account: AccountId::from_bytes([3; 32]),
                    amount: 10,
                }),
                issuance(),
            ],
        );
        let mut checker = StructureChecker::new(&mb);
        checker.expects(Constraint::One, SectionType::AccountPublicKey).unwrap();
        let members = [
            (Constraint::AtMostOne, SectionType::AccountTokenIssuance),
            (Constraint::AtMostOne, SectionType::AccountCreation),
        ];
        // Two sections in a group limited to one.
        assert!(checker.group(Constraint::One, &members).is_err());

        let mut checker = StructureChecker::new(&mb);
        checker.expects(Constraint::One, SectionType::AccountPublicKey).unwrap();
        checker.group(Constraint::Any, &members).unwrap();
        assert!(checker.ends_here().is_ok());
    }

    #[test]
    fn test_account_genesis_grammar() {
        let valid = account_block(
            1,
            vec![public_key(), issuance(), SectionPayload::Signature(signature())],
        );
        assert!(check_microblock_structure(&valid));

        let missing_key = account_block(1, vec![issuance(), SectionPayload::Signature(signature())]);
        assert!(!check_microblock_structure(&missing_key));

        let unsigned = account_block(1, vec![public_key(), issuance()]);
        assert!(!check_microblock_structure(&unsigned));
    }

    #[test]
    fn test_account_successor_grammar() {
        let two_transfers = account_block(
            2,
            vec![transfer(), transfer(), SectionPayload::Signature(signature())],
        );
        assert!(check_microblock_structure(&two_transfers));

        let no_transfer = account_block(2, vec![SectionPayload::Signature(signature())]);
        assert!(!check_microblock_structure(&no_transfer));

        let key_rotation = account_block(
            2,
            vec![public_key(), transfer(), SectionPayload::Signature(signature())],
        );
        assert!(!check_microblock_structure(&key_rotation));
    }

    #[test]
    fn test_ledger_grammar() {
        let declaration = SectionPayload::AppLedgerDeclaration(AppLedgerDeclarationPayload {
            application_id: Sha256Hash::from_bytes([4; 32]),
        });
        let actor = SectionPayload::AppLedgerActorCreation(ActorCreationPayload {
            id: 0,
            name: "alice".into(),
        });
        let data = SectionPayload::AppLedgerPublicChannelData(PublicChannelDataPayload {
            channel_id: 0,
            data: Bytes::from_static(b"hello"),
        });

        let genesis = ledger_block(
            1,
            vec![
                declaration.clone(),
                actor.clone(),
                SectionPayload::AppLedgerEndorserSignature(signature()),
                SectionPayload::AppLedgerAuthorSignature(signature()),
            ],
        );
        assert!(check_microblock_structure(&genesis));

        let bare_genesis = ledger_block(
            1,
            vec![
                declaration.clone(),
                SectionPayload::AppLedgerAuthorSignature(signature()),
            ],
        );
        assert!(check_microblock_structure(&bare_genesis));

        let empty_successor =
            ledger_block(2, vec![SectionPayload::AppLedgerAuthorSignature(signature())]);
        assert!(!check_microblock_structure(&empty_successor));

        let successor = ledger_block(
            2,
            vec![data, actor, SectionPayload::AppLedgerAuthorSignature(signature())],
        );
        assert!(check_microblock_structure(&successor));

        let redeclared = ledger_block(
            2,
            vec![declaration, SectionPayload::AppLedgerAuthorSignature(signature())],
        );
        assert!(!check_microblock_structure(&redeclared));
    }

    #[test]
    fn test_checker_rejects_foreign_type() {
        let mb = account_block(2, vec![transfer(), SectionPayload::Signature(signature())]);
        assert!(!OrganizationMicroblockStructureChecker.check_microblock_structure(&mb));
        assert!(AccountMicroblockStructureChecker.check_microblock_structure(&mb));
    }

    #[test]
    fn test_factory_covers_every_type() {
        for t in VirtualBlockchainType::ALL {
            assert_eq!(structure_checker_for(t).chain_type(), t);
        }
    }
}
