//! Microblock: a header plus an ordered list of sections.
//!
//! The microblock keeps its header body hash and its own hash in sync with
//! the section list: every mutation re-derives both. Signatures cover the
//! header as it would read with only the sections preceding the signature,
//! which is what lets several parties sign the same microblock in turn.

use bytes::Bytes;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::canonical::{decode_body, decode_header, decode_microblock, encode_body, encode_microblock};
use crate::crypto::{PrivateSignatureKey, PublicSignatureKey};
use crate::error::{CoreError, Result};
use crate::header::{MicroblockHeader, MAX_GAS, MAX_HEIGHT, MAX_TIMESTAMP};
use crate::section::{Section, SectionPayload, SectionType, SignaturePayload};
use crate::types::{AccountId, Sha256Hash, VirtualBlockchainType};

/// Which signature section `seal` appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureRole {
    /// The closing signature of the microblock's author.
    #[default]
    Author,
    /// A co-signature; only application ledgers have one.
    Endorser,
}

/// Options for [`Microblock::seal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealOptions {
    /// Set the fees payer before signing.
    pub fees_payer_account: Option<AccountId>,
    /// Whether the gas fields are covered by the signature.
    pub include_gas: bool,
    pub role: SignatureRole,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            fees_payer_account: None,
            include_gas: true,
            role: SignatureRole::Author,
        }
    }
}

/// Which signature [`Microblock::verify`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureIndex {
    #[default]
    Last,
    /// 1-based position among the signature sections.
    Nth(usize),
}

/// Options for [`Microblock::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    pub include_gas: bool,
    pub verified_signature_index: SignatureIndex,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            include_gas: true,
            verified_signature_index: SignatureIndex::Last,
        }
    }
}

/// Outcome of a timestamp window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalValidity {
    Valid,
    TooFarInThePast,
    TooFarInTheFuture,
}

/// Accepted distance between a microblock timestamp and a reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampBounds {
    /// Seconds a microblock may lag behind the reference.
    pub max_past_delay: u64,
    /// Seconds a microblock may run ahead of the reference.
    pub max_future_delay: u64,
}

impl Default for TimestampBounds {
    fn default() -> Self {
        Self {
            max_past_delay: 300,
            max_future_delay: 60,
        }
    }
}

/// Fields recovered from the synthetic previous hash of a genesis microblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenesisSeed {
    pub chain_type: VirtualBlockchainType,
    pub expiration_day: u32,
}

/// Current Unix time in seconds.
pub fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Build the previous hash of a genesis microblock.
///
/// Layout: type at byte 0, expiration day (big-endian u32) at bytes 1..5,
/// zeros at 5..8, random seed at 8..32.
pub fn genesis_previous_hash(
    chain_type: VirtualBlockchainType,
    expiration_day: u32,
    seed: &[u8; 24],
) -> Sha256Hash {
    let mut bytes = [0u8; 32];
    bytes[0] = chain_type.to_u8();
    bytes[1..5].copy_from_slice(&expiration_day.to_be_bytes());
    bytes[8..].copy_from_slice(seed);
    Sha256Hash::from_bytes(bytes)
}

/// A microblock under construction or loaded from bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Microblock {
    header: MicroblockHeader,
    sections: Vec<Section>,
    hash: Sha256Hash,
}

impl Microblock {
    // ─────────────────────────────────────────────────────────────────────
    // Construction
    // ─────────────────────────────────────────────────────────────────────

    /// Create the first microblock of a new virtual blockchain.
    pub fn create_genesis(chain_type: VirtualBlockchainType, expiration_day: u32) -> Result<Self> {
        Self::create_genesis_with_rng(chain_type, expiration_day, &mut rand::thread_rng())
    }

    /// Like [`create_genesis`](Self::create_genesis) with an explicit source
    /// for the random seed.
    pub fn create_genesis_with_rng<R: RngCore + ?Sized>(
        chain_type: VirtualBlockchainType,
        expiration_day: u32,
        rng: &mut R,
    ) -> Result<Self> {
        let mut seed = [0u8; 24];
        rng.fill_bytes(&mut seed);
        let previous_hash = genesis_previous_hash(chain_type, expiration_day, &seed);
        Self::from_header(MicroblockHeader::new(chain_type, 1, previous_hash, now_seconds()))
    }

    /// Create a microblock that extends an existing virtual blockchain.
    pub fn create_successor(
        chain_type: VirtualBlockchainType,
        height: u64,
        previous_hash: Sha256Hash,
    ) -> Result<Self> {
        if height <= 1 {
            return Err(CoreError::IllegalParameter(format!(
                "successor height must be greater than 1, got {}",
                height
            )));
        }
        if height > MAX_HEIGHT {
            return Err(CoreError::IllegalParameter(format!(
                "height {} exceeds maximum {}",
                height, MAX_HEIGHT
            )));
        }
        Self::from_header(MicroblockHeader::new(chain_type, height, previous_hash, now_seconds()))
    }

    fn from_header(header: MicroblockHeader) -> Result<Self> {
        let mut microblock = Self {
            header,
            sections: Vec::new(),
            hash: Sha256Hash::ZERO,
        };
        microblock.refresh()?;
        Ok(microblock)
    }

    /// Rebuild a microblock from its encoded header and body.
    ///
    /// Checks, in order: header decoding, the expected type, the magic
    /// string, section decoding against the type's schema, and the declared
    /// body hash.
    pub fn load_from_header_and_body(
        header_bytes: &[u8],
        body_bytes: &[u8],
        expected_type: Option<VirtualBlockchainType>,
    ) -> Result<Self> {
        let header = decode_header(header_bytes)?;

        if let Some(expected) = expected_type {
            if header.microblock_type != expected {
                return Err(CoreError::MicroblockTypeMismatch {
                    expected,
                    found: header.microblock_type,
                });
            }
        }

        if !header.has_valid_magic() {
            return Err(CoreError::MagicStringMismatch {
                found: header.magic_string,
            });
        }

        let sections = decode_body(body_bytes)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut section = Section::from_raw(raw, header.microblock_type)?;
                section.set_index(index);
                Ok(section)
            })
            .collect::<Result<Vec<_>>>()?;

        let computed = Sha256Hash::hash(body_bytes);
        if computed != header.body_hash {
            return Err(CoreError::BodyHashMismatch {
                declared: header.body_hash,
                computed,
            });
        }

        let hash = Sha256Hash::hash(header_bytes);
        Ok(Self {
            header,
            sections,
            hash,
        })
    }

    /// Decode a whole microblock envelope.
    pub fn from_bytes(bytes: &[u8], expected_type: Option<VirtualBlockchainType>) -> Result<Self> {
        let (header, body) = decode_microblock(bytes)?;
        Self::load_from_header_and_body(&header, &body, expected_type)
    }

    /// Encoded `(header, body)`.
    pub fn serialize(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((self.header.to_bytes()?, self.body_bytes()))
    }

    /// Encode the whole microblock envelope.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let (header, body) = self.serialize()?;
        Ok(Bytes::from(encode_microblock(&header, &body)))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sections
    // ─────────────────────────────────────────────────────────────────────

    /// Append a section.
    ///
    /// Once the microblock is signed only further signatures may be added.
    pub fn add_section(&mut self, payload: SectionPayload) -> Result<&Section> {
        let section_type = payload.section_type();
        section_type.check_allowed_in(self.header.microblock_type)?;
        if self.is_signed() && !section_type.is_signature() {
            return Err(CoreError::IllegalState(format!(
                "cannot add {} to a signed microblock",
                section_type
            )));
        }

        let mut section = Section::new(payload)?;
        section.set_index(self.sections.len());
        self.sections.push(section);
        if let Err(e) = self.refresh() {
            self.sections.pop();
            return Err(e);
        }
        Ok(&self.sections[self.sections.len() - 1])
    }

    /// Append several sections. On failure, none of them is kept.
    pub fn add_sections<I>(&mut self, payloads: I) -> Result<()>
    where
        I: IntoIterator<Item = SectionPayload>,
    {
        let original_len = self.sections.len();
        for payload in payloads {
            if let Err(e) = self.add_section(payload) {
                self.sections.truncate(original_len);
                self.refresh()?;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove and return the last section.
    pub fn pop_section(&mut self) -> Result<Section> {
        let section = self
            .sections
            .pop()
            .ok_or_else(|| CoreError::IllegalState("no section to pop".into()))?;
        self.refresh()?;
        Ok(section)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Header setters
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_timestamp(&mut self, timestamp: u64) -> Result<()> {
        if timestamp > MAX_TIMESTAMP {
            return Err(CoreError::IllegalParameter(format!(
                "timestamp {} exceeds maximum {}",
                timestamp, MAX_TIMESTAMP
            )));
        }
        self.header.timestamp = timestamp;
        self.refresh()
    }

    pub fn set_gas(&mut self, gas: u32) -> Result<()> {
        if gas > MAX_GAS {
            return Err(CoreError::IllegalParameter(format!(
                "gas {} exceeds maximum {}",
                gas, MAX_GAS
            )));
        }
        self.header.gas = gas;
        self.refresh()
    }

    pub fn set_gas_price(&mut self, gas_price: u32) -> Result<()> {
        self.header.gas_price = gas_price;
        self.refresh()
    }

    pub fn set_fees_payer_account(&mut self, account: AccountId) -> Result<()> {
        self.header.fees_payer_account = account;
        self.refresh()
    }

    /// Link this microblock right after `previous`.
    pub fn set_as_successor_of(&mut self, previous: &Microblock) -> Result<()> {
        if previous.microblock_type() != self.microblock_type() {
            return Err(CoreError::IllegalParameter(format!(
                "cannot chain a {} microblock after a {} microblock",
                self.microblock_type(),
                previous.microblock_type()
            )));
        }
        let height = previous.height() + 1;
        if height > MAX_HEIGHT {
            return Err(CoreError::IllegalParameter(format!(
                "height {} exceeds maximum {}",
                height, MAX_HEIGHT
            )));
        }
        self.header.previous_hash = previous.hash();
        self.header.height = height;
        self.refresh()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Signatures
    // ─────────────────────────────────────────────────────────────────────

    /// Sign the microblock as it currently stands.
    pub fn sign<K>(&self, key: &K, include_gas: bool) -> Result<Vec<u8>>
    where
        K: PrivateSignatureKey + ?Sized,
    {
        let message = self.signed_message(&self.sections, include_gas)?;
        Ok(key.sign(&message))
    }

    /// Sign and append the matching signature section.
    pub fn seal<K>(&mut self, key: &K, options: SealOptions) -> Result<()>
    where
        K: PrivateSignatureKey + ?Sized,
    {
        let ledger = self.microblock_type() == VirtualBlockchainType::ApplicationLedger;
        let make_section: fn(SignaturePayload) -> SectionPayload = match (ledger, options.role) {
            (true, SignatureRole::Author) => SectionPayload::AppLedgerAuthorSignature,
            (true, SignatureRole::Endorser) => SectionPayload::AppLedgerEndorserSignature,
            (false, SignatureRole::Author) => SectionPayload::Signature,
            (false, SignatureRole::Endorser) => {
                return Err(CoreError::IllegalParameter(format!(
                    "{} microblocks have no endorser signature",
                    self.microblock_type()
                )))
            }
        };

        if let Some(account) = options.fees_payer_account {
            self.set_fees_payer_account(account)?;
        }

        let signature = self.sign(key, options.include_gas)?;
        self.add_section(make_section(SignaturePayload {
            signature: Bytes::from(signature),
            scheme_id: key.scheme_id().to_u8(),
        }))?;
        Ok(())
    }

    /// Verify one of the signatures of this microblock.
    ///
    /// A key of another scheme than the signature section's verifies as
    /// `false`.
    pub fn verify<K>(&self, key: &K, options: VerifyOptions) -> Result<bool>
    where
        K: PublicSignatureKey + ?Sized,
    {
        let positions: Vec<usize> = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_signature())
            .map(|(i, _)| i)
            .collect();

        if positions.is_empty() {
            return Err(CoreError::IllegalState("microblock has no signature".into()));
        }

        let nth = match options.verified_signature_index {
            SignatureIndex::Last => positions.len(),
            SignatureIndex::Nth(0) => {
                return Err(CoreError::IllegalParameter(
                    "signature index must be positive".into(),
                ))
            }
            SignatureIndex::Nth(n) if n > positions.len() => {
                return Err(CoreError::IllegalParameter(format!(
                    "signature index {} exceeds signature count {}",
                    n,
                    positions.len()
                )))
            }
            SignatureIndex::Nth(n) => n,
        };

        let position = positions[nth - 1];
        let signature = match self.sections[position].payload().as_signature() {
            Some(signature) => signature,
            None => return Err(CoreError::IllegalState("expected a signature section".into())),
        };

        if signature.scheme_id != key.scheme_id().to_u8() {
            return Ok(false);
        }

        let message = self.signed_message(&self.sections[..position], options.include_gas)?;
        Ok(key.verify(&message, &signature.signature))
    }

    /// Header bytes as they read with only `sections` in the body.
    fn signed_message(&self, sections: &[Section], include_gas: bool) -> Result<Vec<u8>> {
        let mut header = if include_gas {
            self.header.clone()
        } else {
            self.header.without_gas()
        };
        header.body_hash = Sha256Hash::hash(&encode_section_list(sections));
        header.to_bytes()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Timestamp window
    // ─────────────────────────────────────────────────────────────────────

    /// Check the timestamp against `reference` with the default bounds.
    pub fn is_temporally_close_to(&self, reference: u64) -> TemporalValidity {
        self.is_temporally_close_to_with(reference, TimestampBounds::default())
    }

    pub fn is_temporally_close_to_with(
        &self,
        reference: u64,
        bounds: TimestampBounds,
    ) -> TemporalValidity {
        let timestamp = self.header.timestamp;
        if timestamp.saturating_add(bounds.max_past_delay) < reference {
            TemporalValidity::TooFarInThePast
        } else if timestamp > reference.saturating_add(bounds.max_future_delay) {
            TemporalValidity::TooFarInTheFuture
        } else {
            TemporalValidity::Valid
        }
    }

    /// Check the timestamp against the current time.
    pub fn is_temporally_close_to_now(&self) -> TemporalValidity {
        self.is_temporally_close_to(now_seconds())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn header(&self) -> &MicroblockHeader {
        &self.header
    }

    /// SHA-256 of the encoded header.
    pub fn hash(&self) -> Sha256Hash {
        self.hash
    }

    pub fn microblock_type(&self) -> VirtualBlockchainType {
        self.header.microblock_type
    }

    pub fn height(&self) -> u64 {
        self.header.height
    }

    pub fn previous_hash(&self) -> Sha256Hash {
        self.header.previous_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.header.timestamp
    }

    pub fn body_hash(&self) -> Sha256Hash {
        self.header.body_hash
    }

    pub fn fees_payer_account(&self) -> AccountId {
        self.header.fees_payer_account
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Types of all sections, in order.
    pub fn section_types(&self) -> Vec<SectionType> {
        self.sections.iter().map(Section::section_type).collect()
    }

    /// First section matching `predicate`.
    pub fn get_section<P>(&self, predicate: P) -> Result<&Section>
    where
        P: Fn(&Section) -> bool,
    {
        self.find_section(predicate)
            .ok_or_else(|| CoreError::SectionNotFound("no section matches".into()))
    }

    pub fn find_section<P>(&self, predicate: P) -> Option<&Section>
    where
        P: Fn(&Section) -> bool,
    {
        self.sections.iter().find(|s| predicate(s))
    }

    pub fn get_sections<P>(&self, predicate: P) -> Vec<&Section>
    where
        P: Fn(&Section) -> bool,
    {
        self.sections.iter().filter(|s| predicate(s)).collect()
    }

    pub fn get_section_by_type(&self, section_type: SectionType) -> Result<&Section> {
        self.find_section_by_type(section_type)
            .ok_or_else(|| CoreError::SectionNotFound(section_type.name().to_string()))
    }

    pub fn find_section_by_type(&self, section_type: SectionType) -> Option<&Section> {
        self.find_section(|s| s.section_type() == section_type)
    }

    pub fn count_sections_by_type(&self, section_type: SectionType) -> usize {
        self.sections
            .iter()
            .filter(|s| s.section_type() == section_type)
            .count()
    }

    pub fn number_of_signatures(&self) -> usize {
        self.sections.iter().filter(|s| s.is_signature()).count()
    }

    /// Whether the last section is a signature.
    pub fn is_signed(&self) -> bool {
        self.sections.last().is_some_and(Section::is_signature)
    }

    pub fn is_genesis_microblock(&self) -> bool {
        self.header.height == 1
    }

    /// Whether the header body hash matches the current sections.
    pub fn is_declaring_consistent_body_hash(&self) -> bool {
        Sha256Hash::hash(&self.body_bytes()) == self.header.body_hash
    }

    /// Type and expiration day encoded in a genesis previous hash.
    pub fn genesis_seed(&self) -> Option<GenesisSeed> {
        if !self.is_genesis_microblock() {
            return None;
        }
        let bytes = self.header.previous_hash.as_bytes();
        if bytes[5..8] != [0, 0, 0] {
            return None;
        }
        let chain_type = VirtualBlockchainType::from_u8(bytes[0])?;
        let mut day = [0u8; 4];
        day.copy_from_slice(&bytes[1..5]);
        Some(GenesisSeed {
            chain_type,
            expiration_day: u32::from_be_bytes(day),
        })
    }

    fn body_bytes(&self) -> Vec<u8> {
        encode_section_list(&self.sections)
    }

    /// Re-derive the body hash and the microblock hash.
    fn refresh(&mut self) -> Result<()> {
        self.header.body_hash = Sha256Hash::hash(&self.body_bytes());
        self.hash = self.header.hash()?;
        Ok(())
    }
}

fn encode_section_list(sections: &[Section]) -> Vec<u8> {
    encode_body(sections.iter().map(|s| (s.section_type().to_u16(), s.data())))
}
