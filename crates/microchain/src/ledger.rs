//! The main Ledger interface.
//!
//! The ledger accepts encoded microblocks, links them to their virtual
//! blockchain, folds them into the chain's local state and persists the
//! outcome.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use microchain_core::{
    check_microblock_structure, Microblock, Sha256Hash, TemporalValidity, VirtualBlockchainId,
    VirtualBlockchainType,
};
use microchain_state::{local_state_updater, LocalState};
use microchain_store::{record_entry, Store, StoreError, StoreExt, Table, WriteEntry};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::records::{MicroblockInformation, VirtualBlockchainState};

/// Outcome of an accepted microblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub virtual_blockchain_id: VirtualBlockchainId,
    pub virtual_blockchain_type: VirtualBlockchainType,
    pub microblock_hash: Sha256Hash,
    pub height: u64,
}

/// The ledger: a store of virtual blockchains and their local states.
pub struct Ledger<S: Store> {
    store: Arc<S>,
    config: LedgerConfig,
    /// Serializes submissions so two microblocks cannot both extend the
    /// same head.
    submit_lock: Mutex<()>,
}

/// The chain a microblock extends, as found before the fold.
struct ChainLink {
    virtual_blockchain_id: VirtualBlockchainId,
    expiration_day: u32,
    local_state: LocalState,
}

impl<S: Store> Ledger<S> {
    /// Create a new ledger with the given store.
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a ledger over a store shared with other components.
    pub fn with_shared_store(store: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            submit_lock: Mutex::new(()),
        }
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate an encoded microblock and append it to its virtual
    /// blockchain.
    ///
    /// `now` is the reference time (Unix seconds) for the timestamp window.
    /// Nothing is written unless every check and the state fold succeed.
    ///
    /// Signature sections are checked for placement only. The ledger does
    /// not verify them against chain keys, so callers that need
    /// authenticated microblocks must run [`Microblock::verify`] with the
    /// expected public key before submitting.
    pub async fn submit_microblock(&self, bytes: &[u8], now: u64) -> Result<SubmitResult> {
        let _guard = self.submit_lock.lock().await;

        match self.try_submit(bytes, now).await {
            Ok(result) => {
                debug!(
                    chain_type = %result.virtual_blockchain_type,
                    chain = %result.virtual_blockchain_id,
                    height = result.height,
                    hash = %result.microblock_hash,
                    "microblock accepted"
                );
                Ok(result)
            }
            Err(e) if e.is_rejection() => {
                warn!(error = %e, "microblock rejected");
                Err(e)
            }
            Err(e) => {
                error!(error = %e, "microblock submission failed");
                Err(e)
            }
        }
    }

    async fn try_submit(&self, bytes: &[u8], now: u64) -> Result<SubmitResult> {
        let microblock = Microblock::from_bytes(bytes, None)?;
        let hash = microblock.hash();
        let chain_type = microblock.microblock_type();

        let declared = microblock.header().protocol_version;
        if declared != self.config.protocol_version {
            return Err(LedgerError::UnsupportedProtocolVersion {
                expected: self.config.protocol_version,
                found: declared,
            });
        }

        if self
            .store
            .get(Table::MicroblockInformation, hash.as_bytes())
            .await?
            .is_some()
        {
            return Err(LedgerError::AlreadyExists(hash));
        }

        let link = self.link(&microblock).await?;

        if self.config.check_structure && !check_microblock_structure(&microblock) {
            return Err(LedgerError::InvalidStructure(hash));
        }

        if self.config.check_timestamps {
            let validity =
                microblock.is_temporally_close_to_with(now, self.config.timestamp_bounds);
            if validity != TemporalValidity::Valid {
                return Err(LedgerError::InvalidTimestamp {
                    timestamp: microblock.timestamp(),
                    now,
                    validity,
                });
            }
        }

        let updater = local_state_updater(chain_type, self.config.version_for(chain_type))?;
        let local_state = updater.update_state(&link.local_state, &microblock)?;

        let (header, body) = microblock.serialize()?;
        let information = MicroblockInformation {
            virtual_blockchain_id: link.virtual_blockchain_id,
            virtual_blockchain_type: chain_type,
            height: microblock.height(),
            previous_hash: microblock.previous_hash(),
            header: Bytes::from(header),
        };
        let state = VirtualBlockchainState {
            virtual_blockchain_type: chain_type,
            height: microblock.height(),
            last_microblock_hash: hash,
            expiration_day: link.expiration_day,
            local_state,
        };

        self.store
            .put_batch(vec![
                record_entry(Table::MicroblockInformation, hash.as_bytes(), &information)?,
                WriteEntry {
                    table: Table::MicroblockContent,
                    key: hash.as_bytes().to_vec(),
                    value: body,
                },
                record_entry(
                    Table::VirtualBlockchainState,
                    link.virtual_blockchain_id.as_bytes(),
                    &state,
                )?,
            ])
            .await?;

        Ok(SubmitResult {
            virtual_blockchain_id: link.virtual_blockchain_id,
            virtual_blockchain_type: chain_type,
            microblock_hash: hash,
            height: microblock.height(),
        })
    }

    /// Find the chain `microblock` extends and the state it folds into.
    async fn link(&self, microblock: &Microblock) -> Result<ChainLink> {
        let chain_type = microblock.microblock_type();

        if microblock.is_genesis_microblock() {
            let seed = microblock.genesis_seed().ok_or_else(|| {
                LedgerError::InvalidGenesis("malformed genesis previous hash".into())
            })?;
            if seed.chain_type != chain_type {
                return Err(LedgerError::InvalidGenesis(format!(
                    "previous hash declares a {} chain for a {} microblock",
                    seed.chain_type, chain_type
                )));
            }
            return Ok(ChainLink {
                virtual_blockchain_id: microblock.hash(),
                expiration_day: seed.expiration_day,
                local_state: LocalState::create_initial_state(chain_type),
            });
        }

        let previous_hash = microblock.previous_hash();
        let previous: MicroblockInformation = self
            .store
            .get_record(Table::MicroblockInformation, previous_hash.as_bytes())
            .await?
            .ok_or(LedgerError::UnknownPreviousMicroblock(previous_hash))?;

        let id = previous.virtual_blockchain_id;
        let head = self
            .virtual_blockchain_state(&id)
            .await?
            .ok_or(LedgerError::UnknownVirtualBlockchain(id))?;

        if head.virtual_blockchain_type != chain_type {
            return Err(LedgerError::TypeMismatch {
                expected: head.virtual_blockchain_type,
                found: chain_type,
            });
        }
        if microblock.height() != head.height + 1 {
            return Err(LedgerError::InvalidHeight {
                expected: head.height + 1,
                found: microblock.height(),
            });
        }
        if previous_hash != head.last_microblock_hash {
            return Err(LedgerError::NotChainHead {
                expected: head.last_microblock_hash,
                found: previous_hash,
            });
        }

        Ok(ChainLink {
            virtual_blockchain_id: id,
            expiration_day: head.expiration_day,
            local_state: head.local_state,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Head and local state of a virtual blockchain.
    pub async fn virtual_blockchain_state(
        &self,
        id: &VirtualBlockchainId,
    ) -> Result<Option<VirtualBlockchainState>> {
        Ok(self
            .store
            .get_record(Table::VirtualBlockchainState, id.as_bytes())
            .await?)
    }

    /// Current local state of a virtual blockchain.
    pub async fn local_state(&self, id: &VirtualBlockchainId) -> Result<Option<LocalState>> {
        Ok(self
            .virtual_blockchain_state(id)
            .await?
            .map(|state| state.local_state))
    }

    pub async fn microblock_information(
        &self,
        hash: &Sha256Hash,
    ) -> Result<Option<MicroblockInformation>> {
        Ok(self
            .store
            .get_record(Table::MicroblockInformation, hash.as_bytes())
            .await?)
    }

    /// Reload a stored microblock.
    pub async fn microblock(&self, hash: &Sha256Hash) -> Result<Option<Microblock>> {
        let Some(information) = self.microblock_information(hash).await? else {
            return Ok(None);
        };
        let body = self
            .store
            .get(Table::MicroblockContent, hash.as_bytes())
            .await?
            .ok_or_else(|| StoreError::Backend(format!("content of microblock {} is missing", hash)))?;

        Ok(Some(Microblock::load_from_header_and_body(
            &information.header,
            &body,
            Some(information.virtual_blockchain_type),
        )?))
    }

    /// Hashes of the microblocks of a virtual blockchain, genesis first.
    pub async fn microblock_hashes(&self, id: &VirtualBlockchainId) -> Result<Vec<Sha256Hash>> {
        let Some(head) = self.virtual_blockchain_state(id).await? else {
            return Ok(Vec::new());
        };

        let mut hashes = Vec::with_capacity(head.height as usize);
        let mut current = head.last_microblock_hash;
        for _ in 0..head.height {
            hashes.push(current);
            let information = self
                .microblock_information(&current)
                .await?
                .ok_or(LedgerError::UnknownPreviousMicroblock(current))?;
            current = information.previous_hash;
        }
        hashes.reverse();
        Ok(hashes)
    }
}
