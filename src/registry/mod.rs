// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Identity registry.
//!
//! Maps wallet addresses to stable 7 digit user ids. The registry is an
//! explicit object owning its state: it reads the persisted mapping once when
//! opened and writes it back on every mutation, before the mutating call
//! returns.

use crate::primitives::{UserId, WalletAddress, USER_ID_SPACE};
use crate::store::{KeyValueStore, StoreErr};
use log::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

mod backup;
mod referral;

pub use backup::*;
pub use referral::*;

/// Store key of the reserved id set
pub const USED_IDS_KEY: &str = "globalway_user_ids";

/// Store key of the address to id mapping
pub const ADDRESS_MAPPING_KEY: &str = "globalway_address_id_mapping";

/// Default bound on random draws per generated id
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Random draws attempted before id generation gives up
    pub max_attempts: u32,

    /// Referral link format
    pub referral: ReferralFormat,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            referral: ReferralFormat::default(),
        }
    }
}

impl RegistryConfig {
    /// Reads the config from the global settings
    pub fn from_settings() -> Result<Self, &'static str> {
        Ok(Self {
            max_attempts: u32::from(crate::settings::SETTINGS.registry.max_attempts),
            referral: ReferralFormat::from_settings()?,
        })
    }
}

/// What the UI shows for a connected user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub address: WalletAddress,
    pub id: UserId,
    pub referral_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Ids ever generated
    pub total_ids: u32,

    /// Addresses with an id
    pub total_mappings: u32,

    /// Ids that can still be generated
    pub available_ids: u32,
}

#[derive(Debug)]
pub enum RegistryErr {
    /// Address is not a `0x` prefixed 20 byte hex string
    InvalidAddress(&'static str),

    /// No unused id was found within the attempt bound
    Exhausted { attempts: u32 },

    /// Persisted state violates the registry invariants
    CorruptData(&'static str),

    /// Id is not 7 digits within range
    InvalidId(&'static str),

    /// Imported backup conflicts with existing assignments
    ImportConflict(&'static str),

    /// Registry settings are invalid
    Config(&'static str),

    /// Store error
    Store(StoreErr),
}

impl std::fmt::Display for RegistryErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAddress(reason) => write!(f, "invalid address: {reason}"),
            Self::Exhausted { attempts } => {
                write!(f, "failed to generate unique id after {attempts} attempts")
            }
            Self::InvalidId(reason) => write!(f, "invalid id: {reason}"),
            Self::CorruptData(reason) => write!(f, "corrupt registry data: {reason}"),
            Self::ImportConflict(reason) => write!(f, "import conflict: {reason}"),
            Self::Config(reason) => write!(f, "invalid registry settings: {reason}"),
            Self::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for RegistryErr {}

impl From<StoreErr> for RegistryErr {
    fn from(other: StoreErr) -> Self {
        Self::Store(other)
    }
}

#[derive(Debug)]
pub struct IdentityRegistry<S: KeyValueStore, R: Rng = StdRng> {
    store: S,
    rng: R,
    config: RegistryConfig,
    used_ids: BTreeSet<UserId>,
    address_mapping: BTreeMap<WalletAddress, UserId>,
    owners: HashMap<UserId, WalletAddress>,
}

impl<S: KeyValueStore> IdentityRegistry<S> {
    /// Opens the registry on top of `store`, loading the persisted state.
    pub fn open(store: S, config: RegistryConfig) -> Result<Self, RegistryErr> {
        Self::with_rng(store, config, StdRng::from_entropy())
    }
}

impl<S: KeyValueStore, R: Rng> IdentityRegistry<S, R> {
    /// Same as `open` but draws ids from the given rng.
    pub fn with_rng(store: S, config: RegistryConfig, rng: R) -> Result<Self, RegistryErr> {
        let mut used_ids: BTreeSet<UserId> = match store.get(USED_IDS_KEY)? {
            Some(raw) => crate::codec::decode(&raw).map_err(|err| {
                error!("Error loading used ids: {}", err);
                RegistryErr::CorruptData("unreadable used id set")
            })?,
            None => BTreeSet::new(),
        };

        let address_mapping: BTreeMap<WalletAddress, UserId> =
            match store.get(ADDRESS_MAPPING_KEY)? {
                Some(raw) => crate::codec::decode(&raw).map_err(|err| {
                    error!("Error loading address mappings: {}", err);
                    RegistryErr::CorruptData("unreadable address mapping")
                })?,
                None => BTreeMap::new(),
            };

        let mut owners = HashMap::with_capacity(address_mapping.len());
        for (address, id) in &address_mapping {
            if owners.insert(*id, *address).is_some() {
                return Err(RegistryErr::CorruptData("id assigned to two addresses"));
            }

            // Mapped ids must never be handed out again
            used_ids.insert(*id);
        }

        debug!(
            "Identity registry loaded {} ids and {} mappings",
            used_ids.len(),
            address_mapping.len()
        );

        Ok(Self {
            store,
            rng,
            config,
            used_ids,
            address_mapping,
            owners,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Backing store, shared with the session for its own keys
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the id of `address`, assigning and persisting a new one on
    /// first sight. The address is matched case-insensitively.
    pub fn assign_or_get_id(&mut self, address: &str) -> Result<UserId, RegistryErr> {
        let address = parse_address(address)?;

        if let Some(id) = self.address_mapping.get(&address) {
            debug!("Existing id found for address {}: {}", address, id);
            return Ok(*id);
        }

        let id = self.draw_unused_id()?;
        self.used_ids.insert(id);
        self.address_mapping.insert(address, id);
        self.owners.insert(id, address);

        if let Err(err) = self.persist() {
            self.used_ids.remove(&id);
            self.address_mapping.remove(&address);
            self.owners.remove(&id);
            return Err(err);
        }

        info!("New id assigned to {}: {}", address, id);
        Ok(id)
    }

    /// Reserves and persists a fresh id that is not bound to any address.
    pub fn generate_unique_id(&mut self) -> Result<UserId, RegistryErr> {
        let id = self.draw_unused_id()?;
        self.used_ids.insert(id);

        if let Err(err) = self.persist_used_ids() {
            self.used_ids.remove(&id);
            return Err(err);
        }

        Ok(id)
    }

    /// Id of `address` without assigning one
    pub fn get_id(&self, address: &str) -> Result<Option<UserId>, RegistryErr> {
        let address = parse_address(address)?;
        Ok(self.address_mapping.get(&address).copied())
    }

    /// Owner of `id`, used to pre-fill the sponsor of a referred user.
    #[must_use]
    pub fn resolve_address(&self, id: UserId) -> Option<WalletAddress> {
        self.owners.get(&id).copied()
    }

    /// Sponsor address behind a textual referral id.
    pub fn sponsor_by_referral_id(&self, id: &str) -> Result<Option<WalletAddress>, RegistryErr> {
        let id: UserId = id.trim().parse().map_err(RegistryErr::InvalidId)?;
        Ok(self.resolve_address(id))
    }

    #[must_use]
    pub fn referral_link(&self, id: UserId) -> String {
        self.config.referral.link(id)
    }

    pub fn profile(&self, address: &str) -> Result<Option<UserProfile>, RegistryErr> {
        let address = parse_address(address)?;
        Ok(self
            .address_mapping
            .get(&address)
            .map(|id| self.make_profile(address, *id)))
    }

    /// Case-insensitive substring search over addresses and ids.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<UserProfile> {
        let query = query.trim().to_lowercase();

        self.address_mapping
            .iter()
            .filter(|(address, id)| {
                address.to_hex().contains(&query) || id.to_string().contains(&query)
            })
            .map(|(address, id)| self.make_profile(*address, *id))
            .collect()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let total_ids = self.used_ids.len() as u32;

        RegistryStats {
            total_ids,
            total_mappings: self.address_mapping.len() as u32,
            available_ids: USER_ID_SPACE.saturating_sub(total_ids),
        }
    }

    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        UserId::is_valid(id)
    }

    /// Snapshot of the registry for backup purposes
    #[must_use]
    pub fn export(&self) -> RegistryBackup {
        RegistryBackup {
            used_ids: self.used_ids.iter().copied().collect(),
            address_mapping: self.address_mapping.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Merges a backup into the registry.
    ///
    /// All or nothing: any entry that would bind an address or an id twice
    /// rejects the whole backup.
    pub fn import(&mut self, backup: RegistryBackup) -> Result<(), RegistryErr> {
        let mut incoming_owners: HashMap<UserId, WalletAddress> =
            HashMap::with_capacity(backup.address_mapping.len());

        for (address, id) in &backup.address_mapping {
            if let Some(existing) = self.address_mapping.get(address) {
                if existing != id {
                    return Err(RegistryErr::ImportConflict("address already has another id"));
                }
            }

            if let Some(owner) = self.owners.get(id) {
                if owner != address {
                    return Err(RegistryErr::ImportConflict("id already owned by another address"));
                }
            }

            if incoming_owners.insert(*id, *address).is_some() {
                return Err(RegistryErr::ImportConflict("backup assigns an id twice"));
            }
        }

        let prev_used_ids = self.used_ids.clone();
        let prev_mapping = self.address_mapping.clone();
        let prev_owners = self.owners.clone();

        self.used_ids.extend(backup.used_ids.iter().copied());
        self.used_ids.extend(incoming_owners.keys().copied());
        self.address_mapping.extend(backup.address_mapping);
        self.owners.extend(incoming_owners);

        if let Err(err) = self.persist() {
            self.used_ids = prev_used_ids;
            self.address_mapping = prev_mapping;
            self.owners = prev_owners;
            return Err(err);
        }

        info!(
            "Registry backup imported, now {} ids and {} mappings",
            self.used_ids.len(),
            self.address_mapping.len()
        );
        Ok(())
    }

    fn make_profile(&self, address: WalletAddress, id: UserId) -> UserProfile {
        UserProfile {
            address,
            id,
            referral_link: self.referral_link(id),
        }
    }

    fn draw_unused_id(&mut self) -> Result<UserId, RegistryErr> {
        if self.used_ids.len() as u32 >= USER_ID_SPACE {
            return Err(RegistryErr::Exhausted { attempts: 0 });
        }

        for _ in 0..self.config.max_attempts {
            let id = UserId::random(&mut self.rng);

            if !self.used_ids.contains(&id) {
                return Ok(id);
            }
        }

        warn!(
            "Failed to generate unique id after {} attempts",
            self.config.max_attempts
        );

        Err(RegistryErr::Exhausted {
            attempts: self.config.max_attempts,
        })
    }

    /// Writes the used id set, then the mapping. If the mapping write fails
    /// the previous used id document is written back.
    fn persist(&self) -> Result<(), RegistryErr> {
        let encoded_mapping =
            crate::codec::encode_to_string(&self.address_mapping).map_err(StoreErr::from)?;
        let previous_used_ids = self
            .store
            .get(USED_IDS_KEY)?
            .unwrap_or_else(|| "[]".to_owned());

        self.persist_used_ids()?;

        if let Err(err) = self.store.set(ADDRESS_MAPPING_KEY, encoded_mapping) {
            if let Err(restore_err) = self.store.set(USED_IDS_KEY, previous_used_ids) {
                error!("Failed to restore used ids: {}", restore_err);
            }

            return Err(err.into());
        }

        Ok(())
    }

    fn persist_used_ids(&self) -> Result<(), RegistryErr> {
        let encoded = crate::codec::encode_to_string(&self.used_ids).map_err(StoreErr::from)?;
        self.store.set(USED_IDS_KEY, encoded)?;
        Ok(())
    }
}

fn parse_address(address: &str) -> Result<WalletAddress, RegistryErr> {
    address.parse().map_err(RegistryErr::InvalidAddress)
}
