// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

//! Wallet session.
//!
//! Tracks the connected account and chain from wallet notifications and keeps
//! the sponsor referral found in the landing url until registration.

use crate::primitives::{UserId, WalletAddress};
use crate::registry::{
    parse_referral_id, strip_referral, IdentityRegistry, RegistryErr, UserProfile,
};
use crate::store::KeyValueStore;
use log::*;
use rand::rngs::StdRng;
use rand::Rng;

/// opBNB mainnet
pub const EXPECTED_CHAIN_ID: u64 = 204;

/// Store key of the referral id seen on a landing url
pub const REFERRAL_ID_KEY: &str = "referral_id";

/// Notification emitted by the wallet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Selected account, empty when the wallet exposes none
    AccountChanged(String),
    ChainChanged(u64),
    Disconnected,
}

/// What an event changed, for the caller to refresh its views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    SignedIn(UserProfile),
    SignedOut,

    /// Wallet switched to a chain other than `EXPECTED_CHAIN_ID`
    WrongChain(u64),
    ChainOk,
    Unchanged,
}

pub struct Session<S: KeyValueStore, R: Rng = StdRng> {
    registry: IdentityRegistry<S, R>,
    current: Option<UserProfile>,
    chain_id: Option<u64>,
    pending_referral: Option<UserId>,
    landing_url: String,
}

impl<S: KeyValueStore, R: Rng> Session<S, R> {
    /// Starts a session.
    ///
    /// A referral id embedded in `landing_url` is saved to the registry store
    /// and becomes the pending referral. Without one, the id saved by an
    /// earlier session is used.
    pub fn start(registry: IdentityRegistry<S, R>, landing_url: &str) -> Result<Self, RegistryErr> {
        let pending_referral = match parse_referral_id(landing_url) {
            Some(id) => {
                registry.store().set(REFERRAL_ID_KEY, id.to_string())?;
                info!("Referral id detected and saved: {}", id);
                Some(id)
            }
            None => Self::saved_referral(&registry)?,
        };

        Ok(Self {
            registry,
            current: None,
            chain_id: None,
            pending_referral,
            landing_url: strip_referral(landing_url),
        })
    }

    fn saved_referral(registry: &IdentityRegistry<S, R>) -> Result<Option<UserId>, RegistryErr> {
        let raw = match registry.store().get(REFERRAL_ID_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        match raw.parse() {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                warn!("Ignoring saved referral id {:?}: {}", raw, err);
                Ok(None)
            }
        }
    }

    pub fn handle(&mut self, event: WalletEvent) -> Result<SessionChange, RegistryErr> {
        match event {
            WalletEvent::AccountChanged(account) if account.trim().is_empty() => {
                Ok(self.sign_out())
            }
            WalletEvent::AccountChanged(account) => self.sign_in(&account),
            WalletEvent::ChainChanged(chain_id) => {
                self.chain_id = Some(chain_id);

                if chain_id == EXPECTED_CHAIN_ID {
                    Ok(SessionChange::ChainOk)
                } else {
                    warn!("Wallet switched to unsupported chain {}", chain_id);
                    Ok(SessionChange::WrongChain(chain_id))
                }
            }
            WalletEvent::Disconnected => Ok(self.sign_out()),
        }
    }

    fn sign_in(&mut self, account: &str) -> Result<SessionChange, RegistryErr> {
        let address: WalletAddress = account.parse().map_err(RegistryErr::InvalidAddress)?;

        if self.current.as_ref().map(|p| p.address) == Some(address) {
            return Ok(SessionChange::Unchanged);
        }

        // The wallet already left the previous account, even if this fails
        self.current = None;
        let id = self.registry.assign_or_get_id(account)?;
        let profile = UserProfile {
            address,
            id,
            referral_link: self.registry.referral_link(id),
        };

        info!("Account changed to {} ({})", address, id);
        self.current = Some(profile.clone());
        Ok(SessionChange::SignedIn(profile))
    }

    fn sign_out(&mut self) -> SessionChange {
        match self.current.take() {
            Some(profile) => {
                info!("Wallet disconnected: {}", profile.address);
                SessionChange::SignedOut
            }
            None => SessionChange::Unchanged,
        }
    }

    #[must_use]
    pub fn current_profile(&self) -> Option<&UserProfile> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    #[must_use]
    pub fn pending_referral(&self) -> Option<UserId> {
        self.pending_referral
    }

    /// Landing url without the referral segment
    #[must_use]
    pub fn landing_url(&self) -> &str {
        &self.landing_url
    }

    /// Address to pre-fill as sponsor on the registration form.
    ///
    /// Unknown referral ids, and referrals to the connected user itself,
    /// leave the field empty.
    #[must_use]
    pub fn sponsor_prefill(&self) -> Option<WalletAddress> {
        let sponsor = self.registry.resolve_address(self.pending_referral?)?;

        if self.current.as_ref().map(|p| p.address) == Some(sponsor) {
            return None;
        }

        Some(sponsor)
    }

    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry<S, R> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut IdentityRegistry<S, R> {
        &mut self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryConfig;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreErr;
    use std::cell::Cell;

    fn registry() -> IdentityRegistry<MemoryStore> {
        IdentityRegistry::open(MemoryStore::new(), RegistryConfig::default()).unwrap()
    }

    /// Store whose writes can be switched off
    #[derive(Default)]
    struct SwitchableStore {
        inner: MemoryStore,
        failing: Cell<bool>,
    }

    impl KeyValueStore for SwitchableStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreErr> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, val: String) -> Result<(), StoreErr> {
            if self.failing.get() {
                return Err(StoreErr::Error("quota exceeded"));
            }
            self.inner.set(key, val)
        }
    }

    #[test]
    fn referred_user_gets_sponsor_prefilled() {
        let mut registry = registry();
        let sponsor = WalletAddress::random();
        let sponsor_id = registry.assign_or_get_id(&sponsor.to_hex()).unwrap();
        let link = registry.referral_link(sponsor_id);

        let mut session = Session::start(registry, &link).unwrap();
        assert_eq!(session.pending_referral(), Some(sponsor_id));
        assert_eq!(session.landing_url(), "https://globalway.club");

        let newcomer = WalletAddress::random();
        let change = session
            .handle(WalletEvent::AccountChanged(newcomer.to_hex()))
            .unwrap();
        assert!(matches!(change, SessionChange::SignedIn(ref p) if p.address == newcomer));
        assert_eq!(session.sponsor_prefill(), Some(sponsor));
    }

    #[test]
    fn referral_survives_restart_on_cleaned_url() {
        let store = MemoryStore::new();
        let mut registry =
            IdentityRegistry::open(store.clone(), RegistryConfig::default()).unwrap();
        let sponsor = WalletAddress::random();
        let sponsor_id = registry.assign_or_get_id(&sponsor.to_hex()).unwrap();

        let link = format!("https://globalway.club/ref{sponsor_id}");
        let landing = {
            let session = Session::start(registry, &link).unwrap();
            session.landing_url().to_owned()
        };
        assert_eq!(landing, "https://globalway.club");
        assert_eq!(store.get(REFERRAL_ID_KEY).unwrap(), Some(sponsor_id.to_string()));

        let registry = IdentityRegistry::open(store, RegistryConfig::default()).unwrap();
        let session = Session::start(registry, &landing).unwrap();
        assert_eq!(session.pending_referral(), Some(sponsor_id));
        assert_eq!(session.sponsor_prefill(), Some(sponsor));
    }

    #[test]
    fn newer_referral_replaces_saved_one() {
        let store = MemoryStore::new();
        store.set(REFERRAL_ID_KEY, "1234567".to_owned()).unwrap();
        let registry = IdentityRegistry::open(store.clone(), RegistryConfig::default()).unwrap();

        let session = Session::start(registry, "https://globalway.club/ref7654321").unwrap();
        assert_eq!(session.pending_referral(), UserId::new(7_654_321).ok());
        assert_eq!(store.get(REFERRAL_ID_KEY).unwrap(), Some("7654321".to_owned()));
    }

    #[test]
    fn malformed_saved_referral_is_ignored() {
        let store = MemoryStore::new();
        store.set(REFERRAL_ID_KEY, "U123".to_owned()).unwrap();
        let registry = IdentityRegistry::open(store, RegistryConfig::default()).unwrap();

        let session = Session::start(registry, "https://globalway.club/").unwrap();
        assert_eq!(session.pending_referral(), None);
    }

    #[test]
    fn failed_account_switch_leaves_no_current_user() {
        let registry =
            IdentityRegistry::open(SwitchableStore::default(), RegistryConfig::default()).unwrap();
        let mut session = Session::start(registry, "https://globalway.club/").unwrap();
        session
            .handle(WalletEvent::AccountChanged(
                "0x1111111111111111111111111111111111111111".to_owned(),
            ))
            .unwrap();

        session.registry().store().failing.set(true);
        assert!(matches!(
            session.handle(WalletEvent::AccountChanged(
                "0x2222222222222222222222222222222222222222".to_owned(),
            )),
            Err(RegistryErr::Store(_))
        ));
        assert!(session.current_profile().is_none());
    }

    #[test]
    fn unknown_referral_prefills_nothing() {
        let session = Session::start(registry(), "https://globalway.club/?ref=7777777").unwrap();
        assert_eq!(session.pending_referral(), Some(UserId::new(7_777_777).unwrap()));
        assert_eq!(session.sponsor_prefill(), None);
    }

    #[test]
    fn account_changes_assign_ids_once() {
        let mut session = Session::start(registry(), "https://globalway.club/").unwrap();
        let account = "0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD";

        let first = session
            .handle(WalletEvent::AccountChanged(account.to_owned()))
            .unwrap();
        let id = match first {
            SessionChange::SignedIn(profile) => profile.id,
            other => panic!("unexpected {other:?}"),
        };

        assert_eq!(
            session
                .handle(WalletEvent::AccountChanged(account.to_lowercase()))
                .unwrap(),
            SessionChange::Unchanged
        );
        assert_eq!(session.current_profile().map(|p| p.id), Some(id));
        assert_eq!(session.registry().stats().total_mappings, 1);
    }

    #[test]
    fn disconnect_and_empty_account_sign_out() {
        let mut session = Session::start(registry(), "https://globalway.club/").unwrap();
        session
            .handle(WalletEvent::AccountChanged(WalletAddress::random().to_hex()))
            .unwrap();

        assert_eq!(
            session.handle(WalletEvent::Disconnected).unwrap(),
            SessionChange::SignedOut
        );
        assert!(session.current_profile().is_none());
        assert_eq!(
            session
                .handle(WalletEvent::AccountChanged(String::new()))
                .unwrap(),
            SessionChange::Unchanged
        );
    }

    #[test]
    fn chain_changes_are_checked() {
        let mut session = Session::start(registry(), "https://globalway.club/").unwrap();
        assert_eq!(
            session.handle(WalletEvent::ChainChanged(56)).unwrap(),
            SessionChange::WrongChain(56)
        );
        assert_eq!(
            session
                .handle(WalletEvent::ChainChanged(EXPECTED_CHAIN_ID))
                .unwrap(),
            SessionChange::ChainOk
        );
        assert_eq!(session.chain_id(), Some(204));
    }

    #[test]
    fn malformed_account_is_rejected() {
        let mut session = Session::start(registry(), "https://globalway.club/").unwrap();
        assert!(matches!(
            session.handle(WalletEvent::AccountChanged("0xnope".to_owned())),
            Err(RegistryErr::InvalidAddress(_))
        ));
        assert!(session.current_profile().is_none());
    }
}
