// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::matrix::ClassifierKind;
use crate::registry::{IdentityRegistry, RegistryConfig, RegistryErr};
use crate::session::Session;
use crate::settings::SETTINGS;
use crate::store::{create_store, KeyValueStore};
use log::*;

pub type DynStore = Box<dyn KeyValueStore + Send + Sync>;

/// Initialize globals
///
/// Installs the logger and loads the settings. Calling it twice is harmless.
pub fn init() -> Result<(), &'static str> {
    // Fails only if a logger is already installed
    let _ = pretty_env_logger::try_init();

    SETTINGS.validate().map_err(|err| {
        error!("Invalid configuration: {}", err);
        err
    })?;

    debug!("Settings loaded: {:?}", *SETTINGS);
    Ok(())
}

/// Opens the identity registry on the configured store.
pub fn open_registry() -> Result<IdentityRegistry<DynStore>, RegistryErr> {
    let config = RegistryConfig::from_settings().map_err(RegistryErr::Config)?;
    IdentityRegistry::open(create_store()?, config)
}

/// Starts a session on the configured registry.
pub fn start_session(landing_url: &str) -> Result<Session<DynStore>, RegistryErr> {
    Session::start(open_registry()?, landing_url)
}

/// Classifier configured for the matrix view
pub fn classifier_kind() -> ClassifierKind {
    ClassifierKind::from_settings().unwrap_or_else(|err| {
        warn!("{}, using the sequential classifier", err);
        ClassifierKind::Sequential
    })
}
