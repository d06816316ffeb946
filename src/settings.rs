// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::matrix::ClassifierKind;
use crate::registry::ReferralStyle;
use config::{Config, ConfigError, File};
use lazy_static::*;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, metadata, File as FsFile};
use std::io::Write;
use std::path::PathBuf;
use struct_field_names_as_array::FieldNamesAsArray;

lazy_static! {
    pub static ref SETTINGS: Settings = Settings::new().unwrap_or_else(|err| {
        error!("Failed to load configuration, using defaults! Reason: {}", err);
        Settings::default()
    });
}

const ENV_PREFIX: &str = "globalway";

#[derive(Debug, Serialize, Deserialize, Default, FieldNamesAsArray)]
pub struct Settings {
    /// Identity registry settings.
    pub registry: Registry,

    /// Referral link settings.
    pub referral: Referral,

    /// Matrix view settings.
    pub matrix: Matrix,
}

/// Directory holding the configuration file and, by default, the data.
fn app_dir() -> PathBuf {
    #[cfg(not(test))]
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));

    #[cfg(test)]
    let mut path = std::env::temp_dir();

    path.push("GlobalWay");
    path
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut config_path = app_dir();
        config_path.push("config.toml");
        let default_settings = Settings::default();

        // Create default configuration
        if metadata(&config_path).is_err() {
            match toml::ser::to_string_pretty(&default_settings) {
                Ok(settings_str) => {
                    let created = config_path
                        .parent()
                        .map_or(Ok(()), fs::create_dir_all)
                        .and_then(|_| FsFile::create(&config_path))
                        .and_then(|mut file| file.write_all(settings_str.as_bytes()));

                    if let Err(err) = created {
                        // If this fails, do nothing and fall back to environment variables
                        error!("Failed to create configuration! Reason: {:#?}", err);
                    }
                }
                Err(err) => error!("Failed to serialize default configuration! Reason: {}", err),
            }
        }

        let env_source: Vec<_> = std::env::vars().collect();
        let mut s = Config::builder()
            .add_source(File::with_name(&config_path.to_string_lossy()).required(false));

        // Set defaults
        let defaults: HashMap<String, HashMap<String, DynamicConfVal>> =
            serde_yaml::to_value(&default_settings)
                .and_then(serde_yaml::from_value)
                .map_err(|err| ConfigError::Foreign(Box::new(err)))?;
        for (k1, inner) in &defaults {
            for (k2, v) in inner {
                match v {
                    DynamicConfVal::String(v) => {
                        s = s.set_default(format!("{k1}.{k2}"), v.as_str())?;
                    }

                    DynamicConfVal::Bool(v) => {
                        s = s.set_default(format!("{k1}.{k2}"), v.to_string())?;
                    }

                    DynamicConfVal::U16(v) => {
                        s = s.set_default(format!("{k1}.{k2}"), v.to_string())?;
                    }
                }
            }
        }

        // Make sure to list these in order
        let settings_modules: Vec<_> = vec![
            Registry::FIELD_NAMES_AS_ARRAY,
            Referral::FIELD_NAMES_AS_ARRAY,
            Matrix::FIELD_NAMES_AS_ARRAY,
        ];

        // Gather all possible settings keys
        let possible_keys: HashMap<String, &str> = Settings::FIELD_NAMES_AS_ARRAY
            .iter()
            .enumerate()
            .flat_map(|(i, field)| {
                settings_modules[i].iter().map(move |nested| {
                    (
                        format!(
                            "{}_{}_{}",
                            ENV_PREFIX,
                            field,
                            nested.split('_').collect::<Vec<_>>().join("")
                        ),
                        *nested,
                    )
                })
            })
            .collect();

        // Parse env vars manually and set overrides if they exist as the
        // config package `Environment` module seems to behave poorly.
        for (k, v) in env_source.iter() {
            let k = k.to_lowercase();

            if let Some(k_postfix) = possible_keys.get(&k) {
                let mut k: Vec<_> = k.split('_').filter(|x| x != &ENV_PREFIX).collect();
                if let Some(last) = k.last_mut() {
                    *last = *k_postfix;
                }
                let k = k.join(".");

                // Filter empty values
                if v.as_str() == "" {
                    continue;
                }

                s = s.set_override(k, v.as_str())?;
            }
        }

        s.build()?.try_deserialize()
    }

    /// Checks values the type system does not.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.registry.max_attempts == 0 {
            return Err("registry.max_attempts must be positive");
        }

        if !self.referral.base_url.starts_with("http://")
            && !self.referral.base_url.starts_with("https://")
        {
            return Err("referral.base_url must be an http(s) url");
        }

        self.referral.style.parse::<ReferralStyle>()?;
        self.matrix.classifier.parse::<ClassifierKind>()?;

        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Registry {
    /// Directory of the identity store.
    #[serde(alias = "datadir")]
    pub data_dir: String,

    /// If specified, we won't be storing anything to disk. Ids are lost on exit.
    #[serde(alias = "memoryonly")]
    pub memory_only: bool,

    /// How many random draws to try before giving up on generating a new id.
    #[serde(alias = "maxattempts")]
    pub max_attempts: u16,
}

impl Default for Registry {
    fn default() -> Self {
        let mut path = app_dir();
        path.push("data");

        Self {
            data_dir: path.to_string_lossy().into_owned(),
            memory_only: false,
            max_attempts: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Referral {
    /// Origin the referral links point to.
    #[serde(alias = "baseurl")]
    pub base_url: String,

    /// Link shape.
    ///
    /// Can either be `path` (`{base_url}/ref1234567`) or `query`
    /// (`{base_url}/?ref=1234567`).
    pub style: String,
}

impl Default for Referral {
    fn default() -> Self {
        Self {
            base_url: "https://globalway.club".to_owned(),
            style: "path".to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FieldNamesAsArray)]
pub struct Matrix {
    /// Slot classification strategy.
    ///
    /// Can either be `sequential`, which places the reported partners,
    /// charity and technical places in order, or `random` which produces
    /// demo data.
    pub classifier: String,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            classifier: "sequential".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum DynamicConfVal {
    String(String),
    Bool(bool),
    U16(u16),
}
