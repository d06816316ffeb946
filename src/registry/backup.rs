// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::primitives::{UserId, WalletAddress};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portable snapshot of the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryBackup {
    /// Every id ever generated
    pub used_ids: Vec<UserId>,

    /// Normalized address to id
    pub address_mapping: BTreeMap<WalletAddress, UserId>,

    /// Unix time in milliseconds at which the backup was taken
    pub timestamp: i64,
}

impl RegistryBackup {
    pub fn to_json(&self) -> Result<String, crate::codec::CodecErr> {
        crate::codec::encode_to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, crate::codec::CodecErr> {
        crate::codec::decode(json)
    }
}
