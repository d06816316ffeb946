// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::codec::CodecErr;
use crate::store::disk::DiskStore;
use crate::store::memory::MemoryStore;
use std::path::PathBuf;

/// File name of the disk store inside the data directory
pub const STORE_FILE_NAME: &str = "globalway.json";

/// Interface to the local persistent key-value store. Values are opaque
/// strings, callers encode them with `crate::codec`.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StoreErr>;

    /// Durably stores `val` under `key`. Once this returns `Ok` the value
    /// must survive a process restart.
    fn set(&self, key: &str, val: String) -> Result<(), StoreErr>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreErr> {
        (**self).get(key)
    }

    fn set(&self, key: &str, val: String) -> Result<(), StoreErr> {
        (**self).set(key, val)
    }
}

#[derive(Debug)]
pub enum StoreErr {
    /// Filesystem error
    Io(std::io::Error),

    /// Stored document could not be encoded or decoded
    Codec(CodecErr),

    /// Generic error
    Error(&'static str),
}

impl std::fmt::Display for StoreErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Codec(err) => write!(f, "codec error: {err}"),
            Self::Error(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for StoreErr {}

impl From<std::io::Error> for StoreErr {
    fn from(other: std::io::Error) -> Self {
        Self::Io(other)
    }
}

impl From<CodecErr> for StoreErr {
    fn from(other: CodecErr) -> Self {
        Self::Codec(other)
    }
}

/// Creates the store configured in the settings. In memory only mode
/// nothing is written to disk.
pub fn create_store() -> Result<Box<dyn KeyValueStore + Send + Sync>, StoreErr> {
    if crate::settings::SETTINGS.registry.memory_only {
        return Ok(Box::new(MemoryStore::new()));
    }

    #[cfg(not(test))]
    let mut path = PathBuf::from(&crate::settings::SETTINGS.registry.data_dir);

    #[cfg(test)]
    let mut path = {
        use rand::Rng;
        let mut path = std::env::temp_dir();
        path.push(hex::encode(rand::thread_rng().gen::<[u8; 32]>()));
        path.push("GlobalWay");
        path
    };

    path.push(STORE_FILE_NAME);
    Ok(Box::new(DiskStore::open(path)?))
}

pub mod disk;
pub mod memory;
