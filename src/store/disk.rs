// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::store::{KeyValueStore, StoreErr};
use log::*;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Store backed by a single json document on disk.
///
/// The whole document is kept in memory. Every `set` rewrites the document
/// to a sibling temporary file, syncs it and renames it over the original, so
/// a crash leaves either the old or the new version in place.
#[derive(Debug)]
pub struct DiskStore {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, String>>,
}

impl DiskStore {
    /// Opens the store at `path`, creating parent directories as needed. A
    /// missing file is an empty store.
    pub fn open(path: PathBuf) -> Result<Self, StoreErr> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let cache = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            crate::codec::decode(&raw)?
        } else {
            BTreeMap::new()
        };

        debug!("Opened disk store at {} with {} keys", path.display(), cache.len());

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("json.tmp");
        tmp_path
    }

    fn flush(&self, doc: &BTreeMap<String, String>) -> Result<(), StoreErr> {
        let encoded = crate::codec::encode_to_string(doc)?;
        let tmp_path = self.tmp_path();
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreErr> {
        Ok(self.cache.read().get(key).cloned())
    }

    fn set(&self, key: &str, val: String) -> Result<(), StoreErr> {
        let mut cache = self.cache.write();
        let mut next = cache.clone();
        next.insert(key.to_owned(), val);

        // Only publish the new document once it is on disk
        self.flush(&next)?;
        *cache = next;
        Ok(())
    }
}
