// Copyright (c) 2024 The GlobalWay Core developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use crate::store::{KeyValueStore, StoreErr};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Volatile store. Clones share the same underlying map, which lets a test
/// "restart" a registry on top of what a previous instance wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreErr> {
        Ok(self.inner.read().get(key).cloned())
    }

    fn set(&self, key: &str, val: String) -> Result<(), StoreErr> {
        self.inner.write().insert(key.to_owned(), val);
        Ok(())
    }
}
