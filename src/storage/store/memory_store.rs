//! An in-memory store.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;

use crate::storage::{
    Bytes, ListableStorageTraits, MaybeBytes, ReadableStorageTraits, StorageError, StoreKey,
    StoreKeys, StoreKeysPrefixes, StorePrefix, WritableStorageTraits,
};

/// An in-memory store.
///
/// Merged collections are assembled in a memory store before they are written out.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data_map: RwLock<BTreeMap<StoreKey, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data_map.read().get(key).cloned())
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: Bytes) -> Result<(), StorageError> {
        self.data_map.write().insert(key.clone(), value);
        Ok(())
    }

    fn erase_prefix(&self, prefix: &StorePrefix) -> Result<(), StorageError> {
        self.data_map.write().retain(|key, _| !key.has_prefix(prefix));
        Ok(())
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list_dir(&self, prefix: &StorePrefix) -> Result<StoreKeysPrefixes, StorageError> {
        let mut keys: StoreKeys = vec![];
        let mut prefixes: BTreeSet<StorePrefix> = BTreeSet::default();
        let data_map = self.data_map.read();
        for key in data_map.keys().filter(|key| key.has_prefix(prefix)) {
            let key_strip = &key.as_str()[prefix.as_str().len()..];
            if let Some((child, _)) = key_strip.split_once('/') {
                prefixes.insert(StorePrefix::new(format!("{}{child}/", prefix.as_str()))?);
            } else {
                keys.push(key.clone());
            }
        }
        Ok(StoreKeysPrefixes::new(keys, prefixes.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        store.set(&"zarr.json".try_into()?, Bytes::from_static(b"{}"))?;
        store.set(&"a/zarr.json".try_into()?, Bytes::from_static(b"{}"))?;
        store.set(&"a/c/0".try_into()?, Bytes::from_static(&[0, 1, 2]))?;
        store.set(&"b/zarr.json".try_into()?, Bytes::from_static(b"{}"))?;
        assert_eq!(
            store.get(&"a/c/0".try_into()?)?,
            Some(Bytes::from_static(&[0, 1, 2]))
        );
        assert!(store.get(&"a/c/1".try_into()?)?.is_none());

        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.keys(), &vec![StoreKey::new("zarr.json")?]);
        assert_eq!(
            list_dir.prefixes(),
            &vec![StorePrefix::new("a/")?, StorePrefix::new("b/")?]
        );
        let list_dir = store.list_dir(&StorePrefix::new("a/")?)?;
        assert_eq!(list_dir.keys(), &vec![StoreKey::new("a/zarr.json")?]);
        assert_eq!(list_dir.prefixes(), &vec![StorePrefix::new("a/c/")?]);

        store.erase_prefix(&StorePrefix::new("a/")?)?;
        assert!(store.get(&"a/c/0".try_into()?)?.is_none());
        let list_dir = store.list_dir(&StorePrefix::root())?;
        assert_eq!(list_dir.keys(), &vec![StoreKey::new("zarr.json")?]);
        assert_eq!(list_dir.prefixes(), &vec![StorePrefix::new("b/")?]);
        Ok(())
    }
}
