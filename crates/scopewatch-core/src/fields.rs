use std::collections::BTreeMap;

use scopewatch_core_types::ContextKey;

use crate::config::ScopewatchConfig;

/// Ambient key/value fields attached to every record of one execution context
///
/// Values persist across emissions until removed or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStore {
    entries: BTreeMap<ContextKey, String>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ContextKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn put(&mut self, key: ContextKey, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    pub fn remove(&mut self, key: ContextKey) -> Option<String> {
        self.entries.remove(&key)
    }

    /// Remove every listed key
    pub fn remove_all(&mut self, keys: &[ContextKey]) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    /// Write `value` when the key is absent or holds an empty string
    ///
    /// Returns `true` if the value was written.
    pub fn backfill(&mut self, key: ContextKey, value: &str) -> bool {
        match self.entries.get(&key) {
            Some(existing) if !existing.is_empty() => false,
            _ => {
                self.entries.insert(key, value.to_owned());
                true
            }
        }
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Backfill required correlation fields and stamp the process identity
    ///
    /// Applied before every emission so no record leaves without a
    /// `RequestId` or `ServiceInstanceId`.
    pub fn prepare(&mut self, config: &ScopewatchConfig) {
        self.backfill(ContextKey::RequestId, &config.request_placeholder);
        self.backfill(
            ContextKey::ServiceInstanceId,
            &config.service_instance_placeholder,
        );
        let identity = &config.instance;
        self.backfill(ContextKey::InstanceUuid, identity.instance_uuid.as_str());
        self.put(ContextKey::ServerIpAddress, identity.server_ip.as_str());
        self.put(ContextKey::ServerFqdn, identity.server_fqdn.as_str());
    }

    /// Copy of the current fields, ordered by key
    pub fn snapshot(&self) -> BTreeMap<ContextKey, String> {
        self.entries.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContextKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let mut store = ContextStore::new();
        store.put(ContextKey::RequestId, "r1");
        assert_eq!(store.get(ContextKey::RequestId), Some("r1"));

        store.put(ContextKey::RequestId, "r2");
        assert_eq!(store.get(ContextKey::RequestId), Some("r2"));

        assert_eq!(store.remove(ContextKey::RequestId).as_deref(), Some("r2"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_backfill_only_fills_missing_or_empty() {
        let mut store = ContextStore::new();
        assert!(store.backfill(ContextKey::RequestId, "?"));
        assert_eq!(store.get(ContextKey::RequestId), Some("?"));

        store.put(ContextKey::ServiceInstanceId, "");
        assert!(store.backfill(ContextKey::ServiceInstanceId, "??"));

        store.put(ContextKey::RequestId, "real");
        assert!(!store.backfill(ContextKey::RequestId, "?"));
        assert_eq!(store.get(ContextKey::RequestId), Some("real"));
    }

    #[test]
    fn test_remove_all_leaves_other_keys() {
        let mut store = ContextStore::new();
        store.put(ContextKey::RequestId, "r1");
        store.put(ContextKey::TargetEntity, "hostX");
        store.put(ContextKey::ElapsedTime, "12");

        store.remove_all(&[ContextKey::TargetEntity, ContextKey::ElapsedTime]);

        assert_eq!(store.len(), 1);
        assert!(store.contains(ContextKey::RequestId));
    }

    #[test]
    fn test_snapshot_is_ordered_by_key() {
        let mut store = ContextStore::new();
        store.put(ContextKey::TargetEntity, "t");
        store.put(ContextKey::RequestId, "r");

        let keys: Vec<_> = store.snapshot().into_keys().collect();
        assert_eq!(keys, vec![ContextKey::RequestId, ContextKey::TargetEntity]);
    }
}
