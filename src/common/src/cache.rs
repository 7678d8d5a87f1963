/*
   Entra ID group to role synchronization - Expiring Cache
   Copyright (C) David Mulder <dmulder@samba.org> 2025

   This program is free software; you can redistribute it and/or modify
   it under the terms of the GNU General Public License as published by
   the Free Software Foundation; either version 3 of the License, or
   (at your option) any later version.

   This program is distributed in the hope that it will be useful,
   but WITHOUT ANY WARRANTY; without even the implied warranty of
   MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
   GNU General Public License for more details.

   You should have received a copy of the GNU General Public License
   along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

/// A keyed cache where every entry carries its own deadline. Entries are
/// replaced wholesale, never updated in place. An entry whose deadline does
/// not fit in a `SystemTime` never expires.
pub struct ExpiringCache<V> {
    entries: RwLock<HashMap<String, (V, Option<SystemTime>)>>,
}

fn is_live(expires_at: &Option<SystemTime>, now: SystemTime) -> bool {
    match expires_at {
        Some(expires_at) => now < *expires_at,
        None => true,
    }
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new() -> Self {
        ExpiringCache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the value if it is present and now < deadline.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if is_live(expires_at, SystemTime::now()) => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    pub async fn set(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = SystemTime::now().checked_add(ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, expires_at));
    }

    pub async fn set_until(&self, key: &str, value: V, expires_at: SystemTime) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, Some(expires_at)));
    }

    pub async fn expire(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Drop every entry whose deadline has passed.
    pub async fn purge(&self) {
        let now = SystemTime::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| is_live(expires_at, now));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V: Clone> Default for ExpiringCache<V> {
    fn default() -> Self {
        ExpiringCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let cache: ExpiringCache<String> = ExpiringCache::new();
        assert_eq!(cache.get("k").await, None);

        cache.set("k", "v1".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some("v1".to_string()));

        // Replaced, not merged
        cache.set("k", "v2".to_string(), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some("v2".to_string()));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache: ExpiringCache<u32> = ExpiringCache::new();
        cache.set("k", 1, Duration::ZERO).await;
        assert_eq!(cache.get("k").await, None);

        cache
            .set_until("old", 2, SystemTime::now() - Duration::from_secs(1))
            .await;
        assert_eq!(cache.get("old").await, None);
    }

    #[tokio::test]
    async fn test_ttl_past_system_time_range() {
        let cache: ExpiringCache<u32> = ExpiringCache::new();
        cache.set("k", 1, Duration::MAX).await;
        assert_eq!(cache.get("k").await, Some(1));

        cache.purge().await;
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_expire_and_purge() {
        let cache: ExpiringCache<u32> = ExpiringCache::new();
        cache.set("live", 1, Duration::from_secs(60)).await;
        cache.set("dead", 2, Duration::ZERO).await;
        assert_eq!(cache.len().await, 2);

        cache.purge().await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("live").await, Some(1));

        cache.expire("live").await;
        assert!(cache.is_empty().await);
    }
}
