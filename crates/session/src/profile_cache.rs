//! Short-lived cache of user profiles keyed by username

use anidex_http::types::UserProfile;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct ProfileCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (UserProfile, Instant)>>,
}

impl ProfileCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, username: &str) -> Option<UserProfile> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(username) {
            Some((profile, fetched)) if fetched.elapsed() < self.ttl => Some(profile.clone()),
            Some(_) => {
                entries.remove(username);
                None
            }
            None => None,
        }
    }

    /// Store `profile`, dropping every entry that has outlived the TTL
    pub fn insert(&self, profile: UserProfile) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (_, fetched)| fetched.elapsed() < self.ttl);
        entries.insert(profile.username.clone(), (profile, Instant::now()));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str) -> UserProfile {
        UserProfile {
            id: "1".into(),
            username: username.into(),
            email: None,
            nickname: None,
            user_avatar: None,
            user_banner: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = ProfileCache::new(Duration::from_secs(300));
        cache.insert(profile("mika"));
        assert_eq!(cache.get("mika").unwrap().username, "mika");

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("mika").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("mika").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_drops_expired_entries() {
        let cache = ProfileCache::new(Duration::from_secs(300));
        cache.insert(profile("mika"));
        cache.insert(profile("aoi"));

        tokio::time::advance(Duration::from_secs(301)).await;
        cache.insert(profile("ren"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("ren").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ProfileCache::new(Duration::from_secs(300));
        cache.insert(profile("mika"));
        cache.clear();
        assert!(cache.get("mika").is_none());
    }
}
