//! Profile directory
//!
//! Read-only lookup from user id to display identity, backed by the history
//! API and a short-lived cache. Missing profiles resolve to the `Unknown`
//! placeholder so a message is always renderable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use lobby_common::{Operation, SyncError, SyncResult};
use lobby_core::{HistoryApi, Profile, UserId};
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CachedProfile {
    profile: Profile,
    fetched_at: Instant,
}

/// Profile lookup with a TTL cache
///
/// Shared between the controller and its background lookup tasks.
pub struct ProfileDirectory {
    api: Arc<dyn HistoryApi>,
    cache: DashMap<UserId, CachedProfile>,
    ttl: Duration,
}

impl ProfileDirectory {
    /// Create a directory whose cache entries live for `ttl`
    pub fn new(api: Arc<dyn HistoryApi>, ttl: Duration) -> Self {
        Self {
            api,
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Create a new directory wrapped in Arc
    pub fn new_shared(api: Arc<dyn HistoryApi>, ttl: Duration) -> Arc<Self> {
        Arc::new(Self::new(api, ttl))
    }

    /// Resolve every id in `ids`
    ///
    /// Fresh cache entries are served directly; the rest are fetched in one
    /// call. Ids the backend does not know map to the `Unknown` placeholder.
    ///
    /// # Errors
    /// Returns a transport error if the fetch fails. Use
    /// [`ProfileDirectory::fallback`] to render with whatever is cached.
    pub async fn lookup_many(&self, ids: &HashSet<UserId>) -> SyncResult<HashMap<UserId, Profile>> {
        let mut resolved = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.cached(id) {
                Some(profile) => {
                    resolved.insert(id.clone(), profile);
                }
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(resolved);
        }

        tracing::debug!(count = missing.len(), "Fetching profiles");
        let fetched = self
            .api
            .fetch_profiles(Some(missing.as_slice()))
            .await
            .map_err(|e| SyncError::transport(Operation::FetchProfiles, e))?;

        for profile in fetched {
            self.remember(profile.clone());
            if ids.contains(&profile.user_id) {
                resolved.insert(profile.user_id.clone(), profile);
            }
        }

        for id in missing {
            resolved
                .entry(id)
                .or_insert_with_key(|id| Profile::unknown(id.clone()));
        }

        Ok(resolved)
    }

    /// Fetch every profile, ordered for the roster
    ///
    /// Always goes to the backend; the result refreshes the cache.
    ///
    /// # Errors
    /// Returns a transport error if the fetch fails.
    pub async fn lookup_all(&self) -> SyncResult<Vec<Profile>> {
        let mut profiles = self
            .api
            .fetch_profiles(None)
            .await
            .map_err(|e| SyncError::transport(Operation::FetchProfiles, e))?;

        for profile in &profiles {
            self.remember(profile.clone());
        }

        profiles.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(profiles)
    }

    /// Fresh cached profile, if any
    pub fn cached(&self, id: &UserId) -> Option<Profile> {
        self.cache
            .get(id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.profile.clone())
    }

    /// Cache a profile obtained elsewhere (e.g. from a roster listing)
    pub fn remember(&self, profile: Profile) {
        self.cache.insert(
            profile.user_id.clone(),
            CachedProfile {
                profile,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Best effort resolution without network access
    ///
    /// Serves cached entries even when stale; anything else is `Unknown`.
    pub fn fallback(&self, ids: &HashSet<UserId>) -> HashMap<UserId, Profile> {
        ids.iter()
            .map(|id| {
                let profile = self
                    .cache
                    .get(id)
                    .map_or_else(|| Profile::unknown(id.clone()), |entry| entry.profile.clone());
                (id.clone(), profile)
            })
            .collect()
    }

    /// Drop expired cache entries, returning how many went
    pub fn evict_stale(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.fetched_at.elapsed() < self.ttl);
        before.saturating_sub(self.cache.len())
    }

    /// Number of cached entries, stale ones included
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for ProfileDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileDirectory")
            .field("cached", &self.cache.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
