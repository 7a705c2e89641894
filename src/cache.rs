// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! # Caches
//!
//! Concurrent maps with per entry expiry. Entries are never invalidated on
//! upstream changes, they only age out. Two concurrent misses on the same
//! key both fetch and the last insert wins.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace};

use crate::auth::{Authentication, CacheKey};
use crate::resource::AuthorizedScope;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Map with entries expiring `ttl` after their insertion.
#[derive(Debug)]
pub struct TtlCache<K: Eq + Hash, V> {
    entries: DashMap<K, Entry<V>>,
    /// `None` keeps the entries for the process lifetime.
    ttl: Option<Duration>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Cache without expiry.
    pub fn unbounded() -> Self {
        Self {
            entries: DashMap::new(),
            ttl: None,
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_duration_since(entry.inserted_at) >= ttl)
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !self.is_expired(&entry, now) {
                return Some(entry.value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, entry| self.is_expired(entry, now));
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Drop all expired entries and return how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key of the user name to ID cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserNameKey {
    pub name: String,
    pub domain_name: String,
}

/// The gatekeeper caches.
#[derive(Debug)]
pub struct AuthCaches {
    /// Authentication results by the presented credentials and scope.
    pub contexts: TtlCache<CacheKey, Arc<Authentication>>,
    /// Descendant project IDs by the root project ID.
    pub project_trees: TtlCache<String, Arc<Vec<String>>>,
    /// Monitoring scopes by the user ID.
    pub user_projects: TtlCache<String, Arc<Vec<AuthorizedScope>>>,
    /// User IDs by name and domain name. User names are assumed to be
    /// immutable, so these never expire.
    pub user_ids: TtlCache<UserNameKey, String>,
}

impl AuthCaches {
    pub fn new(ttl: Duration) -> Self {
        Self {
            contexts: TtlCache::new(ttl),
            project_trees: TtlCache::new(ttl),
            user_projects: TtlCache::new(ttl),
            user_ids: TtlCache::unbounded(),
        }
    }

    /// Sweep all caches.
    pub fn sweep(&self) -> usize {
        self.contexts.sweep() + self.project_trees.sweep() + self.user_projects.sweep()
    }
}

/// Spawn the periodic sweep of the expired cache entries.
pub fn spawn_sweeper(
    caches: Arc<AuthCaches>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(interval);
        interval.tick().await;
        info!("Start the periodic cache sweep");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let dropped = caches.sweep();
                    trace!("cache sweep dropped {} entries", dropped);
                },
                () = cancel.cancelled() => {
                    info!("Cancellation requested. Stopping cache sweep.");
                    break;
                }
            }
        }
    })
}
