use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;

use tokio::sync::Mutex;

use crate::retry::RetryPolicy;
use crate::Result;

/// Default number of locators kept in the metadata cache
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded map with least-recently-used eviction
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, V>,
    // Front is least recently used
    order: VecDeque<K>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key).cloned()?;
        self.touch(key);
        Some(value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }

        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

/// A retrying fetch fronted by an LRU cache.
///
/// Only successful results are cached; a failed fetch is retried per the
/// policy and the next lookup for the same key fetches again.
pub struct CachedFetch<V> {
    cache: Mutex<LruCache<String, V>>,
    policy: RetryPolicy,
}

impl<V: Clone> CachedFetch<V> {
    pub fn new(capacity: usize, policy: RetryPolicy) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            policy,
        }
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &str, operation: &str, fetch: F) -> Result<V>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.cache.lock().await.get(&key.to_string()) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }

        let value = self.policy.run(operation, fetch).await?;
        self.cache.lock().await.insert(key.to_string(), value.clone());
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
