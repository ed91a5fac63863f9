use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::store::Cache;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Set(HashSet<String>),
    // member -> score
    Sorted(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn live(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Functional in-process cache backend.
///
/// Implements the full [`Cache`] contract over process-local state: strings
/// with TTL, sets, sorted sets and counters, including a real sliding-window
/// rate limiter. Intended for test suites (this crate's own and those of
/// dependent services) that need observable cache behavior without a store.
/// Expiry is honored lazily: expired entries read as absent and are purged
/// on the next write touching their key.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries.get(key).is_some_and(|entry| !entry.live()) {
        entries.remove(key);
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.live() => match &entry.value {
                Value::Text(text) => Some(text.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> bool {
        let mut entries = self.entries.write().await;
        let expires_at = ttl_seconds.map(|seconds| Instant::now() + Duration::from_secs(seconds));
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                expires_at,
            },
        );
        true
    }

    async fn del(&self, key: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.remove(key) {
            Some(entry) => entry.live(),
            None => false,
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(Entry::live)
    }

    async fn expire(&self, key: &str, seconds: u64) -> bool {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
                true
            }
            None => false,
        }
    }

    async fn s_add(&self, key: &str, member: &str) -> u64 {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Set(HashSet::new())));
        match &mut entry.value {
            Value::Set(set) => u64::from(set.insert(member.to_string())),
            _ => 0,
        }
    }

    async fn s_members(&self, key: &str) -> Vec<String> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.live() => match &entry.value {
                Value::Set(set) => set.iter().cloned().collect(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    async fn s_rem(&self, key: &str, member: &str) -> u64 {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::Set(set) => u64::from(set.remove(member)),
                _ => 0,
            },
            None => 0,
        }
    }

    async fn s_card(&self, key: &str) -> u64 {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.live() => match &entry.value {
                Value::Set(set) => set.len() as u64,
                _ => 0,
            },
            _ => 0,
        }
    }

    async fn z_add(&self, key: &str, score: f64, member: &str) -> u64 {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Sorted(HashMap::new())));
        match &mut entry.value {
            Value::Sorted(members) => u64::from(members.insert(member.to_string(), score).is_none()),
            _ => 0,
        }
    }

    async fn z_card(&self, key: &str) -> u64 {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.live() => match &entry.value {
                Value::Sorted(members) => members.len() as u64,
                _ => 0,
            },
            _ => 0,
        }
    }

    async fn z_rem_range_by_score(&self, key: &str, min: f64, max: f64) -> u64 {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::Sorted(members) => {
                    let before = members.len();
                    members.retain(|_, score| *score < min || *score > max);
                    (before - members.len()) as u64
                }
                _ => 0,
            },
            None => 0,
        }
    }

    async fn incr(&self, key: &str) -> i64 {
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            Some(entry) => match &mut entry.value {
                Value::Text(text) => match text.parse::<i64>() {
                    Ok(current) => {
                        let next = current + 1;
                        *text = next.to_string();
                        next
                    }
                    Err(_) => 0,
                },
                _ => 0,
            },
            None => {
                entries.insert(key.to_string(), Entry::new(Value::Text("1".to_string())));
                1
            }
        }
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn check_rate_limit(&self, key: &str, limit: u64, window_ms: u64) -> bool {
        let now = Utc::now().timestamp_millis();
        let window_start = now - window_ms as i64;

        self.z_rem_range_by_score(key, 0.0, window_start as f64).await;
        let member = format!("{}-{}", now, rand::random::<u32>());
        self.z_add(key, now as f64, &member).await;
        let count = self.z_card(key).await;
        self.expire(key, window_ms.div_ceil(1000)).await;

        count <= limit
    }
}
