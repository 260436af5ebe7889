//! Download URL cache keyed by object name.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// TTL cache of signed download URLs
#[derive(Debug)]
pub struct UrlCache {
    ttl: Duration,
    entries: HashMap<String, (String, Instant)>,
}

impl UrlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Cached URL, if still fresh at `now`
    pub fn get(&self, object_name: &str, now: Instant) -> Option<&str> {
        self.entries
            .get(object_name)
            .filter(|(_, stored)| now.saturating_duration_since(*stored) < self.ttl)
            .map(|(url, _)| url.as_str())
    }

    /// Store a URL fetched at `now`, evicting expired entries
    pub fn insert(&mut self, object_name: &str, url: String, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, stored)| now.saturating_duration_since(*stored) < ttl);
        self.entries.insert(object_name.to_string(), (url, now));
    }

    /// Drop one entry (e.g. after the download failed)
    pub fn invalidate(&mut self, object_name: &str) {
        self.entries.remove(object_name);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
