//! Platform services consumed by the lifecycle engine: a clock and an
//! allocator for transient blob references backing file attachments.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::{debug, warn};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub trait BlobAllocator: Send + Sync {
    fn allocate(&self, name: &str, size_bytes: u64) -> String;
    fn release(&self, url: &str);
}

/// In-process registry of `blob:` style URLs.
#[derive(Default)]
pub struct ObjectUrls {
    live: Mutex<HashSet<String>>,
}

impl ObjectUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).contains(url)
    }
}

impl BlobAllocator for ObjectUrls {
    fn allocate(&self, name: &str, size_bytes: u64) -> String {
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);
        let url = format!("blob:taskswap/{}", hex::encode(nonce));
        debug!(target: "attachments", name, size_bytes, %url, "allocated blob url");
        self.live.lock().unwrap_or_else(|e| e.into_inner()).insert(url.clone());
        url
    }

    fn release(&self, url: &str) {
        if !self.live.lock().unwrap_or_else(|e| e.into_inner()).remove(url) {
            warn!(target: "attachments", url, "released an unknown blob url");
        }
    }
}

/// A blob reference that is released when dropped.
pub struct BlobLease {
    url: String,
    allocator: Arc<dyn BlobAllocator>,
}

impl BlobLease {
    pub fn acquire(allocator: &Arc<dyn BlobAllocator>, name: &str, size_bytes: u64) -> Self {
        let url = allocator.allocate(name, size_bytes);
        Self { url, allocator: Arc::clone(allocator) }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for BlobLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobLease").field("url", &self.url).finish()
    }
}

impl Drop for BlobLease {
    fn drop(&mut self) {
        self.allocator.release(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_releases_on_drop() {
        let urls = Arc::new(ObjectUrls::new());
        let allocator: Arc<dyn BlobAllocator> = urls.clone();
        let lease = BlobLease::acquire(&allocator, "a.png", 10);
        assert!(lease.url().starts_with("blob:taskswap/"));
        assert!(urls.is_live(lease.url()));
        assert_eq!(urls.live_count(), 1);
        drop(lease);
        assert_eq!(urls.live_count(), 0);
    }

    #[test]
    fn urls_are_unique() {
        let urls = ObjectUrls::new();
        let a = urls.allocate("a", 1);
        let b = urls.allocate("a", 1);
        assert_ne!(a, b);
        assert_eq!(urls.live_count(), 2);
    }
}
