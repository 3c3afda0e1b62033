//! Time-bounded memoization of an arbitrary fallible call, backed by a JSON
//! file so results survive restarts. Entries expire independently by
//! `timestamp + ttl < now`; a corrupt or unreadable file degrades to an empty
//! cache instead of failing the call.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_TTL_MS: u64 = 60_000;
pub const DEFAULT_STORAGE_KEY: &str = "schedule-cache";

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl_ms: u64,
    /// Namespace; becomes the file name under the cache directory.
    pub storage_key: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        CacheOptions {
            ttl_ms: DEFAULT_TTL_MS,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: u64,
    value: serde_json::Value,
}

pub struct PersistentCache {
    path: PathBuf,
    options: CacheOptions,
    entries: HashMap<String, CacheEntry>,
}

impl PersistentCache {
    pub fn open(dir: &Path, options: CacheOptions) -> Self {
        let path = dir.join(format!("{}.json", options.storage_key));
        let entries = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
                log::warn!("discarding corrupt cache {}: {}", path.display(), err);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        PersistentCache {
            path,
            options,
            entries,
        }
    }

    /// Return the cached value for `args` if it is still fresh, otherwise run
    /// `fetch`, remember its result, and return it. A fetch error is passed
    /// through uncached.
    pub fn get_or_fetch<A, T, F>(&mut self, args: &A, fetch: F) -> Result<T>
    where
        A: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let key = serde_json::to_string(args).context("serializing cache key")?;
        let now = now_ms();

        if let Some(entry) = self.entries.get(&key) {
            if now.saturating_sub(entry.timestamp) < self.options.ttl_ms {
                if let Ok(value) = serde_json::from_value(entry.value.clone()) {
                    return Ok(value);
                }
            }
        }

        let value = fetch()?;
        self.entries.insert(
            key,
            CacheEntry {
                timestamp: now,
                value: serde_json::to_value(&value).context("serializing cache value")?,
            },
        );
        self.save();
        Ok(value)
    }

    fn save(&self) {
        let write = || -> Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {:?}", parent))?;
            }
            let data = serde_json::to_string(&self.entries)?;
            fs::write(&self.path, data).with_context(|| format!("writing {:?}", self.path))?;
            Ok(())
        };
        if let Err(err) = write() {
            log::warn!("could not persist cache: {:#}", err);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
