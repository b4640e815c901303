// src/loader.rs
// Terrain cache keyed by terrain id with single-flight coalescing of in-flight loads
// RELEVANT FILES: src/heightfield/mod.rs, src/renderer.rs, src/settings/config.rs

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use futures_intrusive::channel::shared::{oneshot_broadcast_channel, OneshotBroadcastReceiver};

use crate::error::{TerrainError, TerrainResult};
use crate::heightfield::{HeightField, SeaLevel};

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = TerrainResult<Vec<u8>>> + 'a>>;

pub type LoadResult = TerrainResult<Arc<HeightField>>;

/// Supplies raw raster bytes for a terrain key.
pub trait RasterSource {
    fn fetch<'a>(&'a self, key: &'a str) -> FetchFuture<'a>;
}

/// Reads `<root>/<key>.png`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> TerrainResult<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(TerrainError::config(format!("invalid terrain key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.png")))
    }
}

impl RasterSource for DirectorySource {
    fn fetch<'a>(&'a self, key: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            let path = self.path_for(key)?;
            log::debug!("reading raster {}", path.display());
            Ok(std::fs::read(&path)?)
        })
    }
}

/// In-memory rasters, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySource {
    rasters: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, bytes: Vec<u8>) {
        self.rasters.borrow_mut().insert(key.into(), bytes);
    }
}

impl RasterSource for MemorySource {
    fn fetch<'a>(&'a self, key: &'a str) -> FetchFuture<'a> {
        let found = self.rasters.borrow().get(key).cloned();
        Box::pin(async move {
            found.ok_or_else(|| {
                TerrainError::from(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no raster for key '{key}'"),
                ))
            })
        })
    }
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<String, Arc<HeightField>>,
    in_flight: HashMap<String, OneshotBroadcastReceiver<LoadResult>>,
    generation: u64,
    decodes: u64,
}

/// Removes the in-flight entry if the leading load ends without finishing.
struct InFlightGuard<'a> {
    state: &'a RefCell<LoaderState>,
    key: &'a str,
    generation: u64,
    armed: bool,
}

impl InFlightGuard<'_> {
    fn finish(mut self, result: &LoadResult) {
        self.armed = false;
        let mut st = self.state.borrow_mut();
        if st.generation != self.generation {
            // cleared while loading; waiters still get the result
            return;
        }
        st.in_flight.remove(self.key);
        match result {
            Ok(field) => {
                st.cache.insert(self.key.to_string(), Arc::clone(field));
            }
            Err(e) => log::warn!("load of '{}' failed [{}]: {}", self.key, e.category(), e),
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut st = self.state.borrow_mut();
        if st.generation == self.generation {
            st.in_flight.remove(self.key);
        }
        log::warn!("load of '{}' abandoned before completion", self.key);
    }
}

/// Owns decoded terrains. Identical concurrent requests share one fetch and decode.
pub struct TerrainLoader {
    source: Box<dyn RasterSource>,
    sea_level_keys: HashSet<String>,
    state: RefCell<LoaderState>,
}

impl TerrainLoader {
    pub fn new(source: impl RasterSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            sea_level_keys: HashSet::new(),
            state: RefCell::new(LoaderState::default()),
        }
    }

    /// Keys whose rasters keep a below-sea-level band.
    pub fn with_sea_level_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sea_level_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn sea_level_for(&self, key: &str) -> SeaLevel {
        if self.sea_level_keys.contains(key) {
            SeaLevel::Preserved
        } else {
            SeaLevel::Synthetic
        }
    }

    /// Cached terrain, without loading.
    pub fn get(&self, key: &str) -> Option<Arc<HeightField>> {
        self.state.borrow().cache.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.borrow().cache.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.state.borrow().in_flight.contains_key(key)
    }

    /// Number of decodes run so far.
    pub fn decode_count(&self) -> u64 {
        self.state.borrow().decodes
    }

    /// Drop every cached terrain. Loads already running still resolve for their
    /// callers but are not cached.
    pub fn clear(&self) {
        let mut st = self.state.borrow_mut();
        st.generation += 1;
        st.cache.clear();
        st.in_flight.clear();
        log::debug!("terrain cache cleared");
    }

    /// Load `key`, sharing the result with any identical request in flight.
    /// Failed loads are not cached.
    pub async fn load(&self, key: &str) -> LoadResult {
        let waiter = {
            let st = self.state.borrow();
            if let Some(field) = st.cache.get(key) {
                log::debug!("terrain cache hit for '{key}'");
                return Ok(Arc::clone(field));
            }
            st.in_flight.get(key).cloned()
        };

        if let Some(rx) = waiter {
            log::debug!("coalescing request for '{key}' into in-flight load");
            return rx.receive().await.unwrap_or_else(|| {
                Err(TerrainError::decode(format!("load of '{key}' was abandoned")))
            });
        }

        log::debug!("terrain cache miss for '{key}'");
        let (tx, rx) = oneshot_broadcast_channel();
        let generation = {
            let mut st = self.state.borrow_mut();
            st.in_flight.insert(key.to_string(), rx);
            st.generation
        };
        let guard = InFlightGuard { state: &self.state, key, generation, armed: true };

        let result = self.fetch_and_decode(key).await;
        guard.finish(&result);
        let _ = tx.send(result.clone());
        result
    }

    /// Drive [`TerrainLoader::load`] to completion on the current thread.
    pub fn load_blocking(&self, key: &str) -> LoadResult {
        pollster::block_on(self.load(key))
    }

    async fn fetch_and_decode(&self, key: &str) -> LoadResult {
        let bytes = self.source.fetch(key).await?;
        self.state.borrow_mut().decodes += 1;
        let field = HeightField::decode(&bytes, self.sea_level_for(key))?;
        log::info!(
            "loaded terrain '{}' {} ({:?})",
            key,
            field.stats().size_label(),
            field.sea_level()
        );
        Ok(Arc::new(field))
    }
}
