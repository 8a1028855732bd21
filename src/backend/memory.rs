
use std::collections::{HashMap, VecDeque};

use crate::backend::AssetBackend;
use crate::cache::{Asset, Completer, Handle, LoadError, LoadResult, Resource, ResourceKey};


/// In-memory backend whose asynchronous loads finish only when the host says so.
///
/// Every call is counted, which makes it the backend of choice for tests and
/// tools that need to observe what the cache asked for.
#[derive(Default)]
pub struct MemoryBackend {
    assets: HashMap<ResourceKey, Asset>,
    queued: VecDeque<(ResourceKey, Completer)>,
    honor_cancel: bool,

    sync_loads: usize,
    async_loads: usize,
    canceled: Vec<Handle>,
    released: Vec<ResourceKey>,
}


impl MemoryBackend {

    pub fn new() -> Self {
        Self::default()
    }

    /// When set, canceled operations are dropped instead of finishing later.
    pub fn honor_cancel(mut self, honor: bool) -> Self {
        self.honor_cancel = honor;
        self
    }

    pub fn insert<R: Resource>(&mut self, path: impl Into<String>, resource: R) -> Asset {
        let asset = Asset::new(resource);
        self.insert_asset(ResourceKey::of::<R>(path), asset.clone());
        asset
    }

    pub fn insert_asset(&mut self, key: ResourceKey, asset: Asset) {
        self.assets.insert(key, asset);
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Option<Asset> {
        self.assets.remove(key)
    }

    /// Finishes the oldest outstanding asynchronous load.
    pub fn finish_next(&mut self) -> bool {
        match self.queued.pop_front() {
            Some((key, completer)) => {
                let result = self.lookup(&key);
                completer.complete(result);
                true
            },
            None => false,
        }
    }

    /// Drops the oldest outstanding load without a value, as a backend
    /// shutting down would.
    pub fn abandon_next(&mut self) -> bool {
        self.queued.pop_front().is_some()
    }

    pub fn finish_all(&mut self) -> usize {
        let mut finished = 0;
        while self.finish_next() {
            finished += 1;
        }
        finished
    }

    pub fn outstanding(&self) -> usize {
        self.queued.len()
    }

    pub fn sync_loads(&self) -> usize {
        self.sync_loads
    }

    pub fn async_loads(&self) -> usize {
        self.async_loads
    }

    pub fn canceled(&self) -> &[Handle] {
        &self.canceled
    }

    pub fn released(&self) -> &[ResourceKey] {
        &self.released
    }

    fn lookup(&self, key: &ResourceKey) -> LoadResult {
        self.assets
            .get(key)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(key.clone()))
    }

}

impl AssetBackend for MemoryBackend {

    fn load_sync(&mut self, key: &ResourceKey) -> LoadResult {
        self.sync_loads += 1;
        self.lookup(key)
    }

    fn load_async(&mut self, key: &ResourceKey, completer: Completer) {
        self.async_loads += 1;
        self.queued.push_back((key.clone(), completer));
    }

    fn cancel_async(&mut self, handle: Handle) {
        self.canceled.push(handle);
        if self.honor_cancel {
            self.queued.retain(|(_, completer)| completer.handle() != handle);
        }
    }

    fn release(&mut self, key: &ResourceKey, _asset: Asset) {
        self.released.push(key.clone());
    }

}
