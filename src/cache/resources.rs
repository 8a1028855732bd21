
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::backend::AssetBackend;
use crate::cache::{
    asset::downcast_result,
    AssetCache,
    Completion,
    Handle,
    LoadError,
    LoadResult,
    Resource,
    ResourceKey,
    Scheduler,
};


pub type Waiter = Box<dyn FnOnce(LoadResult)>;


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntryState {
    Loading,
    Loaded,
}


enum Entry {
    Loading(Pending),
    Loaded(LoadResult),
}

struct Pending {
    handle: Handle,
    waiters: Vec<Waiter>,
    pending_delete: bool,
}


/// Load-once cache of backend resources keyed by (path, tag).
///
/// At most one backend operation is outstanding per key. Asynchronous
/// requests for a key that is already loading join the existing operation
/// and are answered in the order they were made. A synchronous request for a
/// loading key cancels the asynchronous operation and answers everyone with
/// the synchronous result instead.
///
/// The cache is driven from a single thread: completions are only applied
/// inside [`ResourceCache::update`], which the host calls once per frame.
/// Callbacks run while the cache is borrowed and so can't call back into it.
pub struct ResourceCache<B> {
    backend: B,
    scheduler: Scheduler,
    entries: HashMap<ResourceKey, Entry>,
    in_flight: HashMap<Handle, ResourceKey>,
    superseded: HashSet<Handle>,
    deferred: Vec<Box<dyn FnOnce()>>,
}


impl<B: AssetBackend> ResourceCache<B> {

    pub fn new(backend: B) -> Self {
        Self {
            backend,
            scheduler: Scheduler::new(),
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            superseded: HashSet::new(),
            deferred: Vec::new(),
        }
    }

    /// Returns the resource for `key`, loading it synchronously on a miss.
    ///
    /// If the key is still loading asynchronously, that operation is canceled
    /// and every queued waiter receives the synchronous result before this
    /// returns.
    pub fn get(&mut self, key: &ResourceKey) -> LoadResult {
        let waiters = match self.entries.get_mut(key) {
            Some(Entry::Loaded(result)) => {
                log::trace!("cache hit: {}", key);
                return result.clone();
            },
            Some(Entry::Loading(pending)) => {
                log::debug!("{} requested synchronously while loading, canceling {:?}", key, pending.handle);
                self.backend.cancel_async(pending.handle);
                self.in_flight.remove(&pending.handle);
                self.superseded.insert(pending.handle);
                std::mem::take(&mut pending.waiters)
            },
            None => Vec::new(),
        };

        let result = self.backend.load_sync(key);
        log_load(key, &result);
        self.entries.insert(key.clone(), Entry::Loaded(result.clone()));

        for waiter in waiters {
            waiter(result.clone());
        }

        result
    }

    /// Requests the resource for `key` without blocking.
    ///
    /// A cached result is handed to `on_complete` immediately. Otherwise the
    /// callback is queued behind any earlier ones and runs from a later
    /// [`ResourceCache::update`].
    pub fn get_async(&mut self, key: &ResourceKey, on_complete: impl FnOnce(LoadResult) + 'static) {
        match self.entries.get_mut(key) {
            Some(Entry::Loaded(result)) => {
                log::trace!("cache hit: {}", key);
                let result = result.clone();
                on_complete(result);
            },
            Some(Entry::Loading(pending)) => {
                log::trace!("joining in-flight load of {}", key);
                pending.waiters.push(Box::new(on_complete));
            },
            None => {
                let completer = self.scheduler.completer();
                let handle = completer.handle();
                log::debug!("loading {} asynchronously as {:?}", key, handle);

                self.in_flight.insert(handle, key.clone());
                self.entries.insert(key.clone(), Entry::Loading(Pending {
                    handle,
                    waiters: vec![Box::new(on_complete)],
                    pending_delete: false,
                }));
                self.backend.load_async(key, completer);
            },
        }
    }

    /// Future flavour of [`ResourceCache::get_async`].
    pub fn fetch(&mut self, key: &ResourceKey) -> LoadFuture {
        let (sender, receiver) = oneshot::channel();
        self.get_async(key, move |result| {
            // the future may have been dropped, which is fine.
            let _ = sender.send(result);
        });
        LoadFuture { receiver }
    }

    /// Releases the resource for `key`.
    ///
    /// A key that is still loading is only marked; it is released as soon as
    /// its load completes. Unknown keys are ignored.
    pub fn unload(&mut self, key: &ResourceKey) {
        if let Some(Entry::Loading(pending)) = self.entries.get_mut(key) {
            log::debug!("{} unloaded while loading, deferring release", key);
            pending.pending_delete = true;
            return;
        }

        match self.entries.remove(key) {
            Some(Entry::Loaded(result)) => {
                log::debug!("unloading {}", key);
                release(&mut self.backend, key, result);
            },
            _ => log::trace!("unload of {} ignored, not cached", key),
        }
    }

    /// Releases everything loaded and marks everything loading for release.
    pub fn unload_all(&mut self) {
        // entries leave the map before release so the backend sees the last handle.
        for (key, entry) in std::mem::take(&mut self.entries) {
            match entry {
                Entry::Loading(mut pending) => {
                    pending.pending_delete = true;
                    self.entries.insert(key, Entry::Loading(pending));
                },
                Entry::Loaded(result) => release(&mut self.backend, &key, result),
            }
        }
        log::debug!("unloaded all, {} still loading", self.entries.len());
    }

    /// Asks the backend to free released memory that is no longer referenced;
    /// `on_done` receives the freed count on the next update.
    pub fn unload_unused(&mut self, on_done: impl FnOnce(usize) + 'static) {
        let freed = self.backend.release_unused();
        log::debug!("released {} unused assets", freed);
        self.deferred.push(Box::new(move || on_done(freed)));
    }

    pub fn get_typed<R: Resource>(&mut self, path: &str) -> Result<Arc<R>, LoadError> {
        let key = ResourceKey::of::<R>(path);
        let result = self.get(&key);
        downcast_result(&key, result)
    }

    pub fn get_async_typed<R: Resource>(
        &mut self,
        path: &str,
        on_complete: impl FnOnce(Result<Arc<R>, LoadError>) + 'static,
    ) {
        let key = ResourceKey::of::<R>(path);
        let typed_key = key.clone();
        self.get_async(&key, move |result| on_complete(downcast_result(&typed_key, result)));
    }

    pub fn unload_typed<R: Resource>(&mut self, path: &str) {
        self.unload(&ResourceKey::of::<R>(path));
    }

    /// Applies every completion delivered since the last call, in arrival
    /// order, then runs deferred callbacks.
    pub fn update(&mut self) {
        self.scheduler.refresh_items();
        let completions: Vec<Completion> = self.scheduler.iter_items().collect();
        for Completion { handle, result } in completions {
            self.complete(handle, result);
        }

        for callback in std::mem::take(&mut self.deferred) {
            callback();
        }
    }

    fn complete(&mut self, handle: Handle, result: LoadResult) {
        let key = match self.in_flight.remove(&handle) {
            Some(key) => key,
            None if self.superseded.remove(&handle) => {
                log::debug!("discarding superseded completion {:?}", handle);
                return;
            },
            None => panic!("completion for {:?}, which this cache never issued", handle),
        };

        let pending = match self.entries.remove(&key) {
            Some(Entry::Loading(pending)) if pending.handle == handle => pending,
            _ => panic!("entry for {} is not waiting on {:?}", key, handle),
        };

        log_load(&key, &result);

        if pending.pending_delete {
            log::debug!("releasing {}, it was unloaded while loading", key);
            for waiter in pending.waiters {
                waiter(result.clone());
            }
            release(&mut self.backend, &key, result);
        } else {
            self.entries.insert(key, Entry::Loaded(result.clone()));
            for waiter in pending.waiters {
                waiter(result.clone());
            }
        }
    }

    pub fn state(&self, key: &ResourceKey) -> Option<EntryState> {
        self.entries.get(key).map(|entry| match entry {
            Entry::Loading(_) => EntryState::Loading,
            Entry::Loaded(_) => EntryState::Loaded,
        })
    }

    #[inline]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Asynchronous operations whose completion has not been applied yet,
    /// including those whose entry is waiting to be released.
    #[inline]
    pub fn pending_loads(&self) -> usize {
        self.in_flight.len()
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

}


fn release<B: AssetBackend>(backend: &mut B, key: &ResourceKey, result: LoadResult) {
    // failed loads hold nothing on the backend side.
    if let Ok(asset) = result {
        backend.release(key, asset);
    }
}

fn log_load(key: &ResourceKey, result: &LoadResult) {
    match result {
        Ok(_) => log::debug!("loaded {}", key),
        Err(e) => log::warn!("failed to load {}: {}", key, e),
    }
}


impl<B: AssetBackend> AssetCache for ResourceCache<B> {
    type AssetName = ResourceKey;
    type AssetRef = LoadResult;

    fn load(&mut self, name: ResourceKey) -> LoadResult {
        self.get(&name)
    }

    fn invalidate(&mut self, name: ResourceKey) {
        self.unload(&name);
    }

    fn clear(&mut self) {
        self.unload_all();
    }
}



/// Resolves once the requested load has been applied by an update.
#[must_use = "futures do nothing unless polled"]
pub struct LoadFuture {
    receiver: oneshot::Receiver<LoadResult>,
}

impl Future for LoadFuture {
    type Output = LoadResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<LoadResult> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // the cache went away with the request still queued.
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(LoadError::Canceled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
