
use crate::cache::{Asset, Completer, Handle, LoadResult, ResourceKey};

pub mod files;
pub mod memory;

pub use files::FileBackend;
pub use memory::MemoryBackend;


/// Storage collaborator that actually produces and frees resources.
pub trait AssetBackend {
    fn load_sync(&mut self, key: &ResourceKey) -> LoadResult;

    /// Starts a load whose result must be delivered through `completer`,
    /// from any thread, at any later point.
    fn load_async(&mut self, key: &ResourceKey, completer: Completer);

    /// Best effort. Must be harmless if `handle` already finished.
    fn cancel_async(&mut self, handle: Handle);

    fn release(&mut self, key: &ResourceKey, asset: Asset);

    /// Frees memory of released assets nobody references anymore,
    /// returning how many were freed.
    fn release_unused(&mut self) -> usize {
        0
    }
}
