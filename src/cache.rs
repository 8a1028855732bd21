
mod asset;
mod key;
mod resources;
mod scheduler;

pub use asset::{Asset, LoadError, LoadResult, Resource};
pub use key::{ResourceKey, TypeTag, SEPARATOR};
pub use resources::{EntryState, LoadFuture, ResourceCache, Waiter};
pub use scheduler::{Completer, Completion, Handle, Scheduler};


pub trait AssetCache {
    type AssetName;
    type AssetRef;
    fn load(&mut self, name: Self::AssetName) -> Self::AssetRef;
    fn invalidate(&mut self, name: Self::AssetName);
    fn clear(&mut self);
}
