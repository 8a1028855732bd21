
pub mod backend;
pub mod cache;
pub mod config;

pub use backend::{AssetBackend, FileBackend, MemoryBackend};
pub use cache::{Asset, AssetCache, LoadError, LoadResult, Resource, ResourceCache, ResourceKey, TypeTag};
pub use config::AssetsConfig;
