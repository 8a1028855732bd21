
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::executor::ThreadPool;
use parking_lot::Mutex;

use crate::backend::AssetBackend;
use crate::cache::{Asset, Completer, Handle, LoadError, LoadResult, Resource, ResourceKey, TypeTag};
use crate::config::AssetsConfig;

mod models;
mod shaders;
mod textures;

pub use models::{Mesh, Model};
pub use shaders::{ShaderSource, ShaderStage};
pub use textures::{Texture, TextureFormat};


/// Raw file contents, for anything without a dedicated decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob(pub Vec<u8>);

impl Resource for Blob {
    const TAG: TypeTag = TypeTag::new("Blob");
}


/// Loads resources from `root/<dir for tag>/<path>`.
///
/// Asynchronous loads are decoded on a worker pool. Canceling only helps if
/// the worker hasn't picked the load up yet.
pub struct FileBackend {
    config: Arc<AssetsConfig>,
    pool: ThreadPool,
    // handle -> canceled, for loads no worker has started yet
    pending: Arc<Mutex<HashMap<Handle, bool>>>,
    retired: Vec<(ResourceKey, Asset)>,
}


impl FileBackend {

    pub const TAGS: [TypeTag; 4] = [Texture::TAG, Model::TAG, ShaderSource::TAG, Blob::TAG];

    pub fn new(config: AssetsConfig) -> anyhow::Result<Self> {
        let pool = ThreadPool::builder()
            .pool_size(config.worker_threads.max(1))
            .name_prefix("asset-loader-")
            .create()?;

        log::debug!("file backend rooted at {} with {} workers", config.root.display(), config.worker_threads.max(1));

        Ok(Self {
            config: Arc::new(config),
            pool,
            pending: Arc::new(Mutex::new(HashMap::new())),
            retired: Vec::new(),
        })
    }

    pub fn tag_named(name: &str) -> Option<TypeTag> {
        Self::TAGS.iter().copied().find(|tag| tag.name().eq_ignore_ascii_case(name))
    }

    /// Released assets still referenced outside the cache.
    pub fn retired(&self) -> usize {
        self.retired.len()
    }

    pub fn resolve(&self, key: &ResourceKey) -> Option<PathBuf> {
        resolve(&self.config, key)
    }

}


fn dir_for<'c>(config: &'c AssetsConfig, tag: TypeTag) -> Option<&'c Path> {
    let dirs = &config.dirs;
    let dir = if tag == Texture::TAG {
        &dirs.textures
    } else if tag == Model::TAG {
        &dirs.models
    } else if tag == ShaderSource::TAG {
        &dirs.shaders
    } else if tag == Blob::TAG {
        &dirs.blobs
    } else {
        return None;
    };
    Some(dir.as_path())
}

/// Relative, and never climbing out of the directory it is joined onto.
fn is_confined(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::Normal(_)))
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn resolve(config: &AssetsConfig, key: &ResourceKey) -> Option<PathBuf> {
    let dir = dir_for(config, key.tag())?;
    let rel = Path::new(key.path());
    if !is_confined(rel) {
        return None;
    }
    Some(config.root.join(dir).join(rel))
}

fn decode(config: &AssetsConfig, tag: TypeTag, path: &Path) -> anyhow::Result<Asset> {
    let asset = if tag == Texture::TAG {
        Asset::new(textures::load_texture_file(path)?)
    } else if tag == Model::TAG {
        Asset::new(models::load_model_file(path)?)
    } else if tag == ShaderSource::TAG {
        Asset::new(shaders::load_shader_file(path, config.max_include_depth)?)
    } else {
        Asset::new(Blob(std::fs::read(path)?))
    };
    Ok(asset)
}

fn load_file(config: &AssetsConfig, key: &ResourceKey) -> LoadResult {
    let path = match resolve(config, key) {
        Some(path) => path,
        None => {
            log::warn!("cannot resolve {} inside {}", key, config.root.display());
            return Err(LoadError::NotFound(key.clone()));
        },
    };

    if !path.is_file() {
        return Err(LoadError::NotFound(key.clone()));
    }

    decode(config, key.tag(), &path).map_err(|e| LoadError::Decode {
        key: key.clone(),
        reason: format!("{:#}", e),
    })
}


impl AssetBackend for FileBackend {

    fn load_sync(&mut self, key: &ResourceKey) -> LoadResult {
        load_file(&self.config, key)
    }

    fn load_async(&mut self, key: &ResourceKey, completer: Completer) {
        let handle = completer.handle();
        self.pending.lock().insert(handle, false);

        let config = self.config.clone();
        let pending = self.pending.clone();
        let key = key.clone();

        self.pool.spawn_ok(async move {
            let canceled = pending.lock().remove(&handle).unwrap_or(true);
            if canceled {
                // dropping the completer reports the cancellation.
                log::debug!("skipping canceled load of {}", key);
                return;
            }
            completer.complete(load_file(&config, &key));
        });
    }

    fn cancel_async(&mut self, handle: Handle) {
        if let Some(canceled) = self.pending.lock().get_mut(&handle) {
            *canceled = true;
        }
    }

    fn release(&mut self, key: &ResourceKey, asset: Asset) {
        if asset.handle_count() > 1 {
            log::debug!("{} still referenced, retiring", key);
            self.retired.push((key.clone(), asset));
        }
    }

    fn release_unused(&mut self) -> usize {
        let before = self.retired.len();
        self.retired.retain(|(_, asset)| asset.handle_count() > 1);
        before - self.retired.len()
    }

}



#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> FileBackend {
        FileBackend::new(AssetsConfig {
            root: PathBuf::from("/game"),
            ..AssetsConfig::default()
        }).unwrap()
    }

    #[test]
    fn keys_resolve_into_per_tag_directories() {
        let backend = backend();
        assert_eq!(
            backend.resolve(&ResourceKey::of::<Texture>("ui/icon.png")),
            Some(PathBuf::from("/game/textures/ui/icon.png")),
        );
        assert_eq!(
            backend.resolve(&ResourceKey::of::<ShaderSource>("lit.frag")),
            Some(PathBuf::from("/game/shaders/lit.frag")),
        );
        assert_eq!(backend.resolve(&ResourceKey::new("x", TypeTag::new("Sound"))), None);
    }

    #[test]
    fn paths_outside_the_root_do_not_resolve() {
        let backend = backend();
        for path in ["/etc/passwd", "../../x", "ui/../../x", "", "."] {
            assert_eq!(backend.resolve(&ResourceKey::of::<Blob>(path)), None, "{}", path);
        }
        assert_eq!(
            backend.resolve(&ResourceKey::of::<Blob>("./level.bin")),
            Some(PathBuf::from("/game/blobs/level.bin")),
        );
    }

    #[test]
    fn tags_are_looked_up_by_name() {
        assert_eq!(FileBackend::tag_named("texture"), Some(Texture::TAG));
        assert_eq!(FileBackend::tag_named("Blob"), Some(Blob::TAG));
        assert_eq!(FileBackend::tag_named("Sound"), None);
    }

    #[test]
    fn unknown_tags_are_not_found() {
        let mut backend = backend();
        let key = ResourceKey::new("x", TypeTag::new("Sound"));
        assert_eq!(backend.load_sync(&key).unwrap_err(), LoadError::NotFound(key));
    }

    #[test]
    fn released_assets_wait_for_outside_handles() {
        let mut backend = backend();
        let key = ResourceKey::of::<Blob>("b");
        let asset = Asset::new(Blob(vec![1, 2, 3]));
        let outside = asset.clone();

        backend.release(&key, asset);
        assert_eq!(backend.retired(), 1);
        assert_eq!(backend.release_unused(), 0);

        drop(outside);
        assert_eq!(backend.release_unused(), 1);
        assert_eq!(backend.retired(), 0);

        backend.release(&key, Asset::new(Blob(vec![])));
        assert_eq!(backend.retired(), 0);
    }
}
