
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use clap::Parser;

use tbs_assets::{AssetCache, AssetsConfig, FileBackend, LoadResult, ResourceCache, ResourceKey};


#[derive(Debug, Parser)]
#[command(version, about = "Loads assets through the resource cache, one frame at a time")]
struct CliArgs {
    /// TOML file with backend settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured asset root
    #[arg(long)]
    root: Option<PathBuf>,

    #[arg(long)]
    threads: Option<usize>,

    /// Load everything synchronously up front
    #[arg(long, default_value_t = false)]
    sync: bool,

    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    #[arg(long, default_value_t = 600)]
    max_frames: u32,

    /// Requests as Tag:path, e.g. Texture:ui/icon.png
    #[arg(required = true)]
    requests: Vec<String>,
}


fn parse_request(request: &str) -> anyhow::Result<ResourceKey> {
    let (tag, path) = request
        .split_once(':')
        .ok_or_else(|| anyhow!("expected Tag:path, got `{}`", request))?;

    let tag = FileBackend::tag_named(tag).ok_or_else(|| {
        let known: Vec<_> = FileBackend::TAGS.iter().map(|tag| tag.name()).collect();
        anyhow!("unknown tag `{}`, expected one of {}", tag, known.join(", "))
    })?;

    Ok(ResourceKey::new(path, tag))
}


fn preload<C>(cache: &mut C, keys: &[ResourceKey]) -> usize
where
    C: AssetCache<AssetName=ResourceKey, AssetRef=LoadResult>,
{
    keys.iter()
        .filter(|key| match cache.load((*key).clone()) {
            Ok(asset) => {
                log::info!("{} ready ({})", key, asset.tag());
                true
            },
            Err(e) => {
                log::error!("{}", e);
                false
            },
        })
        .count()
}


fn run_frames(cache: &mut ResourceCache<FileBackend>, keys: &[ResourceKey], args: &CliArgs) -> anyhow::Result<usize> {
    let loaded = Rc::new(Cell::new(0));

    for key in keys {
        let loaded = loaded.clone();
        let name = key.to_string();
        cache.get_async(key, move |result| match result {
            Ok(asset) => {
                log::info!("{} ready ({})", name, asset.tag());
                loaded.set(loaded.get() + 1);
            },
            Err(e) => log::error!("{}", e),
        });
    }

    let frame = Duration::from_millis(args.frame_ms);
    let mut frames = 0;

    while cache.pending_loads() > 0 {
        if frames == args.max_frames {
            anyhow::bail!("{} loads still pending after {} frames", cache.pending_loads(), frames);
        }

        std::thread::sleep(frame);
        cache.update();
        frames += 1;
    }

    log::info!("settled after {} frames", frames);
    Ok(loaded.get())
}


fn main() -> anyhow::Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => AssetsConfig::from_toml_file(path)?,
        None => AssetsConfig::default(),
    };
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if let Some(threads) = args.threads {
        config.worker_threads = threads;
    }

    let keys = args.requests
        .iter()
        .map(|request| parse_request(request))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut cache = ResourceCache::new(FileBackend::new(config)?);

    let start = Instant::now();
    let loaded = if args.sync {
        preload(&mut cache, &keys)
    } else {
        run_frames(&mut cache, &keys, &args)?
    };
    log::info!("{}/{} requests loaded in {:?}, {} cached entries",
        loaded, keys.len(), start.elapsed(), cache.len());

    AssetCache::clear(&mut cache);
    cache.unload_unused(|freed| log::info!("freed {} unused assets", freed));
    cache.update();

    Ok(())
}
