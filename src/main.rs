use anyhow::{Context, Result};
use clap::Parser;
use ogpng::{AssetCache, DiskCache, Element, EmojiSource, MemoryCache, RenderOptions, RendererConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Render an Open Graph preview PNG from a JSON element tree
#[derive(Parser, Debug)]
#[command(name = "ogpng", version, about)]
struct Args {
    /// JSON file holding the element tree
    #[arg(short, long)]
    input: PathBuf,

    /// Output PNG path
    #[arg(short, long, default_value = "og.png")]
    output: PathBuf,

    /// Font family to fetch (repeatable, in priority order)
    #[arg(long = "font")]
    fonts: Vec<String>,

    /// Emoji source: `twemoji`, `openmoji` or a URL prefix (repeatable)
    #[arg(long = "emoji")]
    emojis: Vec<String>,

    /// Query custom emoji URL prefixes with lowercase codes
    #[arg(long)]
    emoji_lowercase: bool,

    #[arg(long, default_value_t = 1200.0)]
    width: f32,

    #[arg(long)]
    height: Option<f32>,

    #[arg(long)]
    scale: Option<f32>,

    /// Persist downloaded assets here instead of in memory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Directory searched first for engine backend modules
    #[arg(long)]
    module_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,
}

fn emoji_source(name: &str, lowercase: bool) -> EmojiSource {
    match name {
        "twemoji" => EmojiSource::twemoji(),
        "openmoji" => EmojiSource::openmoji(),
        url if lowercase => EmojiSource::new(url).lowercase(),
        url => EmojiSource::new(url),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let json = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let element: Element = serde_json::from_str(&json)
        .with_context(|| format!("parsing element tree in {}", args.input.display()))?;

    let cache: Arc<dyn AssetCache> = match &args.cache_dir {
        Some(dir) => Arc::new(DiskCache::new(dir)?),
        None => Arc::new(MemoryCache::new()),
    };

    let mut config = RendererConfig {
        timeout_ms: args.timeout_ms,
        ..Default::default()
    };
    if let Some(dir) = args.module_dir {
        config.module_dir = dir;
    }
    let renderer = ogpng::new_renderer(config)?;

    let mut options = RenderOptions::new(args.width, cache);
    for family in &args.fonts {
        options = options.font(family.as_str());
    }
    if !args.emojis.is_empty() {
        options = options.emojis(
            args.emojis
                .iter()
                .map(|s| emoji_source(s, args.emoji_lowercase))
                .collect(),
        );
    }
    options.height = args.height;
    options.scale = args.scale;

    let png = renderer.render(&element, &options)?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("writing {}", args.output.display()))?;
    log::info!("wrote {} bytes to {}", png.len(), args.output.display());
    Ok(())
}
