//! ogpng
//!
//! Renders Open Graph preview images (PNG) from a declarative element tree.
//! The heavy lifting is split between a layout engine (element tree to SVG)
//! and a rasterizer (SVG to PNG); this crate feeds them web fonts and emoji
//! glyphs fetched from remote directories, caching every download so
//! repeated renders stay off the network.
//!
//! # Features
//!
//! - **http** (default): blocking `reqwest` fetcher for fonts and emoji
//! - **svg** (default): block layout prototype and `resvg` rasterizer
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ogpng::{Element, EmojiSource, MemoryCache, RenderOptions, RendererConfig, Style};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let renderer = ogpng::new_renderer(RendererConfig::default())?;
//! let cache = Arc::new(MemoryCache::new());
//!
//! let card = Element::container(vec![
//!     Element::text("Hello, world \u{1f44b}").with_style(Style::default().font_size(72.0)),
//! ])
//! .with_style(Style::default().background("#ffffff").padding(64.0));
//!
//! let options = RenderOptions::new(1200.0, cache)
//!     .height(630.0)
//!     .font("Roboto")
//!     .emojis(vec![EmojiSource::twemoji()]);
//!
//! let png = renderer.render(&card, &options)?;
//! std::fs::write("og.png", png)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod cache;
pub mod element;
pub mod emoji;
pub mod fetch;
pub mod font;
pub mod renderer;

// Layout/raster seams and the built-in engines
pub mod rendering;

// Async facade over a worker-owned renderer
pub mod async_api;

pub use async_api::AsyncRenderer;
pub use cache::{AssetCache, DiskCache, MemoryCache};
pub use element::{Element, Style};
pub use emoji::{AdditionalAsset, EmojiSource};
pub use fetch::{FetchResponse, Fetcher, StaticFetcher};
pub use font::{FontRequest, FontStyle, FontWeight, ResolvedFont};
pub use renderer::{EngineState, OgpRenderer, RenderOptions, RendererConfig};
pub use rendering::{LayoutEngine, LayoutOptions, ModuleLoader, RasterOptions, Rasterizer};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;

/// Create a renderer with the default fetcher and engines.
#[cfg(all(feature = "http", feature = "svg"))]
pub fn new_renderer(config: RendererConfig) -> Result<OgpRenderer> {
    OgpRenderer::new(config)
}
