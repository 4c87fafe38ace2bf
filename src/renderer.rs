//! Render orchestration: engine initialization, asset resolution, layout and
//! rasterization.

use crate::cache::AssetCache;
use crate::element::Element;
use crate::emoji::{EmojiResolver, EmojiSource};
use crate::fetch::Fetcher;
use crate::font::{FontRequest, FontResolver};
use crate::rendering::{LayoutEngine, LayoutOptions, ModuleLoader, RasterOptions, Rasterizer};
use crate::{Error, Result};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};

/// Configuration for a renderer
///
/// The default user agent does not look like a browser, so the
/// font directory answers with truetype sources instead of WOFF2.
///
/// # Examples
///
/// ```
/// let cfg = ogpng::RendererConfig::default();
/// assert!(cfg.user_agent.starts_with("ogpng"));
/// ```
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// User agent sent with font and emoji requests
    pub user_agent: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Directory searched first for engine backend modules
    pub module_dir: PathBuf,
    /// Directory searched when the module is missing from `module_dir`
    pub fallback_module_dir: PathBuf,
    /// Font module the rasterizer loads for text left in the SVG
    pub fallback_font: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        let modules = ModuleLoader::default();
        Self {
            user_agent: concat!("ogpng/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 30000,
            module_dir: modules.primary().to_path_buf(),
            fallback_module_dir: modules.fallback().to_path_buf(),
            fallback_font: None,
        }
    }
}

impl RendererConfig {
    pub fn module_loader(&self) -> ModuleLoader {
        ModuleLoader::new(&self.module_dir, &self.fallback_module_dir)
    }
}

/// Per-call render inputs besides the element tree.
#[derive(Clone)]
pub struct RenderOptions {
    pub cache: Arc<dyn AssetCache>,
    pub fonts: Vec<FontRequest>,
    /// Emoji sources in priority order; `None` disables emoji replacement
    pub emojis: Option<Vec<EmojiSource>>,
    pub width: f32,
    pub height: Option<f32>,
    pub scale: Option<f32>,
}

impl RenderOptions {
    pub fn new(width: f32, cache: Arc<dyn AssetCache>) -> Self {
        Self {
            cache,
            fonts: Vec::new(),
            emojis: None,
            width,
            height: None,
            scale: None,
        }
    }

    pub fn height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn font(mut self, font: impl Into<FontRequest>) -> Self {
        self.fonts.push(font.into());
        self
    }

    pub fn emojis(mut self, sources: Vec<EmojiSource>) -> Self {
        self.emojis = Some(sources);
        self
    }

    /// Check that every dimension is positive and finite.
    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v > 0.0 && v.is_finite();
        if !positive(self.width) {
            return Err(Error::ConfigError(format!("width must be > 0, got {}", self.width)));
        }
        if let Some(h) = self.height.filter(|h| !positive(*h)) {
            return Err(Error::ConfigError(format!("height must be > 0, got {}", h)));
        }
        if let Some(s) = self.scale.filter(|s| !positive(*s)) {
            return Err(Error::ConfigError(format!("scale must be > 0, got {}", s)));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOptions")
            .field("fonts", &self.fonts)
            .field("emojis", &self.emojis)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InitState {
    Uninitialized,
    InProgress,
    Ready,
    Failed(String),
}

/// Once-only engine initialization shared by every caller of a renderer.
///
/// The first caller runs the initializer; callers arriving while it runs
/// wait for its outcome instead of starting their own. A failure is
/// remembered and reported to every later caller; it is not retried.
#[derive(Debug)]
pub struct EngineState {
    state: Mutex<InitState>,
    settled: Condvar,
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InitState::Uninitialized),
            settled: Condvar::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .map(|s| *s == InitState::Ready)
            .unwrap_or(false)
    }

    /// Run `init` unless it already ran (or is running) for this state.
    pub fn ensure<F>(&self, init: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let poisoned = |e: String| Error::InitializationError(format!("init state poisoned: {}", e));
        let mut state = self.state.lock().map_err(|e| poisoned(e.to_string()))?;
        loop {
            match &*state {
                InitState::Ready => return Ok(()),
                InitState::Failed(msg) => return Err(Error::InitializationError(msg.clone())),
                InitState::Uninitialized => break,
                InitState::InProgress => {}
            }
            state = self
                .settled
                .wait(state)
                .map_err(|e| poisoned(e.to_string()))?;
        }
        *state = InitState::InProgress;
        drop(state);

        let mut guard = UnwindGuard {
            owner: self,
            armed: true,
        };
        let result = init();
        guard.armed = false;

        let mut state = self.state.lock().map_err(|e| poisoned(e.to_string()))?;
        *state = match &result {
            Ok(()) => InitState::Ready,
            Err(Error::InitializationError(msg)) => InitState::Failed(msg.clone()),
            Err(other) => InitState::Failed(other.to_string()),
        };
        self.settled.notify_all();
        match result {
            Ok(()) => Ok(()),
            Err(Error::InitializationError(msg)) => Err(Error::InitializationError(msg)),
            Err(other) => Err(Error::InitializationError(other.to_string())),
        }
    }
}

/// Settles the state as failed if the initializer unwinds, so waiters wake.
struct UnwindGuard<'a> {
    owner: &'a EngineState,
    armed: bool,
}

impl Drop for UnwindGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.owner.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = InitState::Failed("initializer panicked".to_string());
        self.owner.settled.notify_all();
    }
}

/// Renders element trees to PNG.
///
/// Holds the fetcher, both engines and their initialization state. Build
/// one per process (or per engine configuration) and share it; it is
/// `Send + Sync`.
pub struct OgpRenderer {
    fetcher: Arc<dyn Fetcher>,
    layout: Box<dyn LayoutEngine>,
    rasterizer: Box<dyn Rasterizer>,
    modules: ModuleLoader,
    state: EngineState,
}

impl OgpRenderer {
    /// Renderer with the HTTP fetcher, block layout and `resvg` rasterizer.
    #[cfg(all(feature = "http", feature = "svg"))]
    pub fn new(config: RendererConfig) -> Result<Self> {
        use crate::fetch::HttpFetcher;
        use crate::rendering::layout::BlockLayout;
        use crate::rendering::raster::ResvgRasterizer;

        let fetcher = HttpFetcher::new(&config.user_agent, config.timeout_ms)?;
        let rasterizer = match &config.fallback_font {
            Some(name) => ResvgRasterizer::with_fallback_font(name.clone()),
            None => ResvgRasterizer::new(),
        };
        Ok(Self::with_engines(
            Arc::new(fetcher),
            Box::new(BlockLayout::new()),
            Box::new(rasterizer),
            config.module_loader(),
        ))
    }

    pub fn with_engines(
        fetcher: Arc<dyn Fetcher>,
        layout: Box<dyn LayoutEngine>,
        rasterizer: Box<dyn Rasterizer>,
        modules: ModuleLoader,
    ) -> Self {
        Self {
            fetcher,
            layout,
            rasterizer,
            modules,
            state: EngineState::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_ready()
    }

    /// Load backend modules and initialize both engines, once.
    pub fn initialize(&self) -> Result<()> {
        self.state.ensure(|| {
            log::info!("initializing layout and raster engines");
            if let Some(name) = self.layout.backend_module() {
                let module = self.modules.load(name).map_err(|e| {
                    Error::InitializationError(format!("layout backend: {}", e))
                })?;
                self.layout.initialize(&module)?;
            }
            if let Some(name) = self.rasterizer.backend_module() {
                let module = self.modules.load(name).map_err(|e| {
                    Error::InitializationError(format!("raster backend: {}", e))
                })?;
                self.rasterizer.initialize(&module)?;
            }
            log::info!("engines ready");
            Ok(())
        })
    }

    /// Render `element` to PNG bytes.
    ///
    /// Fonts that cannot be resolved are skipped and emoji that cannot be
    /// resolved stay text. Initialization, layout and raster errors are
    /// returned as is.
    pub fn render(&self, element: &Element, options: &RenderOptions) -> Result<Vec<u8>> {
        options.validate()?;
        self.initialize()?;

        let cache = options.cache.as_ref();
        let fetcher = self.fetcher.as_ref();

        let fonts = FontResolver::new(cache, fetcher).resolve_fonts(&options.fonts);
        log::debug!("resolved {} of {} fonts", fonts.len(), options.fonts.len());

        let svg = match &options.emojis {
            Some(sources) => {
                let resolver = EmojiResolver::new(cache, fetcher, sources);
                let loader = |kind: &str, segment: &str| resolver.load_additional_asset(kind, segment);
                self.layout.layout(
                    element,
                    &LayoutOptions {
                        width: options.width,
                        height: options.height,
                        fonts: &fonts,
                        load_additional_asset: Some(&loader),
                    },
                )?
            }
            None => self.layout.layout(
                element,
                &LayoutOptions {
                    width: options.width,
                    height: options.height,
                    fonts: &fonts,
                    load_additional_asset: None,
                },
            )?,
        };

        self.rasterizer.rasterize(
            &svg,
            &RasterOptions {
                scale: options.scale,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn options_validation() {
        let cache: Arc<dyn AssetCache> = Arc::new(MemoryCache::new());
        assert!(RenderOptions::new(1200.0, cache.clone()).validate().is_ok());
        assert!(RenderOptions::new(0.0, cache.clone()).validate().is_err());
        assert!(RenderOptions::new(1200.0, cache.clone())
            .height(-1.0)
            .validate()
            .is_err());
        assert!(RenderOptions::new(1200.0, cache)
            .scale(f32::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn engine_state_runs_init_once() {
        let state = EngineState::new();
        let runs = AtomicUsize::new(0);
        for _ in 0..3 {
            state
                .ensure(|| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(state.is_ready());
    }

    #[test]
    fn engine_state_remembers_failure() {
        let state = EngineState::new();
        let runs = AtomicUsize::new(0);
        let attempt = || {
            state.ensure(|| {
                runs.fetch_add(1, Ordering::SeqCst);
                Err(Error::InitializationError("no backend".into()))
            })
        };
        assert!(matches!(attempt(), Err(Error::InitializationError(m)) if m == "no backend"));
        assert!(matches!(attempt(), Err(Error::InitializationError(m)) if m == "no backend"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!state.is_ready());
    }

    #[test]
    fn engine_state_shares_in_flight_init() {
        let state = Arc::new(EngineState::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(std::sync::Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = Arc::clone(&state);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    state.ensure(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(50));
                        Ok(())
                    })
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn engine_state_fails_after_panicking_init() {
        let state = Arc::new(EngineState::new());

        let first = Arc::clone(&state);
        let panicked = std::thread::spawn(move || {
            let _ = first.ensure(|| panic!("backend blew up"));
        })
        .join();
        assert!(panicked.is_err());

        let (tx, rx) = std::sync::mpsc::channel();
        let second = Arc::clone(&state);
        std::thread::spawn(move || {
            let _ = tx.send(second.ensure(|| Ok(())));
        });
        let result = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("ensure blocked after a panicking initializer");
        assert!(matches!(result, Err(Error::InitializationError(m)) if m == "initializer panicked"));
        assert!(!state.is_ready());
    }
}
