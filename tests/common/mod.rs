//! Recording engine doubles shared by the integration tests.
#![allow(dead_code)]

use ogpng::emoji::EMOJI_ASSET;
use ogpng::{
    AdditionalAsset, Element, Error, LayoutEngine, LayoutOptions, RasterOptions, Rasterizer, Result,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
pub const SMILE: &str = "\u{1f600}";

/// What a layout call observed.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutCall {
    pub fonts: Vec<String>,
    pub width: f32,
    pub height: Option<f32>,
    /// Loader answer for `SMILE`, when a loader was supplied
    pub emoji: Option<AdditionalAsset>,
}

#[derive(Default)]
pub struct LayoutLog {
    pub inits: AtomicUsize,
    pub calls: Mutex<Vec<LayoutCall>>,
}

impl LayoutLog {
    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<LayoutCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Layout double that asks the loader for `SMILE` and returns a fixed SVG.
pub struct RecordingLayout {
    pub module: Option<String>,
    pub fail_with: Option<String>,
    pub log: Arc<LayoutLog>,
}

impl RecordingLayout {
    pub fn new() -> (Self, Arc<LayoutLog>) {
        let log = Arc::new(LayoutLog::default());
        (
            Self {
                module: None,
                fail_with: None,
                log: Arc::clone(&log),
            },
            log,
        )
    }

    pub fn with_module(mut self, name: &str) -> Self {
        self.module = Some(name.to_string());
        self
    }

    pub fn failing(mut self, msg: &str) -> Self {
        self.fail_with = Some(msg.to_string());
        self
    }
}

impl LayoutEngine for RecordingLayout {
    fn backend_module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    fn initialize(&self, module: &[u8]) -> Result<()> {
        assert!(!module.is_empty());
        self.log.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn layout(&self, _element: &Element, options: &LayoutOptions<'_>) -> Result<String> {
        if let Some(msg) = &self.fail_with {
            return Err(Error::LayoutError(msg.clone()));
        }
        let emoji = options.load_additional_asset.map(|load| {
            assert_eq!(load("ja-JP", "\u{3042}"), AdditionalAsset::None);
            load(EMOJI_ASSET, SMILE)
        });
        self.log.calls.lock().unwrap().push(LayoutCall {
            fonts: options.fonts.iter().map(|f| f.name.clone()).collect(),
            width: options.width,
            height: options.height,
            emoji,
        });
        Ok(format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}"/>"#,
            options.width,
            options.height.unwrap_or(1.0)
        ))
    }
}

#[derive(Default)]
pub struct RasterLog {
    pub calls: Mutex<Vec<(String, Option<f32>)>>,
}

/// Rasterizer double: PNG magic followed by the SVG text.
pub struct RecordingRaster {
    pub log: Arc<RasterLog>,
}

impl RecordingRaster {
    pub fn new() -> (Self, Arc<RasterLog>) {
        let log = Arc::new(RasterLog::default());
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Rasterizer for RecordingRaster {
    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((svg.to_string(), options.scale));
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(svg.as_bytes());
        Ok(png)
    }
}
