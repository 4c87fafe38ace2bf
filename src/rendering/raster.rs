/// `resvg` rasterizer: SVG text in, PNG bytes out

use crate::rendering::{RasterOptions, Rasterizer};
use crate::{Error, Result};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use std::sync::{Arc, RwLock};

pub struct ResvgRasterizer {
    fallback_font: Option<String>,
    fontdb: RwLock<Arc<usvg::fontdb::Database>>,
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResvgRasterizer {
    pub fn new() -> Self {
        Self {
            fallback_font: None,
            fontdb: RwLock::new(Arc::new(usvg::fontdb::Database::new())),
        }
    }

    /// Load the font module `name` at initialization and use it for any text
    /// still present in the SVG.
    pub fn with_fallback_font(name: impl Into<String>) -> Self {
        Self {
            fallback_font: Some(name.into()),
            ..Self::new()
        }
    }

    fn fonts(&self) -> Result<Arc<usvg::fontdb::Database>> {
        self.fontdb
            .read()
            .map(|db| Arc::clone(&*db))
            .map_err(|e| Error::RasterError(format!("font database poisoned: {}", e)))
    }
}

impl Rasterizer for ResvgRasterizer {
    fn backend_module(&self) -> Option<&str> {
        self.fallback_font.as_deref()
    }

    fn initialize(&self, module: &[u8]) -> Result<()> {
        let mut db = usvg::fontdb::Database::new();
        db.load_font_data(module.to_vec());
        if db.len() == 0 {
            return Err(Error::InitializationError(
                "fallback font module contains no usable faces".into(),
            ));
        }
        let mut slot = self
            .fontdb
            .write()
            .map_err(|e| Error::InitializationError(format!("font database poisoned: {}", e)))?;
        *slot = Arc::new(db);
        Ok(())
    }

    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>> {
        let scale = options.scale.unwrap_or(1.0);
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(Error::RasterError(format!("invalid scale {}", scale)));
        }

        let mut opt = usvg::Options::default();
        opt.fontdb = self.fonts()?;
        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| Error::RasterError(format!("invalid SVG: {}", e)))?;

        let size = tree.size();
        let width = (size.width() * scale).ceil() as u32;
        let height = (size.height() * scale).ceil() as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::RasterError(format!("cannot allocate {}x{} pixmap", width, height))
        })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
        pixmap
            .encode_png()
            .map_err(|e| Error::RasterError(format!("PNG encoding failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10" fill="#f00"/></svg>"##;

    fn dimensions(png: &[u8]) -> (u32, u32) {
        let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        (w, h)
    }

    #[test]
    fn rasterize_emits_png() {
        let png = ResvgRasterizer::new()
            .rasterize(SQUARE, &RasterOptions::default())
            .unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
        assert_eq!(dimensions(&png), (20, 10));
    }

    #[test]
    fn rasterize_applies_scale() {
        let png = ResvgRasterizer::new()
            .rasterize(SQUARE, &RasterOptions { scale: Some(2.0) })
            .unwrap();
        assert_eq!(dimensions(&png), (40, 20));
    }

    #[test]
    fn rasterize_rejects_garbage() {
        let err = ResvgRasterizer::new()
            .rasterize("not svg", &RasterOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::RasterError(_)));
    }

    #[test]
    fn fallback_font_module_must_contain_faces() {
        let r = ResvgRasterizer::with_fallback_font("fallback.ttf");
        assert_eq!(r.backend_module(), Some("fallback.ttf"));
        assert!(r.initialize(b"not a font").is_err());
    }
}
