//! Layout and raster engine seams.
//!
//! The renderer drives two engines: a layout engine turning an element tree
//! plus font binaries into SVG, and a rasterizer turning SVG into PNG. Both
//! may need a binary backend module loaded once before first use; those
//! modules are read from disk by [`ModuleLoader`].

#[cfg(feature = "svg")]
pub mod layout;
pub mod paint;
#[cfg(feature = "svg")]
pub mod raster;

use crate::element::Element;
use crate::emoji::AssetLoader;
use crate::font::ResolvedFont;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Inputs for one layout call.
pub struct LayoutOptions<'a> {
    pub width: f32,
    pub height: Option<f32>,
    pub fonts: &'a [ResolvedFont],
    /// Present only when the caller configured emoji sources
    pub load_additional_asset: Option<&'a AssetLoader<'a>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RasterOptions {
    pub scale: Option<f32>,
}

/// Turns an element tree into an SVG document.
pub trait LayoutEngine: Send + Sync {
    /// File name of the backend module to load before the first layout.
    fn backend_module(&self) -> Option<&str> {
        None
    }

    /// Receive the backend module bytes. Called at most once per renderer.
    fn initialize(&self, _module: &[u8]) -> Result<()> {
        Ok(())
    }

    fn layout(&self, element: &Element, options: &LayoutOptions<'_>) -> Result<String>;
}

/// Turns an SVG document into PNG bytes.
pub trait Rasterizer: Send + Sync {
    fn backend_module(&self) -> Option<&str> {
        None
    }

    fn initialize(&self, _module: &[u8]) -> Result<()> {
        Ok(())
    }

    fn rasterize(&self, svg: &str, options: &RasterOptions) -> Result<Vec<u8>>;
}

/// Reads backend modules from a primary directory, then a fallback one.
///
/// Two locations let the same build run from a source checkout and from
/// an installed layout where assets sit one level higher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLoader {
    primary: PathBuf,
    fallback: PathBuf,
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new("assets/modules", "../assets/modules")
    }
}

impl ModuleLoader {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn fallback(&self) -> &Path {
        &self.fallback
    }

    /// Read `name` from the primary directory, falling back on any error.
    pub fn load(&self, name: &str) -> Result<Vec<u8>> {
        let first = self.primary.join(name);
        match std::fs::read(&first) {
            Ok(bytes) => Ok(bytes),
            Err(primary_err) => {
                let second = self.fallback.join(name);
                log::debug!(
                    "module {} not readable at {} ({}); trying {}",
                    name,
                    first.display(),
                    primary_err,
                    second.display()
                );
                std::fs::read(&second).map_err(|e| {
                    Error::LoadError(format!(
                        "module {} not found at {} ({}) or {} ({})",
                        name,
                        first.display(),
                        primary_err,
                        second.display(),
                        e
                    ))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_prefers_primary() {
        let primary = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        std::fs::write(primary.path().join("yoga.bin"), b"primary").unwrap();
        std::fs::write(fallback.path().join("yoga.bin"), b"fallback").unwrap();
        let loader = ModuleLoader::new(primary.path(), fallback.path());
        assert_eq!(loader.load("yoga.bin").unwrap(), b"primary".to_vec());
    }

    #[test]
    fn loader_uses_fallback_when_primary_missing() {
        let primary = tempfile::tempdir().unwrap();
        let fallback = tempfile::tempdir().unwrap();
        std::fs::write(fallback.path().join("raster.bin"), b"fallback").unwrap();
        let loader = ModuleLoader::new(primary.path(), fallback.path());
        assert_eq!(loader.load("raster.bin").unwrap(), b"fallback".to_vec());
    }

    #[test]
    fn loader_reports_both_paths_when_missing() {
        let loader = ModuleLoader::new("/nonexistent/a", "/nonexistent/b");
        let err = loader.load("m.bin").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/a"));
        assert!(msg.contains("/nonexistent/b"));
    }
}
