//! Emoji glyph resolution.
//!
//! Emoji graphemes are replaced by SVG images pulled from one or more
//! directories that name files by codepoint (`1f468-200d-1f4bb.svg`). The
//! first source that answers wins; when none do, the text is kept as is.

use crate::cache::AssetCache;
use crate::fetch::Fetcher;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// Asset kind tag the layout engine uses for emoji graphemes.
pub const EMOJI_ASSET: &str = "emoji";

const ZWJ: u32 = 0x200d;
const VARIATION_SELECTOR_16: u32 = 0xfe0f;

/// A directory of per-emoji SVG files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiSource {
    /// Prefix the lookup code and `.svg` are appended to
    pub url: String,
    /// Uppercase the code (the default) or lowercase it when `Some(false)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<bool>,
}

impl EmojiSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            upper: None,
        }
    }

    /// Query this source with lowercase codes.
    pub fn lowercase(mut self) -> Self {
        self.upper = Some(false);
        self
    }

    /// Twemoji 14 via jsDelivr.
    pub fn twemoji() -> Self {
        Self::new("https://cdn.jsdelivr.net/gh/twitter/twemoji@14.0.2/assets/svg/").lowercase()
    }

    /// OpenMoji via jsDelivr.
    pub fn openmoji() -> Self {
        Self::new("https://cdn.jsdelivr.net/npm/openmoji@15.0.0/color/svg/")
    }

    /// Full URL of the SVG for `code`.
    pub fn lookup_url(&self, code: &str) -> String {
        let code = if self.upper == Some(false) {
            code.to_lowercase()
        } else {
            code.to_uppercase()
        };
        format!("{}{}.svg", self.url, code)
    }
}

/// What the layout engine should put in place of a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdditionalAsset {
    /// Draw this image URI instead of the text
    DataUri(String),
    /// Draw this text (the input segment when lookup failed)
    Text(String),
    /// No substitution
    None,
}

/// Callback the layout engine invokes with `(kind, segment)`.
pub type AssetLoader<'a> = dyn Fn(&str, &str) -> AdditionalAsset + 'a;

/// Lookup code for a grapheme: hex codepoints joined by `-`.
///
/// U+FE0F is dropped unless the grapheme is a ZWJ sequence, which is how
/// emoji directories name their files.
pub fn emoji_code(segment: &str) -> String {
    let codes: Vec<u32> = segment.chars().map(u32::from).collect();
    let is_zwj_sequence = codes.contains(&ZWJ);
    codes
        .iter()
        .filter(|&&c| is_zwj_sequence || c != VARIATION_SELECTOR_16)
        .map(|c| format!("{:x}", c))
        .collect::<Vec<_>>()
        .join("-")
}

/// Heuristic emoji test for a single grapheme cluster.
pub fn is_emoji(grapheme: &str) -> bool {
    grapheme.chars().any(|c| {
        let c = u32::from(c);
        matches!(
            c,
            0x1f000..=0x1faff // pictographs, emoticons, symbols, flags
                | 0x2600..=0x27bf // misc symbols and dingbats
                | 0x2300..=0x23ff
                | 0x2b05..=0x2b55
                | 0x00a9 | 0x00ae // copyright, registered
                | 0x203c | 0x2049 | 0x2122 | 0x2139 | 0x24c2
                | 0x2194..=0x2199 | 0x21a9 | 0x21aa // arrows
                | 0x25aa | 0x25ab | 0x25b6 | 0x25c0 | 0x25fb..=0x25fe
                | 0x2934 | 0x2935
                | 0x3030 | 0x303d | 0x3297 | 0x3299
                | 0x20e3 // keycap
                | 0xfe0f
        )
    })
}

/// Resolves emoji graphemes against an ordered list of sources.
///
/// Only successful responses are cached; misses are not. A warm cache
/// therefore avoids the network only for graphemes whose first source
/// answered. When a later source wins, every earlier source is asked again
/// on each render.
pub struct EmojiResolver<'a> {
    cache: &'a dyn AssetCache,
    fetcher: &'a dyn Fetcher,
    sources: &'a [EmojiSource],
}

impl<'a> EmojiResolver<'a> {
    pub fn new(
        cache: &'a dyn AssetCache,
        fetcher: &'a dyn Fetcher,
        sources: &'a [EmojiSource],
    ) -> Self {
        Self {
            cache,
            fetcher,
            sources,
        }
    }

    /// SVG text for `segment` from the first source that has it.
    pub fn resolve_emoji(&self, segment: &str) -> Option<String> {
        let code = emoji_code(segment);
        self.sources.iter().find_map(|source| {
            let url = source.lookup_url(&code);
            self.fetch_svg(&url)
        })
    }

    /// Asset-loader entry point handed to the layout engine.
    pub fn load_additional_asset(&self, kind: &str, segment: &str) -> AdditionalAsset {
        if kind != EMOJI_ASSET {
            return AdditionalAsset::None;
        }
        match self.resolve_emoji(segment) {
            Some(svg) => AdditionalAsset::DataUri(format!(
                "data:image/svg+xml;base64,{}",
                STANDARD.encode(svg)
            )),
            None => AdditionalAsset::Text(segment.to_string()),
        }
    }

    fn fetch_svg(&self, url: &str) -> Option<String> {
        if let Some(cached) = self.cache.lookup(url) {
            log::debug!("emoji cache hit for {}", url);
            return Some(String::from_utf8_lossy(&cached).into_owned());
        }
        let resp = match self.fetcher.fetch(url) {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("emoji fetch failed for {}: {}", url, e);
                return None;
            }
        };
        if !resp.is_success() {
            log::debug!("emoji source {} answered {}", url, resp.status);
            return None;
        }
        let svg = resp.text();
        if let Err(e) = self.cache.put(url, resp.body) {
            log::warn!("could not cache emoji {}: {}", url, e);
        }
        Some(svg)
    }
}
