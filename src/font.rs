//! Web font resolution.
//!
//! A family name is turned into a stylesheet query against the Google Fonts
//! CSS API, the first opentype/truetype `src` is pulled out of the returned
//! CSS and the binary behind it is downloaded. Binaries are cached under the
//! *stylesheet* URL, so a warm cache skips both requests.

use crate::cache::AssetCache;
use crate::fetch::Fetcher;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Base of the stylesheet query; the encoded family is appended.
pub const STYLESHEET_ENDPOINT: &str = "https://fonts.googleapis.com/css2?family=";

// Characters JavaScript's `encodeURI` leaves untouched.
const ENCODE_URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

static FONT_SRC: OnceLock<Regex> = OnceLock::new();

fn font_src_pattern() -> &'static Regex {
    FONT_SRC.get_or_init(|| {
        Regex::new(r"src: url\((.+)\) format\('(opentype|truetype)'\)")
            .expect("font src pattern is valid")
    })
}

/// Font weight, 100 through 900 in steps of 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum FontWeight {
    W100,
    W200,
    W300,
    #[default]
    W400,
    W500,
    W600,
    W700,
    W800,
    W900,
}

impl FontWeight {
    pub fn value(self) -> u16 {
        match self {
            FontWeight::W100 => 100,
            FontWeight::W200 => 200,
            FontWeight::W300 => 300,
            FontWeight::W400 => 400,
            FontWeight::W500 => 500,
            FontWeight::W600 => 600,
            FontWeight::W700 => 700,
            FontWeight::W800 => 800,
            FontWeight::W900 => 900,
        }
    }
}

impl TryFrom<u16> for FontWeight {
    type Error = String;

    fn try_from(v: u16) -> Result<Self, Self::Error> {
        Ok(match v {
            100 => FontWeight::W100,
            200 => FontWeight::W200,
            300 => FontWeight::W300,
            400 => FontWeight::W400,
            500 => FontWeight::W500,
            600 => FontWeight::W600,
            700 => FontWeight::W700,
            800 => FontWeight::W800,
            900 => FontWeight::W900,
            other => return Err(format!("unsupported font weight {}", other)),
        })
    }
}

impl From<FontWeight> for u16 {
    fn from(w: FontWeight) -> u16 {
        w.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// A font the caller wants available to the layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRequest {
    pub family: String,
    #[serde(default)]
    pub weight: FontWeight,
    #[serde(default)]
    pub style: FontStyle,
    #[serde(default)]
    pub lang: Option<String>,
}

impl FontRequest {
    pub fn new(family: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            weight: FontWeight::default(),
            style: FontStyle::default(),
            lang: None,
        }
    }

    pub fn weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    pub fn italic(mut self) -> Self {
        self.style = FontStyle::Italic;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    fn is_default_face(&self) -> bool {
        self.weight == FontWeight::W400 && self.style == FontStyle::Normal
    }
}

impl From<&str> for FontRequest {
    fn from(family: &str) -> Self {
        FontRequest::new(family)
    }
}

impl From<String> for FontRequest {
    fn from(family: String) -> Self {
        FontRequest::new(family)
    }
}

impl fmt::Display for FontRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.weight.value())?;
        if self.style == FontStyle::Italic {
            write!(f, " italic")?;
        }
        Ok(())
    }
}

/// Font binary ready for the layout engine. `data` is never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    pub name: String,
    pub data: Vec<u8>,
    pub weight: FontWeight,
    pub style: FontStyle,
    pub lang: Option<String>,
}

impl fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("name", &self.name)
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("weight", &self.weight)
            .field("style", &self.style)
            .field("lang", &self.lang)
            .finish()
    }
}

/// Stylesheet URL for a request. Also the cache key for its binary.
///
/// The family is encoded the way `encodeURI` would encode it, so
/// `"Noto Sans JP"` becomes `Noto%20Sans%20JP`. Non-default faces get an
/// axis suffix such as `:ital,wght@1,700`.
pub fn stylesheet_url(request: &FontRequest) -> String {
    let mut family = request.family.clone();
    if !request.is_default_face() {
        let italic = request.style == FontStyle::Italic;
        let weighted = request.weight != FontWeight::W400;
        match (italic, weighted) {
            (true, true) => family.push_str(&format!(":ital,wght@1,{}", request.weight.value())),
            (true, false) => family.push_str(":ital@1"),
            (false, _) => family.push_str(&format!(":wght@{}", request.weight.value())),
        }
    }
    format!(
        "{}{}",
        STYLESHEET_ENDPOINT,
        utf8_percent_encode(&family, ENCODE_URI)
    )
}

/// Pull the first opentype/truetype binary URL out of a font stylesheet.
///
/// Expects the Google Fonts `@font-face` shape, one declaration per line:
/// `src: url(https://...) format('truetype');`. WOFF/WOFF2 sources and
/// anything else yield `None`.
pub fn extract_font_url(css: &str) -> Option<&str> {
    font_src_pattern()
        .captures(css)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Resolves font requests against a cache and a fetcher.
pub struct FontResolver<'a> {
    cache: &'a dyn AssetCache,
    fetcher: &'a dyn Fetcher,
}

impl<'a> FontResolver<'a> {
    pub fn new(cache: &'a dyn AssetCache, fetcher: &'a dyn Fetcher) -> Self {
        Self { cache, fetcher }
    }

    /// Resolve one request, or `None` if any step fails to produce bytes.
    pub fn resolve_font(&self, request: &FontRequest) -> Option<ResolvedFont> {
        let data = self.download(request)?;
        Some(ResolvedFont {
            name: request.family.clone(),
            data,
            weight: request.weight,
            style: request.style,
            lang: request.lang.clone(),
        })
    }

    /// Resolve requests one after another, dropping the ones that fail.
    ///
    /// Output order follows input order.
    pub fn resolve_fonts(&self, requests: &[FontRequest]) -> Vec<ResolvedFont> {
        requests
            .iter()
            .filter_map(|req| {
                let font = self.resolve_font(req);
                if font.is_none() {
                    log::warn!("font {} could not be resolved; skipping", req);
                }
                font
            })
            .collect()
    }

    fn download(&self, request: &FontRequest) -> Option<Vec<u8>> {
        let url = stylesheet_url(request);

        if let Some(cached) = self.cache.lookup(&url) {
            if !cached.is_empty() {
                log::debug!("font cache hit for {}", url);
                return Some(cached);
            }
        }

        let css = match self.fetcher.fetch(&url) {
            Ok(resp) => resp.text(),
            Err(e) => {
                log::warn!("stylesheet fetch failed for {}: {}", request.family, e);
                return None;
            }
        };
        let Some(binary_url) = extract_font_url(&css) else {
            log::debug!("no opentype/truetype source in stylesheet {}", url);
            return None;
        };

        let resp = match self.fetcher.fetch(binary_url) {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("font binary fetch failed for {}: {}", request.family, e);
                return None;
            }
        };
        if !resp.is_success() || resp.body.is_empty() {
            log::debug!("font binary {} answered {}", binary_url, resp.status);
            return None;
        }

        if let Err(e) = self.cache.put(&url, resp.body.clone()) {
            log::warn!("could not cache font {}: {}", request.family, e);
        }
        Some(resp.body)
    }
}
