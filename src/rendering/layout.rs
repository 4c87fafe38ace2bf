/// Block layout prototype: vertical stacking with naive text wrapping.
///
/// Glyph advances are estimated from the font size rather than measured, so
/// wrapping is approximate. Text is flattened to outlines through `usvg`
/// using the resolved fonts, which leaves a font-free SVG for the rasterizer.

use crate::element::{Element, Style};
use crate::emoji::{is_emoji, AdditionalAsset, AssetLoader, EMOJI_ASSET};
use crate::font::ResolvedFont;
use crate::rendering::paint::{to_svg, PaintCommand};
use crate::rendering::{LayoutEngine, LayoutOptions};
use crate::{Error, Result};
use resvg::usvg;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

const DEFAULT_FONT_SIZE: f32 = 32.0;
const DEFAULT_COLOR: &str = "#000000";

/// Inherited text properties while walking the tree
#[derive(Debug, Clone)]
struct TextContext {
    font_family: Option<String>,
    font_size: f32,
    color: String,
}

impl TextContext {
    fn inherit(&self, style: &Style) -> Self {
        Self {
            font_family: style.font_family.clone().or_else(|| self.font_family.clone()),
            font_size: style.font_size.unwrap_or(self.font_size),
            color: style.color.clone().unwrap_or_else(|| self.color.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLayout {
    /// Estimated advance per grapheme, as a fraction of font size
    pub char_width: f32,
    /// Line box height, as a fraction of font size
    pub line_height: f32,
}

impl Default for BlockLayout {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            line_height: 1.2,
        }
    }
}

impl BlockLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `element` into paint commands, returning them with the
    /// content height.
    pub fn paint(&self, element: &Element, options: &LayoutOptions<'_>) -> (Vec<PaintCommand>, f32) {
        let root = TextContext {
            font_family: options.fonts.first().map(|f| f.name.clone()),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
        };
        let mut out = Vec::new();
        let height = self.place(
            element,
            0.0,
            0.0,
            options.width,
            &root,
            options.load_additional_asset,
            &mut out,
        );
        (out, height)
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        element: &Element,
        x: f32,
        y: f32,
        width: f32,
        parent: &TextContext,
        loader: Option<&AssetLoader<'_>>,
        out: &mut Vec<PaintCommand>,
    ) -> f32 {
        let style = element.style();
        let ctx = parent.inherit(style);
        let pad = style.padding.max(0.0);
        let inner_width = (width - pad * 2.0).max(0.0);
        let background_at = out.len();

        let content_height = match element {
            Element::Container { children, .. } => {
                let mut cursor = y + pad;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        cursor += style.gap;
                    }
                    cursor += self.place(child, x + pad, cursor, inner_width, &ctx, loader, out);
                }
                cursor - (y + pad)
            }
            Element::Text { text, .. } => {
                self.place_text(text, x + pad, y + pad, inner_width, &ctx, loader, out)
            }
        };

        let height = content_height + pad * 2.0;
        if let Some(fill) = &style.background_color {
            out.insert(
                background_at,
                PaintCommand::SolidRect {
                    x,
                    y,
                    width,
                    height,
                    fill: fill.clone(),
                },
            );
        }
        height
    }

    #[allow(clippy::too_many_arguments)]
    fn place_text(
        &self,
        text: &str,
        x: f32,
        y: f32,
        width: f32,
        ctx: &TextContext,
        loader: Option<&AssetLoader<'_>>,
        out: &mut Vec<PaintCommand>,
    ) -> f32 {
        let advance = ctx.font_size * self.char_width;
        let line_box = ctx.font_size * self.line_height;
        let per_line = if advance > 0.0 {
            ((width / advance).floor() as usize).max(1)
        } else {
            usize::MAX
        };

        let lines = wrap(text, per_line);
        for (i, line) in lines.iter().enumerate() {
            let baseline = y + i as f32 * line_box + (line_box + ctx.font_size * 0.7) / 2.0;
            let mut cursor = x;
            let mut run = String::new();
            let mut run_x = x;

            for g in line.graphemes(true) {
                let substitute = match loader {
                    Some(load) if is_emoji(g) => load(EMOJI_ASSET, g),
                    _ => AdditionalAsset::None,
                };
                match substitute {
                    AdditionalAsset::DataUri(href) => {
                        flush_run(&mut run, run_x, baseline, ctx, out);
                        out.push(PaintCommand::Image {
                            x: cursor,
                            y: baseline - ctx.font_size * 0.85,
                            width: ctx.font_size,
                            height: ctx.font_size,
                            href,
                        });
                        cursor += ctx.font_size;
                        run_x = cursor;
                    }
                    AdditionalAsset::Text(t) => {
                        run.push_str(&t);
                        cursor += advance;
                    }
                    AdditionalAsset::None => {
                        run.push_str(g);
                        cursor += advance;
                    }
                }
            }
            flush_run(&mut run, run_x, baseline, ctx, out);
        }
        lines.len().max(1) as f32 * line_box
    }
}

fn flush_run(run: &mut String, x: f32, baseline: f32, ctx: &TextContext, out: &mut Vec<PaintCommand>) {
    if run.is_empty() {
        return;
    }
    out.push(PaintCommand::Text {
        x,
        y: baseline,
        text: std::mem::take(run),
        font_family: ctx.font_family.clone(),
        font_size: ctx.font_size,
        fill: ctx.color.clone(),
    });
}

/// Greedy word wrap counting graphemes. Words longer than a line are split.
fn wrap(text: &str, per_line: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut cur = String::new();
        let mut cur_len = 0usize;
        for word in paragraph.split_whitespace() {
            let word_len = word.graphemes(true).count();
            if cur_len > 0 && cur_len + 1 + word_len > per_line {
                lines.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            if word_len > per_line {
                for g in word.graphemes(true) {
                    if cur_len == per_line {
                        lines.push(std::mem::take(&mut cur));
                        cur_len = 0;
                    }
                    cur.push_str(g);
                    cur_len += 1;
                }
                continue;
            }
            if cur_len > 0 {
                cur.push(' ');
                cur_len += 1;
            }
            cur.push_str(word);
            cur_len += word_len;
        }
        lines.push(cur);
    }
    lines
}

/// Re-serialize `svg` with all text converted to outlines.
fn flatten_text(svg: &str, fonts: &[ResolvedFont]) -> Result<String> {
    let mut db = usvg::fontdb::Database::new();
    for font in fonts {
        db.load_font_data(font.data.clone());
    }
    if db.len() < fonts.len() {
        log::debug!("{} of {} fonts contained usable faces", db.len(), fonts.len());
    }

    let mut opt = usvg::Options::default();
    if let Some(first) = fonts.first() {
        opt.font_family = first.name.clone();
    }
    opt.fontdb = Arc::new(db);

    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| Error::LayoutError(format!("generated SVG rejected: {}", e)))?;
    Ok(tree.to_string(&usvg::WriteOptions::default()))
}

impl LayoutEngine for BlockLayout {
    fn layout(&self, element: &Element, options: &LayoutOptions<'_>) -> Result<String> {
        if !(options.width > 0.0 && options.width.is_finite()) {
            return Err(Error::LayoutError(format!("invalid width {}", options.width)));
        }
        let (commands, content_height) = self.paint(element, options);
        let height = options.height.unwrap_or(content_height).max(1.0);
        let svg = to_svg(options.width, height, &commands);
        flatten_text(&svg, options.fonts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Style;

    fn options<'a>(width: f32, loader: Option<&'a AssetLoader<'a>>) -> LayoutOptions<'a> {
        LayoutOptions {
            width,
            height: None,
            fonts: &[],
            load_additional_asset: loader,
        }
    }

    #[test]
    fn wrap_splits_on_words_and_long_words() {
        assert_eq!(wrap("hello world", 20), vec!["hello world"]);
        assert_eq!(wrap("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("a\nb", 10), vec!["a", "b"]);
    }

    #[test]
    fn container_background_precedes_children() {
        let el = Element::container(vec![
            Element::text("Title").with_style(Style::default().font_size(64.0)),
            Element::text("Body"),
        ])
        .with_style(Style::default().background("#fff").padding(10.0).gap(4.0));
        let (cmds, height) = BlockLayout::new().paint(&el, &options(1200.0, None));
        assert!(matches!(&cmds[0], PaintCommand::SolidRect { fill, .. } if fill == "#fff"));
        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Title", "Body"]);
        let expected = 10.0 * 2.0 + 64.0 * 1.2 + 4.0 + 32.0 * 1.2;
        assert!((height - expected).abs() < 0.01);
    }

    #[test]
    fn emoji_graphemes_are_replaced_by_loader_images() {
        let calls = std::cell::RefCell::new(Vec::new());
        let loader = |kind: &str, seg: &str| {
            calls.borrow_mut().push((kind.to_string(), seg.to_string()));
            AdditionalAsset::DataUri("data:image/svg+xml;base64,AA==".to_string())
        };
        let el = Element::text("hi \u{1f600}!");
        let (cmds, _) = BlockLayout::new().paint(&el, &options(1200.0, Some(&loader)));
        assert_eq!(
            calls.borrow().as_slice(),
            &[("emoji".to_string(), "\u{1f600}".to_string())]
        );
        assert!(cmds.iter().any(|c| matches!(c, PaintCommand::Image { href, .. } if href.starts_with("data:image/svg+xml"))));
        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["hi ", "!"]);
    }

    #[test]
    fn text_fallback_keeps_emoji_as_text() {
        let loader = |_: &str, seg: &str| AdditionalAsset::Text(seg.to_string());
        let el = Element::text("a\u{1f600}");
        let (cmds, _) = BlockLayout::new().paint(&el, &options(1200.0, Some(&loader)));
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], PaintCommand::Text { text, .. } if text == "a\u{1f600}"));
    }

    #[test]
    fn layout_produces_svg_of_requested_size() {
        let el = Element::text("Hello");
        let opts = LayoutOptions {
            width: 1200.0,
            height: Some(630.0),
            fonts: &[],
            load_additional_asset: None,
        };
        let svg = BlockLayout::new().layout(&el, &opts).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("1200"));
        assert!(svg.contains("630"));
    }

    #[test]
    fn layout_rejects_zero_width() {
        let el = Element::text("x");
        let err = BlockLayout::new().layout(&el, &options(0.0, None)).unwrap_err();
        assert!(matches!(err, Error::LayoutError(_)));
    }
}
