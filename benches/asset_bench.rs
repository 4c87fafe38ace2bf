use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ogpng::emoji::emoji_code;
use ogpng::font::{extract_font_url, stylesheet_url, FontRequest};

fn bench_emoji_code(c: &mut Criterion) {
    c.bench_function("emoji_code_zwj_sequence", |b| {
        b.iter(|| emoji_code(black_box("\u{1f469}\u{200d}\u{2764}\u{fe0f}\u{200d}\u{1f468}")))
    });
}

fn bench_stylesheet(c: &mut Criterion) {
    let css = "@font-face {\n  font-family: 'Noto Sans JP';\n  font-style: normal;\n  font-weight: 400;\n  src: url(https://fonts.gstatic.com/s/notosansjp/v52/font.ttf) format('truetype');\n}\n"
        .repeat(8);
    c.bench_function("extract_font_url", |b| b.iter(|| extract_font_url(black_box(&css))));

    let req = FontRequest::new("Noto Sans JP");
    c.bench_function("stylesheet_url", |b| b.iter(|| stylesheet_url(black_box(&req))));
}

// Warm-cache render through the built-in engines; no network involved.
#[cfg(feature = "svg")]
fn bench_warm_render(c: &mut Criterion) {
    use ogpng::rendering::layout::BlockLayout;
    use ogpng::rendering::raster::ResvgRasterizer;
    use ogpng::{Element, MemoryCache, ModuleLoader, OgpRenderer, RenderOptions, StaticFetcher, Style};
    use std::sync::Arc;

    let renderer = OgpRenderer::with_engines(
        Arc::new(StaticFetcher::new()),
        Box::new(BlockLayout::new()),
        Box::new(ResvgRasterizer::new()),
        ModuleLoader::default(),
    );
    let card = Element::container(vec![
        Element::text("Benchmarks").with_style(Style::default().font_size(64.0)),
        Element::text("A warm cache render"),
    ])
    .with_style(Style::default().background("#ffffff").padding(48.0));
    let options = RenderOptions::new(1200.0, Arc::new(MemoryCache::new())).height(630.0);

    c.bench_function("render_warm_1200x630", |b| {
        b.iter(|| renderer.render(black_box(&card), &options).unwrap())
    });
}

#[cfg(not(feature = "svg"))]
fn bench_warm_render(_c: &mut Criterion) {}

criterion_group!(benches, bench_emoji_code, bench_stylesheet, bench_warm_render);
criterion_main!(benches);
