/// Paint command list produced by layout, and its SVG serialization

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: String,
    },
    /// `y` is the baseline
    Text {
        x: f32,
        y: f32,
        text: String,
        font_family: Option<String>,
        font_size: f32,
        fill: String,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        href: String,
    },
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Serialize commands, in order, into a standalone SVG document.
pub fn to_svg(width: f32, height: f32, commands: &[PaintCommand]) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    for cmd in commands {
        match cmd {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                fill,
            } => svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                x,
                y,
                width,
                height,
                escape(fill)
            )),
            PaintCommand::Text {
                x,
                y,
                text,
                font_family,
                font_size,
                fill,
            } => {
                svg.push_str(&format!(r#"<text x="{}" y="{}" font-size="{}""#, x, y, font_size));
                if let Some(family) = font_family {
                    svg.push_str(&format!(r#" font-family="{}""#, escape(family)));
                }
                svg.push_str(&format!(
                    r#" fill="{}" xml:space="preserve">{}</text>"#,
                    escape(fill),
                    escape(text)
                ));
            }
            PaintCommand::Image {
                x,
                y,
                width,
                height,
                href,
            } => svg.push_str(&format!(
                r#"<image x="{}" y="{}" width="{}" height="{}" xlink:href="{}"/>"#,
                x,
                y,
                width,
                height,
                escape(href)
            )),
        }
    }
    svg.push_str("</svg>");
    svg
}
