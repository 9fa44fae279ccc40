// Paints a `TreeLayout` into a PNG.
//
// The chart is described as a small SVG scene (rounded boxes, connector lines,
// centered labels) and rasterized with resvg onto a pixmap pre-filled with the
// background color. Nothing here touches the network or the database.

use super::tree_layout::{layout_tree, LayoutParams, PlacedBox, TreeLayout};
use super::tree_models::TreeNode;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

pub const BACKGROUND: (u8, u8, u8) = (0x36, 0x39, 0x3f);

const BOX_FILL: &str = "#ffffff";
const BOX_BORDER: &str = "#000000";
const BOX_BORDER_WIDTH: f32 = 2.0;
const CONNECTOR_COLOR: &str = "#ffffff";
const CONNECTOR_WIDTH: f32 = 1.0;
const LABEL_COLOR: &str = "#000000";
// Concrete faces first so labels don't depend on how `sans-serif` resolves.
const LABEL_FAMILIES: [&str; 3] = ["DejaVu Sans", "Liberation Sans", "Arial"];
const LABEL_FONT_STACK: &str = "DejaVu Sans, Liberation Sans, Arial, sans-serif";
const LABEL_PADDING_X: f32 = 5.0;
const FONT_SIZE: f32 = 12.0;
const LINE_SPACING: f32 = 1.0;
// Rough advance of one narrow glyph relative to the font size.
const GLYPH_ADVANCE: f32 = 0.6;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load font {path}: {source}")]
    FontLoad {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse chart SVG: {0}")]
    SvgParse(String),
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for a finished chart.
pub trait ImageSink {
    fn accept(&mut self, file_name: &str, png: Vec<u8>) -> Result<(), RenderError>;
}

/// Keeps the encoded chart in memory, ready to be uploaded as an attachment.
#[derive(Debug, Default)]
pub struct InMemoryImage {
    pub file_name: String,
    pub png: Vec<u8>,
}

impl ImageSink for InMemoryImage {
    fn accept(&mut self, file_name: &str, png: Vec<u8>) -> Result<(), RenderError> {
        self.file_name = file_name.to_string();
        self.png = png;
        Ok(())
    }
}

pub struct TreeRenderer {
    options: usvg::Options<'static>,
    font_stack: String,
}

impl TreeRenderer {
    /// Renderer backed by the system font database.
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();

        let mut renderer = Self {
            options,
            font_stack: LABEL_FONT_STACK.to_string(),
        };
        match system_label_family(&renderer.options.fontdb) {
            Some(family) => renderer.use_family(family),
            None => tracing::warn!("No system fonts found, tree chart labels will not be drawn"),
        }
        renderer
    }

    /// Like [`TreeRenderer::new`], but labels use the font at `path`.
    pub fn with_font_file(path: &Path) -> Result<Self, RenderError> {
        let mut renderer = Self::new();
        let fontdb = renderer.options.fontdb_mut();

        fontdb
            .load_font_file(path)
            .map_err(|source| RenderError::FontLoad {
                path: path.display().to_string(),
                source,
            })?;

        let family = fontdb
            .faces()
            .last()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());
        if let Some(family) = family {
            tracing::info!(family = %family, "Using custom font for tree charts");
            renderer.font_stack = format!("'{}', {}", family, LABEL_FONT_STACK);
            renderer.use_family(family);
        }

        Ok(renderer)
    }

    /// Route generic `sans-serif` lookups, and text with no usable family, to
    /// `family`. fontdb resolves `sans-serif` to Arial otherwise.
    fn use_family(&mut self, family: String) {
        self.options.fontdb_mut().set_sans_serif_family(family.clone());
        self.options.font_family = family;
    }

    /// Lay out `tree`, rasterize it and hand the PNG to `sink` as `file_name`.
    pub fn render(
        &self,
        tree: &TreeNode,
        params: &LayoutParams,
        file_name: &str,
        sink: &mut dyn ImageSink,
    ) -> Result<(), RenderError> {
        let png = self.render_png(tree, params)?;
        sink.accept(file_name, png)
    }

    pub fn render_png(&self, tree: &TreeNode, params: &LayoutParams) -> Result<Vec<u8>, RenderError> {
        let layout = layout_tree(tree, params);
        let (width, height) = pixel_size(&layout);
        let svg = chart_svg(&layout, params, &self.font_stack, width, height);

        let svg_tree = usvg::Tree::from_str(&svg, &self.options)
            .map_err(|e| RenderError::SvgParse(e.to_string()))?;

        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(RenderError::PixmapAlloc { width, height })?;
        let (r, g, b) = BACKGROUND;
        pixmap.fill(tiny_skia::Color::from_rgba8(r, g, b, 255));

        resvg::render(&svg_tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        tracing::debug!(
            width,
            height,
            boxes = layout.boxes.len(),
            rows = layout.row_count,
            "Rendered tree chart"
        );

        pixmap
            .encode_png()
            .map_err(|e| RenderError::PngEncode(e.to_string()))
    }
}

impl Default for TreeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// First installed family from [`LABEL_FAMILIES`], falling back to whatever
/// face the database found first.
fn system_label_family(fontdb: &usvg::fontdb::Database) -> Option<String> {
    let families: Vec<&str> = fontdb
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.as_str()))
        .collect();

    LABEL_FAMILIES
        .iter()
        .find(|wanted| families.contains(*wanted))
        .or(families.first())
        .map(|name| name.to_string())
}

/// Canvas size in whole pixels, never smaller than 1x1.
pub fn pixel_size(layout: &TreeLayout) -> (u32, u32) {
    let width = layout.width.round().max(1.0) as u32;
    let height = layout.height.round().max(1.0) as u32;
    (width, height)
}

/// SVG scene for a layout. Boxes and their incoming connectors are emitted in
/// layout order, so later rows paint over earlier ones.
pub fn chart_svg(
    layout: &TreeLayout,
    params: &LayoutParams,
    font_stack: &str,
    width: u32,
    height: u32,
) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );

    for placed in &layout.boxes {
        write_box(&mut svg, placed, params, font_stack);
    }

    svg.push_str("</svg>");
    svg
}

fn write_box(svg: &mut String, placed: &PlacedBox, params: &LayoutParams, font_stack: &str) {
    let font_stack = escape_xml(font_stack);
    let (w, h) = (params.box_width, params.box_height);
    let radius = ((w + h) / 2.0) / 12.0;

    let _ = write!(
        svg,
        r#"<rect x="{}" y="{}" width="{w}" height="{h}" rx="{radius}" ry="{radius}" fill="{BOX_FILL}" stroke="{BOX_BORDER}" stroke-width="{BOX_BORDER_WIDTH}"/>"#,
        placed.x, placed.y
    );

    if let Some(from) = placed.connector_from {
        let to = placed.top_center(params);
        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{CONNECTOR_COLOR}" stroke-width="{CONNECTOR_WIDTH}"/>"#,
            from.x,
            from.y + CONNECTOR_WIDTH,
            to.x,
            to.y - CONNECTOR_WIDTH
        );
    }

    let lines = wrap_label(&placed.name, w - LABEL_PADDING_X, FONT_SIZE);
    let line_height = FONT_SIZE * LINE_SPACING;
    let block_height = line_height * lines.len() as f32;
    let center_x = placed.x + w / 2.0;
    let first_top = placed.y + h / 2.0 - block_height / 2.0;

    for (i, line) in lines.iter().enumerate() {
        // Baseline sits roughly one ascent below the line's top.
        let baseline = first_top + line_height * i as f32 + FONT_SIZE * 0.9;
        let _ = write!(
            svg,
            r#"<text x="{center_x}" y="{baseline}" font-family="{font_stack}" font-size="{FONT_SIZE}" fill="{LABEL_COLOR}" text-anchor="middle">{}</text>"#,
            escape_xml(line)
        );
    }
}

fn text_width(text: &str, font_size: f32) -> f32 {
    UnicodeWidthStr::width(text) as f32 * font_size * GLYPH_ADVANCE
}

/// Greedy word wrap to `max_width` pixels. Words wider than a whole line are
/// split between characters.
pub fn wrap_label(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width(word, font_size) <= max_width {
            current = word.to_string();
            continue;
        }

        for ch in word.chars() {
            let mut next = current.clone();
            next.push(ch);
            if !current.is_empty() && text_width(&next, font_size) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = next;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trees::tree_builder::build_tree;
    use std::collections::HashMap;

    fn sample_tree() -> TreeNode {
        let mut map = HashMap::new();
        map.insert("".to_string(), vec!["Boss".to_string()]);
        map.insert(
            "Boss".to_string(),
            vec!["Left <&>".to_string(), "Right".to_string()],
        );
        build_tree(&map, "").unwrap()
    }

    #[test]
    fn test_wrap_label_breaks_on_words() {
        // 12px font: 7.2px per column, so 70px fits 9 columns.
        let lines = wrap_label("Anna Maria Lopez", 70.0, 12.0);
        assert_eq!(lines, vec!["Anna", "Maria", "Lopez"]);

        let lines = wrap_label("Al Bo Cy", 70.0, 12.0);
        assert_eq!(lines, vec!["Al Bo Cy"]);
    }

    #[test]
    fn test_wrap_label_splits_long_words() {
        let lines = wrap_label("Supercalifragilistic", 70.0, 12.0);

        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "Supercalifragilistic");
        assert!(lines.iter().all(|l| text_width(l, 12.0) <= 70.0));
    }

    #[test]
    fn test_wrap_label_empty() {
        assert!(wrap_label("   ", 70.0, 12.0).is_empty());
    }

    #[test]
    fn test_svg_escapes_labels_and_draws_connectors() {
        let params = LayoutParams::default();
        let layout = layout_tree(&sample_tree(), &params);
        let (w, h) = pixel_size(&layout);
        let svg = chart_svg(&layout, &params, LABEL_FONT_STACK, w, h);

        assert!(svg.contains("Left &lt;&amp;&gt;"));
        assert!(!svg.contains("Left <&>"));
        assert!(svg.contains(r#"font-family="DejaVu Sans, Liberation Sans, Arial, sans-serif""#));
        assert_eq!(svg.matches("<rect").count(), 3);
        // First row hangs from the root origin without a line.
        assert_eq!(svg.matches("<line").count(), 2);
    }

    #[test]
    fn test_pixel_size_never_zero() {
        let params = LayoutParams {
            padding_top: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            padding_right: 0.0,
            ..LayoutParams::default()
        };
        let layout = layout_tree(&TreeNode::leaf(""), &params);

        assert_eq!(pixel_size(&layout), (1, 1));
    }

    #[test]
    fn test_render_png_has_layout_dimensions() {
        let renderer = TreeRenderer::new();
        let params = LayoutParams::default();
        let tree = sample_tree();

        let mut image = InMemoryImage::default();
        renderer.render(&tree, &params, "tree.png", &mut image).unwrap();

        assert_eq!(image.file_name, "tree.png");
        assert_eq!(&image.png[..8], b"\x89PNG\r\n\x1a\n");

        // IHDR width/height are big-endian u32s right after the chunk header.
        let width = u32::from_be_bytes(image.png[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(image.png[20..24].try_into().unwrap());
        assert_eq!(width, 2 * 75 + 5 + 100);
        assert_eq!(height, 2 * 75 + 50 + 100);
    }

    fn rgb(pixmap: &tiny_skia::Pixmap, x: u32, y: u32) -> (u8, u8, u8) {
        let px = pixmap.pixel(x, y).unwrap();
        (px.red(), px.green(), px.blue())
    }

    #[test]
    fn test_render_png_paints_boxes_labels_and_connectors() {
        let params = LayoutParams::default();
        let tree = sample_tree();
        let layout = layout_tree(&tree, &params);

        let png = TreeRenderer::new().render_png(&tree, &params).unwrap();
        let pixmap = tiny_skia::Pixmap::decode_png(&png).unwrap();

        assert_eq!(rgb(&pixmap, 0, 0), BACKGROUND);

        let boss = layout.boxes.iter().find(|b| b.name == "Boss").unwrap();
        let (left, top) = (boss.x as u32, boss.y as u32);
        // Just inside the border, away from the centered label.
        assert_eq!(rgb(&pixmap, left + 10, top + 10), (255, 255, 255));

        // Label ink, skipping the border band.
        let inset = 6;
        let mut ink = 0;
        for y in top + inset..top + params.box_height as u32 - inset {
            for x in left + inset..left + params.box_width as u32 - inset {
                let (r, g, b) = rgb(&pixmap, x, y);
                if r < 128 && g < 128 && b < 128 {
                    ink += 1;
                }
            }
        }
        assert!(ink > 0, "no label drawn inside the Boss box");

        // Midpoint of the connector into the first child.
        let child = layout.boxes.iter().find(|b| b.connector_from.is_some()).unwrap();
        let from = child.connector_from.unwrap();
        let to = child.top_center(&params);
        let (mx, my) = (((from.x + to.x) / 2.0) as u32, ((from.y + to.y) / 2.0) as u32);
        let touched = (mx.saturating_sub(1)..=mx + 1)
            .flat_map(|x| (my.saturating_sub(1)..=my + 1).map(move |y| (x, y)))
            .any(|(x, y)| rgb(&pixmap, x, y) != BACKGROUND);
        assert!(touched, "connector not drawn near ({mx}, {my})");
    }

    #[test]
    fn test_label_family_prefers_known_faces() {
        let renderer = TreeRenderer::new();
        let fontdb = &renderer.options.fontdb;
        if fontdb.len() == 0 {
            return;
        }

        let family = system_label_family(fontdb).unwrap();
        assert_eq!(renderer.options.font_family, family);
        let known = fontdb
            .faces()
            .any(|face| face.families.iter().any(|(name, _)| LABEL_FAMILIES.contains(&name.as_str())));
        if known {
            assert!(LABEL_FAMILIES.contains(&family.as_str()));
        }
    }

    #[test]
    fn test_empty_chart_is_background_only() {
        let renderer = TreeRenderer::new();
        let png = renderer
            .render_png(&TreeNode::leaf(""), &LayoutParams::default())
            .unwrap();

        let width = u32::from_be_bytes(png[16..20].try_into().unwrap());
        let height = u32::from_be_bytes(png[20..24].try_into().unwrap());
        assert_eq!((width, height), (100, 100));
    }
}
