// Geometry for the tree chart.
//
// Layout is computed up front as plain data so it can be checked without
// rasterizing anything. The renderer only paints what this module decides.

use super::tree_builder::extract_rows;
use super::tree_models::TreeNode;
use std::collections::HashMap;

/// Box sizes, gaps and paddings, all in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub box_height: f32,
    pub box_width: f32,
    pub gap_x: f32,
    pub gap_y: f32,
    pub padding_top: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
    pub padding_right: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            box_height: 75.0,
            box_width: 75.0,
            gap_x: 5.0,
            gap_y: 50.0,
            padding_top: 50.0,
            padding_bottom: 50.0,
            padding_left: 50.0,
            padding_right: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A node's box, in drawing order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBox {
    pub name: String,
    /// 1-based visual row.
    pub row: usize,
    pub x: f32,
    pub y: f32,
    /// Parent's origin, `None` for boxes in the first row.
    pub connector_from: Option<Point>,
}

impl PlacedBox {
    pub fn top_center(&self, params: &LayoutParams) -> Point {
        Point {
            x: self.x + params.box_width / 2.0,
            y: self.y,
        }
    }

    /// Where lines to this node's children start.
    pub fn origin(&self, params: &LayoutParams) -> Point {
        Point {
            x: self.x + params.box_width / 2.0,
            y: self.y + params.box_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeLayout {
    pub width: f32,
    pub height: f32,
    pub row_count: usize,
    pub boxes: Vec<PlacedBox>,
}

/// Left edge of box `index` (1-based) in a row of `boxes_in_row` boxes.
///
/// The row spans `n * box_width + (n - 1) * gap_x` and is centered on
/// `anchor_x`; consecutive boxes are `box_width + gap_x` apart.
pub fn box_left_x(boxes_in_row: usize, index: usize, box_width: f32, gap_x: f32, anchor_x: f32) -> f32 {
    let n = boxes_in_row as f32;
    let span = n * box_width + (n - 1.0).max(0.0) * gap_x;
    anchor_x - span / 2.0 + (index as f32 - 1.0) * (box_width + gap_x)
}

/// Top edge of a 1-based visual row.
pub fn row_top_y(row: usize, params: &LayoutParams) -> f32 {
    params.padding_top + (params.box_height + params.gap_y) * (row as f32 - 1.0)
}

/// Canvas size for `row_count` rows whose widest row holds `max_row_len` boxes.
pub fn canvas_size(row_count: usize, max_row_len: usize, params: &LayoutParams) -> (f32, f32) {
    let cols = max_row_len as f32;
    let rows = row_count as f32;

    let width = cols * params.box_width
        + (cols - 1.0).max(0.0) * params.gap_x
        + params.padding_left
        + params.padding_right;
    let height = rows * params.box_height
        + (rows - 1.0).max(0.0) * params.gap_y
        + params.padding_top
        + params.padding_bottom;

    (width, height)
}

/// Place every node below `tree`'s root.
///
/// The root draws nothing; it only seeds the origin `(width / 2, 0)` that the
/// first row hangs from. Each placed node records its own origin before the
/// next row is visited, so parents are always resolved by the time their
/// children look them up.
pub fn layout_tree(tree: &TreeNode, params: &LayoutParams) -> TreeLayout {
    let rows = extract_rows(tree);
    let max_row_len = rows.iter().map(Vec::len).max().unwrap_or(0);
    let (width, height) = canvas_size(rows.len(), max_row_len, params);
    let anchor_x = width / 2.0;

    let mut origins: HashMap<&str, Point> = HashMap::new();
    origins.insert(tree.name.as_str(), Point { x: anchor_x, y: 0.0 });

    let mut boxes = Vec::with_capacity(rows.iter().map(Vec::len).sum());

    for (row_index, members) in rows.iter().enumerate() {
        let row = row_index + 1;
        let y = row_top_y(row, params);

        for (member_index, member) in members.iter().enumerate() {
            let x = box_left_x(
                members.len(),
                member_index + 1,
                params.box_width,
                params.gap_x,
                anchor_x,
            );

            let connector_from = if row > 1 {
                origins.get(member.parent_name.as_str()).copied()
            } else {
                None
            };

            let placed = PlacedBox {
                name: member.name.clone(),
                row,
                x,
                y,
                connector_from,
            };
            origins.insert(member.name.as_str(), placed.origin(params));
            boxes.push(placed);
        }
    }

    TreeLayout {
        width,
        height,
        row_count: rows.len(),
        boxes,
    }
}
