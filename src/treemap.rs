use std::sync::Arc;

use serde::Serialize;

use crate::tree::FileNode;

/// Directories below this share of the root's total are drawn flat, with no
/// visible internal structure.
pub const DEFAULT_MIN_SIZE_THRESHOLD: f64 = 0.005;

/// Rectangle in the layout's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A node paired with its laid-out rectangle. Transient: regenerated whenever
/// the bounds or the input tree change.
#[derive(Debug, Clone)]
pub struct TreemapRect {
    pub node: Arc<FileNode>,
    pub rect: Rect,
}

/// Squarified treemap layout (Bruls, Huizing, van Wijk) with the default
/// minimum-size threshold.
pub fn layout(root: &Arc<FileNode>, bounds: Rect) -> Vec<TreemapRect> {
    layout_with_threshold(root, bounds, DEFAULT_MIN_SIZE_THRESHOLD)
}

/// Pure function of its inputs: recursively partitions `bounds` into
/// rectangles proportional to subtree sizes. The root rectangle is always
/// emitted; directories smaller than `min_size_threshold` of the root total
/// become single flat rectangles.
pub fn layout_with_threshold(
    root: &Arc<FileNode>,
    bounds: Rect,
    min_size_threshold: f64,
) -> Vec<TreemapRect> {
    let mut rects = Vec::new();
    if root.total_size == 0 || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return rects;
    }

    let min_visible_size = min_size_threshold * root.total_size as f64;
    emit_node(root, bounds, min_visible_size, &mut rects);
    rects
}

fn emit_node(
    node: &Arc<FileNode>,
    bounds: Rect,
    min_visible_size: f64,
    rects: &mut Vec<TreemapRect>,
) {
    rects.push(TreemapRect {
        node: node.clone(),
        rect: bounds,
    });

    if !node.is_dir || node.children.is_empty() {
        return;
    }

    // Filtering may have disturbed the scanner's largest-first order, so
    // never assume it still holds here.
    let mut children: Vec<&Arc<FileNode>> = node
        .children
        .iter()
        .filter(|child| child.total_size > 0)
        .collect();
    children.sort_by(|a, b| b.total_size.cmp(&a.total_size));
    if children.is_empty() {
        return;
    }

    for (child, rect) in squarify(&children, bounds) {
        let descend = child.is_dir
            && !child.children.is_empty()
            && child.total_size as f64 >= min_visible_size;
        if descend {
            emit_node(child, rect, min_visible_size, rects);
        } else {
            rects.push(TreemapRect {
                node: child.clone(),
                rect,
            });
        }
    }
}

/// Pack `children` (sorted descending, all with positive size) into `bounds`
/// as greedy rows: a row grows while its worst aspect ratio does not get
/// worse, then is emitted and the remaining bounds shrink by its thickness.
fn squarify<'a>(
    children: &[&'a Arc<FileNode>],
    bounds: Rect,
) -> Vec<(&'a Arc<FileNode>, Rect)> {
    let mut placed = Vec::with_capacity(children.len());
    let mut remaining = children;
    let mut remaining_total: f64 = children.iter().map(|c| c.total_size as f64).sum();
    let mut free = bounds;

    while !remaining.is_empty() {
        if free.width <= 0.0 || free.height <= 0.0 || remaining_total <= 0.0 {
            break;
        }

        // A row always contains at least one item, even when that item alone
        // has a bad ratio.
        let mut count = 1;
        let mut row_sum = remaining[0].total_size as f64;
        let mut worst = worst_aspect_ratio(&remaining[..1], row_sum, remaining_total, free);

        while count < remaining.len() {
            let next_sum = row_sum + remaining[count].total_size as f64;
            let next_worst =
                worst_aspect_ratio(&remaining[..count + 1], next_sum, remaining_total, free);
            if next_worst > worst {
                break;
            }
            worst = next_worst;
            row_sum = next_sum;
            count += 1;
        }

        let (row, rest) = remaining.split_at(count);
        free = place_row(row, row_sum, remaining_total, free, &mut placed);
        remaining = rest;
        remaining_total -= row_sum;
    }

    placed
}

/// Worst aspect ratio a row would have in the current free rectangle: the row
/// occupies a band whose area is its share of the remaining total, split
/// proportionally among its members.
fn worst_aspect_ratio(
    row: &[&Arc<FileNode>],
    row_sum: f64,
    remaining_total: f64,
    free: Rect,
) -> f64 {
    let row_area = row_sum / remaining_total * free.area();
    let band = if free.width >= free.height {
        free.width
    } else {
        free.height
    };
    let thickness = row_area / band;
    if thickness <= 0.0 {
        return f64::INFINITY;
    }

    row.iter()
        .map(|item| {
            let length = item.total_size as f64 / row_sum * band;
            (length / thickness).max(thickness / length)
        })
        .fold(0.0, f64::max)
}

fn place_row<'a>(
    row: &[&'a Arc<FileNode>],
    row_sum: f64,
    remaining_total: f64,
    free: Rect,
    placed: &mut Vec<(&'a Arc<FileNode>, Rect)>,
) -> Rect {
    let row_area = row_sum / remaining_total * free.area();
    let horizontal = free.width >= free.height;

    if horizontal {
        let thickness = row_area / free.width;
        let mut x = free.x;
        for item in row {
            let width = item.total_size as f64 / row_sum * free.width;
            placed.push((*item, Rect::new(x, free.y, width, thickness)));
            x += width;
        }
        Rect::new(
            free.x,
            free.y + thickness,
            free.width,
            (free.height - thickness).max(0.0),
        )
    } else {
        let thickness = row_area / free.height;
        let mut y = free.y;
        for item in row {
            let height = item.total_size as f64 / row_sum * free.height;
            placed.push((*item, Rect::new(free.x, y, thickness, height)));
            y += height;
        }
        Rect::new(
            free.x + thickness,
            free.y,
            (free.width - thickness).max(0.0),
            free.height,
        )
    }
}
