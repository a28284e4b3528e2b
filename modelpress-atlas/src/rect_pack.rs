//! Rectangle packing into a power-of-two square
//!
//! Shelf packing: tiles sorted by height are laid out in rows inside
//! candidate squares, growing through power-of-two sizes until everything
//! fits or the maximum atlas dimension is exceeded.

use modelpress_core::{Error, Result};

/// The pixel-space destination rectangle assigned to one tile inside the
/// packed atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PackedRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn overlaps(&self, other: &PackedRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Pack `sizes` into the smallest enclosing power-of-two square no larger
/// than `max_size`, with `padding` pixels between tiles. Returns the square
/// dimension and one destination rectangle per input tile, in input order.
pub fn pack_into_square(
    sizes: &[(u32, u32)],
    padding: u32,
    max_size: u32,
) -> Result<(u32, Vec<PackedRect>)> {
    if sizes.is_empty() {
        return Err(Error::Packing("no tiles to pack".to_string()));
    }

    let sizes: Vec<(u32, u32)> = sizes
        .iter()
        .map(|&(w, h)| (w.max(1), h.max(1)))
        .collect();

    // Tall tiles first keeps shelves dense; the permutation is undone when
    // rectangles are written back.
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse((sizes[i].1, sizes[i].0)));

    let max_side = sizes.iter().map(|&(w, h)| w.max(h)).max().unwrap_or(1);
    let total_area: u64 = sizes.iter().map(|&(w, h)| w as u64 * h as u64).sum();
    let area_side = (total_area as f64).sqrt().ceil() as u32;

    let mut candidate = max_side.max(area_side).max(1).next_power_of_two();
    while candidate <= max_size {
        if let Some(rects) = try_shelf_pack(&sizes, &order, candidate, padding) {
            return Ok((candidate, rects));
        }
        candidate = match candidate.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
    }

    Err(Error::Packing(format!(
        "tiles do not fit a {}x{} atlas",
        max_size, max_size
    )))
}

fn try_shelf_pack(
    sizes: &[(u32, u32)],
    order: &[usize],
    square: u32,
    padding: u32,
) -> Option<Vec<PackedRect>> {
    let mut rects = vec![
        PackedRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
        sizes.len()
    ];
    let mut cursor_x = 0u32;
    let mut cursor_y = 0u32;
    let mut shelf_height = 0u32;

    for &i in order {
        let (w, h) = sizes[i];
        if w > square {
            return None;
        }
        if cursor_x + w > square {
            cursor_y += shelf_height + padding;
            cursor_x = 0;
            shelf_height = 0;
        }
        if cursor_y + h > square {
            return None;
        }
        rects[i] = PackedRect {
            x: cursor_x,
            y: cursor_y,
            width: w,
            height: h,
        };
        cursor_x += w + padding;
        shelf_height = shelf_height.max(h);
    }
    Some(rects)
}
