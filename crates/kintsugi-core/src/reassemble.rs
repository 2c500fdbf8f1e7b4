//! Tile reassembly.
//!
//! Scrambled pages are served with their tiles packed into four regions
//! (interior block, right-edge stack, bottom-edge stack, corner). This module
//! inverts that packing: one pass over `key.order`, one exact rectangle copy
//! per tile. No blending, no resampling.

use image::RgbaImage;

use crate::error::{KintsugiError, Result};
use crate::key::{PackedCursor, ScrambleKey};

/// Repair one scrambled page.
///
/// For each entry of `key.order`, the destination cell, tile size, and tile
/// category derive from the entry value alone; the packed source origin comes
/// from the category's cursor. The source is read-only; with a valid
/// permutation in `order`, every destination pixel is written exactly once.
///
/// Any tile that would read outside `source` or land outside the destination
/// fails the whole call with [`KintsugiError::MalformedKey`]; no partial
/// bitmap is returned.
pub fn reassemble(source: &RgbaImage, key: &ScrambleKey) -> Result<RgbaImage> {
    key.validate()?;

    let mut dest = RgbaImage::new(key.width, key.height);
    let mut cursor = PackedCursor::new();

    for &s in &key.order {
        let row = s / key.x_slices;
        let col = s % key.x_slices;
        let (w, h) = key.tile_size(row, col);
        let (sx, sy) = cursor.next_origin(key.category(row, col), key);
        let dx = col * key.slice_width;
        let dy = row * key.slice_height;

        if sx + w > source.width() || sy + h > source.height() {
            return Err(KintsugiError::MalformedKey(format!(
                "tile {s} reads {w}x{h} at ({sx},{sy}), outside the {}x{} source",
                source.width(),
                source.height()
            )));
        }
        if dx + w > key.width || dy + h > key.height {
            return Err(KintsugiError::MalformedKey(format!(
                "tile {s} lands {w}x{h} at ({dx},{dy}), outside the {}x{} image",
                key.width, key.height
            )));
        }

        blit(source, sx, sy, &mut dest, dx, dy, w, h);
    }

    Ok(dest)
}

/// Copy a `w`x`h` rectangle from `src` at `(sx, sy)` to `dst` at `(dx, dy)`.
/// Callers have already bounds-checked both rectangles.
fn blit(src: &RgbaImage, sx: u32, sy: u32, dst: &mut RgbaImage, dx: u32, dy: u32, w: u32, h: u32) {
    for y in 0..h {
        for x in 0..w {
            dst.put_pixel(dx + x, dy + y, *src.get_pixel(sx + x, sy + y));
        }
    }
}
