//! Scramble-key model.
//!
//! The site publishes one key per page image. A key describes how the
//! original picture was cut into a grid of tiles and where each tile was
//! packed inside the scrambled bitmap that is actually served. Reassembly
//! walks `order` once and copies tiles back; see [`crate::reassemble`].

use serde::{Deserialize, Serialize};

use crate::error::{KintsugiError, Result};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Per-page descrambling key, decoded from the viewer's `keys` variable.
///
/// `x_slices * y_slices` is the destination grid; `order` holds one entry per
/// grid cell. `order[i]` is the row-major destination index of the tile found
/// at packed position `i` in the source bitmap. Tiles in the last column and
/// last row may be narrower/shorter than the nominal slice size.
///
/// Geometry helpers assume a key that passed [`ScrambleKey::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrambleKey {
    pub width: u32,
    pub height: u32,
    pub x_slices: u32,
    pub y_slices: u32,
    pub slice_width: u32,
    pub slice_height: u32,
    #[serde(rename = "slices")]
    pub order: Vec<u32>,
}

/// One page image as listed in the viewer's `array` variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    pub id: u32,
    pub filename: String,
}

/// One key entry as listed in the viewer's `keys` variable, correlated with
/// [`PageImage`] by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageKey {
    pub id: u32,
    pub key: ScrambleKey,
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Hard cap on key pixel dimensions (image and slice size). Real pages are a
/// few thousand pixels on a side; anything larger is a garbage key.
pub const KEY_MAX_DIM: u32 = 65_535;

/// Hard cap on slices per axis. Real keys use single-digit grids. Together
/// with [`KEY_MAX_DIM`] this keeps every derived origin computation within
/// `u32`.
pub const KEY_MAX_SLICES: u32 = 255;

/// Position class of a destination cell, derived from `(row, col)` alone.
/// Each class maps to its own packed region in the source bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileCategory {
    Interior,
    RightEdge,
    BottomEdge,
    Corner,
}

impl ScrambleKey {
    /// Number of cells in the destination grid.
    pub fn grid_len(&self) -> usize {
        self.x_slices as usize * self.y_slices as usize
    }

    /// Structural checks; every failure is a [`KintsugiError::MalformedKey`].
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(KintsugiError::MalformedKey(format!(
                "image size {}x{} must be nonzero",
                self.width, self.height
            )));
        }
        if self.slice_width == 0 || self.slice_height == 0 {
            return Err(KintsugiError::MalformedKey(format!(
                "slice size {}x{} must be nonzero",
                self.slice_width, self.slice_height
            )));
        }
        if self.x_slices == 0 || self.y_slices == 0 {
            return Err(KintsugiError::MalformedKey(format!(
                "slice counts {}x{} must be nonzero",
                self.x_slices, self.y_slices
            )));
        }
        if self.width > KEY_MAX_DIM
            || self.height > KEY_MAX_DIM
            || self.slice_width > KEY_MAX_DIM
            || self.slice_height > KEY_MAX_DIM
        {
            return Err(KintsugiError::MalformedKey(format!(
                "pixel dimensions exceed {KEY_MAX_DIM}"
            )));
        }
        if self.x_slices > KEY_MAX_SLICES || self.y_slices > KEY_MAX_SLICES {
            return Err(KintsugiError::MalformedKey(format!(
                "slice counts {}x{} exceed {KEY_MAX_SLICES}",
                self.x_slices, self.y_slices
            )));
        }
        let expected = self.grid_len();
        if self.order.len() != expected {
            return Err(KintsugiError::MalformedKey(format!(
                "order has {} entries, grid {}x{} needs {}",
                self.order.len(),
                self.x_slices,
                self.y_slices,
                expected
            )));
        }
        if let Some(&s) = self.order.iter().find(|&&s| s as usize >= expected) {
            return Err(KintsugiError::MalformedKey(format!(
                "order entry {s} outside {expected}-cell grid"
            )));
        }
        Ok(())
    }

    /// Width of tiles in the last column. A remainder of zero means the image
    /// divides evenly and the tile is full-sized, never zero-sized.
    pub fn remainder_width(&self) -> u32 {
        match self.width % self.slice_width {
            0 => self.slice_width,
            r => r,
        }
    }

    /// Height of tiles in the last row; same zero-remainder rule as
    /// [`ScrambleKey::remainder_width`].
    pub fn remainder_height(&self) -> u32 {
        match self.height % self.slice_height {
            0 => self.slice_height,
            r => r,
        }
    }

    /// Classify the destination cell at `(row, col)`.
    pub fn category(&self, row: u32, col: u32) -> TileCategory {
        let last_col = col == self.x_slices - 1;
        let last_row = row == self.y_slices - 1;
        match (last_row, last_col) {
            (true, true) => TileCategory::Corner,
            (false, true) => TileCategory::RightEdge,
            (true, false) => TileCategory::BottomEdge,
            (false, false) => TileCategory::Interior,
        }
    }

    /// Pixel size of the tile destined for `(row, col)`.
    pub fn tile_size(&self, row: u32, col: u32) -> (u32, u32) {
        let w = if col == self.x_slices - 1 {
            self.remainder_width()
        } else {
            self.slice_width
        };
        let h = if row == self.y_slices - 1 {
            self.remainder_height()
        } else {
            self.slice_height
        };
        (w, h)
    }
}

// ---------------------------------------------------------------------------
// Packed-source cursor
// ---------------------------------------------------------------------------

/// Read cursor over the packed regions of the scrambled source bitmap.
///
/// The source packs tiles into four disjoint regions (interior block,
/// right-edge stack, bottom-edge stack, corner). Within a region, tiles are
/// stored in the order they are encountered while walking `order`, so each
/// region gets its own counter. Counters are per-reconstruction state: use a
/// fresh cursor for every call.
#[derive(Debug, Default)]
pub struct PackedCursor {
    interior: u32,
    right_edge: u32,
    bottom_edge: u32,
}

impl PackedCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source origin of the next tile of `category`, consuming one slot from
    /// that region.
    pub fn next_origin(&mut self, category: TileCategory, key: &ScrambleKey) -> (u32, u32) {
        let sw = key.slice_width;
        let sh = key.slice_height;
        match category {
            TileCategory::Corner => ((key.x_slices - 1) * sw, (key.y_slices - 1) * sh),
            TileCategory::RightEdge => {
                let n = self.right_edge;
                self.right_edge += 1;
                ((key.x_slices - 1) * sw, n * sh)
            }
            TileCategory::BottomEdge => {
                let n = self.bottom_edge;
                self.bottom_edge += 1;
                (n * sw, (key.y_slices - 1) * sh)
            }
            TileCategory::Interior => {
                // Interior cells only exist when x_slices >= 2, so the
                // column count below is never zero.
                let cols = key.x_slices - 1;
                let r = self.interior / cols;
                let c = self.interior % cols;
                self.interior += 1;
                (c * sw, r * sh)
            }
        }
    }

    /// Tiles consumed so far as `(interior, right_edge, bottom_edge)`.
    pub fn counts(&self) -> (u32, u32, u32) {
        (self.interior, self.right_edge, self.bottom_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_key;

    #[test]
    fn wire_field_names_round_trip() {
        let json = r#"{
            "width": 100, "height": 100,
            "xSlices": 3, "ySlices": 3,
            "sliceWidth": 40, "sliceHeight": 40,
            "slices": [8, 7, 6, 5, 4, 3, 2, 1, 0]
        }"#;
        let key: ScrambleKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.x_slices, 3);
        assert_eq!(key.slice_height, 40);
        assert_eq!(key.order, vec![8, 7, 6, 5, 4, 3, 2, 1, 0]);
        key.validate().unwrap();
    }

    #[test]
    fn validate_rejects_order_length_mismatch() {
        let mut key = make_key(100, 100, 3, 3, 40, 40);
        key.order.pop();
        let err = key.validate().unwrap_err();
        assert!(matches!(err, KintsugiError::MalformedKey(_)), "{err}");
    }

    #[test]
    fn validate_rejects_out_of_grid_entry() {
        let mut key = make_key(100, 100, 3, 3, 40, 40);
        key.order[4] = 9;
        assert!(key.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_geometry() {
        for f in [
            |k: &mut ScrambleKey| k.width = 0,
            |k: &mut ScrambleKey| k.slice_height = 0,
            |k: &mut ScrambleKey| k.x_slices = 0,
        ] {
            let mut key = make_key(100, 100, 3, 3, 40, 40);
            f(&mut key);
            assert!(key.validate().is_err());
        }
    }

    #[test]
    fn validate_rejects_absurd_geometry() {
        let mut key = make_key(100, 100, 3, 3, 40, 40);
        key.width = KEY_MAX_DIM + 1;
        assert!(key.validate().is_err());

        let mut key = make_key(100, 100, 3, 3, 40, 40);
        key.x_slices = u32::MAX;
        assert!(key.validate().is_err());
    }

    #[test]
    fn remainder_zero_means_full_slice() {
        // 120 divides evenly by 40: edge tiles are full-sized.
        let key = make_key(120, 120, 3, 3, 40, 40);
        assert_eq!(key.remainder_width(), 40);
        assert_eq!(key.remainder_height(), 40);
        assert_eq!(key.tile_size(2, 2), (40, 40));
    }

    #[test]
    fn remainder_tiles_are_smaller() {
        let key = make_key(100, 100, 3, 3, 40, 40);
        assert_eq!(key.remainder_width(), 20);
        assert_eq!(key.tile_size(0, 0), (40, 40));
        assert_eq!(key.tile_size(0, 2), (20, 40));
        assert_eq!(key.tile_size(2, 0), (40, 20));
        assert_eq!(key.tile_size(2, 2), (20, 20));
    }

    #[test]
    fn category_covers_all_cells() {
        let key = make_key(100, 100, 3, 3, 40, 40);
        assert_eq!(key.category(0, 0), TileCategory::Interior);
        assert_eq!(key.category(1, 2), TileCategory::RightEdge);
        assert_eq!(key.category(2, 1), TileCategory::BottomEdge);
        assert_eq!(key.category(2, 2), TileCategory::Corner);
    }

    #[test]
    fn category_partition_counts() {
        // Any grid with both axes >= 2 splits into (x-1)(y-1) interior,
        // y-1 right-edge, x-1 bottom-edge, and exactly one corner cell.
        for (xs, ys) in [(2u32, 2u32), (3, 3), (4, 2), (2, 5), (6, 4)] {
            let key = make_key(xs * 40, ys * 40, xs, ys, 40, 40);
            let mut counts = [0u32; 4];
            for row in 0..ys {
                for col in 0..xs {
                    let idx = match key.category(row, col) {
                        TileCategory::Interior => 0,
                        TileCategory::RightEdge => 1,
                        TileCategory::BottomEdge => 2,
                        TileCategory::Corner => 3,
                    };
                    counts[idx] += 1;
                }
            }
            assert_eq!(
                counts,
                [(xs - 1) * (ys - 1), ys - 1, xs - 1, 1],
                "grid {xs}x{ys}"
            );
        }
    }

    #[test]
    fn single_column_grid_has_no_interior() {
        // x_slices == 1: every cell is last-column, so nothing may ever
        // classify as Interior (whose origin math divides by x_slices - 1).
        let key = make_key(40, 100, 1, 3, 40, 40);
        assert_eq!(key.category(0, 0), TileCategory::RightEdge);
        assert_eq!(key.category(1, 0), TileCategory::RightEdge);
        assert_eq!(key.category(2, 0), TileCategory::Corner);
    }

    #[test]
    fn single_row_grid_has_no_interior() {
        let key = make_key(100, 40, 3, 1, 40, 40);
        assert_eq!(key.category(0, 0), TileCategory::BottomEdge);
        assert_eq!(key.category(0, 2), TileCategory::Corner);
    }

    #[test]
    fn cursor_walks_each_region_independently() {
        let key = make_key(100, 100, 3, 3, 40, 40);
        let mut cur = PackedCursor::new();

        // Interior block is row-major over x_slices - 1 columns.
        assert_eq!(cur.next_origin(TileCategory::Interior, &key), (0, 0));
        assert_eq!(cur.next_origin(TileCategory::Interior, &key), (40, 0));
        assert_eq!(cur.next_origin(TileCategory::Interior, &key), (0, 40));
        // Right-edge stack sits at the last slice column, top to bottom.
        assert_eq!(cur.next_origin(TileCategory::RightEdge, &key), (80, 0));
        assert_eq!(cur.next_origin(TileCategory::RightEdge, &key), (80, 40));
        // Bottom-edge stack sits at the last slice row, left to right.
        assert_eq!(cur.next_origin(TileCategory::BottomEdge, &key), (0, 80));
        assert_eq!(cur.next_origin(TileCategory::BottomEdge, &key), (40, 80));
        // Corner is fixed and consumes no counter.
        assert_eq!(cur.next_origin(TileCategory::Corner, &key), (80, 80));
        assert_eq!(cur.next_origin(TileCategory::Corner, &key), (80, 80));

        assert_eq!(cur.counts(), (3, 2, 2));
    }
}
