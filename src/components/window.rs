use geo::{Coord, Rect};
use itertools::Itertools;

use crate::{errors::Result, intersection::Intersection};

/// Rectangular sub-region of a raster's pixel grid, the unit of I/O.
///
/// Defined by:
///     - `col_off`/`row_off`: coords of the top left pixel of the window,
///         with origin at the top left pixel of the raster.
///     - `width`/`height`: shape in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Coords of the top left pixel of the window.
    pub fn offset(&self) -> (usize, usize) {
        (self.col_off, self.row_off)
    }

    /// (W, H)
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixel area of the window.
    pub fn size(&self) -> usize {
        self.width * self.height
    }

    pub fn rect(&self) -> Rect<usize> {
        let min = Coord {
            x: self.col_off,
            y: self.row_off,
        };
        let max = Coord {
            x: self.col_off + self.width,
            y: self.row_off + self.height,
        };
        Rect::new(min, max)
    }

    pub fn from_rect(rect: Rect<usize>) -> Self {
        let min = rect.min();
        Self {
            col_off: min.x,
            row_off: min.y,
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn intersection(&self, rhs: &Window) -> Result<Window> {
        self.rect().intersection(&rhs.rect()).map(Self::from_rect)
    }

    /// Whether the window lies fully within a raster of the given (W, H).
    pub fn fits_within(&self, bounds: (usize, usize)) -> bool {
        self.width > 0
            && self.height > 0
            && self.col_off + self.width <= bounds.0
            && self.row_off + self.height <= bounds.1
    }
}

/// Row-major partition of a raster extent into blocks of at most `block` shape.
///
/// Windows are mutually non-overlapping and cover the extent exactly once;
/// blocks on the right and bottom edges are clamped.
pub fn block_partition(raster: (usize, usize), block: (usize, usize)) -> Vec<Window> {
    let (width, height) = raster;
    let (block_width, block_height) = block;
    let block_cols = width.div_ceil(block_width);
    let block_rows = height.div_ceil(block_height);
    (0..block_rows)
        .cartesian_product(0..block_cols)
        .map(|(block_row, block_col)| {
            let col_off = block_col * block_width;
            let row_off = block_row * block_height;
            Window::new(
                col_off,
                row_off,
                block_width.min(width - col_off),
                block_height.min(height - row_off),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case((512, 512), (256, 256), 4)]
    #[case((513, 512), (256, 256), 6)]
    #[case((100, 40), (256, 256), 1)]
    #[case((1024, 768), (256, 128), 24)]
    fn partition_counts(
        #[case] raster: (usize, usize),
        #[case] block: (usize, usize),
        #[case] expected: usize,
    ) {
        assert_eq!(block_partition(raster, block).len(), expected);
    }

    #[rstest]
    #[case((512, 512), (256, 256))]
    #[case((513, 511), (256, 256))]
    #[case((300, 200), (128, 64))]
    #[case((7, 5), (4, 4))]
    fn partition_covers_extent_exactly_once(
        #[case] raster: (usize, usize),
        #[case] block: (usize, usize),
    ) {
        let windows = block_partition(raster, block);
        let mut covered = vec![0u8; raster.0 * raster.1];
        for window in &windows {
            assert!(window.fits_within(raster));
            for row in window.row_off..window.row_off + window.height {
                for col in window.col_off..window.col_off + window.width {
                    covered[row * raster.0 + col] += 1;
                }
            }
        }
        assert!(covered.iter().all(|count| *count == 1));
    }

    #[test]
    fn partition_is_row_major() {
        let windows = block_partition((512, 512), (256, 256));
        let offsets: Vec<_> = windows.iter().map(Window::offset).collect();
        assert_eq!(offsets, vec![(0, 0), (256, 0), (0, 256), (256, 256)]);
    }

    #[test]
    fn window_intersection_clamps() {
        let extent = Window::new(0, 0, 512, 512);
        let block = Window::new(384, 384, 256, 256);
        let clamped = block.intersection(&extent).unwrap();
        assert_eq!(clamped, Window::new(384, 384, 128, 128));
    }

    #[test]
    fn disjoint_windows_do_not_intersect() {
        let extent = Window::new(0, 0, 512, 512);
        let outside = Window::new(512, 0, 64, 64);
        assert!(outside.intersection(&extent).is_err());
    }
}
