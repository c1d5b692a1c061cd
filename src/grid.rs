use crate::error::{Result, SignatureError};
use crate::intensity::IntensityView;

/// Compass offsets `(row, col)` in signature order: N, NE, E, SE, S, SW, W, NW.
pub const NEIGHBORS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
];

/// Mean intensity around each interior sample point, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAverages {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl GridAverages {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    fn neighbor(&self, row: usize, col: usize, (dr, dc): (isize, isize)) -> Option<f64> {
        let r = row.checked_add_signed(dr).filter(|r| *r < self.rows)?;
        let c = col.checked_add_signed(dc).filter(|c| *c < self.cols)?;
        Some(self.get(r, c))
    }
}

/// Side of the square averaged around each sample point.
pub fn block_size(height: usize, width: usize) -> usize {
    let scaled = (0.5 + height.min(width) as f64 / 20.).floor() as usize;
    scaled.max(2)
}

/// Half-open range of a block anchored at `center`, clipped to `extent`.
fn block_range(center: usize, size: usize, extent: usize) -> std::ops::Range<usize> {
    let start = (center + 1).saturating_sub(size / 2);
    let end = (center + 1 + size - size / 2).min(extent);
    start..end
}

/**
 * Splits `view` into `rows x cols` equal bands and averages a small block at
 * every interior band corner, giving a `(rows - 1) x (cols - 1)` matrix.
 *
 * Sample `(i, j)` sits at pixel `((i + 1) * height / rows, (j + 1) * width / cols)`.
 * Blocks that run past the bottom or right edge only average what is in bounds.
 */
pub fn grid_averages(view: IntensityView<'_>, rows: usize, cols: usize) -> Result<GridAverages> {
    let (height, width) = (view.height(), view.width());
    if rows < 2 || cols < 2 || rows > height || cols > width {
        return Err(SignatureError::InvalidGrid {
            rows,
            cols,
            height,
            width,
        });
    }

    let size = block_size(height, width);
    let mut values = Vec::with_capacity((rows - 1) * (cols - 1));
    for i in 1..rows {
        let row_block = block_range(i * height / rows, size, height);
        for j in 1..cols {
            let col_block = block_range(j * width / cols, size, width);
            let mut sum = 0.;
            for r in row_block.clone() {
                for c in col_block.clone() {
                    sum += view.get(r, c);
                }
            }
            values.push(sum / (row_block.len() * col_block.len()) as f64);
        }
    }

    Ok(GridAverages {
        rows: rows - 1,
        cols: cols - 1,
        values,
    })
}

/**
 * For every grid cell, `neighbor - center` towards each in-grid compass
 * neighbor in [`NEIGHBORS`] order. Corners get 3 entries, edges 5, the
 * interior 8.
 */
pub fn neighbor_differences(averages: &GridAverages) -> Vec<Vec<f64>> {
    let mut table = Vec::with_capacity(averages.rows * averages.cols);
    for row in 0..averages.rows {
        for col in 0..averages.cols {
            let center = averages.get(row, col);
            table.push(
                NEIGHBORS
                    .iter()
                    .filter_map(|d| averages.neighbor(row, col, *d))
                    .map(|n| n - center)
                    .collect(),
            );
        }
    }
    table
}
