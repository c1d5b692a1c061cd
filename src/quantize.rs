use crate::percentile::percentile;

/**
 * Maps a signed difference to one of `2 * num_levels + 1` levels in
 * `-num_levels..=num_levels`.
 *
 * Each side of `[negative_cut, positive_cut]` is cut into zones of width
 * `cut / (num_levels + 0.5)`, so that level 0 straddles zero and the outermost
 * level ends at the cut. The level is the zone index, rounded half away from
 * zero; anything past a cut saturates.
 */
pub fn normalize(num_levels: u8, positive_cut: f64, negative_cut: f64, value: f64) -> i8 {
    let levels = num_levels.min(i8::MAX as u8) as i8;
    let cut = match value >= 0. {
        true => positive_cut,
        false => -negative_cut,
    };
    if value == 0. {
        return 0;
    }
    if cut <= 0. {
        return levels * value.signum() as i8;
    }
    let width = cut / (f64::from(levels) + 0.5);
    let level = (value / width).round();
    level.clamp(-f64::from(levels), f64::from(levels)) as i8
}

/// Zeroes every difference whose magnitude is at or below `tolerance`, so
/// that noise on flat regions reads as "same".
pub fn suppress_identical(table: &[Vec<f64>], tolerance: f64) -> Vec<Vec<f64>> {
    table
        .iter()
        .map(|point| {
            point
                .iter()
                .map(|v| match v.abs() <= tolerance {
                    true => 0.,
                    false => *v,
                })
                .collect()
        })
        .collect()
}

/// Per-image cut points, derived once from every non-zero difference of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub positive_cut: f64,
    pub negative_cut: f64,
}

impl Thresholds {
    /// First pass: the `cut_percentile`-th and `(100 - cut_percentile)`-th
    /// percentiles of the flattened difference table. Zero entries do not
    /// take part; a table of zeros gives zero cuts.
    pub fn from_differences(table: &[Vec<f64>], cut_percentile: f64) -> Self {
        let all: Vec<f64> = table
            .iter()
            .flatten()
            .copied()
            .filter(|v| *v != 0.)
            .collect();
        Self {
            positive_cut: percentile(&all, cut_percentile).unwrap_or(0.),
            negative_cut: percentile(&all, 100. - cut_percentile).unwrap_or(0.),
        }
    }

    /// Second pass: quantize every entry, keeping the table's shape.
    pub fn quantize(&self, table: &[Vec<f64>], num_levels: u8) -> Vec<Vec<i8>> {
        table
            .iter()
            .map(|point| {
                point
                    .iter()
                    .map(|v| normalize(num_levels, self.positive_cut, self.negative_cut, *v))
                    .collect()
            })
            .collect()
    }
}
