use serde::{Deserialize, Serialize};

use crate::crop::check_range;
use crate::error::{Result, SignatureError};

/// Tunables of the signature pipeline. The defaults give 81-point signatures
/// over the levels -2..=2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Lower percentile of the crop band.
    pub lower_percentile: f64,
    /// Upper percentile of the crop band.
    pub upper_percentile: f64,
    /// Sample points per axis.
    pub grid_size: usize,
    /// Levels per sign.
    pub num_levels: u8,
    /// Percentile of all differences that becomes the positive cut; its
    /// mirror `100 - cut_percentile` becomes the negative cut.
    pub cut_percentile: f64,
    /// Differences of at most this magnitude count as "same" and never take
    /// part in the cuts. A negative value keeps every difference.
    pub identical_tolerance: f64,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            lower_percentile: 5.,
            upper_percentile: 95.,
            grid_size: 9,
            num_levels: 2,
            cut_percentile: 95.,
            identical_tolerance: 2.,
        }
    }
}

impl SignatureConfig {
    pub fn with_crop(lower_percentile: f64, upper_percentile: f64) -> Self {
        Self {
            lower_percentile,
            upper_percentile,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_range(self.lower_percentile, self.upper_percentile)?;
        if !(0. ..=100.).contains(&self.cut_percentile) {
            return Err(SignatureError::InvalidRange {
                lower: 100. - self.cut_percentile,
                upper: self.cut_percentile,
            });
        }
        if self.grid_size == 0 {
            return Err(SignatureError::InvalidGrid {
                rows: 0,
                cols: 0,
                height: 0,
                width: 0,
            });
        }
        Ok(())
    }
}
