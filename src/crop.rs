use log::trace;

use crate::error::{Result, SignatureError};
use crate::intensity::IntensityView;
use crate::percentile::{count_at_or_below, count_below, percentile_of_sorted};

/// Inclusive range of kept rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    first: usize,
    last: usize,
}

impl Span {
    fn len(&self) -> usize {
        self.last + 1 - self.first
    }
}

pub(crate) fn check_range(lower: f64, upper: f64) -> Result<()> {
    // NaN fails every comparison, so it lands here too
    if !(lower >= 0. && upper <= 100. && lower < upper) {
        return Err(SignatureError::InvalidRange { lower, upper });
    }
    Ok(())
}

/**
 * Trims low-content borders from `view`. Rows are trimmed first, then columns,
 * each axis independently of the other.
 *
 * `lower` and `upper` are percentiles of the cumulative absolute-gradient
 * profile along the axis: the kept band starts where that profile leaves its
 * `lower` percentile and ends where it reaches its `upper` percentile.
 */
pub fn auto_crop(view: IntensityView<'_>, lower: f64, upper: f64) -> Result<IntensityView<'_>> {
    auto_crop_with_min(view, lower, upper, 1)
}

/// [`auto_crop`] that never shrinks an axis below `min_extent` pixels.
pub fn auto_crop_with_min(
    view: IntensityView<'_>,
    lower: f64,
    upper: f64,
    min_extent: usize,
) -> Result<IntensityView<'_>> {
    check_range(lower, upper)?;
    let min_extent = min_extent.max(1);
    if view.height() < min_extent || view.width() < min_extent {
        return Err(SignatureError::DegenerateCrop {
            height: view.height(),
            width: view.width(),
            min_extent,
        });
    }

    let rows = crop_span(&row_profile(&view), lower, upper, min_extent);
    let cols = crop_span(&column_profile(&view), lower, upper, min_extent);
    trace!(
        "crop {}x{} -> rows {:?}, cols {:?}",
        view.height(),
        view.width(),
        rows,
        cols
    );
    Ok(view.sub(rows.first, cols.first, rows.len(), cols.len()))
}

/// Sum of absolute horizontal differences of every row.
fn row_profile(view: &IntensityView<'_>) -> Vec<f64> {
    (0..view.height())
        .map(|r| {
            (1..view.width())
                .map(|c| (view.get(r, c) - view.get(r, c - 1)).abs())
                .sum()
        })
        .collect()
}

/// Sum of absolute vertical differences of every column.
fn column_profile(view: &IntensityView<'_>) -> Vec<f64> {
    (0..view.width())
        .map(|c| {
            (1..view.height())
                .map(|r| (view.get(r, c) - view.get(r - 1, c)).abs())
                .sum()
        })
        .collect()
}

fn crop_span(profile: &[f64], lower: f64, upper: f64, min_extent: usize) -> Span {
    let extent = profile.len();
    // Running totals never decrease, so they are already sorted.
    let cumulative: Vec<f64> = profile
        .iter()
        .scan(0., |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect();

    let first = count_at_or_below(&cumulative, percentile_of_sorted(&cumulative, lower));
    let last = count_below(&cumulative, percentile_of_sorted(&cumulative, upper));

    let span = match first <= last && last < extent {
        true => Span { first, last },
        false => fallback_span(extent, lower, upper),
    };
    widen(span, min_extent, extent)
}

/// Fixed-fraction crop used when the gradient profile has no usable band.
fn fallback_span(extent: usize, lower: f64, upper: f64) -> Span {
    let at = |p: f64| (((p / 100.) * extent as f64).floor() as usize).min(extent - 1);
    Span {
        first: at(lower),
        last: at(upper),
    }
}

/// Grows `span` around its center to `min_extent`, staying inside `extent`.
fn widen(span: Span, min_extent: usize, extent: usize) -> Span {
    if span.len() >= min_extent {
        return span;
    }
    let center = (span.first + span.last) / 2;
    let first = center
        .saturating_sub((min_extent - 1) / 2)
        .min(extent - min_extent);
    Span {
        first,
        last: first + min_extent - 1,
    }
}
