use image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::SignatureConfig;
use crate::crop::auto_crop_with_min;
use crate::error::{Result, SignatureError};
use crate::grid::{grid_averages, neighbor_differences};
use crate::intensity::{IntensityMap, PixelBuffer};
use crate::linalg::{diff_norm, norm};
use crate::quantize::{suppress_identical, Thresholds};

/// Distances below this usually mean the same picture.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.4;

/**
 * Quantized neighbor differences of every grid sample point, row-major.
 * Serializes as a plain array of arrays.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    points: Vec<Vec<i8>>,
}

impl Signature {
    pub fn from_points(points: Vec<Vec<i8>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vec<i8>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of quantized values over all points.
    pub fn value_count(&self) -> usize {
        self.points.iter().map(Vec::len).sum()
    }

    fn flatten(&self) -> Vec<f64> {
        self.points.iter().flatten().map(|v| f64::from(*v)).collect()
    }

    pub fn distance(&self, other: &Signature) -> Result<f64> {
        distance(self, other)
    }

    pub fn is_near_duplicate(&self, other: &Signature, threshold: f64) -> Result<bool> {
        Ok(distance(self, other)? < threshold)
    }
}

/**
 * Signature of `buffer` with the default 9x9 grid, cropping at the
 * `lower`/`upper` percentiles. See [`generate_grid`] for other grid sizes and
 * [`generate_with`] for full control.
 */
pub fn generate<T: Copy + Into<f64>>(
    buffer: &PixelBuffer<'_, T>,
    lower: f64,
    upper: f64,
) -> Result<Signature> {
    generate_with(buffer, &SignatureConfig::with_crop(lower, upper))
}

/// [`generate`] with `grid_size x grid_size` sample points.
pub fn generate_grid<T: Copy + Into<f64>>(
    buffer: &PixelBuffer<'_, T>,
    lower: f64,
    upper: f64,
    grid_size: usize,
) -> Result<Signature> {
    let config = SignatureConfig {
        grid_size,
        ..SignatureConfig::with_crop(lower, upper)
    };
    generate_with(buffer, &config)
}

pub fn generate_with<T: Copy + Into<f64>>(
    buffer: &PixelBuffer<'_, T>,
    config: &SignatureConfig,
) -> Result<Signature> {
    config.validate()?;
    sign_map(&IntensityMap::from_buffer(buffer)?, config)
}

pub fn generate_from_image(image: &DynamicImage, config: &SignatureConfig) -> Result<Signature> {
    config.validate()?;
    sign_map(&IntensityMap::from_image(image)?, config)
}

pub fn generate_from_map(map: &IntensityMap, config: &SignatureConfig) -> Result<Signature> {
    config.validate()?;
    sign_map(map, config)
}

/// The pipeline proper; `config` is already validated.
fn sign_map(map: &IntensityMap, config: &SignatureConfig) -> Result<Signature> {
    let bands = config.grid_size + 1;

    let cropped = auto_crop_with_min(
        map.view(),
        config.lower_percentile,
        config.upper_percentile,
        bands,
    )?;
    debug!(
        "cropped {}x{} to {}x{} at {:?}",
        map.height(),
        map.width(),
        cropped.height(),
        cropped.width(),
        cropped.origin()
    );

    let averages = grid_averages(cropped, bands, bands)?;
    let differences = suppress_identical(
        &neighbor_differences(&averages),
        config.identical_tolerance,
    );
    let thresholds = Thresholds::from_differences(&differences, config.cut_percentile);
    debug!(
        "cuts {:.3} / {:.3} over {} points",
        thresholds.negative_cut,
        thresholds.positive_cut,
        differences.len()
    );

    Ok(Signature {
        points: thresholds.quantize(&differences, config.num_levels),
    })
}

/**
 * Compares two signatures and returns `|a - b| / (|a| + |b|)`, a value in
 * `[0, 1]` where 0 is identical. Two all-zero signatures are at distance 0.
 */
pub fn distance(first: &Signature, second: &Signature) -> Result<f64> {
    if first.len() != second.len() {
        return Err(SignatureError::ShapeMismatch(format!(
            "{} points vs {} points",
            first.len(),
            second.len()
        )));
    }
    if let Some((i, (a, b))) = first
        .points
        .iter()
        .zip(&second.points)
        .enumerate()
        .find(|(_, (a, b))| a.len() != b.len())
    {
        return Err(SignatureError::ShapeMismatch(format!(
            "point {} has {} values vs {}",
            i,
            a.len(),
            b.len()
        )));
    }

    let (a, b) = (first.flatten(), second.flatten());
    let numerator = diff_norm(&a, &b).map_err(SignatureError::ShapeMismatch)?;
    let denominator = norm(a) + norm(b);
    match denominator == 0. {
        true => Ok(0.),
        false => Ok(numerator / denominator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn random_signature(rng: &mut Xoshiro256PlusPlus, arities: &[usize]) -> Signature {
        Signature::from_points(
            arities
                .iter()
                .map(|n| (0..*n).map(|_| rng.random_range(-2..=2i8)).collect())
                .collect(),
        )
    }

    #[test]
    fn worked_example() {
        let s1 = Signature::from_points(vec![vec![2, 3], vec![1, 1], vec![1]]);
        let s2 = Signature::from_points(vec![vec![4, 2], vec![1, 2], vec![1]]);
        let expected = (4_f64 + 1. + 0. + 1. + 0.).sqrt() / (4. + 26_f64.sqrt());
        assert!((distance(&s1, &s2).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn self_distance_is_zero() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let sig = random_signature(&mut rng, &[3, 5, 8, 5, 3]);
        assert_eq!(distance(&sig, &sig).unwrap(), 0.);
    }

    #[test]
    fn symmetric_and_bounded() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12);
        let arities = [3, 5, 5, 8, 8, 5, 3];
        for _ in 0..200 {
            let a = random_signature(&mut rng, &arities);
            let b = random_signature(&mut rng, &arities);
            let ab = distance(&a, &b).unwrap();
            assert_eq!(ab, distance(&b, &a).unwrap());
            assert!((0. ..=1.).contains(&ab), "{}", ab);
        }
    }

    #[test]
    fn all_zero_signatures() {
        let zero = Signature::from_points(vec![vec![0; 3], vec![0; 5]]);
        assert_eq!(distance(&zero, &zero.clone()).unwrap(), 0.);
        let one = Signature::from_points(vec![vec![0, 0, 1], vec![0; 5]]);
        assert_eq!(distance(&zero, &one).unwrap(), 1.);
    }

    #[test]
    fn negation_is_maximal() {
        let a = Signature::from_points(vec![vec![2, -1, 0], vec![1, 1]]);
        let b = Signature::from_points(vec![vec![-2, 1, 0], vec![-1, -1]]);
        assert!((distance(&a, &b).unwrap() - 1.).abs() < 1e-12);
        assert!(!a.is_near_duplicate(&b, NEAR_DUPLICATE_THRESHOLD).unwrap());
    }

    #[test]
    fn shape_mismatch() {
        let a = Signature::from_points(vec![vec![1, 2], vec![1]]);
        let fewer = Signature::from_points(vec![vec![1, 2]]);
        let wrong_arity = Signature::from_points(vec![vec![1], vec![1, 2]]);
        assert!(matches!(
            distance(&a, &fewer),
            Err(SignatureError::ShapeMismatch(_))
        ));
        assert!(matches!(
            distance(&a, &wrong_arity),
            Err(SignatureError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn serializes_as_nested_arrays() {
        let sig = Signature::from_points(vec![vec![0, -2, 1], vec![2]]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "[[0,-2,1],[2]]");
        assert_eq!(serde_json::from_str::<Signature>(&json).unwrap(), sig);
    }

    #[test]
    fn generated_shape() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let data: Vec<u8> = (0..120 * 90).map(|_| rng.random()).collect();
        let buffer = PixelBuffer::gray(&data, 90, 120).unwrap();
        let sig = generate(&buffer, 5., 95.).unwrap();
        assert_eq!(sig.len(), 81);
        assert_eq!(sig.value_count(), 4 * 3 + 4 * 7 * 5 + 7 * 7 * 8);
        assert!(sig.points().iter().flatten().all(|v| (-2..=2).contains(v)));
        for (i, point) in sig.points().iter().enumerate() {
            let edges = [i / 9 == 0 || i / 9 == 8, i % 9 == 0 || i % 9 == 8];
            let expected = match edges.iter().filter(|e| **e).count() {
                2 => 3,
                1 => 5,
                _ => 8,
            };
            assert_eq!(point.len(), expected);
        }
    }

    #[test]
    fn custom_grid_size() {
        let data: Vec<f32> = (0..64 * 64).map(|i| ((i * 7) % 251) as f32).collect();
        let buffer = PixelBuffer::gray(&data, 64, 64).unwrap();
        let config = SignatureConfig {
            grid_size: 5,
            ..Default::default()
        };
        assert_eq!(generate_with(&buffer, &config).unwrap().len(), 25);
    }

    #[test]
    fn grid_size_shortcut() {
        let data: Vec<u16> = (0..80 * 70).map(|i| ((i * 31) % 1009) as u16).collect();
        let buffer = PixelBuffer::gray(&data, 80, 70).unwrap();
        let sig = generate_grid(&buffer, 5., 95., 4).unwrap();
        assert_eq!(sig.len(), 16);
        assert_eq!(sig.value_count(), 4 * 3 + 8 * 5 + 4 * 8);
        assert_eq!(generate_grid(&buffer, 5., 95., 9).unwrap(), generate(&buffer, 5., 95.).unwrap());
        assert!(matches!(
            generate_grid(&buffer, 5., 95., 0),
            Err(SignatureError::InvalidGrid { .. })
        ));
    }

    fn noisy_blank_page(seed: u64) -> Vec<u8> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        (0..120 * 120).map(|_| 200 + rng.random_range(0..=1u8)).collect()
    }

    #[test]
    fn noisy_blank_pages_are_near_duplicates() {
        let (first, second) = (noisy_blank_page(1), noisy_blank_page(2));
        let a = generate(&PixelBuffer::gray(&first, 120, 120).unwrap(), 5., 95.).unwrap();
        let b = generate(&PixelBuffer::gray(&second, 120, 120).unwrap(), 5., 95.).unwrap();
        assert!(a.points().iter().flatten().all(|v| *v == 0));
        let d = distance(&a, &b).unwrap();
        assert!(d < NEAR_DUPLICATE_THRESHOLD, "distance {}", d);
        assert!(a.is_near_duplicate(&b, NEAR_DUPLICATE_THRESHOLD).unwrap());
    }

    #[test]
    fn negative_tolerance_keeps_faint_noise() {
        let page = noisy_blank_page(1);
        let config = SignatureConfig {
            identical_tolerance: -1.,
            ..Default::default()
        };
        let sig = generate_with(&PixelBuffer::gray(&page, 120, 120).unwrap(), &config).unwrap();
        assert!(sig.points().iter().flatten().any(|v| *v != 0));
    }

    #[test]
    fn uniform_image_has_zero_signature() {
        let data = vec![77u8; 40 * 40];
        let sig = generate(&PixelBuffer::gray(&data, 40, 40).unwrap(), 5., 95.).unwrap();
        assert_eq!(sig.len(), 81);
        assert!(sig.points().iter().flatten().all(|v| *v == 0));
    }

    #[test]
    fn generate_errors_surface() {
        let data = vec![1u8; 8 * 8];
        let small = PixelBuffer::gray(&data, 8, 8).unwrap();
        assert!(matches!(
            generate(&small, 5., 95.),
            Err(SignatureError::DegenerateCrop { .. })
        ));
        assert!(matches!(
            generate(&small, 95., 5.),
            Err(SignatureError::InvalidRange { .. })
        ));
    }

    #[test]
    fn every_entry_point_checks_the_config_first() {
        let no_grid = SignatureConfig {
            grid_size: 0,
            ..Default::default()
        };
        let map = IntensityMap::new(vec![3.; 16 * 16], 16, 16).unwrap();
        assert!(matches!(
            generate_from_map(&map, &no_grid),
            Err(SignatureError::InvalidGrid { .. })
        ));
        let image = DynamicImage::new_luma8(16, 16);
        assert!(matches!(
            generate_from_image(&image, &SignatureConfig::with_crop(80., 20.)),
            Err(SignatureError::InvalidRange { .. })
        ));
        // a bad config wins over a bad buffer
        let huge = vec![f64::MAX; 4];
        assert!(matches!(
            generate_with(&PixelBuffer::gray(&huge, 2, 2).unwrap(), &no_grid),
            Err(SignatureError::InvalidGrid { .. })
        ));
    }
}
