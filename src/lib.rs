//! Perceptual image signatures for near-duplicate detection.
//!
//! An image is reduced to intensities, its low-content borders are cropped,
//! a 9x9 grid of local averages is sampled, and the differences between
//! neighboring samples are quantized to -2..=2. Two signatures are compared
//! with a normalized Euclidean distance in `[0, 1]`.
//!
//! ```no_run
//! use image_signature::{distance, generate, PixelBuffer};
//!
//! # fn pixels() -> (Vec<u8>, Vec<u8>) { unimplemented!() }
//! let (first, second) = pixels();
//! let a = generate(&PixelBuffer::new(&first, 480, 640, 4)?, 5., 95.)?;
//! let b = generate(&PixelBuffer::new(&second, 240, 320, 4)?, 5., 95.)?;
//! println!("{}", distance(&a, &b)?);
//! # Ok::<(), image_signature::SignatureError>(())
//! ```

pub mod config;
pub mod crop;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod intensity;
pub mod linalg;
pub mod percentile;
pub mod quantize;

pub use config::SignatureConfig;
pub use crop::{auto_crop, auto_crop_with_min};
pub use error::{Result, SignatureError};
pub use fingerprint::{
    distance, generate, generate_from_image, generate_from_map, generate_grid, generate_with,
    Signature, NEAR_DUPLICATE_THRESHOLD,
};
pub use grid::{grid_averages, neighbor_differences, GridAverages};
pub use intensity::{IntensityMap, IntensityView, PixelBuffer};
pub use quantize::{normalize, suppress_identical, Thresholds};

#[cfg(test)]
fn scene(width: u32, height: u32) -> image::DynamicImage {
    use std::f64::consts::PI;

    // Resolution independent: everything is a function of the pixel center in [0, 1].
    let img = image::ImageBuffer::from_fn(width, height, |x, y| {
        let u = (x as f64 + 0.5) / width as f64;
        let v = (y as f64 + 0.5) / height as f64;
        let disc = match (u - 0.3).powi(2) + (v - 0.4).powi(2) < 0.04 {
            true => 90.,
            false => 0.,
        };
        let base = 80. + 40. * (3. * PI * u).sin() + 30. * (2. * PI * v).cos();
        let r = (base + disc).clamp(0., 255.) as u8;
        let g = (base + 0.5 * disc + 20. * u).clamp(0., 255.) as u8;
        let b = (base * 0.8 + 40. * v).clamp(0., 255.) as u8;
        image::Rgb([r, g, b])
    });
    image::DynamicImage::ImageRgb8(img)
}

#[test]
fn same_scene_at_two_resolutions_is_near_duplicate() {
    let config = SignatureConfig::default();
    let large = generate_from_image(&scene(320, 240), &config).unwrap();
    let small = generate_from_image(&scene(160, 120), &config).unwrap();
    let d = distance(&large, &small).unwrap();
    assert!(d < NEAR_DUPLICATE_THRESHOLD, "distance {}", d);
    assert!(large.is_near_duplicate(&small, NEAR_DUPLICATE_THRESHOLD).unwrap());
}

#[test]
fn resized_copy_is_near_duplicate() {
    use image::imageops::FilterType;

    let original = scene(300, 200);
    let resized = original.resize_exact(150, 100, FilterType::Triangle);
    let config = SignatureConfig::default();
    let d = distance(
        &generate_from_image(&original, &config).unwrap(),
        &generate_from_image(&resized, &config).unwrap(),
    )
    .unwrap();
    assert!(d < NEAR_DUPLICATE_THRESHOLD, "distance {}", d);
}

#[test]
fn negative_image_is_unrelated() {
    let mut negative = scene(200, 150);
    negative.invert();
    let config = SignatureConfig::default();
    let d = distance(
        &generate_from_image(&scene(200, 150), &config).unwrap(),
        &generate_from_image(&negative, &config).unwrap(),
    )
    .unwrap();
    assert!(d > NEAR_DUPLICATE_THRESHOLD, "distance {}", d);
}

#[test]
fn channel_layouts_agree() {
    let gray: Vec<u8> = (0..50 * 60).map(|i| (2 * (i / 60) + i % 60) as u8).collect();
    let gray_alpha: Vec<u8> = gray.iter().flat_map(|v| [*v, 255]).collect();
    let rgb: Vec<u8> = gray.iter().flat_map(|v| [*v, *v, *v]).collect();

    let a = generate(&PixelBuffer::gray(&gray, 50, 60).unwrap(), 5., 95.).unwrap();
    let b = generate(&PixelBuffer::new(&gray_alpha, 50, 60, 2).unwrap(), 5., 95.).unwrap();
    let c = generate(&PixelBuffer::new(&rgb, 50, 60, 3).unwrap(), 5., 95.).unwrap();
    assert_eq!(a, b);
    assert!(distance(&a, &c).unwrap() < NEAR_DUPLICATE_THRESHOLD);
}

#[test]
fn signatures_are_deterministic() {
    let config = SignatureConfig::default();
    let image = scene(128, 96);
    assert_eq!(
        generate_from_image(&image, &config).unwrap(),
        generate_from_image(&image, &config).unwrap()
    );
}
