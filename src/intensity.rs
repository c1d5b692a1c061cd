use image::DynamicImage;

use crate::error::{Result, SignatureError};

/// Rec. 709 luma weights for red, green and blue.
const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/**
 * A borrowed, row-major `height x width x channels` pixel array as handed over
 * by a decoder. Supported layouts are gray (1), gray + alpha (2), RGB (3) and
 * RGBA (4). Alpha never contributes to intensity.
 */
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a, T> {
    data: &'a [T],
    height: usize,
    width: usize,
    channels: usize,
}

impl<'a, T: Copy + Into<f64>> PixelBuffer<'a, T> {
    pub fn new(data: &'a [T], height: usize, width: usize, channels: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(SignatureError::InvalidBuffer(format!(
                "empty {}x{} image",
                height, width
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(SignatureError::InvalidBuffer(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        if data.len() != height * width * channels {
            return Err(SignatureError::InvalidBuffer(format!(
                "expected {} samples for {}x{}x{}, got {}",
                height * width * channels,
                height,
                width,
                channels,
                data.len()
            )));
        }
        Ok(Self {
            data,
            height,
            width,
            channels,
        })
    }

    /// Single-channel buffer.
    pub fn gray(data: &'a [T], height: usize, width: usize) -> Result<Self> {
        Self::new(data, height, width, 1)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn intensity_at(&self, index: usize) -> f64 {
        let px = &self.data[index * self.channels..(index + 1) * self.channels];
        match self.channels {
            1 | 2 => px[0].into(),
            _ => px
                .iter()
                .zip(LUMA_WEIGHTS)
                .map(|(c, w)| Into::<f64>::into(*c) * w)
                .sum(),
        }
    }
}

/// Owned single-channel intensities, row-major. Every value is finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityMap {
    height: usize,
    width: usize,
    values: Vec<f64>,
}

impl IntensityMap {
    pub fn new(values: Vec<f64>, height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 || values.len() != height * width {
            return Err(SignatureError::InvalidBuffer(format!(
                "{} values do not form a non-empty {}x{} map",
                values.len(),
                height,
                width
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.) {
            return Err(SignatureError::InvalidBuffer(format!(
                "intensity {} is not a finite non-negative number",
                bad
            )));
        }
        // every gradient sum is bounded by twice the total intensity
        if !(values.iter().sum::<f64>() * 2.).is_finite() {
            return Err(SignatureError::InvalidBuffer(
                "intensities too large to accumulate".to_string(),
            ));
        }
        Ok(Self {
            height,
            width,
            values,
        })
    }

    /// Collapses every pixel of `buffer` to a single intensity.
    pub fn from_buffer<T: Copy + Into<f64>>(buffer: &PixelBuffer<'_, T>) -> Result<Self> {
        let values = (0..buffer.height * buffer.width)
            .map(|i| buffer.intensity_at(i))
            .collect();
        Self::new(values, buffer.height, buffer.width)
    }

    /// Intensities of a decoded image, taken from its 8-bit RGB form.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let buffer = PixelBuffer::new(rgb.as_raw(), height as usize, width as usize, 3)?;
        Self::from_buffer(&buffer)
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width + col]
    }

    /// A view over the whole map.
    pub fn view(&self) -> IntensityView<'_> {
        IntensityView {
            map: self,
            top: 0,
            left: 0,
            height: self.height,
            width: self.width,
        }
    }
}

/// A read-only rectangle inside an [`IntensityMap`].
#[derive(Debug, Clone, Copy)]
pub struct IntensityView<'a> {
    map: &'a IntensityMap,
    top: usize,
    left: usize,
    height: usize,
    width: usize,
}

impl<'a> IntensityView<'a> {
    /// Sub-rectangle relative to this view. Callers guarantee it is non-empty
    /// and in bounds.
    pub(crate) fn sub(&self, top: usize, left: usize, height: usize, width: usize) -> Self {
        debug_assert!(height > 0 && width > 0);
        debug_assert!(top + height <= self.height && left + width <= self.width);
        Self {
            map: self.map,
            top: self.top + top,
            left: self.left + left,
            height,
            width,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Offset of the view's top-left pixel inside the underlying map.
    pub fn origin(&self) -> (usize, usize) {
        (self.top, self.left)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.map.get(self.top + row, self.left + col)
    }
}
