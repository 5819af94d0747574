use crate::analysis::BucketPowers;
use crate::config::{SpectrumConfig, BINS};

/// Packed 32-bit xRGB frame, row-major with the top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    /// Creates a fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<u32>()
    }

    /// Host-endian byte image, as handed to the video layer.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|pixel| pixel.to_ne_bytes())
            .collect()
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// Rasterises bucket powers into one bar per bucket, growing up from the
/// bottom edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRenderer {
    color: u32,
}

impl Default for BarRenderer {
    fn default() -> Self {
        Self::new(&SpectrumConfig::default())
    }
}

impl BarRenderer {
    pub fn new(config: &SpectrumConfig) -> Self {
        Self {
            color: config.bar_color,
        }
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    /// Renders a fresh bitmap of the requested size.
    pub fn render(&self, powers: &BucketPowers, width: u32, height: u32) -> Bitmap {
        let mut bitmap = Bitmap::new(width, height);
        self.render_into(powers, &mut bitmap);
        bitmap
    }

    /// Overwrites `bitmap` with the bars for `powers`.
    pub fn render_into(&self, powers: &BucketPowers, bitmap: &mut Bitmap) {
        bitmap.clear();

        let width = bitmap.width as usize;
        let height = bitmap.height as usize;
        let (bar_spacing, bar_width) = bar_geometry(bitmap.width);
        if bar_width == 0 || height == 0 {
            return;
        }

        for (bucket, &power) in powers.iter().enumerate() {
            let bar_height = bar_height(power, bitmap.height);
            let left = (bucket * bar_spacing).min(width);
            let right = (left + bar_width).min(width);

            for y in 0..bar_height {
                let row = (height - y - 1) * width;
                bitmap.pixels[row + left..row + right].fill(self.color);
            }
        }
    }
}

/// Horizontal distance between bar origins and the width of each bar.
pub fn bar_geometry(width: u32) -> (usize, usize) {
    let bar_spacing = width as usize / BINS;
    (bar_spacing, bar_spacing * 3 / 4)
}

/// Bar height in whole pixels. Powers are not renormalised; anything at or
/// above 1.0 fills the column.
pub fn bar_height(power: f32, height: u32) -> usize {
    let pixels = (height as f32 * power).floor();
    if pixels.is_nan() || pixels <= 0.0 {
        0
    } else {
        (pixels as usize).min(height as usize)
    }
}
