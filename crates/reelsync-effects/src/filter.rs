//! Visual filters.
//!
//! Each filter reproduces a CSS filter function at a fixed amount, evaluated
//! directly on 8-bit sRGB values:
//!
//! | Filter | CSS |
//! |---|---|
//! | `grayscale` | `grayscale(100%)` |
//! | `sepia` | `sepia(100%)` |
//! | `invert` | `invert(100%)` |
//! | `blur` | `blur(4px)` |
//! | `brightness` | `brightness(1.2)` |
//! | `contrast` | `contrast(1.5)` |
//! | `hue-rotate` | `hue-rotate(90deg)` |

use rayon::prelude::*;
use reelsync_core::frame::BYTES_PER_PIXEL;
use reelsync_core::FrameBuffer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard deviation of the blur filter, in pixels.
pub const BLUR_SIGMA: f32 = 4.0;
pub const BRIGHTNESS_FACTOR: f32 = 1.2;
pub const CONTRAST_FACTOR: f32 = 1.5;
pub const HUE_ROTATE_DEGREES: f32 = 90.0;

// ── Color matrix ────────────────────────────────────────────────

/// A 3×4 affine transform on normalized RGB (alpha untouched).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    pub m: [[f32; 3]; 3],
    pub offset: [f32; 3],
}

impl ColorMatrix {
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        offset: [0.0; 3],
    };

    pub fn grayscale() -> Self {
        let row = [0.2126, 0.7152, 0.0722];
        Self {
            m: [row, row, row],
            offset: [0.0; 3],
        }
    }

    pub fn sepia() -> Self {
        Self {
            m: [
                [0.393, 0.769, 0.189],
                [0.349, 0.686, 0.168],
                [0.272, 0.534, 0.131],
            ],
            offset: [0.0; 3],
        }
    }

    pub fn invert() -> Self {
        Self {
            m: [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
            offset: [1.0; 3],
        }
    }

    pub fn brightness(amount: f32) -> Self {
        Self::scale(amount, 0.0)
    }

    pub fn contrast(amount: f32) -> Self {
        Self::scale(amount, 0.5 - 0.5 * amount)
    }

    fn scale(factor: f32, offset: f32) -> Self {
        Self {
            m: [[factor, 0.0, 0.0], [0.0, factor, 0.0], [0.0, 0.0, factor]],
            offset: [offset; 3],
        }
    }

    pub fn hue_rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            m: [
                [
                    0.213 + cos * 0.787 - sin * 0.213,
                    0.715 - cos * 0.715 - sin * 0.715,
                    0.072 - cos * 0.072 + sin * 0.928,
                ],
                [
                    0.213 - cos * 0.213 + sin * 0.143,
                    0.715 + cos * 0.285 + sin * 0.140,
                    0.072 - cos * 0.072 - sin * 0.283,
                ],
                [
                    0.213 - cos * 0.213 - sin * 0.787,
                    0.715 - cos * 0.715 + sin * 0.715,
                    0.072 + cos * 0.928 + sin * 0.072,
                ],
            ],
            offset: [0.0; 3],
        }
    }

    /// Transform one RGBA pixel in place.
    #[inline]
    pub fn apply_pixel(&self, px: &mut [u8]) {
        let rgb = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
        ];
        for (c, out) in px.iter_mut().take(3).enumerate() {
            let row = &self.m[c];
            let v = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2] + self.offset[c];
            *out = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    /// Transform every pixel of a frame, one row per task.
    pub fn apply(&self, frame: &mut FrameBuffer) {
        let stride = frame.stride();
        if stride == 0 {
            return;
        }
        frame
            .as_bytes_mut()
            .par_chunks_mut(stride)
            .for_each(|row| {
                for px in row.chunks_exact_mut(BYTES_PER_PIXEL) {
                    self.apply_pixel(px);
                }
            });
    }
}

// ── Filters ─────────────────────────────────────────────────────

/// The active visual filter of the main clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisualFilter {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
    Blur,
    Brightness,
    Contrast,
    HueRotate,
}

impl VisualFilter {
    pub const ALL: [Self; 8] = [
        Self::None,
        Self::Grayscale,
        Self::Sepia,
        Self::Invert,
        Self::Blur,
        Self::Brightness,
        Self::Contrast,
        Self::HueRotate,
    ];

    /// Short name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Invert => "invert",
            Self::Blur => "blur",
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::HueRotate => "hue-rotate",
        }
    }

    /// Equivalent CSS filter value.
    pub fn css(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Grayscale => "grayscale(100%)",
            Self::Sepia => "sepia(100%)",
            Self::Invert => "invert(100%)",
            Self::Blur => "blur(4px)",
            Self::Brightness => "brightness(1.2)",
            Self::Contrast => "contrast(1.5)",
            Self::HueRotate => "hue-rotate(90deg)",
        }
    }

    /// The color matrix for per-pixel filters; `None` for identity and blur.
    pub fn matrix(self) -> Option<ColorMatrix> {
        match self {
            Self::None | Self::Blur => None,
            Self::Grayscale => Some(ColorMatrix::grayscale()),
            Self::Sepia => Some(ColorMatrix::sepia()),
            Self::Invert => Some(ColorMatrix::invert()),
            Self::Brightness => Some(ColorMatrix::brightness(BRIGHTNESS_FACTOR)),
            Self::Contrast => Some(ColorMatrix::contrast(CONTRAST_FACTOR)),
            Self::HueRotate => Some(ColorMatrix::hue_rotate(HUE_ROTATE_DEGREES)),
        }
    }

    /// Filter a frame in place.
    pub fn apply(self, frame: &mut FrameBuffer) {
        match self {
            Self::None => {}
            Self::Blur => gaussian_blur(frame, BLUR_SIGMA),
            other => {
                if let Some(matrix) = other.matrix() {
                    matrix.apply(frame);
                }
            }
        }
    }
}

impl fmt::Display for VisualFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VisualFilter {
    type Err = String;

    /// Accepts short names (`sepia`, `hue-rotate`, `hue_rotate`) and the
    /// CSS values from [`VisualFilter::css`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s || f.css() == s || f.name().replace('-', "_") == s)
            .ok_or_else(|| format!("unknown filter: {s}"))
    }
}

// ── Blur ────────────────────────────────────────────────────────

fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur with edge clamping.
pub fn gaussian_blur(frame: &mut FrameBuffer, sigma: f32) {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w == 0 || h == 0 || sigma <= 0.0 {
        return;
    }
    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as isize;
    let stride = w * BYTES_PER_PIXEL;

    // Horizontal pass into a float buffer
    let src = frame.as_bytes().to_vec();
    let mut tmp = vec![0.0f32; w * h * BYTES_PER_PIXEL];
    tmp.par_chunks_mut(stride)
        .zip(src.par_chunks(stride))
        .for_each(|(out_row, in_row)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                    for c in 0..4 {
                        acc[c] += in_row[sx * 4 + c] as f32 * weight;
                    }
                }
                out_row[x * 4..x * 4 + 4].copy_from_slice(&acc);
            }
        });

    // Vertical pass back into the frame
    frame
        .as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, out_row)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
                    let i = sy * stride + x * 4;
                    for c in 0..4 {
                        acc[c] += tmp[i + c] * weight;
                    }
                }
                for c in 0..4 {
                    out_row[x * 4 + c] = acc[c].round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}
