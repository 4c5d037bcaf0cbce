//! Luminance helpers for building the plane a decode capability binarizes.
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8

use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Images at or above this many pixels are converted row-parallel
pub const PARALLEL_THRESHOLD_PX: usize = 512 * 512;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert RGBA image to grayscale (ignores alpha channel)
pub fn rgba_to_luma(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width * height >= PARALLEL_THRESHOLD_PX {
        rgba_to_luma_parallel(rgba, width, height)
    } else {
        rgba_to_luma_scalar(rgba, width, height)
    }
}

/// Single-threaded conversion
pub fn rgba_to_luma_scalar(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    rgba.chunks_exact(4)
        .take(width * height)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect()
}

/// Convert RGBA to grayscale using parallel processing
/// Processes rows in parallel for multi-core speedup
pub fn rgba_to_luma_parallel(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 4;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 4;
            *out = luma(rgba[idx], rgba[idx + 1], rgba[idx + 2]);
        }
    });

    gray
}

/// Photometric negative, in place
pub fn invert_luma(gray: &mut [u8]) {
    for v in gray.iter_mut() {
        *v = 255 - *v;
    }
}
