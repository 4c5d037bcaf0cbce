//! Pixel kernels
//!
//! This module provides the image work done outside the decode capability:
//! - Grayscale conversion (RGBA to luminance, scalar and row-parallel)
//! - Contrast enhancement for low-contrast captures

/// Contrast enhancement
pub mod enhance;
/// RGBA to luminance conversion
pub mod grayscale;
