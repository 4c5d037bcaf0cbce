/// Error-correction levels
pub mod ec_level;
/// Owned pixel buffers
pub mod image_buffer;
/// Analysis results and their wire shape
pub mod outcome;

pub use ec_level::ECLevel;
pub use image_buffer::{ImageBuffer, PixelLayout};
pub use outcome::{AnalysisOutcome, BarcodeFormat, ErrorKind};
