#![allow(dead_code)]

use qr_ec_probe::ImageBuffer;
use qrcode::{Color, EcLevel, QrCode};

pub const SIZE: usize = 300;
const QUIET_ZONE: usize = 4;

/// Render `data` at `level` as a SIZE x SIZE grayscale image with a
/// 4-module quiet zone, dark modules at `dark` and background at `light`.
pub fn render(data: &str, level: EcLevel, dark: u8, light: u8) -> ImageBuffer {
    let code = QrCode::with_error_correction_level(data, level).expect("encodable payload");
    let modules = code.width();
    let colors = code.to_colors();

    let span = modules + 2 * QUIET_ZONE;
    let scale = SIZE / span;
    let offset = (SIZE - span * scale) / 2 + QUIET_ZONE * scale;

    let mut pixels = vec![light; SIZE * SIZE];
    for my in 0..modules {
        for mx in 0..modules {
            if colors[my * modules + mx] != Color::Dark {
                continue;
            }
            for y in 0..scale {
                let row = offset + my * scale + y;
                let start = row * SIZE + offset + mx * scale;
                pixels[start..start + scale].fill(dark);
            }
        }
    }
    ImageBuffer::from_luma(SIZE, SIZE, pixels).expect("valid dimensions")
}

/// Black on white
pub fn render_plain(data: &str, level: EcLevel) -> ImageBuffer {
    render(data, level, 0, 255)
}

/// Same symbol as an RGBA image
pub fn to_rgba(image: &ImageBuffer) -> ImageBuffer {
    let rgba: Vec<u8> = image
        .as_bytes()
        .iter()
        .flat_map(|&v| [v, v, v, 255])
        .collect();
    ImageBuffer::from_rgba(image.width(), image.height(), rgba).expect("valid dimensions")
}

pub fn blank() -> ImageBuffer {
    ImageBuffer::from_luma(SIZE, SIZE, vec![255u8; SIZE * SIZE]).expect("valid dimensions")
}
