//! Tray icon pixels, drawn in memory as a 2x2 tile glyph

use tray_icon::{BadIcon, Icon};

const SIZE: u32 = 32;
const GAP: u32 = 3;
const TILE: [u8; 4] = [0x5b, 0x8d, 0xef, 0xff];
const CLEAR: [u8; 4] = [0, 0, 0, 0];

/// RGBA pixels of the glyph, row-major
pub fn rgba() -> Vec<u8> {
    let half = SIZE / 2;
    let mut pixels = Vec::with_capacity((SIZE * SIZE * 4) as usize);

    for y in 0..SIZE {
        for x in 0..SIZE {
            // Transparent border and a cross-shaped gutter between tiles
            let edge = x < GAP || y < GAP || x >= SIZE - GAP || y >= SIZE - GAP;
            let gutter = x.abs_diff(half) < GAP / 2 + 1 || y.abs_diff(half) < GAP / 2 + 1;
            let pixel = if edge || gutter { CLEAR } else { TILE };
            pixels.extend_from_slice(&pixel);
        }
    }

    pixels
}

pub fn generate() -> Result<Icon, BadIcon> {
    Icon::from_rgba(rgba(), SIZE, SIZE)
}
