//! EAN-13 identity derivation and barcode rasterization.
//!
//! A product's UPC is the 7-digit company prefix, its 5-digit product id and
//! one check digit. The symbol is rendered to a grayscale PNG with the digits
//! printed underneath.

use std::path::Path;

use barcoders::sym::ean13::EAN13;
use image::{codecs::png::PngEncoder, ColorType, GrayImage, ImageEncoder, Luma};
use thiserror::Error;
use tokio::fs;

use crate::models::ProductId;

pub const COMPANY_PREFIX_LEN: usize = 7;
pub const UPC_LEN: usize = 13;

/// Modules in an EAN-13 symbol: guards, two halves of six digits and the centre pattern.
const SYMBOL_MODULES: u32 = 95;
const QUIET_LEFT: u32 = 11;
const QUIET_RIGHT: u32 = 7;

#[derive(Debug, Error)]
pub enum BarcodeError {
    #[error("expected {expected} digits, got {got:?}")]
    InvalidDigits { expected: usize, got: String },

    #[error("failed to encode EAN-13 symbol: {0}")]
    Encode(String),

    #[error("failed to render barcode image: {0}")]
    Render(#[from] image::ImageError),

    #[error("failed to write barcode image: {0}")]
    Io(#[from] std::io::Error),

    #[error("barcode render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// The fixed GS1 company prefix leading every generated UPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyPrefix(String);

impl CompanyPrefix {
    pub fn parse(raw: &str) -> Result<Self, BarcodeError> {
        let raw = raw.trim();
        if raw.len() != COMPANY_PREFIX_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BarcodeError::InvalidDigits {
                expected: COMPANY_PREFIX_LEN,
                got: raw.to_string(),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CompanyPrefix {
    fn default() -> Self {
        Self("8901234".to_string())
    }
}

fn digits(input: &str, expected: usize) -> Result<Vec<u32>, BarcodeError> {
    let parsed: Option<Vec<u32>> = input.chars().map(|c| c.to_digit(10)).collect();
    match parsed {
        Some(d) if d.len() == expected => Ok(d),
        _ => Err(BarcodeError::InvalidDigits {
            expected,
            got: input.to_string(),
        }),
    }
}

/// Computes the EAN-13 check digit for a 12-digit payload.
///
/// Digits at even (0-based) positions weigh 1, odd positions weigh 3.
pub fn ean13_check_digit(payload: &str) -> Result<u8, BarcodeError> {
    let sum: u32 = digits(payload, UPC_LEN - 1)?
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    Ok(((10 - sum % 10) % 10) as u8)
}

pub fn is_valid_upc(upc: &str) -> bool {
    match digits(upc, UPC_LEN) {
        Ok(d) => {
            let weighted: u32 = d
                .iter()
                .enumerate()
                .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
                .sum();
            weighted % 10 == 0
        }
        Err(_) => false,
    }
}

/// Builds the full 13-digit UPC for a product.
pub fn build_upc(prefix: &CompanyPrefix, product_id: &ProductId) -> Result<String, BarcodeError> {
    let payload = format!("{}{}", prefix.as_str(), product_id.as_str());
    let check = ean13_check_digit(&payload)?;
    Ok(format!("{payload}{check}"))
}

/// Raster settings. `scale` is pixels per module; `bar_height` is in modules.
#[derive(Debug, Clone, Copy)]
pub struct BarcodeStyle {
    pub scale: u32,
    pub bar_height: u32,
    pub include_text: bool,
}

impl Default for BarcodeStyle {
    fn default() -> Self {
        Self {
            scale: 3,
            bar_height: 20,
            include_text: true,
        }
    }
}

// 5x7 digit glyphs, one row per byte, low five bits used.
const GLYPHS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

fn fill_rect(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
    for px in x..(x + w).min(img.width()) {
        for py in y..(y + h).min(img.height()) {
            img.put_pixel(px, py, BLACK);
        }
    }
}

/// Renders a complete UPC as an EAN-13 PNG and returns the encoded bytes.
pub fn render_ean13_png(upc: &str, style: BarcodeStyle) -> Result<Vec<u8>, BarcodeError> {
    if !is_valid_upc(upc) {
        return Err(BarcodeError::InvalidDigits {
            expected: UPC_LEN,
            got: upc.to_string(),
        });
    }
    let modules = EAN13::new(upc)
        .map_err(|e| BarcodeError::Encode(format!("{e:?}")))?
        .encode();

    let scale = style.scale.max(1);
    let margin = 2 * scale;
    let bars_height = style.bar_height.max(1) * scale;
    let text_height = if style.include_text {
        GLYPH_HEIGHT * scale + 2 * scale
    } else {
        0
    };

    let width = (QUIET_LEFT + SYMBOL_MODULES + QUIET_RIGHT) * scale;
    let height = margin + bars_height + text_height + margin;
    let mut img = GrayImage::from_pixel(width, height, WHITE);

    for (i, module) in modules.iter().enumerate() {
        if *module == 1 {
            let x = (QUIET_LEFT + i as u32) * scale;
            fill_rect(&mut img, x, margin, scale, bars_height);
        }
    }

    if style.include_text {
        let text_width = upc.len() as u32 * GLYPH_ADVANCE * scale - scale;
        let mut x = width.saturating_sub(text_width) / 2;
        let y = margin + bars_height + 2 * scale;
        for digit in upc.chars().filter_map(|c| c.to_digit(10)) {
            let glyph = GLYPHS[digit as usize];
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        fill_rect(&mut img, x + col * scale, y + row as u32 * scale, scale, scale);
                    }
                }
            }
            x += GLYPH_ADVANCE * scale;
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(img.as_raw(), img.width(), img.height(), ColorType::L8)?;
    Ok(png)
}

/// Renders the barcode and writes it to `destination`, creating parent
/// directories. Returns only once the file is on disk.
pub async fn write_barcode(
    upc: &str,
    destination: &Path,
    style: BarcodeStyle,
) -> Result<(), BarcodeError> {
    let owned = upc.to_string();
    let png = tokio::task::spawn_blocking(move || render_ean13_png(&owned, style)).await??;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(destination, &png).await?;
    Ok(())
}
