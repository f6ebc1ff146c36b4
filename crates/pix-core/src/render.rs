//! Модуль рендеринга QR-кода
//!
//! Кодирует готовую EMV строку в QR без каких-либо преобразований:
//! PNG (в т.ч. data URI для `<img src>`), SVG или текст для терминала.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::{PixError, Result};

/// Уровень коррекции ошибок
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCorrection {
    L, // ~7%
    M, // ~15%
    Q, // ~25%
    H, // ~30%
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

/// Формат результата
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QrFormat {
    /// PNG байты
    Png,
    /// SVG строка
    Svg,
    /// Unicode для терминала
    Terminal,
}

/// Конфигурация рендеринга
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrOptions {
    /// Размер модуля в пикселях (PNG)
    pub module_size: u32,
    /// Тихая зона в модулях
    pub quiet_zone: u32,
    pub error_correction: ErrorCorrection,
    pub format: QrFormat,
    /// Цвет модулей (SVG, hex)
    pub dark_color: String,
    /// Цвет фона (SVG, hex)
    pub light_color: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            module_size: 8,
            quiet_zone: 4,
            error_correction: ErrorCorrection::M,
            format: QrFormat::Png,
            dark_color: "#000000".to_string(),
            light_color: "#FFFFFF".to_string(),
        }
    }
}

impl QrOptions {
    pub fn png(module_size: u32) -> Self {
        Self {
            module_size,
            format: QrFormat::Png,
            ..Self::default()
        }
    }

    pub fn svg() -> Self {
        Self {
            format: QrFormat::Svg,
            ..Self::default()
        }
    }

    pub fn terminal() -> Self {
        Self {
            format: QrFormat::Terminal,
            ..Self::default()
        }
    }
}

/// Отрендеренный QR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImage {
    Png(Vec<u8>),
    Svg(String),
    Terminal(String),
}

impl QrImage {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            QrImage::Png(bytes) => bytes,
            QrImage::Svg(svg) => svg.as_bytes(),
            QrImage::Terminal(text) => text.as_bytes(),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            QrImage::Png(_) => "image/png",
            QrImage::Svg(_) => "image/svg+xml",
            QrImage::Terminal(_) => "text/plain",
        }
    }
}

/// Рендеринг Pix-кода в выбранном формате
pub fn render_qr_code(pix_code: &str, options: &QrOptions) -> Result<QrImage> {
    let code = encode(pix_code, options)?;
    log::debug!("Rendering QR {}x{} modules as {:?}", code.width(), code.width(), options.format);

    match options.format {
        QrFormat::Png => Ok(QrImage::Png(png_bytes(&rasterize(&code, options))?)),
        QrFormat::Svg => Ok(QrImage::Svg(svg(&code, options))),
        QrFormat::Terminal => Ok(QrImage::Terminal(terminal(&code, options))),
    }
}

/// Растровое изображение в оттенках серого
pub fn render_gray(pix_code: &str, options: &QrOptions) -> Result<GrayImage> {
    let code = encode(pix_code, options)?;
    Ok(rasterize(&code, options))
}

/// data URI для встраивания в HTML (`data:image/png;base64,...`)
pub fn data_uri(pix_code: &str, options: &QrOptions) -> Result<String> {
    let image = match options.format {
        QrFormat::Terminal => render_qr_code(pix_code, &QrOptions { format: QrFormat::Png, ..options.clone() })?,
        _ => render_qr_code(pix_code, options)?,
    };
    Ok(format!("data:{};base64,{}", image.mime_type(), STANDARD.encode(image.as_bytes())))
}

fn encode(pix_code: &str, options: &QrOptions) -> Result<QrCode> {
    QrCode::with_error_correction_level(pix_code.as_bytes(), options.error_correction.into())
        .map_err(|e| PixError::Render(format!("QR generation failed: {}", e)))
}

// Ручной рендер, чтобы не зависеть от версии image внутри qrcode
fn rasterize(code: &QrCode, options: &QrOptions) -> GrayImage {
    let module_size = options.module_size.max(1);
    let quiet_zone = options.quiet_zone;
    let width = code.width() as u32;
    let doc_width = (width + quiet_zone * 2) * module_size;
    let mut img = GrayImage::from_pixel(doc_width, doc_width, Luma([255]));

    for y in 0..width {
        for x in 0..width {
            if code[(x as usize, y as usize)] == qrcode::Color::Dark {
                let px = (quiet_zone + x) * module_size;
                let py = (quiet_zone + y) * module_size;
                for dy in 0..module_size {
                    for dx in 0..module_size {
                        img.put_pixel(px + dx, py + dy, Luma([0]));
                    }
                }
            }
        }
    }

    img
}

fn png_bytes(img: &GrayImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut bytes);

    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::L8,
    )
    .map_err(|e| PixError::Render(format!("PNG encoding failed: {}", e)))?;

    Ok(bytes)
}

fn svg(code: &QrCode, options: &QrOptions) -> String {
    code.render()
        .quiet_zone(options.quiet_zone > 0)
        .dark_color(qrcode::render::svg::Color(&options.dark_color))
        .light_color(qrcode::render::svg::Color(&options.light_color))
        .build()
}

fn terminal(code: &QrCode, options: &QrOptions) -> String {
    code.render::<char>()
        .quiet_zone(options.quiet_zone > 0)
        .module_dimensions(2, 1)
        .build()
}
