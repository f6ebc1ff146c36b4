//! Pix Core - Генерация статических Pix-платежей
//!
//! Библиотека для построения и разбора статического Pix payload
//! (EMV QR Code в профиле Banco Central do Brasil):
//! - Валидация и нормализация Pix-ключей (email, CPF/CNPJ, телефон, UUID)
//! - Кодирование/декодирование вложенного TLV дерева EMV
//! - Контрольная сумма CRC16-CCITT (поле 63)
//! - Рендеринг QR-кода (PNG, SVG, терминал)

pub mod crc;
pub mod key;
pub mod parser;
pub mod payload;
#[cfg(feature = "render")]
pub mod render;
pub mod request;
pub mod text;
pub mod tlv;

pub use key::{KeyType, PixKey};
pub use parser::Parser;
pub use payload::{Payload, PayloadBuilder, PointOfInitiation, TopLevelField};
#[cfg(feature = "render")]
pub use render::{QrFormat, QrImage, QrOptions};
pub use request::PixRequest;
pub use tlv::{EmvField, EmvValue};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Основные ошибки модуля
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PixError {
    #[error("Invalid Pix key type: {0}")]
    InvalidPixKeyType(String),

    #[error("Invalid Pix key for type {key_type}: {reason}")]
    InvalidPixKey { key_type: KeyType, reason: String },

    #[error("Invalid EMV field {id}: {reason}")]
    InvalidEmvField { id: String, reason: String },

    #[error("EMV id {0} is required")]
    EmvIdIsRequired(String),

    #[error("Invalid CRC: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("QR render error: {0}")]
    Render(String),
}

impl PixError {
    pub(crate) fn invalid_field(id: impl Into<String>, reason: impl Into<String>) -> Self {
        PixError::InvalidEmvField {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PixError>;

/// Результат генерации: код Pix и ссылка на изображение QR
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPix {
    /// EMV строка ("Pix copia e cola")
    pub pix_code: String,
    /// data URI с PNG изображением QR-кода
    pub qr_code: String,
}

/// Полная генерация из пользовательского запроса: код + QR
#[cfg(feature = "render")]
pub fn generate(request: &PixRequest, options: &QrOptions) -> Result<GeneratedPix> {
    let builder = request.to_builder()?;
    let pix_code = builder.finalize()?;
    let qr_code = render::data_uri(&pix_code, options)?;

    log::debug!("Generated Pix code with {} bytes", pix_code.len());

    Ok(GeneratedPix { pix_code, qr_code })
}
