//! Модуль валидации Pix-ключей
//!
//! Поддерживаемые типы ключей:
//! - Email
//! - Документ (CPF - 11 цифр, CNPJ - 14 цифр)
//! - Телефон (+55 по умолчанию)
//! - Случайный ключ (UUID)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PixError, Result};

/// Максимальная длина ключа внутри шаблона 26
pub const MAX_KEY_LENGTH: usize = 77;

/// Код страны, подставляемый для телефонов без `+`
pub const DEFAULT_COUNTRY_CODE: &str = "55";

/// Тип Pix-ключа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Email,
    Document,
    Phone,
    Random,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Email => "email",
            KeyType::Document => "document",
            KeyType::Phone => "phone",
            KeyType::Random => "random",
        }
    }

    /// Определение типа по уже нормализованному значению ключа
    pub fn infer(value: &str) -> Option<Self> {
        if value.contains('@') {
            Some(KeyType::Email)
        } else if value.len() == 36 && Uuid::try_parse(value).is_ok() {
            Some(KeyType::Random)
        } else if value.starts_with('+') {
            Some(KeyType::Phone)
        } else if value.bytes().all(|b| b.is_ascii_digit()) && matches!(value.len(), 11 | 14) {
            Some(KeyType::Document)
        } else {
            None
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = PixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "email" => Ok(KeyType::Email),
            "document" => Ok(KeyType::Document),
            "phone" => Ok(KeyType::Phone),
            "random" => Ok(KeyType::Random),
            _ => Err(PixError::InvalidPixKeyType(s.to_string())),
        }
    }
}

/// Проверенный и нормализованный Pix-ключ
///
/// Создаётся только через [`PixKey::new`], поэтому любое значение этого
/// типа синтаксически корректно для своего `KeyType`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixKey {
    key_type: KeyType,
    value: String,
}

impl PixKey {
    /// Валидация и нормализация сырого значения
    pub fn new(key_type: KeyType, raw: &str) -> Result<Self> {
        let value = match key_type {
            KeyType::Email => normalize_email(raw)?,
            KeyType::Document => normalize_document(raw)?,
            KeyType::Phone => normalize_phone(raw)?,
            KeyType::Random => normalize_random(raw)?,
        };
        Ok(Self { key_type, value })
    }

    /// Разбор по строковому тегу типа (`email|document|phone|random`)
    pub fn parse(key_type: &str, raw: &str) -> Result<Self> {
        Self::new(key_type.parse()?, raw)
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for PixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

fn invalid(key_type: KeyType, reason: impl Into<String>) -> PixError {
    PixError::InvalidPixKey {
        key_type,
        reason: reason.into(),
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Err(invalid(KeyType::Email, "email is empty"));
    }
    if value.chars().count() > MAX_KEY_LENGTH {
        return Err(invalid(
            KeyType::Email,
            format!("email exceeds {} characters", MAX_KEY_LENGTH),
        ));
    }

    let (local, domain) = value
        .split_once('@')
        .ok_or_else(|| invalid(KeyType::Email, "missing '@'"))?;

    if !is_valid_local_part(local) {
        return Err(invalid(KeyType::Email, "invalid local part"));
    }
    if !is_valid_domain(domain) {
        return Err(invalid(KeyType::Email, "invalid domain"));
    }

    Ok(value)
}

fn is_valid_local_part(local: &str) -> bool {
    const SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

    !local.is_empty()
        && local.len() <= 64
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || SPECIALS.contains(c))
}

fn is_valid_domain(domain: &str) -> bool {
    if !domain.contains('.') {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    let tld_ok = labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);

    tld_ok
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn normalize_document(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 | 14 => Ok(digits),
        0 => Err(invalid(KeyType::Document, "document has no digits")),
        n => Err(invalid(
            KeyType::Document,
            format!("document must have 11 or 14 digits, got {}", n),
        )),
    }
}

fn normalize_phone(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');

    if trimmed
        .chars()
        .skip(usize::from(has_plus))
        .any(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')' | '.')))
    {
        return Err(invalid(KeyType::Phone, "phone contains invalid characters"));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = if has_plus {
        digits
    } else {
        format!("{}{}", DEFAULT_COUNTRY_CODE, digits)
    };

    if !(8..=15).contains(&digits.len()) {
        return Err(invalid(
            KeyType::Phone,
            format!("phone must have 8 to 15 digits, got {}", digits.len()),
        ));
    }

    Ok(format!("+{}", digits))
}

fn normalize_random(raw: &str) -> Result<String> {
    let value = raw.trim().to_lowercase();
    if value.len() != 36 {
        return Err(invalid(KeyType::Random, "random key must have 36 characters"));
    }

    let uuid = Uuid::try_parse(&value).map_err(|e| invalid(KeyType::Random, e.to_string()))?;
    // try_parse also accepts simple/braced/urn forms, keep only hyphenated
    if uuid.hyphenated().to_string() != value {
        return Err(invalid(KeyType::Random, "random key must be a hyphenated UUID"));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_from_str() {
        assert_eq!("email".parse::<KeyType>().unwrap(), KeyType::Email);
        assert_eq!("Document".parse::<KeyType>().unwrap(), KeyType::Document);
        assert_eq!(" phone ".parse::<KeyType>().unwrap(), KeyType::Phone);
        assert_eq!("random".parse::<KeyType>().unwrap(), KeyType::Random);
        assert_eq!(
            "cpf".parse::<KeyType>(),
            Err(PixError::InvalidPixKeyType("cpf".to_string()))
        );
    }

    #[test]
    fn test_email() {
        let key = PixKey::new(KeyType::Email, "Test@Example.com").unwrap();
        assert_eq!(key.value(), "test@example.com");
        assert_eq!(key.key_type(), KeyType::Email);

        assert!(PixKey::new(KeyType::Email, "first.last+tag@mail.example.com.br").is_ok());
        assert!(PixKey::new(KeyType::Email, "").is_err());
        assert!(PixKey::new(KeyType::Email, "no-at-sign.com").is_err());
        assert!(PixKey::new(KeyType::Email, "user@localhost").is_err());
        assert!(PixKey::new(KeyType::Email, "user@@example.com").is_err());
        assert!(PixKey::new(KeyType::Email, ".user@example.com").is_err());
        assert!(PixKey::new(KeyType::Email, "user@example..com").is_err());
    }

    #[test]
    fn test_email_length_limit() {
        let local = "a".repeat(64);
        let domain = format!("{}.com", "b".repeat(8));
        let ok = format!("{}@{}", local, domain);
        assert_eq!(ok.len(), 77);
        assert!(PixKey::new(KeyType::Email, &ok).is_ok());

        let too_long = format!("{}@{}", local, format!("{}.com", "b".repeat(9)));
        assert!(PixKey::new(KeyType::Email, &too_long).is_err());
    }

    #[test]
    fn test_document() {
        assert_eq!(PixKey::new(KeyType::Document, "123.456.789-09").unwrap().value(), "12345678909");
        assert_eq!(
            PixKey::new(KeyType::Document, "12.345.678/0001-95").unwrap().value(),
            "12345678000195"
        );

        let err = PixKey::new(KeyType::Document, "123").unwrap_err();
        assert!(matches!(err, PixError::InvalidPixKey { key_type: KeyType::Document, .. }));
        assert!(PixKey::new(KeyType::Document, "1234567890").is_err());
        assert!(PixKey::new(KeyType::Document, "").is_err());
    }

    #[test]
    fn test_phone() {
        assert_eq!(
            PixKey::new(KeyType::Phone, "(11) 98765-4321").unwrap().value(),
            "+5511987654321"
        );
        assert_eq!(
            PixKey::new(KeyType::Phone, "+1 212 555 0100").unwrap().value(),
            "+12125550100"
        );
        assert!(PixKey::new(KeyType::Phone, "+123").is_err());
        assert!(PixKey::new(KeyType::Phone, "+1234567890123456").is_err());
        assert!(PixKey::new(KeyType::Phone, "11 9876x4321").is_err());
        assert!(PixKey::new(KeyType::Phone, "++5511987654321").is_err());
    }

    #[test]
    fn test_random() {
        let key = PixKey::new(KeyType::Random, "123E4567-E89B-12D3-A456-426614174000").unwrap();
        assert_eq!(key.value(), "123e4567-e89b-12d3-a456-426614174000");

        assert!(PixKey::new(KeyType::Random, "123e4567e89b12d3a456426614174000").is_err());
        assert!(PixKey::new(KeyType::Random, "{123e4567-e89b-12d3-a456-426614174000}").is_err());
        assert!(PixKey::new(KeyType::Random, "123e4567-e89b-12d3-a456-42661417400g").is_err());
    }

    #[test]
    fn test_parse_with_tag() {
        assert!(PixKey::parse("email", "a@b.co").is_ok());
        assert!(matches!(
            PixKey::parse("iban", "whatever"),
            Err(PixError::InvalidPixKeyType(_))
        ));
    }

    #[test]
    fn test_infer() {
        assert_eq!(KeyType::infer("test@example.com"), Some(KeyType::Email));
        assert_eq!(KeyType::infer("+5511987654321"), Some(KeyType::Phone));
        assert_eq!(KeyType::infer("12345678909"), Some(KeyType::Document));
        assert_eq!(KeyType::infer("12345678000195"), Some(KeyType::Document));
        assert_eq!(
            KeyType::infer("123e4567-e89b-12d3-a456-426614174000"),
            Some(KeyType::Random)
        );
        assert_eq!(KeyType::infer("hello"), None);
    }
}
