//! Модуль сборки статического Pix payload
//!
//! Поля верхнего уровня собираются строго в порядке таблицы
//! [`TopLevelField::ORDER`], в конце добавляется `6304` и CRC16.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::crc;
use crate::key::{KeyType, PixKey};
use crate::text;
use crate::tlv::{EmvField, MAX_VALUE_LENGTH};
use crate::{PixError, Result};

/// Идентификаторы полей EMV, используемых Pix
pub mod ids {
    pub const PAYLOAD_FORMAT_INDICATOR: &str = "00";
    pub const POINT_OF_INITIATION_METHOD: &str = "01";
    pub const MERCHANT_ACCOUNT_INFORMATION: &str = "26";
    pub const MERCHANT_CATEGORY_CODE: &str = "52";
    pub const TRANSACTION_CURRENCY: &str = "53";
    pub const TRANSACTION_AMOUNT: &str = "54";
    pub const COUNTRY_CODE: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA_FIELD_TEMPLATE: &str = "62";
    pub const CRC: &str = "63";

    /// Поля шаблона 26
    pub mod account {
        pub const GUI: &str = "00";
        pub const KEY: &str = "01";
        pub const DESCRIPTION: &str = "02";
    }

    /// Поля шаблона 62
    pub mod additional {
        pub const TRANSACTION_ID: &str = "05";
    }
}

/// GUI арранжмента Pix
pub const PIX_GUI: &str = "br.gov.bcb.pix";
pub const PAYLOAD_FORMAT: &str = "01";
/// ISO 4217, BRL
pub const CURRENCY_BRL: &str = "986";
pub const COUNTRY_BR: &str = "BR";
pub const DEFAULT_MERCHANT_CATEGORY_CODE: &str = "0000";
/// Маркер "идентификатор транзакции не указан"
pub const DEFAULT_TRANSACTION_ID: &str = "***";

pub const MAX_MERCHANT_NAME_LENGTH: usize = 25;
pub const MAX_MERCHANT_CITY_LENGTH: usize = 15;
pub const MAX_TRANSACTION_ID_LENGTH: usize = 25;
pub const MAX_AMOUNT_LENGTH: usize = 13;

/// Метод инициации (поле 01)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointOfInitiation {
    /// Многоразовый QR ("11")
    Reusable,
    /// Одноразовый QR ("12")
    Unique,
}

impl PointOfInitiation {
    pub fn code(&self) -> &'static str {
        match self {
            PointOfInitiation::Reusable => "11",
            PointOfInitiation::Unique => "12",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "11" => Some(PointOfInitiation::Reusable),
            "12" => Some(PointOfInitiation::Unique),
            _ => None,
        }
    }
}

/// Поля верхнего уровня в порядке, обязательном для EMV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopLevelField {
    PayloadFormatIndicator,
    PointOfInitiationMethod,
    MerchantAccountInformation,
    MerchantCategoryCode,
    TransactionCurrency,
    TransactionAmount,
    CountryCode,
    MerchantName,
    MerchantCity,
    AdditionalDataFieldTemplate,
    Crc,
}

impl TopLevelField {
    /// Порядок сериализации. CRC всегда последний.
    pub const ORDER: [TopLevelField; 11] = [
        TopLevelField::PayloadFormatIndicator,
        TopLevelField::PointOfInitiationMethod,
        TopLevelField::MerchantAccountInformation,
        TopLevelField::MerchantCategoryCode,
        TopLevelField::TransactionCurrency,
        TopLevelField::TransactionAmount,
        TopLevelField::CountryCode,
        TopLevelField::MerchantName,
        TopLevelField::MerchantCity,
        TopLevelField::AdditionalDataFieldTemplate,
        TopLevelField::Crc,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            TopLevelField::PayloadFormatIndicator => ids::PAYLOAD_FORMAT_INDICATOR,
            TopLevelField::PointOfInitiationMethod => ids::POINT_OF_INITIATION_METHOD,
            TopLevelField::MerchantAccountInformation => ids::MERCHANT_ACCOUNT_INFORMATION,
            TopLevelField::MerchantCategoryCode => ids::MERCHANT_CATEGORY_CODE,
            TopLevelField::TransactionCurrency => ids::TRANSACTION_CURRENCY,
            TopLevelField::TransactionAmount => ids::TRANSACTION_AMOUNT,
            TopLevelField::CountryCode => ids::COUNTRY_CODE,
            TopLevelField::MerchantName => ids::MERCHANT_NAME,
            TopLevelField::MerchantCity => ids::MERCHANT_CITY,
            TopLevelField::AdditionalDataFieldTemplate => ids::ADDITIONAL_DATA_FIELD_TEMPLATE,
            TopLevelField::Crc => ids::CRC,
        }
    }

    /// Обязательные поля отсутствовать не могут (EmvIdIsRequired)
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            TopLevelField::PointOfInitiationMethod | TopLevelField::TransactionAmount
        )
    }
}

/// Готовый payload: дерево полей + метаданные
///
/// Неизменяем. Создаётся [`PayloadBuilder::build`] или [`crate::Parser::decode`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub(crate) key: PixKey,
    pub(crate) merchant_name: String,
    pub(crate) merchant_city: String,
    pub(crate) amount: Option<String>,
    pub(crate) transaction_id: String,
    pub(crate) description: Option<String>,
    pub(crate) merchant_category_code: String,
    pub(crate) currency: String,
    pub(crate) country: String,
    pub(crate) point_of_initiation: Option<PointOfInitiation>,
    pub(crate) fields: Vec<EmvField>,
    pub(crate) crc: String,
    pub(crate) pix_code: String,
}

impl Payload {
    pub fn key(&self) -> &PixKey {
        &self.key
    }

    pub fn merchant_name(&self) -> &str {
        &self.merchant_name
    }

    pub fn merchant_city(&self) -> &str {
        &self.merchant_city
    }

    /// Сумма в формате EMV ("10.00"), `None` если плательщик вводит сам
    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn merchant_category_code(&self) -> &str {
        &self.merchant_category_code
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn point_of_initiation(&self) -> Option<PointOfInitiation> {
        self.point_of_initiation
    }

    /// Поля верхнего уровня, включая 63
    pub fn fields(&self) -> &[EmvField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&EmvField> {
        self.fields.iter().find(|field| field.id() == id)
    }

    pub fn crc(&self) -> &str {
        &self.crc
    }

    /// EMV строка ("Pix copia e cola")
    pub fn pix_code(&self) -> &str {
        &self.pix_code
    }
}

/// Конструктор статического payload
///
/// Поля задаются в любом порядке, проверка обязательных полей и расчёт CRC
/// выполняются в [`PayloadBuilder::finalize`]. Каждый запрос создаёт свой
/// экземпляр.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    key: Option<PixKey>,
    merchant_name: Option<String>,
    merchant_city: Option<String>,
    amount: Option<String>,
    transaction_id: String,
    description: Option<String>,
    merchant_category_code: String,
    point_of_initiation: Option<PointOfInitiation>,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuilder {
    pub fn new() -> Self {
        Self {
            key: None,
            merchant_name: None,
            merchant_city: None,
            amount: None,
            transaction_id: DEFAULT_TRANSACTION_ID.to_string(),
            description: None,
            merchant_category_code: DEFAULT_MERCHANT_CATEGORY_CODE.to_string(),
            point_of_initiation: None,
        }
    }

    /// Установка ключа с валидацией по типу
    pub fn pix_key(&mut self, key_type: KeyType, raw: &str) -> Result<&mut Self> {
        self.key = Some(PixKey::new(key_type, raw)?);
        Ok(self)
    }

    /// Установка уже проверенного ключа
    pub fn with_key(&mut self, key: PixKey) -> &mut Self {
        self.key = Some(key);
        self
    }

    /// Имя получателя, приводится к ASCII и обрезается до 25 символов
    pub fn merchant_name(&mut self, name: &str) -> Result<&mut Self> {
        self.merchant_name = Some(required_text("merchant name", name, MAX_MERCHANT_NAME_LENGTH)?);
        Ok(self)
    }

    /// Город получателя, приводится к ASCII и обрезается до 15 символов
    pub fn merchant_city(&mut self, city: &str) -> Result<&mut Self> {
        self.merchant_city = Some(required_text("merchant city", city, MAX_MERCHANT_CITY_LENGTH)?);
        Ok(self)
    }

    /// Сумма из десятичной строки ("10", "10.5", "10.50")
    pub fn amount(&mut self, amount: &str) -> Result<&mut Self> {
        let trimmed = amount.trim();
        if !is_decimal_amount(trimmed) {
            return Err(PixError::Validation(format!("invalid amount '{}'", amount)));
        }
        let value = Decimal::from_str(trimmed)
            .map_err(|e| PixError::Validation(format!("invalid amount '{}': {}", amount, e)))?;
        self.amount_decimal(value)
    }

    pub fn amount_decimal(&mut self, amount: Decimal) -> Result<&mut Self> {
        self.amount = Some(format_amount(amount)?);
        Ok(self)
    }

    /// Убрать сумму: поле 54 не будет сгенерировано
    pub fn clear_amount(&mut self) -> &mut Self {
        self.amount = None;
        self
    }

    /// Идентификатор транзакции (поле 62/05). Пустое значение = "***".
    pub fn transaction_id(&mut self, tid: &str) -> Result<&mut Self> {
        let tid = tid.trim();
        if tid.is_empty() || tid == DEFAULT_TRANSACTION_ID {
            self.transaction_id = DEFAULT_TRANSACTION_ID.to_string();
            return Ok(self);
        }
        validate_transaction_id(tid)?;
        self.transaction_id = tid.to_string();
        Ok(self)
    }

    /// Описание платежа (поле 26/02). Пустое значение убирает поле.
    pub fn description(&mut self, description: &str) -> &mut Self {
        let normalized = text::normalize(description, MAX_VALUE_LENGTH);
        self.description = if normalized.is_empty() { None } else { Some(normalized) };
        self
    }

    pub fn merchant_category_code(&mut self, code: &str) -> Result<&mut Self> {
        let code = code.trim();
        if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PixError::invalid_field(
                ids::MERCHANT_CATEGORY_CODE,
                format!("merchant category code must be 4 digits, got '{}'", code),
            ));
        }
        self.merchant_category_code = code.to_string();
        Ok(self)
    }

    /// Поле 01: многоразовый ("11") или одноразовый ("12") QR
    pub fn reusable(&mut self, reusable: bool) -> &mut Self {
        self.point_of_initiation = Some(if reusable {
            PointOfInitiation::Reusable
        } else {
            PointOfInitiation::Unique
        });
        self
    }

    /// Сборка дерева полей и расчёт CRC
    pub fn build(&self) -> Result<Payload> {
        let mut fields = Vec::with_capacity(TopLevelField::ORDER.len());
        let mut pix_code = String::new();
        let mut checksum = String::new();

        for field in TopLevelField::ORDER {
            if field == TopLevelField::Crc {
                pix_code.push_str(crc::CRC_FIELD_PREFIX);
                checksum = crc::compute(&pix_code);
                pix_code.push_str(&checksum);
                fields.push(EmvField::leaf(field.id(), checksum.clone())?);
                continue;
            }

            match self.emv_field(field)? {
                Some(emv) => {
                    log::trace!("Emitting field {} ({} bytes)", emv.id(), emv.value_len());
                    emv.encode_into(&mut pix_code);
                    fields.push(emv);
                }
                None if field.is_required() => {
                    return Err(PixError::EmvIdIsRequired(field.id().to_string()));
                }
                None => {}
            }
        }

        log::debug!("Built Pix payload: {} fields, CRC {}", fields.len(), checksum);

        Ok(Payload {
            key: self.required_key()?.clone(),
            merchant_name: self.merchant_name.clone().unwrap_or_default(),
            merchant_city: self.merchant_city.clone().unwrap_or_default(),
            amount: self.amount.clone(),
            transaction_id: self.transaction_id.clone(),
            description: self.fitted_description(),
            merchant_category_code: self.merchant_category_code.clone(),
            currency: CURRENCY_BRL.to_string(),
            country: COUNTRY_BR.to_string(),
            point_of_initiation: self.point_of_initiation,
            fields,
            crc: checksum,
            pix_code,
        })
    }

    /// Итоговая EMV строка. Повторный вызов даёт ту же строку.
    pub fn finalize(&self) -> Result<String> {
        Ok(self.build()?.pix_code)
    }

    fn emv_field(&self, field: TopLevelField) -> Result<Option<EmvField>> {
        let id = field.id();
        let emv = match field {
            TopLevelField::PayloadFormatIndicator => Some(EmvField::leaf(id, PAYLOAD_FORMAT)?),
            TopLevelField::PointOfInitiationMethod => self
                .point_of_initiation
                .map(|method| EmvField::leaf(id, method.code()))
                .transpose()?,
            TopLevelField::MerchantAccountInformation => match &self.key {
                Some(key) => Some(self.merchant_account_information(key)?),
                None => None,
            },
            TopLevelField::MerchantCategoryCode => {
                Some(EmvField::leaf(id, self.merchant_category_code.as_str())?)
            }
            TopLevelField::TransactionCurrency => Some(EmvField::leaf(id, CURRENCY_BRL)?),
            TopLevelField::TransactionAmount => self
                .amount
                .as_deref()
                .map(|amount| EmvField::leaf(id, amount))
                .transpose()?,
            TopLevelField::CountryCode => Some(EmvField::leaf(id, COUNTRY_BR)?),
            TopLevelField::MerchantName => self
                .merchant_name
                .as_deref()
                .map(|name| EmvField::leaf(id, name))
                .transpose()?,
            TopLevelField::MerchantCity => self
                .merchant_city
                .as_deref()
                .map(|city| EmvField::leaf(id, city))
                .transpose()?,
            TopLevelField::AdditionalDataFieldTemplate => Some(EmvField::composite(
                id,
                vec![EmvField::leaf(
                    ids::additional::TRANSACTION_ID,
                    self.transaction_id.as_str(),
                )?],
            )?),
            TopLevelField::Crc => None,
        };
        Ok(emv)
    }

    fn merchant_account_information(&self, key: &PixKey) -> Result<EmvField> {
        let mut children = vec![
            EmvField::leaf(ids::account::GUI, PIX_GUI)?,
            EmvField::leaf(ids::account::KEY, key.value())?,
        ];
        if let Some(description) = self.fitted_description() {
            children.push(EmvField::leaf(ids::account::DESCRIPTION, description)?);
        }
        EmvField::composite(ids::MERCHANT_ACCOUNT_INFORMATION, children)
    }

    /// Описание, обрезанное под остаток бюджета шаблона 26 (99 байт)
    fn fitted_description(&self) -> Option<String> {
        let description = self.description.as_deref()?;
        let key = self.key.as_ref()?;
        // header + GUI, header + key, header of 02
        let used = 4 + PIX_GUI.len() + 4 + key.value().len() + 4;
        let budget = MAX_VALUE_LENGTH.saturating_sub(used);
        if budget == 0 {
            log::debug!("No room left for description in template 26");
            return None;
        }
        let fitted = text::truncate(description, budget).trim_end().to_string();
        if fitted.is_empty() {
            None
        } else {
            Some(fitted)
        }
    }

    fn required_key(&self) -> Result<&PixKey> {
        self.key
            .as_ref()
            .ok_or_else(|| PixError::EmvIdIsRequired(ids::MERCHANT_ACCOUNT_INFORMATION.to_string()))
    }
}

fn required_text(name: &str, value: &str, max: usize) -> Result<String> {
    let normalized = text::normalize(value, max);
    if normalized.is_empty() {
        return Err(PixError::Validation(format!("{} must not be empty", name)));
    }
    Ok(normalized)
}

/// Формат суммы EMV: ровно два знака после точки, > 0, не длиннее 13 символов
pub fn format_amount(amount: Decimal) -> Result<String> {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded <= Decimal::ZERO {
        return Err(PixError::Validation(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    rounded.rescale(2);
    let formatted = rounded.to_string();
    if formatted.len() > MAX_AMOUNT_LENGTH {
        return Err(PixError::invalid_field(
            ids::TRANSACTION_AMOUNT,
            format!("amount '{}' exceeds {} characters", formatted, MAX_AMOUNT_LENGTH),
        ));
    }
    Ok(formatted)
}

/// Только цифры с необязательной дробной частью: без знака, экспоненты и `_`
pub(crate) fn is_decimal_amount(amount: &str) -> bool {
    let (int, frac) = match amount.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (amount, None),
    };
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    digits(int) && frac.map_or(true, digits)
}

pub(crate) fn validate_transaction_id(tid: &str) -> Result<()> {
    if tid == DEFAULT_TRANSACTION_ID {
        return Ok(());
    }
    if tid.is_empty() || tid.len() > MAX_TRANSACTION_ID_LENGTH {
        return Err(PixError::Validation(format!(
            "transaction id must have 1 to {} characters",
            MAX_TRANSACTION_ID_LENGTH
        )));
    }
    if !tid.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(PixError::Validation(format!(
            "transaction id '{}' must be alphanumeric",
            tid
        )));
    }
    Ok(())
}
