//! Pix payload parser
//!
//! Decodes an EMV string back into a [`Payload`], re-validating the CRC,
//! the mandatory ids and the Pix key carried in template 26.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::crc;
use crate::key::{KeyType, PixKey};
use crate::payload::{self, ids, Payload, PointOfInitiation, TopLevelField};
use crate::tlv::{self, EmvField};
use crate::{PixError, Result};

/// Parser for static Pix payloads
#[derive(Debug, Clone, Default)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Pre-flight key check, same rules as the builder
    pub fn validate(&self, key_type: &str, raw: &str) -> Result<PixKey> {
        PixKey::parse(key_type, raw)
    }

    /// Decodes and validates a Pix code
    pub fn decode(&self, raw: &str) -> Result<Payload> {
        let raw = raw.trim();

        // 1. Structure
        let fields = tlv::decode_all(raw)?;
        log::debug!("Decoded {} top-level fields", fields.len());

        // 2. CRC must be the last object, then the checksum itself
        let last = fields
            .last()
            .ok_or_else(|| PixError::EmvIdIsRequired(ids::CRC.to_string()))?;
        if last.id() != ids::CRC {
            return Err(PixError::EmvIdIsRequired(ids::CRC.to_string()));
        }
        if last.value_len() != crc::CRC_LENGTH {
            return Err(PixError::invalid_field(ids::CRC, "checksum must have 4 hex digits"));
        }
        crc::verify(raw)?;

        // 3. Mandatory ids
        for field in TopLevelField::ORDER {
            if field.is_required() && field != TopLevelField::MerchantAccountInformation {
                find(&fields, field.id())?;
            }
        }

        let format = leaf(&fields, ids::PAYLOAD_FORMAT_INDICATOR)?;
        if format != payload::PAYLOAD_FORMAT {
            return Err(PixError::invalid_field(
                ids::PAYLOAD_FORMAT_INDICATOR,
                format!("unsupported payload format '{}'", format),
            ));
        }

        let point_of_initiation = match optional_leaf(&fields, ids::POINT_OF_INITIATION_METHOD)? {
            Some(code) => Some(PointOfInitiation::from_code(code).ok_or_else(|| {
                PixError::invalid_field(
                    ids::POINT_OF_INITIATION_METHOD,
                    format!("unknown point of initiation '{}'", code),
                )
            })?),
            None => None,
        };

        let account = pix_account(&fields)?;
        let key = decode_key(account)?;
        let description = account
            .child(ids::account::DESCRIPTION)
            .and_then(EmvField::as_str)
            .map(str::to_string);

        let merchant_category_code = leaf(&fields, ids::MERCHANT_CATEGORY_CODE)?;
        if merchant_category_code.len() != 4 || !merchant_category_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PixError::invalid_field(
                ids::MERCHANT_CATEGORY_CODE,
                "merchant category code must be 4 digits",
            ));
        }

        let currency = expect_value(&fields, ids::TRANSACTION_CURRENCY, payload::CURRENCY_BRL)?;
        let country = expect_value(&fields, ids::COUNTRY_CODE, payload::COUNTRY_BR)?;

        let amount = match optional_leaf(&fields, ids::TRANSACTION_AMOUNT)? {
            Some(amount) => Some(decode_amount(amount)?),
            None => None,
        };

        let merchant_name = non_empty(&fields, ids::MERCHANT_NAME)?;
        let merchant_city = non_empty(&fields, ids::MERCHANT_CITY)?;

        let additional = find(&fields, ids::ADDITIONAL_DATA_FIELD_TEMPLATE)?;
        let transaction_id = additional
            .child(ids::additional::TRANSACTION_ID)
            .and_then(EmvField::as_str)
            .ok_or_else(|| {
                PixError::invalid_field(
                    ids::ADDITIONAL_DATA_FIELD_TEMPLATE,
                    "missing transaction id (05)",
                )
            })?;
        payload::validate_transaction_id(transaction_id)
            .map_err(|e| PixError::invalid_field(ids::ADDITIONAL_DATA_FIELD_TEMPLATE, e.to_string()))?;

        let crc = last.as_str().unwrap_or_default().to_uppercase();

        Ok(Payload {
            key,
            merchant_name: merchant_name.to_string(),
            merchant_city: merchant_city.to_string(),
            amount,
            transaction_id: transaction_id.to_string(),
            description,
            merchant_category_code: merchant_category_code.to_string(),
            currency: currency.to_string(),
            country: country.to_string(),
            point_of_initiation,
            crc,
            pix_code: raw.to_string(),
            fields,
        })
    }
}

fn find<'a>(fields: &'a [EmvField], id: &str) -> Result<&'a EmvField> {
    fields
        .iter()
        .find(|field| field.id() == id)
        .ok_or_else(|| PixError::EmvIdIsRequired(id.to_string()))
}

fn leaf<'a>(fields: &'a [EmvField], id: &str) -> Result<&'a str> {
    find(fields, id)?
        .as_str()
        .ok_or_else(|| PixError::invalid_field(id, "expected a plain value"))
}

fn optional_leaf<'a>(fields: &'a [EmvField], id: &str) -> Result<Option<&'a str>> {
    match fields.iter().find(|field| field.id() == id) {
        Some(field) => field
            .as_str()
            .map(Some)
            .ok_or_else(|| PixError::invalid_field(id, "expected a plain value")),
        None => Ok(None),
    }
}

fn non_empty<'a>(fields: &'a [EmvField], id: &str) -> Result<&'a str> {
    let value = leaf(fields, id)?;
    if value.trim().is_empty() {
        return Err(PixError::invalid_field(id, "value must not be empty"));
    }
    Ok(value)
}

fn expect_value<'a>(fields: &'a [EmvField], id: &str, expected: &str) -> Result<&'a str> {
    let value = leaf(fields, id)?;
    if value != expected {
        return Err(PixError::invalid_field(
            id,
            format!("expected '{}', got '{}'", expected, value),
        ));
    }
    Ok(value)
}

/// First merchant account template (26..=51) carrying the Pix GUI
fn pix_account(fields: &[EmvField]) -> Result<&EmvField> {
    fields
        .iter()
        .filter(|field| tlv::is_template(field.id()) && field.id() != ids::ADDITIONAL_DATA_FIELD_TEMPLATE)
        .find(|field| {
            field
                .child(ids::account::GUI)
                .and_then(EmvField::as_str)
                .map(|gui| gui.eq_ignore_ascii_case(payload::PIX_GUI))
                .unwrap_or(false)
        })
        .ok_or_else(|| PixError::EmvIdIsRequired(ids::MERCHANT_ACCOUNT_INFORMATION.to_string()))
}

fn decode_key(account: &EmvField) -> Result<PixKey> {
    let value = account
        .child(ids::account::KEY)
        .and_then(EmvField::as_str)
        .ok_or_else(|| PixError::invalid_field(account.id(), "missing Pix key (01)"))?;

    let key_type = KeyType::infer(value).ok_or_else(|| PixError::InvalidPixKeyType(value.to_string()))?;
    PixKey::new(key_type, value)
}

fn decode_amount(amount: &str) -> Result<String> {
    if !payload::is_decimal_amount(amount) {
        return Err(PixError::invalid_field(
            ids::TRANSACTION_AMOUNT,
            format!("invalid amount '{}'", amount),
        ));
    }
    let value = Decimal::from_str(amount)
        .map_err(|_| PixError::invalid_field(ids::TRANSACTION_AMOUNT, format!("invalid amount '{}'", amount)))?;
    if value <= Decimal::ZERO {
        return Err(PixError::invalid_field(
            ids::TRANSACTION_AMOUNT,
            "amount must be greater than zero",
        ));
    }
    Ok(amount.to_string())
}
