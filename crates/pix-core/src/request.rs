//! Входные данные от UI (форма генерации Pix)

use serde::{Deserialize, Serialize};

use crate::key::KeyType;
use crate::payload::PayloadBuilder;
use crate::Result;

/// Сырые строки, собранные вызывающей стороной
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixRequest {
    /// `email|document|phone|random`
    pub key_type: String,
    pub key_value: String,
    pub merchant_name: String,
    pub merchant_city: String,
    /// Десятичная строка, отсутствие = сумму вводит плательщик
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub tid: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reusable: Option<bool>,
}

impl PixRequest {
    /// Перенос полей запроса в builder с полной валидацией
    pub fn to_builder(&self) -> Result<PayloadBuilder> {
        let key_type: KeyType = self.key_type.parse()?;

        let mut builder = PayloadBuilder::new();
        builder
            .pix_key(key_type, &self.key_value)?
            .merchant_name(&self.merchant_name)?
            .merchant_city(&self.merchant_city)?;

        if let Some(amount) = non_blank(&self.amount) {
            builder.amount(amount)?;
        }
        if let Some(tid) = non_blank(&self.tid) {
            builder.transaction_id(tid)?;
        }
        if let Some(description) = non_blank(&self.description) {
            builder.description(description);
        }
        if let Some(reusable) = self.reusable {
            builder.reusable(reusable);
        }

        Ok(builder)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
