//! EMV Tag-Length-Value tree
//!
//! Every field is `id (2 digits) + length (2 digits) + value`. The value is
//! either raw text or the concatenation of nested fields (templates such as
//! merchant account information `26` or additional data `62`).

use std::fmt;

use serde::Serialize;

use crate::{PixError, Result};

/// Largest value that fits in the two-digit length.
pub const MAX_VALUE_LENGTH: usize = 99;

const HEADER_LENGTH: usize = 4;

/// Field value: text or nested fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EmvValue {
    Leaf(String),
    Composite(Vec<EmvField>),
}

/// One EMV data object.
///
/// Constructors enforce a numeric two-digit id and a value of at most
/// 99 bytes, so any `EmvField` encodes without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmvField {
    id: String,
    value: EmvValue,
}

impl EmvField {
    pub fn leaf(id: &str, value: impl Into<String>) -> Result<Self> {
        validate_id(id)?;
        let value = value.into();
        check_length(id, value.len())?;
        Ok(Self {
            id: id.to_string(),
            value: EmvValue::Leaf(value),
        })
    }

    pub fn composite(id: &str, children: Vec<EmvField>) -> Result<Self> {
        validate_id(id)?;
        let length = children.iter().map(EmvField::encoded_len).sum();
        check_length(id, length)?;
        Ok(Self {
            id: id.to_string(),
            value: EmvValue::Composite(children),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> &EmvValue {
        &self.value
    }

    /// Text value, `None` for templates
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            EmvValue::Leaf(value) => Some(value),
            EmvValue::Composite(_) => None,
        }
    }

    /// Nested fields, empty for leaves
    pub fn children(&self) -> &[EmvField] {
        match &self.value {
            EmvValue::Leaf(_) => &[],
            EmvValue::Composite(children) => children,
        }
    }

    pub fn child(&self, id: &str) -> Option<&EmvField> {
        self.children().iter().find(|field| field.id == id)
    }

    /// Byte length of the serialized value (the number written in the length digits).
    pub fn value_len(&self) -> usize {
        match &self.value {
            EmvValue::Leaf(value) => value.len(),
            EmvValue::Composite(children) => children.iter().map(EmvField::encoded_len).sum(),
        }
    }

    /// Byte length of the whole serialized field, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_LENGTH + self.value_len()
    }

    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    pub fn encode_into(&self, out: &mut String) {
        out.push_str(&self.id);
        out.push_str(&format!("{:02}", self.value_len()));
        match &self.value {
            EmvValue::Leaf(value) => out.push_str(value),
            EmvValue::Composite(children) => {
                for child in children {
                    child.encode_into(out);
                }
            }
        }
    }

    /// Decodes one top-level field starting at byte `offset`.
    ///
    /// Returns the field and the offset right after it. Ids known to be
    /// templates are decoded recursively, everything else stays a leaf.
    pub fn decode(input: &str, offset: usize) -> Result<(EmvField, usize)> {
        decode_field(input, offset, is_template)
    }
}

impl fmt::Display for EmvField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Top-level ids whose value is a nested sequence of fields.
///
/// 26..=51 are merchant account information templates, 62 is the
/// additional data field template.
pub fn is_template(id: &str) -> bool {
    matches!(id.parse::<u8>(), Ok(26..=51) | Ok(62))
}

/// Decodes a whole sequence of top-level fields.
pub fn decode_all(input: &str) -> Result<Vec<EmvField>> {
    decode_sequence(input, is_template)
}

fn decode_sequence(input: &str, templates: fn(&str) -> bool) -> Result<Vec<EmvField>> {
    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < input.len() {
        let (field, next) = decode_field(input, offset, templates)?;
        fields.push(field);
        offset = next;
    }
    Ok(fields)
}

fn decode_field(input: &str, offset: usize, templates: fn(&str) -> bool) -> Result<(EmvField, usize)> {
    let header = offset
        .checked_add(HEADER_LENGTH)
        .and_then(|header_end| input.get(offset..header_end))
        .ok_or_else(|| PixError::invalid_field(fragment(input, offset), "truncated header"))?;

    let (id, len_str) = match (header.get(..2), header.get(2..)) {
        (Some(id), Some(len_str)) => (id, len_str),
        _ => return Err(PixError::invalid_field(fragment(input, offset), "header is not ASCII")),
    };
    validate_id(id)?;

    if !len_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PixError::invalid_field(
            id,
            format!("length '{}' is not numeric", len_str),
        ));
    }
    let value_len: usize = len_str
        .parse()
        .map_err(|_| PixError::invalid_field(id, format!("length '{}' is not numeric", len_str)))?;

    let start = offset + HEADER_LENGTH;
    let end = start.saturating_add(value_len);
    if end > input.len() {
        return Err(PixError::invalid_field(
            id,
            format!("declared length {} exceeds remaining {} bytes", value_len, input.len() - start),
        ));
    }
    let value = input
        .get(start..end)
        .ok_or_else(|| PixError::invalid_field(id, "value splits a multi-byte character"))?;

    let field = if templates(id) {
        log::trace!("Decoding template {} ({} bytes)", id, value_len);
        let children = decode_sequence(value, |_| false)?;
        EmvField {
            id: id.to_string(),
            value: EmvValue::Composite(children),
        }
    } else {
        EmvField {
            id: id.to_string(),
            value: EmvValue::Leaf(value.to_string()),
        }
    };

    Ok((field, end))
}

fn validate_id(id: &str) -> Result<()> {
    if id.len() == 2 && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PixError::invalid_field(id, "id must be two decimal digits"))
    }
}

fn check_length(id: &str, length: usize) -> Result<()> {
    if length > MAX_VALUE_LENGTH {
        return Err(PixError::invalid_field(
            id,
            format!("value has {} bytes, maximum is {}", length, MAX_VALUE_LENGTH),
        ));
    }
    Ok(())
}

fn fragment(input: &str, offset: usize) -> String {
    input.get(offset..).unwrap_or_default().chars().take(2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_leaf() {
        let field = EmvField::leaf("59", "JOHN DOE").unwrap();
        assert_eq!(field.encode(), "5908JOHN DOE");
        assert_eq!(EmvField::leaf("00", "01").unwrap().encode(), "000201");
    }

    #[test]
    fn test_encode_nested() {
        let account = EmvField::composite(
            "26",
            vec![
                EmvField::leaf("00", "br.gov.bcb.pix").unwrap(),
                EmvField::leaf("01", "test@example.com").unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(account.value_len(), 38);
        assert_eq!(account.encode(), "26380014br.gov.bcb.pix0116test@example.com");
    }

    #[test]
    fn test_length_counts_bytes() {
        let field = EmvField::leaf("59", "SÃO").unwrap();
        assert_eq!(field.encode(), "5904SÃO");
    }

    #[test]
    fn test_rejects_oversized_values() {
        assert!(EmvField::leaf("05", "x".repeat(99)).is_ok());
        let err = EmvField::leaf("05", "x".repeat(100)).unwrap_err();
        assert!(matches!(err, PixError::InvalidEmvField { ref id, .. } if id == "05"));

        let children = vec![EmvField::leaf("01", "y".repeat(91)).unwrap(), EmvField::leaf("02", "z").unwrap()];
        assert!(EmvField::composite("26", children).is_err());
    }

    #[test]
    fn test_rejects_bad_ids() {
        assert!(EmvField::leaf("A1", "x").is_err());
        assert!(EmvField::leaf("1", "x").is_err());
        assert!(EmvField::leaf("123", "x").is_err());
    }

    #[test]
    fn test_decode_with_offset() {
        let input = "0002015908JOHN DOE";
        let (first, next) = EmvField::decode(input, 0).unwrap();
        assert_eq!(first.as_str(), Some("01"));
        assert_eq!(next, 6);

        let (second, next) = EmvField::decode(input, next).unwrap();
        assert_eq!(second.id(), "59");
        assert_eq!(second.as_str(), Some("JOHN DOE"));
        assert_eq!(next, input.len());
    }

    #[test]
    fn test_decode_offset_overflow() {
        assert!(matches!(
            EmvField::decode("0002", usize::MAX),
            Err(PixError::InvalidEmvField { .. })
        ));
        assert!(EmvField::decode("0002", 3).is_err());
    }

    #[test]
    fn test_decode_templates() {
        let fields = decode_all("26380014br.gov.bcb.pix0116test@example.com62100506ABC123").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].child("01").and_then(EmvField::as_str), Some("test@example.com"));
        assert_eq!(fields[1].child("05").and_then(EmvField::as_str), Some("ABC123"));
    }

    #[test]
    fn test_unknown_ids_stay_opaque() {
        let fields = decode_all("80060102AB").unwrap();
        assert_eq!(fields[0].as_str(), Some("0102AB"));
        assert!(fields[0].children().is_empty());
    }

    #[test]
    fn test_nested_template_decodes_one_level() {
        let inner = EmvField::composite("50", vec![EmvField::leaf("00", "AB").unwrap()]).unwrap();
        let outer = EmvField::composite("26", vec![inner]).unwrap();

        let decoded = decode_all(&outer.encode()).unwrap();
        let child = decoded[0].child("50").unwrap();
        assert!(child.children().is_empty());
        assert_eq!(child.as_str(), Some("0002AB"));
        assert_eq!(decoded[0].encode(), outer.encode());
        assert_ne!(decoded[0], outer);
    }

    #[test]
    fn test_decode_errors() {
        // non-numeric length
        assert!(matches!(
            decode_all("59A1JOHN"),
            Err(PixError::InvalidEmvField { ref id, .. }) if id == "59"
        ));
        // declared length exceeds input
        assert!(matches!(
            decode_all("5910JOHN"),
            Err(PixError::InvalidEmvField { ref id, .. }) if id == "59"
        ));
        // non-numeric id
        assert!(decode_all("X1020101").is_err());
        // truncated header
        assert!(decode_all("000").is_err());
        // broken nested field inside a template
        assert!(decode_all("2606009901").is_err());
    }

    #[test]
    fn test_round_trip_keeps_structure() {
        let field = EmvField::composite(
            "62",
            vec![EmvField::leaf("05", "***").unwrap()],
        )
        .unwrap();
        let encoded = field.encode();
        let (decoded, next) = EmvField::decode(&encoded, 0).unwrap();
        assert_eq!(decoded, field);
        assert_eq!(next, encoded.len());
    }
}
