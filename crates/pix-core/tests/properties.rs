//! Property tests: checksum consistency, idempotence, round trips

use pix_core::crc;
use pix_core::tlv::{decode_all, EmvField};
use pix_core::{KeyType, Parser, PayloadBuilder};
use proptest::prelude::*;

fn key_strategy() -> impl Strategy<Value = (KeyType, String)> {
    prop_oneof![
        "[a-z0-9]{1,20}@[a-z]{1,10}\\.(com|com\\.br|org)".prop_map(|v| (KeyType::Email, v)),
        "[0-9]{11}".prop_map(|v| (KeyType::Document, v)),
        "[0-9]{14}".prop_map(|v| (KeyType::Document, v)),
        "\\+[1-9][0-9]{7,14}".prop_map(|v| (KeyType::Phone, v)),
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}".prop_map(|v| (KeyType::Random, v)),
    ]
}

fn builder_strategy() -> impl Strategy<Value = PayloadBuilder> {
    (
        key_strategy(),
        "[A-Z][A-Z ]{0,39}",
        "[A-Z][A-Z ]{0,29}",
        proptest::option::of(1u64..100_000_000u64),
        proptest::option::of("[A-Za-z0-9]{1,25}"),
        proptest::option::of("[A-Za-z0-9 ]{1,60}"),
    )
        .prop_map(|((key_type, key), name, city, cents, tid, description)| {
            let mut builder = PayloadBuilder::new();
            builder
                .pix_key(key_type, &key)
                .unwrap()
                .merchant_name(&name)
                .unwrap()
                .merchant_city(&city)
                .unwrap();
            if let Some(cents) = cents {
                builder.amount(&format!("{}.{:02}", cents / 100, cents % 100)).unwrap();
            }
            if let Some(tid) = tid {
                builder.transaction_id(&tid).unwrap();
            }
            if let Some(description) = description {
                builder.description(&description);
            }
            builder
        })
}

fn template_strategy() -> impl Strategy<Value = EmvField> {
    let id = prop_oneof![(26u8..=51).prop_map(|id| id.to_string()), Just("62".to_string())];
    let child = ("[0-9]{2}", "[A-Za-z0-9 .@*-]{1,20}")
        .prop_map(|(id, value)| EmvField::leaf(&id, value).unwrap());
    (id, proptest::collection::vec(child, 1..4))
        .prop_map(|(id, children)| EmvField::composite(&id, children).unwrap())
}

proptest! {
    #[test]
    fn checksum_matches_trailer(builder in builder_strategy()) {
        let code = builder.finalize().unwrap();
        let (body, checksum) = code.split_at(code.len() - 4);
        prop_assert!(body.ends_with("6304"));
        prop_assert_eq!(crc::compute(body), checksum);
    }

    #[test]
    fn finalize_is_idempotent(builder in builder_strategy()) {
        prop_assert_eq!(builder.finalize().unwrap(), builder.finalize().unwrap());
    }

    #[test]
    fn parser_reconstructs_builder_output(builder in builder_strategy()) {
        let built = builder.build().unwrap();
        let decoded = Parser::new().decode(built.pix_code()).unwrap();
        prop_assert_eq!(decoded.key(), built.key());
        prop_assert_eq!(decoded.merchant_name(), built.merchant_name());
        prop_assert_eq!(decoded.merchant_city(), built.merchant_city());
        prop_assert_eq!(decoded.amount(), built.amount());
        prop_assert_eq!(decoded.transaction_id(), built.transaction_id());
        prop_assert_eq!(decoded.description(), built.description());
    }

    #[test]
    fn key_value_survives_encoding((key_type, raw) in key_strategy()) {
        let key = Parser::new().validate(key_type.as_str(), &raw).unwrap();
        let field = EmvField::composite(
            "26",
            vec![
                EmvField::leaf("00", "br.gov.bcb.pix").unwrap(),
                EmvField::leaf("01", key.value()).unwrap(),
            ],
        )
        .unwrap();
        let decoded = decode_all(&field.encode()).unwrap();
        prop_assert_eq!(decoded[0].child("01").and_then(EmvField::as_str), Some(key.value()));
    }

    #[test]
    fn template_survives_encoding(template in template_strategy()) {
        let encoded = template.encode();
        let (decoded, next) = EmvField::decode(&encoded, 0).unwrap();
        prop_assert_eq!(next, encoded.len());
        prop_assert_eq!(decoded, template);
    }

    #[test]
    fn decoder_never_panics(input in "\\PC{0,120}") {
        let _ = Parser::new().decode(&input);
    }
}
