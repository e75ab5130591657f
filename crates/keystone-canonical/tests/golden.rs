use keystone_canonical::{
    block_id, decode, encode, from_json_str, object_id, CanonicalMap, CanonicalValue, Codec,
    IngestionError, MapKey, Profile, RejectionReason,
};

fn hex_bytes(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

#[test]
fn description_with_unordered_keys_encodes_to_golden_bytes() {
    let codec = Codec::new(Profile::v1());
    let out = codec.canonicalize_json(r#"{"b": 1, "a": 0}"#).unwrap();
    assert_eq!(out.bytes, hex_bytes("a2616100616201"));
    assert_eq!(
        out.object_id.to_hex(),
        "0e0737331f0aa937467d1ed21fc38582bc3888b00eb8e33466894e938c53b995"
    );
}

#[test]
fn pinned_blake3_digests() {
    assert_eq!(
        block_id(b"").to_hex(),
        "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
    );
    assert_eq!(
        block_id(b"abc").to_hex(),
        "6437b3ac38465133ffb63b75273a8db548c558465d79db03fd359c6cd5bd9d85"
    );
    assert_eq!(
        block_id(&[0u8; 1024]).to_hex(),
        "d6fd9de5bccf223f523b316c9cd1cf9a9d87ea42473d68e011dad13f09bf8917"
    );
}

#[test]
fn fractional_number_is_rejected_by_ingestion() {
    let err = from_json_str("1.5").unwrap_err();
    assert!(matches!(err, IngestionError::FloatingPointValue { .. }));
}

#[test]
fn indefinite_length_map_is_rejected() {
    let rejection = decode(&hex_bytes("bf616100ff"), &Profile::v1()).unwrap_err();
    assert_eq!(rejection.reason, RejectionReason::IndefiniteLength);
    assert_eq!(rejection.offset, 0);
}

fn sample_values() -> Vec<CanonicalValue> {
    let mut bytes_keyed = CanonicalMap::new();
    bytes_keyed.insert(MapKey::Bytes(vec![0, 1]), CanonicalValue::Null);
    bytes_keyed.insert("zz", CanonicalValue::Bool(true));
    bytes_keyed.insert("a", CanonicalValue::integer(-1000));

    vec![
        CanonicalValue::UInt(0),
        CanonicalValue::UInt(u64::MAX),
        CanonicalValue::NegInt(i64::MIN),
        CanonicalValue::text("caf\u{e9}"),
        CanonicalValue::bytes(vec![0xff; 300]),
        CanonicalValue::Array(vec![
            CanonicalValue::Null,
            CanonicalValue::Bool(false),
            CanonicalValue::Array(vec![]),
        ]),
        CanonicalValue::Map(bytes_keyed),
        CanonicalValue::map([
            ("type", CanonicalValue::text("note")),
            (
                "payload",
                CanonicalValue::map([("title", CanonicalValue::text("hello"))]),
            ),
            ("version", CanonicalValue::UInt(1)),
        ]),
    ]
}

#[test]
fn every_encoded_value_decodes_back_to_itself() {
    let profile = Profile::v1();
    for value in sample_values() {
        let bytes = encode(&value);
        let decoded = decode(&bytes, &profile).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(encode(&decoded), bytes, "re-encoding {value}");
    }
}

#[test]
fn encoding_is_independent_of_insertion_order() {
    let forward: CanonicalMap = (0..50u64)
        .map(|i| (format!("key-{i}"), CanonicalValue::UInt(i)))
        .collect();
    let reverse: CanonicalMap = (0..50u64)
        .rev()
        .map(|i| (format!("key-{i}"), CanonicalValue::UInt(i)))
        .collect();
    let a = CanonicalValue::Map(forward);
    let b = CanonicalValue::Map(reverse);
    assert_eq!(a, b);
    assert_eq!(encode(&a), encode(&b));
    assert_eq!(object_id(&encode(&a)), object_id(&encode(&b)));
}

#[test]
fn codec_is_shareable_across_threads() {
    let codec = Codec::new(Profile::v1());
    let values = sample_values();
    let expected: Vec<Vec<u8>> = values.iter().map(encode).collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for (value, bytes) in values.iter().zip(&expected) {
                    let out = codec.canonicalize(value).unwrap();
                    assert_eq!(&out.bytes, bytes);
                }
            });
        }
    });
}

#[test]
fn diagnostic_notation_uses_canonical_order() {
    let value = from_json_str(r#"{"bb": [1, -2], "a": "x"}"#).unwrap();
    assert_eq!(value.to_string(), r#"{"a": "x", "bb": [1, -2]}"#);
}
