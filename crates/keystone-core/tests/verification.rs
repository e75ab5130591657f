use keystone_canonical::{from_json_str, CanonicalValue, Codec, Profile};
use keystone_core::{
    check, check_signature, sign, sign_value, verify, verify_value, ObjectBuilder, PublicKey,
    SecretKey, SignatureError, SignedObject,
};

// RFC 8032 section 7.1, TEST 1.
const RFC8032_SEED: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
const RFC8032_PUBLIC: &str = "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
const RFC8032_SIGNATURE: &str = "e5564300c360ac729086e2cc806e828a84877f1eb8e5d974d873e065224901555fb8821590a33bacc61e39701cf9b46bd25bf5f0595bbe24655141438e7a100b";

fn make_codec() -> Codec {
    Codec::new(Profile::v1())
}

fn make_secret() -> SecretKey {
    SecretKey::from_hex(RFC8032_SEED).unwrap()
}

#[test]
fn rfc8032_test_vector() {
    let secret = make_secret();
    assert_eq!(secret.public_key().to_hex(), RFC8032_PUBLIC);
    let sig = sign(b"", &secret);
    assert_eq!(sig.to_hex(), RFC8032_SIGNATURE);
    let public = PublicKey::from_hex(RFC8032_PUBLIC).unwrap();
    assert!(verify(b"", &hex::decode(RFC8032_SIGNATURE).unwrap(), &public));
}

#[test]
fn resigned_mutated_payload_does_not_verify_against_original_bytes() {
    let codec = make_codec();
    let secret = make_secret();
    let original = codec
        .canonicalize_json(r#"{"type": "note", "payload": {"title": "hello"}}"#)
        .unwrap();
    let original_sig = sign(&original.bytes, &secret);

    let mutated = codec
        .canonicalize_json(r#"{"type": "note", "payload": {"title": "hellO"}}"#)
        .unwrap();
    let mutated_sig = sign(&mutated.bytes, &secret);

    assert_ne!(original_sig, mutated_sig);
    assert!(!verify(&original.bytes, mutated_sig.as_bytes(), &secret.public_key()));
    assert!(!verify(&mutated.bytes, original_sig.as_bytes(), &secret.public_key()));
    assert!(verify(&original.bytes, original_sig.as_bytes(), &secret.public_key()));
}

#[test]
fn signature_is_bound_to_exact_bytes_not_decoded_value() {
    let secret = make_secret();
    let canonical = hex::decode("a2616100616201").unwrap();
    let reordered = hex::decode("a2616201616100").unwrap();
    let sig = sign(&canonical, &secret);

    assert_eq!(
        check(&reordered, sig.as_bytes(), &secret.public_key()),
        Err(SignatureError::InvalidSignature)
    );
    let permissive = Profile::v1().with_key_order(keystone_canonical::KeyOrderPolicy::Permissive);
    let decoded = Codec::new(permissive).decode(&reordered).unwrap();
    assert_eq!(make_codec().encode(&decoded), canonical);
}

#[test]
fn value_signatures_re_encode_before_checking() {
    let secret = make_secret();
    let value = from_json_str(r#"{"b": 1, "a": 0}"#).unwrap();
    let sig = sign_value(&value, &secret);
    assert!(verify_value(&value, &sig).is_ok());
    assert!(check_signature(&hex::decode("a2616100616201").unwrap(), &sig, &secret.public_key()).is_ok());

    let other = CanonicalValue::map([("a", CanonicalValue::UInt(0))]);
    assert_eq!(verify_value(&other, &sig), Err(SignatureError::InvalidSignature));
}

#[test]
fn signed_objects_survive_the_wire() {
    let codec = make_codec();
    let secret = make_secret();
    let first = ObjectBuilder::new("thread_create")
        .space_id("garden")
        .payload_value(&from_json_str(r#"{"title": "First"}"#).unwrap())
        .sign(&secret);
    let reply = ObjectBuilder::new("post")
        .space_id("garden")
        .channel_id("general")
        .reference(first.object_id())
        .payload_value(&from_json_str(r#"{"body": "reply"}"#).unwrap())
        .sign(&secret);

    let wire = reply.to_canonical_bytes();
    let received = SignedObject::from_canonical_bytes(&wire, &codec).unwrap();
    assert!(received.verify().is_ok());
    assert_eq!(received.references, vec![first.object_id()]);
    assert_eq!(received.object_id(), reply.object_id());

    let mut corrupted = wire.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    let tampered = SignedObject::from_canonical_bytes(&corrupted, &codec).unwrap();
    assert!(tampered.verify().is_err());
}
