//! Behavioral properties of encoding, ordering, hashing and containment.

use std::cmp::Ordering;

use libjsonbc::{
    compare, contained, contains, encode, eq, hash, parse, text, Builder, Container, Error,
    KeyDictionary, Token, Value,
};

fn build(dict: &KeyDictionary, tokens: Vec<Token>) -> Value {
    let mut builder = Builder::new(dict);
    let mut result = None;
    for token in tokens {
        if let Some(v) = builder.push(token).unwrap() {
            result = Some(v);
        }
    }
    result.expect("root closed")
}

fn num(n: i32) -> Value {
    Value::from(n)
}

/// A mixed corpus used for the ordering checks.
const CORPUS: &[&str] = &[
    "null",
    "true",
    "false",
    "0",
    "-1",
    "1.5",
    "\"\"",
    "\"a\"",
    "\"ab\"",
    "\"b\"",
    "[]",
    "[null]",
    "[1]",
    "[\"a\"]",
    "[1, 2]",
    "[[1], 2]",
    "[{}]",
    "{}",
    "{\"a\": 1}",
    "{\"a\": 2}",
    "{\"b\": 1}",
    "{\"a\": [1]}",
    "{\"a\": 1, \"b\": 2}",
    "{\"a\": {\"b\": null}}",
];

fn corpus(dict: &KeyDictionary) -> Vec<Container> {
    CORPUS.iter().map(|s| parse(s, dict).unwrap()).collect()
}

#[test]
fn test_tree_roundtrip() {
    let dict = KeyDictionary::in_memory();
    let tree = build(
        &dict,
        vec![
            Token::BeginObject { count: 3 },
            Token::key("zeta"),
            Token::Value("last".into()),
            Token::key("alpha"),
            Token::BeginArray {
                count: 3,
                raw_scalar: false,
            },
            Token::Elem(num(3)),
            Token::BeginObject { count: 0 },
            Token::EndObject,
            Token::Elem(Value::Bool(false)),
            Token::EndArray,
            Token::key("mid"),
            Token::Value(Value::Numeric("1e-3".parse().unwrap())),
            Token::EndObject,
        ],
    );

    let c = encode(&tree).unwrap();
    let decoded = Value::from_container(&c, &dict).unwrap();
    assert_eq!(decoded, tree);
}

#[test]
fn test_object_deduplication() {
    let dict = KeyDictionary::in_memory();
    let tree = build(
        &dict,
        vec![
            Token::BeginObject { count: 2 },
            Token::key("a"),
            Token::Value(num(1)),
            Token::key("a"),
            Token::Value(num(2)),
            Token::EndObject,
        ],
    );
    let c = encode(&tree).unwrap();
    assert_eq!(c.root_count(), 1);
    assert_eq!(text::to_text(&c, &dict).unwrap(), r#"{"a": 2}"#);
}

#[test]
fn test_ordering_is_antisymmetric() {
    let dict = KeyDictionary::in_memory();
    let docs = corpus(&dict);
    for (i, a) in docs.iter().enumerate() {
        for (j, b) in docs.iter().enumerate() {
            let ab = compare(a, b, &dict).unwrap();
            let ba = compare(b, a, &dict).unwrap();
            assert_eq!(ab, ba.reverse(), "{} vs {}", CORPUS[i], CORPUS[j]);
            assert_eq!(ab == Ordering::Equal, i == j, "{} vs {}", CORPUS[i], CORPUS[j]);
            assert_eq!(eq(a, b, &dict).unwrap(), ab == Ordering::Equal);
        }
    }
}

#[test]
fn test_ordering_is_transitive() {
    let dict = KeyDictionary::in_memory();
    let mut docs = corpus(&dict);
    docs.sort_by(|a, b| compare(a, b, &dict).unwrap());
    for i in 0..docs.len() {
        for j in i + 1..docs.len() {
            assert_eq!(
                compare(&docs[i], &docs[j], &dict).unwrap(),
                Ordering::Less,
                "{} !< {}",
                text::to_text(&docs[i], &dict).unwrap(),
                text::to_text(&docs[j], &dict).unwrap()
            );
        }
    }
}

#[test]
fn test_fewer_pairs_sort_first() {
    let dict = KeyDictionary::in_memory();
    let a = parse(r#"{"a": 1}"#, &dict).unwrap();
    let b = parse(r#"{"a": 1, "b": 2}"#, &dict).unwrap();
    assert_eq!(compare(&a, &b, &dict).unwrap(), Ordering::Less);
}

#[test]
fn test_containment_scenario() {
    let dict = KeyDictionary::in_memory();
    let doc = parse(r#"{"a": 1, "b": [true, null, "x"]}"#, &dict).unwrap();
    assert_eq!(
        text::to_text(&doc, &dict).unwrap(),
        r#"{"a": 1, "b": [true, null, "x"]}"#
    );

    let sub = parse(r#"{"b": [true]}"#, &dict).unwrap();
    assert!(contains(&doc, &sub).unwrap());
    assert!(contained(&sub, &doc).unwrap());

    let other = parse(r#"{"a": 2}"#, &dict).unwrap();
    assert!(!contains(&doc, &other).unwrap());
}

#[test]
fn test_containment_reflexive_and_empty() {
    let dict = KeyDictionary::in_memory();
    let empty_object = parse("{}", &dict).unwrap();
    let empty_array = parse("[]", &dict).unwrap();

    for doc in corpus(&dict) {
        assert!(contains(&doc, &doc).unwrap());
        if doc.is_object() {
            assert!(contains(&doc, &empty_object).unwrap());
        } else if doc.is_array() {
            assert!(contains(&doc, &empty_array).unwrap());
        }
    }
}

#[test]
fn test_containment_monotonic_in_lhs() {
    let dict = KeyDictionary::in_memory();
    let pairs = [
        (r#"{"a": 1}"#, r#"{"a": 1, "z": [1, 2]}"#),
        (r#"{"a": {"b": 1}}"#, r#"{"a": {"b": 1, "c": 2}, "d": null}"#),
        (r#"{"a": [1, {"x": 1}]}"#, r#"{"a": [1, {"x": 1}], "q": "r"}"#),
    ];
    for (small, big) in pairs {
        let small = parse(small, &dict).unwrap();
        let big = parse(big, &dict).unwrap();
        for doc in corpus(&dict) {
            if contains(&small, &doc).unwrap() {
                assert!(contains(&big, &doc).unwrap());
            }
        }
        assert!(contains(&big, &small).unwrap());
    }
}

#[test]
fn test_scalar_wrapper_decodes_bare() {
    let dict = KeyDictionary::in_memory();
    let c = encode(&num(42)).unwrap();
    assert!(c.is_scalar());
    assert_eq!(c.root_count(), 1);
    assert_eq!(Value::from_container(&c, &dict).unwrap(), num(42));
    assert_eq!(text::to_text(&c, &dict).unwrap(), "42");
}

#[test]
fn test_equal_values_hash_equal() {
    let dict = KeyDictionary::in_memory();
    let a = parse(r#"{"x": 1.0, "y": [1, 2]}"#, &dict).unwrap();
    let b = parse(r#"{"y": [1, 2], "x": 1}"#, &dict).unwrap();
    assert!(eq(&a, &b, &dict).unwrap());
    assert_eq!(hash(&a, &dict).unwrap(), hash(&b, &dict).unwrap());
}

#[test]
fn test_decode_with_wrong_dictionary_fails() {
    let writer = KeyDictionary::in_memory();
    let c = parse(r#"{"only": true}"#, &writer).unwrap();
    let reader = KeyDictionary::in_memory();
    assert!(matches!(
        text::to_text(&c, &reader),
        Err(Error::DictionaryLookupFailure(1))
    ));
}

#[test]
fn test_file_dictionary_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.dict");

    let wire = {
        let dict = KeyDictionary::open_file(&path).unwrap();
        let c = parse(r#"{"name": "widget", "size": {"w": 3}}"#, &dict).unwrap();
        dict.close().unwrap();
        c.to_wire()
    };

    let dict = KeyDictionary::open_file(&path).unwrap();
    let c = Container::from_wire(wire).unwrap();
    assert_eq!(
        text::to_text(&c, &dict).unwrap(),
        r#"{"name": "widget", "size": {"w": 3}}"#
    );
}

#[test]
fn test_malformed_bytes_never_panic() {
    let dict = KeyDictionary::in_memory();
    let good = parse(r#"{"a": [1, "two", {"b": null}], "c": 3.25}"#, &dict)
        .unwrap()
        .as_bytes()
        .to_vec();

    for cut in 0..good.len() {
        if let Ok(c) = Container::from_bytes(good[..cut].to_vec()) {
            assert!(text::to_text(&c, &dict).is_err(), "truncated at {}", cut);
        }
    }
    for i in 0..good.len() {
        let mut bad = good.clone();
        bad[i] ^= 0xFF;
        if let Ok(c) = Container::from_bytes(bad) {
            let _ = text::to_text(&c, &dict);
            let _ = contains(&c, &c);
            let _ = hash(&c, &dict);
        }
    }
}
