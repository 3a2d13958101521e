/* Codec tests for structgen_runtime: descriptors are resolved and planned
 * exactly as the generator does it, then driven through the registry */

mod common;

use common::{ints, record, registry, registry_with, seq, union};
use pretty_assertions::assert_eq;
use std::io;
use std::sync::{Arc, Mutex};
use structgen_runtime::codec::raw::decode_with_stats;
use structgen_runtime::{
    DecodeErrorKind, DecodeOptions, EncodeError, Format, Registry, RuntimeConfig, Severity, Value,
};

const CODECS: &str = r#"
module:
  name: Codecs
types:
  - name: Numbers
    encodings: all
    kind:
      record-of:
        element:
          name: item
          field-type:
            primitive:
              type: integer
    attributes:
      text:
        begin: "{"
        separator: ","
        end: "}"

  - name: Choice
    encodings: {tlv: true, text: true, xml: true, json: true}
    kind:
      union:
        alternatives:
          - name: num
            field-type: {primitive: {type: integer}}
          - name: word
            field-type: {primitive: {type: charstring}}

  - name: Entry
    encodings: {tlv: true, text: true, xml: true, json: true}
    kind:
      record:
        fields:
          - name: key
            field-type: {primitive: {type: charstring}}
          - name: count
            field-type: {primitive: {type: integer}}
            optional: true
            json: {alias: n}

  - name: Loose
    encodings: {tlv: true, json: true}
    kind:
      union:
        alternatives:
          - name: a
            field-type: {primitive: {type: integer}}
          - name: b
            field-type: {primitive: {type: charstring}}
    attributes:
      json: {as-value: true}

  - name: Header
    encodings: {bit-packed: true}
    kind:
      record:
        fields:
          - name: kind
            field-type: {primitive: {type: integer, raw: {bits: 16}}}
          - name: flag
            field-type: {primitive: {type: boolean}}
          - name: rest
            field-type: {primitive: {type: integer, raw: {bits: 7}}}
"#;

fn codecs() -> Registry {
    registry(CODECS)
}

fn round_trip(registry: &Registry, format: Format, type_name: &str, value: &Value) -> Vec<u8> {
    let encoded = registry
        .encode(format, type_name, value)
        .unwrap_or_else(|err| panic!("{} encode of {}: {}", format.name(), type_name, err));
    let decoded = registry
        .decode(format, type_name, &encoded, DecodeOptions::silent())
        .unwrap_or_else(|err| panic!("{} decode of {}: {}", format.name(), type_name, err));
    assert_eq!(&decoded, value, "{} round trip of {}", format.name(), type_name);
    encoded
}

fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("textual encoding")
}

#[test]
fn numbers_round_trip_in_every_format() {
    let registry = codecs();
    let value = ints(&registry, "Numbers", &[1, 2, 3]);

    assert_eq!(
        round_trip(&registry, Format::Tlv, "Numbers", &value),
        vec![0x30, 0x09, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x02, 0x01, 0x03]
    );
    assert_eq!(round_trip(&registry, Format::BitPacked, "Numbers", &value), vec![1, 2, 3]);
    assert_eq!(text(round_trip(&registry, Format::Text, "Numbers", &value)), "{1,2,3}");
    assert_eq!(
        text(round_trip(&registry, Format::Xml, "Numbers", &value)),
        "<Numbers><item>1</item><item>2</item><item>3</item></Numbers>"
    );
    assert_eq!(text(round_trip(&registry, Format::Json, "Numbers", &value)), "[1,2,3]");

    let empty = ints(&registry, "Numbers", &[]);
    for format in Format::ALL {
        round_trip(&registry, format, "Numbers", &empty);
    }
}

#[test]
fn unions_and_records_round_trip() {
    let registry = codecs();
    let word = union(&registry, "Choice", "word", Value::from("say \"hi\""));
    let num = union(&registry, "Choice", "num", Value::Integer(-300));
    let full = record(&registry, "Entry", &[("key", Value::from("a<b")), ("count", Value::Integer(3))]);
    let partial = record(&registry, "Entry", &[("key", Value::from("solo"))]);

    for format in [Format::Tlv, Format::Text, Format::Xml, Format::Json] {
        for value in [&word, &num] {
            round_trip(&registry, format, "Choice", value);
        }
        for value in [&full, &partial] {
            round_trip(&registry, format, "Entry", value);
        }
    }

    assert_eq!(text(round_trip(&registry, Format::Json, "Choice", &num)), r#"{"num":-300}"#);
    assert_eq!(text(round_trip(&registry, Format::Json, "Entry", &full)), r#"{"key":"a<b","n":3}"#);
    assert_eq!(text(round_trip(&registry, Format::Text, "Entry", &partial)), r#""solo","#);
    assert_eq!(
        text(round_trip(&registry, Format::Xml, "Entry", &full)),
        "<Entry><key>a&lt;b</key><count>3</count></Entry>"
    );
    assert_eq!(round_trip(&registry, Format::Tlv, "Choice", &num), vec![0x02, 0x02, 0xFE, 0xD4]);
}

#[test]
fn bit_packed_fields_share_bytes() {
    let registry = codecs();
    let header = record(
        &registry,
        "Header",
        &[("kind", Value::Integer(0x0102)), ("flag", Value::Boolean(true)), ("rest", Value::Integer(5))],
    );
    assert_eq!(round_trip(&registry, Format::BitPacked, "Header", &header), vec![0x02, 0x01, 0x0B]);

    let too_wide = record(
        &registry,
        "Header",
        &[("kind", Value::Integer(1)), ("flag", Value::Boolean(false)), ("rest", Value::Integer(200))],
    );
    assert!(matches!(
        registry.encode(Format::BitPacked, "Header", &too_wide),
        Err(EncodeError::Invalid { .. })
    ));
}

#[test]
fn unbound_values_are_rejected_by_every_encoder() {
    let registry = codecs();
    let unbound = registry.new_value("Numbers").expect("known type");
    for format in Format::ALL {
        match registry.encode(format, "Numbers", &unbound) {
            Err(EncodeError::Unbound { type_name, .. }) => assert_eq!(type_name, "Numbers"),
            other => panic!("{} encoded an unbound value: {:?}", format.name(), other),
        }
    }

    let holey = seq(&registry, "Numbers", vec![Some(Value::Integer(1)), None]);
    for format in [Format::Tlv, Format::BitPacked, Format::Xml, Format::Json] {
        match registry.encode(format, "Numbers", &holey) {
            Err(EncodeError::Unbound { path, .. }) => assert_eq!(path, "Numbers[1]"),
            other => panic!("{} encoded an unbound element: {:?}", format.name(), other),
        }
    }

    let missing_key = record(&registry, "Entry", &[("count", Value::Integer(1))]);
    assert!(matches!(
        registry.encode(Format::Json, "Entry", &missing_key),
        Err(EncodeError::Unbound { .. })
    ));
}

#[test]
fn text_keeps_omitted_elements_in_place() {
    let registry = codecs();

    /* {1, 2, omit, 4}: the hole survives and nothing trailing is trimmed */
    let inner_hole = seq(
        &registry,
        "Numbers",
        vec![Some(Value::Integer(1)), Some(Value::Integer(2)), None, Some(Value::Integer(4))],
    );
    assert_eq!(text(round_trip(&registry, Format::Text, "Numbers", &inner_hole)), "{1,2,,4}");
    let decoded = registry
        .decode(Format::Text, "Numbers", b"{1,2,,4}", DecodeOptions::silent())
        .expect("decode");
    let decoded = decoded.as_seq().expect("sequence");
    assert_eq!(decoded.element_at(2).expect("in range"), &None);
    assert_eq!(decoded.size_of().expect("bound"), 4);
    assert_eq!(decoded.length_of().expect("bound"), 4);

    /* A trailing omit keeps the slot allocated, but lengthof trims it */
    let trailing = seq(
        &registry,
        "Numbers",
        vec![Some(Value::Integer(1)), Some(Value::Integer(2)), Some(Value::Integer(4)), None],
    );
    assert_eq!(text(round_trip(&registry, Format::Text, "Numbers", &trailing)), "{1,2,4,}");
    let decoded = registry
        .decode(Format::Text, "Numbers", b"{1,2,4,}", DecodeOptions::silent())
        .expect("decode");
    let decoded = decoded.as_seq().expect("sequence");
    assert_eq!(decoded.size_of().expect("bound"), 4);
    assert_eq!(decoded.length_of().expect("bound"), 3);
}

#[test]
fn failed_decode_into_clears_the_target() {
    let registry = codecs();
    let mut target = ints(&registry, "Numbers", &[7]);
    let err = registry
        .decode_into(Format::Text, "Numbers", b"{1,x}", &mut target, DecodeOptions::silent())
        .expect_err("malformed input");
    assert!(!err.recoverable);
    assert!(!target.is_bound());

    registry
        .decode_into(Format::Text, "Numbers", b"{5}", &mut target, DecodeOptions::silent())
        .expect("valid input");
    assert_eq!(target, ints(&registry, "Numbers", &[5]));
}

#[test]
fn decode_errors_name_where_they_happened() {
    let registry = codecs();
    let err = registry
        .decode(Format::Json, "Numbers", br#"[1, "two"]"#, DecodeOptions::silent())
        .expect_err("string element");
    assert_eq!(err.path(), "Numbers[1]");

    let err = registry
        .decode(Format::Tlv, "Numbers", &[0x30, 0x03, 0x02, 0x01, 0x01, 0x00], DecodeOptions::silent())
        .expect_err("trailing byte");
    assert_eq!(err.kind, DecodeErrorKind::TrailingData(1));
}

#[test]
fn json_as_value_union_is_chosen_by_token_category() {
    let registry = codecs();
    let decoded = registry
        .decode(Format::Json, "Loose", br#""hello""#, DecodeOptions::silent())
        .expect("string selects b");
    assert_eq!(decoded, union(&registry, "Loose", "b", Value::from("hello")));

    let decoded = registry
        .decode(Format::Json, "Loose", b"42", DecodeOptions::silent())
        .expect("number selects a");
    assert_eq!(decoded.as_union().expect("union").selected_name(), Some("a"));
    assert_eq!(text(round_trip(&registry, Format::Json, "Loose", &decoded)), "42");

    let err = registry
        .decode(Format::Json, "Loose", b"true", DecodeOptions::silent())
        .expect_err("no alternative accepts a literal");
    assert_eq!(
        err.kind,
        DecodeErrorKind::CouldNotDecodeByAnyField {
            type_name: "Loose".to_string(),
            category: "a literal",
        }
    );
}

#[test]
fn missing_format_is_reported() {
    let registry = codecs();
    let header = record(
        &registry,
        "Header",
        &[("kind", Value::Integer(1)), ("flag", Value::Boolean(false)), ("rest", Value::Integer(0))],
    );
    assert!(matches!(
        registry.encode(Format::Json, "Header", &header),
        Err(EncodeError::FormatNotSupported { format: "JSON", .. })
    ));
}

/* ----------------------------------------------------- bit-packed unions */

const MESSAGES: &str = r#"
module:
  name: Messages
types:
  - name: MsgX
    encodings: {bit-packed: true}
    kind:
      record:
        fields:
          - name: kind
            field-type: {primitive: {type: integer, raw: {bits: 16}}}
          - name: value
            field-type: {primitive: {type: integer}}

  - name: MsgY
    encodings: {bit-packed: true}
    kind:
      record:
        fields:
          - name: kind
            field-type: {primitive: {type: integer, raw: {bits: 16}}}
          - name: flag
            field-type: {primitive: {type: boolean, raw: {bits: 8}}}

  - name: Msg
    encodings: {bit-packed: true}
    kind:
      union:
        alternatives:
          - name: y
            field-type: {type-ref: {name: MsgY}}
          - name: x
            field-type: {type-ref: {name: MsgX}}
    attributes:
      raw:
        tag-rules:
          - alternative: y
            conditions:
              - field: [kind]
                values: [2]
          - alternative: x
            conditions:
              - field: [kind]
                values: [1]
"#;

#[test]
fn discriminator_selects_alternative_without_decoding_the_other() {
    let registry = registry(MESSAGES);
    let plan = registry.plan("Msg").expect("Msg plan");

    let body = record(&registry, "MsgX", &[("kind", Value::Integer(1)), ("value", Value::Integer(42))]);
    let message = union(&registry, "Msg", "x", body);
    let encoded = registry.encode(Format::BitPacked, "Msg", &message).expect("encode");
    assert_eq!(encoded, vec![0x01, 0x00, 0x2A]);

    let (decoded, stats) = decode_with_stats(&registry, plan, &encoded);
    assert_eq!(decoded.expect("decode"), message);
    assert_eq!(stats.full_decodes_of("Msg", "y"), 0);
    assert_eq!(stats.full_decodes_of("Msg", "x"), 1);
    /* Both rules read the same 16 bits; the second read is served from cache */
    assert_eq!(stats.discriminator_decodes, 1);
    assert_eq!(stats.cache_hits, 1);

    let (result, stats) = decode_with_stats(&registry, plan, &[0x03, 0x00, 0x01]);
    assert!(matches!(
        result.map_err(|err| err.kind),
        Err(DecodeErrorKind::NoUnionMemberFound { .. })
    ));
    assert_eq!(stats.full_decodes_of("Msg", "x") + stats.full_decodes_of("Msg", "y"), 0);
}

/* -------------------------------------------------------- TLV open types */

const FRAMES: &str = r#"
module:
  name: Frames
types:
  - name: Payload
    encodings: {tlv: true}
    kind:
      union:
        open-type: true
        alternatives:
          - name: small
            field-type: {primitive: {type: integer}}
          - name: big
            field-type: {primitive: {type: integer}}

  - name: Frame
    encodings: {tlv: true}
    kind:
      record:
        fields:
          - name: id
            field-type: {primitive: {type: integer}}
          - name: payload
            field-type: {type-ref: {name: Payload}}
        constraints:
          - field: payload
            keys: [id]
            table:
              - values: [1]
                alternative: small
              - values: [2]
                alternative: big
"#;

fn frame(registry: &Registry, id: i64, alternative: &str, payload: i64) -> Value {
    let payload = union(registry, "Payload", alternative, Value::Integer(payload));
    record(registry, "Frame", &[("id", Value::Integer(id)), ("payload", payload)])
}

fn with_severity(severity: Severity) -> Registry {
    registry_with(
        FRAMES,
        RuntimeConfig {
            broken_constraint: severity,
            ..RuntimeConfig::default()
        },
    )
}

#[test]
fn open_type_follows_constraint_table() {
    let registry = with_severity(Severity::Error);
    let value = frame(&registry, 2, "big", 7);
    let encoded = round_trip(&registry, Format::Tlv, "Frame", &value);
    assert_eq!(encoded, vec![0x30, 0x06, 0x02, 0x01, 0x02, 0x02, 0x01, 0x07]);
}

#[test]
fn broken_constraint_severity() {
    let encoded = {
        let registry = with_severity(Severity::Error);
        registry
            .encode(Format::Tlv, "Frame", &frame(&registry, 3, "big", 7))
            .expect("encode")
    };

    let registry = with_severity(Severity::Error);
    let err = registry
        .decode(Format::Tlv, "Frame", &encoded, DecodeOptions::silent())
        .expect_err("no row for id 3");
    assert!(matches!(err.kind, DecodeErrorKind::BrokenConstraint { ref field, .. } if field == "payload"));
    assert_eq!(err.path(), "Frame.payload");

    /* Warning and Ignore fall back to tag claims, where `small` comes first */
    for severity in [Severity::Warning, Severity::Ignore] {
        let registry = with_severity(severity);
        let decoded = registry
            .decode(Format::Tlv, "Frame", &encoded, DecodeOptions::silent())
            .expect("decoded by tag");
        assert_eq!(decoded, frame(&registry, 3, "small", 7));
    }
}

/* ------------------------------------------------------------- XML modes */

const XML_MODES: &str = r#"
module:
  name: Markup
types:
  - name: Tags
    encodings: {xml: true}
    kind:
      record-of:
        element:
          name: tag
          field-type: {primitive: {type: integer}}
    attributes:
      xml: {list: true}

  - name: TagAttr
    encodings: {xml: true}
    kind:
      record-of:
        element:
          name: tag
          field-type: {primitive: {type: integer}}
    attributes:
      xml: {attribute: true}

  - name: Item
    encodings: {xml: true}
    kind:
      record:
        fields:
          - name: tags
            field-type: {type-ref: {name: TagAttr}}
          - name: name
            field-type: {primitive: {type: charstring}}

  - name: Shape
    encodings: {xml: true}
    kind:
      union:
        alternatives:
          - name: circle
            field-type: {primitive: {type: integer}}
          - name: label
            field-type: {primitive: {type: charstring}}
    attributes:
      xml: {use-type: true}

  - name: Bare
    encodings: {xml: true}
    kind:
      union:
        alternatives:
          - name: n
            field-type: {primitive: {type: integer}}
          - name: s
            field-type: {primitive: {type: charstring}}
    attributes:
      xml: {untagged: true}

  - name: Words
    encodings: {xml: true}
    kind:
      record-of:
        element:
          name: word
          field-type: {primitive: {type: charstring}}
    attributes:
      xml: {list: true}

  - name: Holder
    encodings: {xml: true}
    kind:
      record:
        fields:
          - name: v
            field-type: {type-ref: {name: Bare}}
    attributes:
      xml: {name: holder}
"#;

#[test]
fn xml_list_attribute_and_type_modes() {
    let registry = registry(XML_MODES);

    let tags = ints(&registry, "Tags", &[1, 2, 3]);
    assert_eq!(text(round_trip(&registry, Format::Xml, "Tags", &tags)), "<Tags>1 2 3</Tags>");

    let item = record(
        &registry,
        "Item",
        &[("tags", ints(&registry, "TagAttr", &[4, 5])), ("name", Value::from("x"))],
    );
    assert_eq!(
        text(round_trip(&registry, Format::Xml, "Item", &item)),
        r#"<Item tags="4 5"><name>x</name></Item>"#
    );

    let shape = union(&registry, "Shape", "circle", Value::Integer(5));
    assert_eq!(
        text(round_trip(&registry, Format::Xml, "Shape", &shape)),
        r#"<Shape type="circle">5</Shape>"#
    );

    let holder = record(&registry, "Holder", &[("v", union(&registry, "Bare", "s", Value::from("hi")))]);
    assert_eq!(text(round_trip(&registry, Format::Xml, "Holder", &holder)), "<holder><s>hi</s></holder>");
}

#[test]
fn xml_selected_alternative_does_not_backtrack() {
    let registry = registry(XML_MODES);
    let err = registry
        .decode(Format::Xml, "Holder", b"<holder><n>not a number</n></holder>", DecodeOptions::silent())
        .expect_err("n is selected by its tag and fails");
    assert_eq!(err.path(), "Holder.v.<n>");

    let decoded = registry
        .decode(
            Format::Xml,
            "Holder",
            b"<?xml version=\"1.0\"?>\n<holder>\n  <!-- spacing is ignored -->\n  <n>12</n>\n</holder>\n",
            DecodeOptions::silent(),
        )
        .expect("whitespace between elements");
    assert_eq!(
        decoded,
        record(&registry, "Holder", &[("v", union(&registry, "Bare", "n", Value::Integer(12)))])
    );
}

#[test]
fn xml_list_items_must_survive_whitespace_splitting() {
    let registry = registry(XML_MODES);
    let words = seq(&registry, "Words", vec![Some(Value::from("a")), Some(Value::from("b"))]);
    assert_eq!(text(round_trip(&registry, Format::Xml, "Words", &words)), "<Words>a b</Words>");

    for bad in ["a b", "", "tab\there"] {
        let words = seq(&registry, "Words", vec![Some(Value::from(bad))]);
        match registry.encode(Format::Xml, "Words", &words) {
            Err(EncodeError::Invalid { type_name, .. }) => assert_eq!(type_name, "Words"),
            other => panic!("{:?} encoded as a list item: {:?}", bad, other),
        }
    }
}

/* ------------------------------------------------------ sequence layouts */

const LAYOUTS: &str = r#"
module:
  name: Layouts
types:
  - name: IntSet
    encodings: {tlv: true}
    kind:
      set-of:
        element:
          name: item
          field-type: {primitive: {type: integer}}

  - name: Nibbles
    encodings: {bit-packed: true}
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer, raw: {bits: 4}}}
    attributes:
      raw: {extension-bit: "yes"}

  - name: ReverseNibbles
    encodings: {bit-packed: true}
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer, raw: {bits: 4}}}
    attributes:
      raw: {extension-bit: reverse}

  - name: Pair
    encodings: {bit-packed: true}
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer}}
    attributes:
      raw: {count: 2}

  - name: Words
    encodings: {bit-packed: true}
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer, raw: {bits: 16}}}
"#;

#[test]
fn tlv_set_of_is_written_in_canonical_order() {
    let registry = registry(LAYOUTS);
    let value = ints(&registry, "IntSet", &[300, 1, -5]);
    let encoded = round_trip(&registry, Format::Tlv, "IntSet", &value);
    assert_eq!(
        encoded,
        vec![0x31, 0x0A, 0x02, 0x01, 0x01, 0x02, 0x01, 0xFB, 0x02, 0x02, 0x01, 0x2C]
    );

    /* the same elements in another order encode identically */
    let shuffled = ints(&registry, "IntSet", &[-5, 300, 1]);
    assert_eq!(registry.encode(Format::Tlv, "IntSet", &shuffled).expect("encode"), encoded);
}

#[test]
fn tlv_rejects_primitive_constructed_mismatches() {
    let registry = codecs();
    /* integer element flagged constructed */
    let err = registry
        .decode(Format::Tlv, "Numbers", &[0x30, 0x03, 0x22, 0x01, 0x01], DecodeOptions::silent())
        .expect_err("constructed integer");
    assert!(matches!(err.kind, DecodeErrorKind::Malformed(_)));
    assert_eq!(err.path(), "Numbers[0]");

    /* sequence flagged primitive */
    let err = registry
        .decode(Format::Tlv, "Numbers", &[0x10, 0x03, 0x02, 0x01, 0x01], DecodeOptions::silent())
        .expect_err("primitive sequence");
    assert!(matches!(err.kind, DecodeErrorKind::Malformed(_)));
}

#[test]
fn extension_bits_delimit_record_of() {
    let registry = registry(LAYOUTS);

    /* 1, 3, 1, 5, 0 with 4-bit items, low bits first */
    let value = ints(&registry, "Nibbles", &[3, 5]);
    assert_eq!(round_trip(&registry, Format::BitPacked, "Nibbles", &value), vec![0x67, 0x01]);
    assert_eq!(
        round_trip(&registry, Format::BitPacked, "Nibbles", &ints(&registry, "Nibbles", &[])),
        vec![0x00]
    );

    let value = ints(&registry, "ReverseNibbles", &[3, 5]);
    assert_eq!(round_trip(&registry, Format::BitPacked, "ReverseNibbles", &value), vec![0x46, 0x05]);
    assert_eq!(
        round_trip(&registry, Format::BitPacked, "ReverseNibbles", &ints(&registry, "ReverseNibbles", &[])),
        vec![0x01]
    );

    /* no terminating bit before the input ends */
    let err = registry
        .decode(Format::BitPacked, "Nibbles", &[0xFF], DecodeOptions::silent())
        .expect_err("unterminated");
    assert_eq!(err.kind, DecodeErrorKind::UnexpectedEnd);
}

#[test]
fn fixed_count_record_of() {
    let registry = registry(LAYOUTS);
    let value = ints(&registry, "Pair", &[7, 9]);
    assert_eq!(round_trip(&registry, Format::BitPacked, "Pair", &value), vec![7, 9]);

    assert!(matches!(
        registry.encode(Format::BitPacked, "Pair", &ints(&registry, "Pair", &[1, 2, 3])),
        Err(EncodeError::Invalid { .. })
    ));

    let err = registry
        .decode(Format::BitPacked, "Pair", &[7], DecodeOptions::silent())
        .expect_err("one element short");
    assert_eq!(err.kind, DecodeErrorKind::UnexpectedEnd);
    assert_eq!(err.path(), "Pair[1]");

    let err = registry
        .decode(Format::BitPacked, "Pair", &[7, 9, 1], DecodeOptions::silent())
        .expect_err("one element too many");
    assert_eq!(err.kind, DecodeErrorKind::TrailingData(1));
}

#[test]
fn greedy_record_of_stops_at_the_last_whole_element() {
    let registry = registry(LAYOUTS);
    let value = ints(&registry, "Words", &[1, 2]);
    assert_eq!(round_trip(&registry, Format::BitPacked, "Words", &value), vec![0x01, 0x00, 0x02, 0x00]);

    /* a trailing half element is not decoded and is left over */
    let err = registry
        .decode(Format::BitPacked, "Words", &[0x01, 0x00, 0x02, 0x00, 0x03], DecodeOptions::silent())
        .expect_err("half element");
    assert_eq!(err.kind, DecodeErrorKind::TrailingData(1));
}

/* ------------------------------------------------------------- logging */

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn captured_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn silent_decodes_do_not_log_failures() {
    let registry = codecs();

    let logs = captured_logs(|| {
        let result = registry.decode(Format::Text, "Numbers", b"{1,x}", DecodeOptions::default());
        assert!(result.is_err());
    });
    assert!(logs.contains("decode failed"), "missing failure log: {}", logs);
    assert!(logs.contains("Numbers"));

    let logs = captured_logs(|| {
        let result = registry.decode(Format::Text, "Numbers", b"{1,x}", DecodeOptions::silent());
        assert!(result.is_err());
    });
    assert_eq!(logs, "");

    /* decode_into logs the same way */
    let logs = captured_logs(|| {
        let mut target = ints(&registry, "Numbers", &[1]);
        let result = registry.decode_into(Format::Json, "Numbers", b"{", &mut target, DecodeOptions::silent());
        assert!(result.is_err());
    });
    assert_eq!(logs, "");
}

#[test]
fn broken_constraint_warning_is_logged() {
    let encoded = {
        let registry = with_severity(Severity::Error);
        registry
            .encode(Format::Tlv, "Frame", &frame(&registry, 3, "big", 7))
            .expect("encode")
    };
    let registry = with_severity(Severity::Warning);
    let logs = captured_logs(|| {
        registry
            .decode(Format::Tlv, "Frame", &encoded, DecodeOptions::silent())
            .expect("decoded by tag");
    });
    assert!(logs.contains("component relation constraint broken"), "missing warning: {}", logs);

    let registry = with_severity(Severity::Ignore);
    let logs = captured_logs(|| {
        registry
            .decode(Format::Tlv, "Frame", &encoded, DecodeOptions::silent())
            .expect("decoded by tag");
    });
    assert_eq!(logs, "");
}
