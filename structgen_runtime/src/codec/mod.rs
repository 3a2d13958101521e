/* Plan interpreters for the five wire formats */

pub mod json;
pub mod raw;
pub mod text;
pub mod tlv;
pub mod xml;

use crate::errors::{
    ContextFrame, DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult, SemanticError,
};
use crate::record::RecordValue;
use crate::registry::Registry;
use crate::sequence::SeqValue;
use crate::union::UnionValue;
use crate::value::{Element, Value};
use structgen_gen::codegen::shared::plan::TypePlan;
use structgen_gen::schema::Format;
use structgen_types::{PrimitiveType, RuleValue};

pub(crate) fn encode(registry: &Registry, format: Format, plan: &TypePlan, value: &Value) -> EncodeResult<Vec<u8>> {
    match format {
        Format::Tlv => tlv::encode(registry, plan, value),
        Format::BitPacked => raw::encode(registry, plan, value),
        Format::Text => text::encode(registry, plan, value).map(String::into_bytes),
        Format::Xml => xml::encode(registry, plan, value).map(String::into_bytes),
        Format::Json => json::encode(registry, plan, value),
    }
}

pub(crate) fn decode(registry: &Registry, format: Format, plan: &TypePlan, input: &[u8]) -> DecodeResult<Value> {
    let result = match format {
        Format::Tlv => tlv::decode(registry, plan, input),
        Format::BitPacked => raw::decode(registry, plan, input),
        Format::Text => utf8(input).and_then(|input| text::decode(registry, plan, input)),
        Format::Xml => utf8(input).and_then(|input| xml::decode(registry, plan, input)),
        Format::Json => json::decode(registry, plan, input),
    };
    result.map_err(|err| err.within(ContextFrame::Type(plan.type_name.clone())))
}

fn utf8(input: &[u8]) -> DecodeResult<&str> {
    std::str::from_utf8(input).map_err(|err| DecodeError::malformed(format!("input is not UTF-8: {}", err)))
}

/* Missing per-format plan, converted into either error family */
pub(crate) struct Unsupported {
    type_name: String,
    format: &'static str,
}

pub(crate) fn unsupported(plan: &TypePlan, format: Format) -> Unsupported {
    Unsupported {
        type_name: plan.type_name.clone(),
        format: format.name(),
    }
}

impl From<Unsupported> for EncodeError {
    fn from(err: Unsupported) -> Self {
        EncodeError::FormatNotSupported {
            type_name: err.type_name,
            format: err.format,
        }
    }
}

impl From<Unsupported> for DecodeError {
    fn from(err: Unsupported) -> Self {
        DecodeError::new(DecodeErrorKind::FormatNotSupported {
            type_name: err.type_name,
            format: err.format,
        })
    }
}

/* ------------------------------------------------------ encode-side access */

fn unbound(plan: &TypePlan, frame: Option<ContextFrame>) -> EncodeError {
    let path = match frame {
        Some(frame) => format!("{}{}", plan.type_name, frame),
        None => plan.type_name.clone(),
    };
    EncodeError::Unbound {
        type_name: plan.type_name.clone(),
        path,
    }
}

pub(crate) fn seq_elements<'v>(plan: &TypePlan, value: &'v Value) -> EncodeResult<&'v [Element]> {
    value.as_seq()?.elements().ok_or_else(|| unbound(plan, None))
}

pub(crate) fn union_selection<'v>(plan: &TypePlan, value: &'v Value) -> EncodeResult<(usize, &'v Value)> {
    value.as_union()?.selection().ok_or_else(|| unbound(plan, None))
}

pub(crate) fn record_fields<'v>(plan: &TypePlan, value: &'v Value) -> EncodeResult<&'v [Element]> {
    value.as_record()?.fields().ok_or_else(|| unbound(plan, None))
}

pub(crate) fn bound_element<'v>(plan: &TypePlan, element: &'v Element, frame: ContextFrame) -> EncodeResult<&'v Value> {
    element.as_ref().ok_or_else(|| unbound(plan, Some(frame)))
}

pub(crate) fn primitive_mismatch(expected: PrimitiveType, found: &Value) -> SemanticError {
    SemanticError::TypeMismatch {
        operation: "encoding",
        expected: expected.keyword().to_string(),
        found: found.type_name().to_string(),
    }
}

/* ------------------------------------------------------ decode-side values */

pub(crate) fn make_seq(registry: &Registry, plan: &TypePlan, elements: Vec<Element>) -> Value {
    Value::Seq(SeqValue::with_elements(registry.seq_shape(plan), elements))
}

pub(crate) fn make_union(registry: &Registry, plan: &TypePlan, alternative: usize, value: Value) -> Value {
    let mut union = UnionValue::unbound(registry.union_shape(plan));
    *union.field_mut_at(alternative) = Some(value);
    Value::Union(union)
}

pub(crate) fn make_record(registry: &Registry, plan: &TypePlan, fields: Vec<Element>) -> Value {
    Value::Record(RecordValue::with_fields(registry.record_shape(plan), fields))
}

/* Decoded primitive compared against a rule or constraint literal */
pub(crate) fn rule_value_matches(value: &Value, literal: &RuleValue) -> bool {
    match (value, literal) {
        (Value::Integer(a), RuleValue::Integer(b)) => a == b,
        (Value::Boolean(a), RuleValue::Boolean(b)) => a == b,
        (Value::Charstring(a), RuleValue::Text(b)) => a == b,
        (Value::Octetstring(a), RuleValue::Text(b)) => hex::decode(b).is_ok_and(|bytes| &bytes == a),
        _ => false,
    }
}

/* Text form shared by the text, XML and JSON codecs */
pub(crate) fn primitive_text(prim_type: PrimitiveType, value: &Value) -> EncodeResult<String> {
    Ok(match (prim_type, value) {
        (PrimitiveType::Integer, Value::Integer(v)) => v.to_string(),
        (PrimitiveType::Boolean, Value::Boolean(v)) => v.to_string(),
        (PrimitiveType::Charstring, Value::Charstring(v)) => v.clone(),
        (PrimitiveType::Octetstring, Value::Octetstring(v)) => hex::encode_upper(v),
        (expected, found) => return Err(primitive_mismatch(expected, found).into()),
    })
}

pub(crate) fn parse_primitive(prim_type: PrimitiveType, text: &str) -> DecodeResult<Value> {
    let trimmed = text.trim();
    match prim_type {
        PrimitiveType::Integer => trimmed
            .parse()
            .map(Value::Integer)
            .map_err(|_| DecodeError::malformed(format!("'{}' is not an integer", trimmed))),
        PrimitiveType::Boolean => match trimmed {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            other => Err(DecodeError::malformed(format!("'{}' is not a boolean", other))),
        },
        PrimitiveType::Charstring => Ok(Value::Charstring(text.to_string())),
        PrimitiveType::Octetstring => hex::decode(trimmed)
            .map(Value::Octetstring)
            .map_err(|err| DecodeError::malformed(format!("'{}' is not an octetstring: {}", trimmed, err))),
    }
}
