/* JSON documents
 *
 * Sequences are arrays, records objects keyed by the aliased field name and
 * unions a single-entry object, or the bare alternative value for
 * `as-value` unions. Octetstrings are hex strings. */

use super::{bound_element, make_record, make_seq, make_union, primitive_mismatch, record_fields, seq_elements, union_selection, unsupported};
use crate::errors::{ContextFrame, DecodeContext, DecodeError, DecodeErrorKind, DecodeResult, EncodeResult};
use crate::registry::Registry;
use crate::value::Value;
use serde_json::{Map, Value as Json};
use structgen_gen::codegen::shared::plan::{JsonPlan, TypePlan};
use structgen_gen::schema::{ElementType, Format, ResolvedTypeKind};
use structgen_types::{JsonCategory, PrimitiveType};
use tracing::trace;

fn json_plan(plan: &TypePlan) -> Result<&JsonPlan, super::Unsupported> {
    plan.json.as_ref().ok_or_else(|| unsupported(plan, Format::Json))
}

fn category(json: &Json) -> JsonCategory {
    match json {
        Json::Number(_) => JsonCategory::Number,
        Json::String(_) => JsonCategory::String,
        Json::Bool(_) | Json::Null => JsonCategory::Literal,
        Json::Array(_) => JsonCategory::Array,
        Json::Object(_) => JsonCategory::Object,
    }
}

/* ----------------------------------------------------------------- encode */

pub fn encode(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<Vec<u8>> {
    let json = encode_plan(registry, plan, value)?;
    Ok(json.to_string().into_bytes())
}

fn encode_plan(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<Json> {
    let json = json_plan(plan)?;
    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let mut items = Vec::new();
            for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
                let item = bound_element(plan, item, ContextFrame::Index(index))?;
                items.push(encode_slot(registry, &element.ty, item)?);
            }
            Ok(Json::Array(items))
        }
        ResolvedTypeKind::Record { fields, .. } => {
            let mut object = Map::new();
            for ((field, member), item) in fields.iter().zip(&json.members).zip(record_fields(plan, value)?) {
                match item {
                    Some(item) => {
                        object.insert(member.key.clone(), encode_slot(registry, &field.ty, item)?);
                    }
                    None if field.optional => {}
                    None => {
                        bound_element(plan, item, ContextFrame::Field(field.name.clone()))?;
                    }
                }
            }
            Ok(Json::Object(object))
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            let encoded = encode_slot(registry, &alternatives[index].ty, inner)?;
            if json.as_value {
                return Ok(encoded);
            }
            let mut object = Map::new();
            object.insert(json.members[index].key.clone(), encoded);
            Ok(Json::Object(object))
        }
    }
}

fn encode_slot(registry: &Registry, ty: &ElementType, value: &Value) -> EncodeResult<Json> {
    let spec = match ty {
        ElementType::Primitive(spec) => spec,
        ElementType::Named(name) => return encode_plan(registry, registry.plan(name)?, value),
    };
    Ok(match (spec.prim_type, value) {
        (PrimitiveType::Integer, Value::Integer(v)) => Json::from(*v),
        (PrimitiveType::Boolean, Value::Boolean(v)) => Json::Bool(*v),
        (PrimitiveType::Charstring, Value::Charstring(v)) => Json::String(v.clone()),
        (PrimitiveType::Octetstring, Value::Octetstring(v)) => Json::String(hex::encode_upper(v)),
        (expected, found) => return Err(primitive_mismatch(expected, found).into()),
    })
}

/* ----------------------------------------------------------------- decode */

pub fn decode(registry: &Registry, plan: &TypePlan, input: &[u8]) -> DecodeResult<Value> {
    let json: Json = serde_json::from_slice(input).map_err(|err| {
        if err.is_eof() {
            DecodeError::unexpected_end()
        } else {
            DecodeError::malformed(format!("invalid JSON: {}", err))
        }
    })?;
    decode_plan(registry, plan, &json)
}

fn expected(what: &str, found: &Json) -> DecodeError {
    DecodeError::malformed(format!("expected {}, found {}", what, category(found).describe()))
}

fn decode_plan(registry: &Registry, plan: &TypePlan, json: &Json) -> DecodeResult<Value> {
    let json_attrs = json_plan(plan)?;
    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let items = json.as_array().ok_or_else(|| expected("an array", json))?;
            let mut elements = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                elements.push(Some(decode_slot(registry, &element.ty, item).within(|| ContextFrame::Index(index))?));
            }
            Ok(make_seq(registry, plan, elements))
        }
        ResolvedTypeKind::Record { fields, .. } => {
            let object = json.as_object().ok_or_else(|| expected("an object", json))?;
            if let Some(unknown) = object
                .keys()
                .find(|key| !json_attrs.members.iter().any(|member| &member.key == *key))
            {
                return Err(DecodeError::malformed(format!("unknown field '{}' for '{}'", unknown, plan.type_name)));
            }
            let mut decoded = Vec::with_capacity(fields.len());
            for (field, member) in fields.iter().zip(&json_attrs.members) {
                match object.get(&member.key) {
                    Some(Json::Null) | None if field.optional => decoded.push(None),
                    Some(item) => decoded.push(Some(
                        decode_slot(registry, &field.ty, item).within(|| ContextFrame::Field(field.name.clone()))?,
                    )),
                    None => {
                        return Err(DecodeError::malformed(format!("missing field '{}'", member.key))
                            .within(ContextFrame::Field(field.name.clone())))
                    }
                }
            }
            Ok(make_record(registry, plan, decoded))
        }
        ResolvedTypeKind::Union { alternatives, .. } if json_attrs.as_value => {
            let category = category(json);
            for (index, (alternative, member)) in alternatives.iter().zip(&json_attrs.members).enumerate() {
                if !member.accepts(category) {
                    continue;
                }
                match decode_slot(registry, &alternative.ty, json) {
                    Ok(value) => {
                        trace!(type_name = %plan.type_name, alternative = %alternative.name, "JSON alternative selected");
                        return Ok(make_union(registry, plan, index, value));
                    }
                    Err(err) => {
                        trace!(type_name = %plan.type_name, alternative = %alternative.name, error = %err, "JSON trial failed");
                    }
                }
            }
            Err(DecodeError::new(DecodeErrorKind::CouldNotDecodeByAnyField {
                type_name: plan.type_name.clone(),
                category: category.describe(),
            }))
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let object = json.as_object().ok_or_else(|| expected("an object", json))?;
            let mut entries = object.iter();
            let (key, item) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => {
                    return Err(DecodeError::malformed(format!(
                        "'{}' expects an object with exactly one member, found {}",
                        plan.type_name,
                        object.len()
                    )))
                }
            };
            let index = json_attrs
                .members
                .iter()
                .position(|member| &member.key == key)
                .ok_or_else(|| DecodeError::malformed(format!("'{}' has no alternative '{}'", plan.type_name, key)))?;
            let alternative = &alternatives[index];
            let value = decode_slot(registry, &alternative.ty, item)
                .within(|| ContextFrame::Alternative(alternative.name.clone()))?;
            Ok(make_union(registry, plan, index, value))
        }
    }
}

fn decode_slot(registry: &Registry, ty: &ElementType, json: &Json) -> DecodeResult<Value> {
    let spec = match ty {
        ElementType::Primitive(spec) => spec,
        ElementType::Named(name) => return decode_plan(registry, registry.plan(name)?, json),
    };
    match spec.prim_type {
        PrimitiveType::Integer => json
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| expected("an integer", json)),
        PrimitiveType::Boolean => json
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| expected("a boolean", json)),
        PrimitiveType::Charstring => json
            .as_str()
            .map(|text| Value::Charstring(text.to_string()))
            .ok_or_else(|| expected("a string", json)),
        PrimitiveType::Octetstring => {
            let text = json.as_str().ok_or_else(|| expected("a hex string", json))?;
            hex::decode(text)
                .map(Value::Octetstring)
                .map_err(|err| DecodeError::malformed(format!("'{}' is not an octetstring: {}", text, err)))
        }
    }
}
