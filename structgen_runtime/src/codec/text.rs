/* Token text: begin/separator/end literals around element text.
 *
 * Integers and booleans are written plainly, charstrings quoted with
 * backslash escapes and octetstrings as 'XX'O. An unbound record-of element
 * or an omitted optional field is empty text between separators. */

use super::{bound_element, make_record, make_seq, make_union, primitive_mismatch, record_fields, seq_elements, union_selection, unsupported};
use crate::errors::{ContextFrame, DecodeContext, DecodeError, DecodeErrorKind, DecodeResult, EncodeResult};
use crate::registry::Registry;
use crate::value::Value;
use structgen_gen::codegen::shared::plan::{TextPlan, TypePlan};
use structgen_gen::schema::{ElementType, Format, ResolvedTypeKind};
use structgen_types::PrimitiveType;
use tracing::trace;

fn text_plan(plan: &TypePlan) -> Result<&TextPlan, super::Unsupported> {
    plan.text.as_ref().ok_or_else(|| unsupported(plan, Format::Text))
}

/* ----------------------------------------------------------------- encode */

pub fn encode(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<String> {
    let mut out = String::new();
    encode_plan(registry, plan, value, &mut out)?;
    Ok(out)
}

fn encode_plan(registry: &Registry, plan: &TypePlan, value: &Value, out: &mut String) -> EncodeResult<()> {
    let text = text_plan(plan)?;
    out.push_str(&text.begin);
    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
                if index > 0 {
                    out.push_str(&text.separator);
                }
                if let Some(item) = item {
                    encode_element(registry, &element.ty, item, out)?;
                }
            }
        }
        ResolvedTypeKind::Record { fields, .. } => {
            for (index, (field, item)) in fields.iter().zip(record_fields(plan, value)?).enumerate() {
                if index > 0 {
                    out.push_str(&text.separator);
                }
                match item {
                    Some(item) => encode_element(registry, &field.ty, item, out)?,
                    None if field.optional => {}
                    None => {
                        bound_element(plan, item, ContextFrame::Field(field.name.clone()))?;
                    }
                }
            }
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            encode_element(registry, &alternatives[index].ty, inner, out)?;
        }
    }
    out.push_str(&text.end);
    Ok(())
}

fn encode_element(registry: &Registry, ty: &ElementType, value: &Value, out: &mut String) -> EncodeResult<()> {
    match ty {
        ElementType::Primitive(spec) => {
            match (spec.prim_type, value) {
                (PrimitiveType::Integer, Value::Integer(v)) => out.push_str(&v.to_string()),
                (PrimitiveType::Boolean, Value::Boolean(v)) => out.push_str(if *v { "true" } else { "false" }),
                (PrimitiveType::Charstring, Value::Charstring(v)) => {
                    out.push('"');
                    for c in v.chars() {
                        if c == '"' || c == '\\' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push('"');
                }
                (PrimitiveType::Octetstring, Value::Octetstring(v)) => {
                    out.push('\'');
                    out.push_str(&hex::encode_upper(v));
                    out.push_str("'O");
                }
                (expected, found) => return Err(primitive_mismatch(expected, found).into()),
            }
            Ok(())
        }
        ElementType::Named(name) => encode_plan(registry, registry.plan(name)?, value, out),
    }
}

/* ----------------------------------------------------------------- decode */

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> DecodeResult<()> {
        if self.eat(token) {
            Ok(())
        } else if self.rest().is_empty() {
            Err(DecodeError::unexpected_end())
        } else {
            Err(DecodeError::malformed(format!("expected '{}' at offset {}", token, self.pos)))
        }
    }

    /* Empty element text: the next thing is a separator, the end token or
     * the end of input */
    fn at_empty(&self, text: &TextPlan) -> bool {
        let rest = self.rest();
        rest.is_empty()
            || (!text.separator.is_empty() && rest.starts_with(&text.separator))
            || (!text.end.is_empty() && rest.starts_with(&text.end))
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !accept(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }
}

pub fn decode(registry: &Registry, plan: &TypePlan, input: &str) -> DecodeResult<Value> {
    let mut cursor = Cursor { input, pos: 0 };
    let value = decode_plan(registry, plan, &mut cursor)?;
    match cursor.rest().len() {
        0 => Ok(value),
        trailing => Err(DecodeError::new(DecodeErrorKind::TrailingData(trailing))),
    }
}

fn decode_plan(registry: &Registry, plan: &TypePlan, cursor: &mut Cursor<'_>) -> DecodeResult<Value> {
    let text = text_plan(plan)?;
    cursor.expect(&text.begin)?;
    let value = match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let mut elements = Vec::new();
            loop {
                let mark = cursor.pos;
                if elements.is_empty() {
                    if !text.end.is_empty() && cursor.rest().starts_with(&text.end) {
                        break;
                    }
                } else if !cursor.eat(&text.separator) {
                    break;
                }
                if !text.separator.is_empty() && cursor.at_empty(text) {
                    if elements.is_empty() && cursor.rest().is_empty() {
                        break;
                    }
                    elements.push(None);
                    continue;
                }
                let index = elements.len();
                let before = cursor.pos;
                match decode_element(registry, &element.ty, cursor).within(|| ContextFrame::Index(index)) {
                    Ok(value) if cursor.pos > before => elements.push(Some(value)),
                    _ => {
                        cursor.pos = mark;
                        break;
                    }
                }
            }
            make_seq(registry, plan, elements)
        }
        ResolvedTypeKind::Record { fields, .. } => {
            let mut decoded = Vec::with_capacity(fields.len());
            for (index, field) in fields.iter().enumerate() {
                if index > 0 {
                    cursor.expect(&text.separator).within(|| ContextFrame::Field(field.name.clone()))?;
                }
                if field.optional {
                    let mark = cursor.pos;
                    if cursor.at_empty(text) {
                        decoded.push(None);
                        continue;
                    }
                    match decode_element(registry, &field.ty, cursor) {
                        Ok(value) => decoded.push(Some(value)),
                        Err(_) => {
                            cursor.pos = mark;
                            decoded.push(None);
                        }
                    }
                } else {
                    let value = decode_element(registry, &field.ty, cursor).within(|| ContextFrame::Field(field.name.clone()))?;
                    decoded.push(Some(value));
                }
            }
            make_record(registry, plan, decoded)
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let mark = cursor.pos;
            let mut selected = None;
            for (index, alternative) in alternatives.iter().enumerate() {
                match decode_element(registry, &alternative.ty, cursor) {
                    Ok(value) => {
                        trace!(type_name = %plan.type_name, alternative = %alternative.name, "text alternative selected");
                        selected = Some(make_union(registry, plan, index, value));
                        break;
                    }
                    Err(err) => {
                        trace!(type_name = %plan.type_name, alternative = %alternative.name, error = %err, "text trial failed");
                        cursor.pos = mark;
                    }
                }
            }
            selected.ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::NoUnionMemberFound {
                    type_name: plan.type_name.clone(),
                })
            })?
        }
    };
    cursor.expect(&text.end)?;
    Ok(value)
}

fn decode_element(registry: &Registry, ty: &ElementType, cursor: &mut Cursor<'_>) -> DecodeResult<Value> {
    let spec = match ty {
        ElementType::Primitive(spec) => spec,
        ElementType::Named(name) => return decode_plan(registry, registry.plan(name)?, cursor),
    };
    let start = cursor.pos;
    let result = decode_primitive(spec.prim_type, cursor);
    if result.is_err() {
        cursor.pos = start;
    }
    result
}

fn decode_primitive(prim_type: PrimitiveType, cursor: &mut Cursor<'_>) -> DecodeResult<Value> {
    match prim_type {
        PrimitiveType::Integer => {
            let negative = cursor.eat("-");
            let digits = cursor.take_while(|c| c.is_ascii_digit());
            if digits.is_empty() {
                return Err(DecodeError::malformed(format!("expected an integer at offset {}", cursor.pos)));
            }
            let magnitude = if negative { format!("-{}", digits) } else { digits.to_string() };
            magnitude
                .parse()
                .map(Value::Integer)
                .map_err(|_| DecodeError::malformed(format!("integer {} out of range", magnitude)))
        }
        PrimitiveType::Boolean => {
            if cursor.eat("true") {
                Ok(Value::Boolean(true))
            } else if cursor.eat("false") {
                Ok(Value::Boolean(false))
            } else {
                Err(DecodeError::malformed(format!("expected a boolean at offset {}", cursor.pos)))
            }
        }
        PrimitiveType::Charstring => {
            cursor.expect("\"")?;
            let mut out = String::new();
            let mut chars = cursor.rest().char_indices();
            while let Some((offset, c)) = chars.next() {
                match c {
                    '"' => {
                        cursor.pos += offset + 1;
                        return Ok(Value::Charstring(out));
                    }
                    '\\' => match chars.next() {
                        Some((_, escaped)) => out.push(escaped),
                        None => break,
                    },
                    other => out.push(other),
                }
            }
            Err(DecodeError::unexpected_end())
        }
        PrimitiveType::Octetstring => {
            cursor.expect("'")?;
            let digits = cursor.take_while(|c| c.is_ascii_hexdigit());
            cursor.expect("'O")?;
            hex::decode(digits)
                .map(Value::Octetstring)
                .map_err(|err| DecodeError::malformed(format!("bad octetstring: {}", err)))
        }
    }
}
