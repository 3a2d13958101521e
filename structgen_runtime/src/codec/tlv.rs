/* BER-style TLV with definite lengths */

use super::{
    bound_element, make_record, make_seq, make_union, primitive_mismatch, record_fields, rule_value_matches,
    seq_elements, union_selection, unsupported,
};
use crate::errors::{
    ContextFrame, DecodeContext, DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult,
};
use crate::registry::{Registry, Severity};
use crate::value::{Element, Value};
use std::cmp::Ordering;
use structgen_gen::codegen::shared::builder::primitive_identity;
use structgen_gen::codegen::shared::plan::{TlvIdentity, TlvPlan, TlvSlotPlan, TypePlan};
use structgen_gen::schema::{ElementType, Format, ResolvedElement, ResolvedTypeKind};
use structgen_types::{OpenTypeConstraint, PrimitiveType, TagClass, TlvTag};
use tracing::{trace, warn};

const CONSTRUCTED: u8 = 0x20;

/// One encoded node before its header is written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    identity: TlvIdentity,
    constructed: bool,
    content: Vec<u8>,
}

impl Node {
    fn into_bytes(self) -> Vec<u8> {
        let mut out = identifier_octets(self.identity, self.constructed);
        out.extend(length_octets(self.content.len()));
        out.extend(self.content);
        out
    }

    /* Implicit tags replace the identity, explicit ones wrap the node */
    fn tagged(self, tag: Option<TlvTag>) -> Node {
        match tag {
            None => self,
            Some(tag) if tag.implicit => Node {
                identity: tag.into(),
                ..self
            },
            Some(tag) => Node {
                identity: tag.into(),
                constructed: true,
                content: self.into_bytes(),
            },
        }
    }
}

fn class_bits(class: TagClass) -> u8 {
    match class {
        TagClass::Universal => 0x00,
        TagClass::Application => 0x40,
        TagClass::Context => 0x80,
        TagClass::Private => 0xC0,
    }
}

fn identifier_octets(identity: TlvIdentity, constructed: bool) -> Vec<u8> {
    let mut first = class_bits(identity.class);
    if constructed {
        first |= CONSTRUCTED;
    }
    if identity.number < 31 {
        return vec![first | identity.number as u8];
    }
    let mut out = vec![first | 0x1F];
    let mut groups = Vec::new();
    let mut number = identity.number;
    loop {
        groups.push((number & 0x7F) as u8);
        number >>= 7;
        if number == 0 {
            break;
        }
    }
    for (index, group) in groups.iter().rev().enumerate() {
        let more = if index + 1 < groups.len() { 0x80 } else { 0 };
        out.push(group | more);
    }
    out
}

fn length_octets(length: usize) -> Vec<u8> {
    if length < 0x80 {
        return vec![length as u8];
    }
    let bytes = length.to_be_bytes();
    let skip = bytes.iter().take_while(|byte| **byte == 0).count();
    let mut out = vec![0x80 | (bytes.len() - skip) as u8];
    out.extend_from_slice(&bytes[skip..]);
    out
}

/* DER set ordering: shorter encodings compare as if padded with zeros */
fn canonical_order(a: &[u8], b: &[u8]) -> Ordering {
    let width = a.len().max(b.len());
    let padded = |bytes: &[u8], index: usize| bytes.get(index).copied().unwrap_or(0);
    (0..width)
        .map(|index| padded(a, index).cmp(&padded(b, index)))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

/* ----------------------------------------------------------------- encode */

pub fn encode(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<Vec<u8>> {
    Ok(encode_plan(registry, plan, value)?.into_bytes())
}

fn tlv_plan(plan: &TypePlan) -> Result<&TlvPlan, super::Unsupported> {
    plan.tlv.as_ref().ok_or_else(|| unsupported(plan, Format::Tlv))
}

fn encode_plan(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<Node> {
    let tlv = tlv_plan(plan)?;
    let node = match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let mut encoded = Vec::new();
            for (index, item) in seq_elements(plan, value)?.iter().enumerate() {
                let item = bound_element(plan, item, ContextFrame::Index(index))?;
                encoded.push(encode_slot(registry, &tlv.slots[0], element, item)?.into_bytes());
            }
            if tlv.sort_set {
                encoded.sort_by(|a, b| canonical_order(a, b));
            }
            Node {
                identity: base_identity(plan, tlv)?,
                constructed: true,
                content: encoded.concat(),
            }
        }
        ResolvedTypeKind::Record { fields, .. } => {
            let mut content = Vec::new();
            for ((field, slot), element) in fields.iter().zip(&tlv.slots).zip(record_fields(plan, value)?) {
                match element {
                    Some(item) => content.extend(encode_slot(registry, slot, field, item)?.into_bytes()),
                    None if field.optional => {}
                    None => {
                        bound_element(plan, element, ContextFrame::Field(field.name.clone()))?;
                    }
                }
            }
            Node {
                identity: base_identity(plan, tlv)?,
                constructed: true,
                content,
            }
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            encode_slot(registry, &tlv.slots[index], &alternatives[index], inner)?
        }
    };
    Ok(node.tagged(tlv.own_tag))
}

fn base_identity(plan: &TypePlan, tlv: &TlvPlan) -> EncodeResult<TlvIdentity> {
    tlv.base.ok_or_else(|| EncodeError::Invalid {
        type_name: plan.type_name.clone(),
        reason: "plan has no base identity".to_string(),
    })
}

fn encode_slot(registry: &Registry, slot: &TlvSlotPlan, element: &ResolvedElement, value: &Value) -> EncodeResult<Node> {
    let node = match &element.ty {
        ElementType::Primitive(spec) => encode_primitive(spec.prim_type, value)?,
        ElementType::Named(name) => encode_plan(registry, registry.plan(name)?, value)?,
    };
    Ok(node.tagged(slot.tag))
}

fn encode_primitive(prim_type: PrimitiveType, value: &Value) -> EncodeResult<Node> {
    let content = match (prim_type, value) {
        (PrimitiveType::Integer, Value::Integer(v)) => integer_content(*v),
        (PrimitiveType::Boolean, Value::Boolean(v)) => vec![if *v { 0xFF } else { 0x00 }],
        (PrimitiveType::Charstring, Value::Charstring(v)) => v.as_bytes().to_vec(),
        (PrimitiveType::Octetstring, Value::Octetstring(v)) => v.clone(),
        (expected, found) => return Err(primitive_mismatch(expected, found).into()),
    };
    Ok(Node {
        identity: primitive_identity(prim_type),
        constructed: false,
        content,
    })
}

/* Minimal two's complement */
fn integer_content(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/* ----------------------------------------------------------------- decode */

#[derive(Debug, Clone, Copy)]
struct RawNode<'a> {
    identity: TlvIdentity,
    constructed: bool,
    content: &'a [u8],
}

impl<'a> RawNode<'a> {
    /* Read one node, returning it and the number of bytes it spans */
    fn read(input: &'a [u8]) -> DecodeResult<(RawNode<'a>, usize)> {
        let first = *input.first().ok_or_else(DecodeError::unexpected_end)?;
        let class = match first & 0xC0 {
            0x00 => TagClass::Universal,
            0x40 => TagClass::Application,
            0x80 => TagClass::Context,
            _ => TagClass::Private,
        };
        let constructed = first & CONSTRUCTED != 0;
        let mut pos = 1;
        let mut number = u32::from(first & 0x1F);
        if number == 0x1F {
            number = 0;
            loop {
                let byte = *input.get(pos).ok_or_else(DecodeError::unexpected_end)?;
                pos += 1;
                number = number
                    .checked_mul(128)
                    .ok_or_else(|| DecodeError::malformed("tag number overflow"))?
                    | u32::from(byte & 0x7F);
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }

        let first_length = *input.get(pos).ok_or_else(DecodeError::unexpected_end)?;
        pos += 1;
        let length = if first_length < 0x80 {
            usize::from(first_length)
        } else {
            let count = usize::from(first_length & 0x7F);
            if count == 0 {
                return Err(DecodeError::malformed("indefinite lengths are not supported"));
            }
            if count > std::mem::size_of::<usize>() {
                return Err(DecodeError::malformed("length does not fit in memory"));
            }
            let octets = input.get(pos..pos + count).ok_or_else(DecodeError::unexpected_end)?;
            pos += count;
            octets.iter().fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte))
        };

        let end = pos.checked_add(length).ok_or_else(DecodeError::unexpected_end)?;
        let content = input.get(pos..end).ok_or_else(DecodeError::unexpected_end)?;
        Ok((
            RawNode {
                identity: TlvIdentity { class, number },
                constructed,
                content,
            },
            end,
        ))
    }

    /* Content of an explicit wrapper: exactly one inner node */
    fn unwrap_explicit(self, tag: TlvTag) -> DecodeResult<RawNode<'a>> {
        self.expect(tag.into())?;
        self.expect_form(true)?;
        let (inner, used) = RawNode::read(self.content)?;
        if used != self.content.len() {
            return Err(DecodeError::new(DecodeErrorKind::TrailingData(self.content.len() - used)));
        }
        Ok(inner)
    }

    /* Records, sequences and explicit wrappers are constructed, primitives are not */
    fn expect_form(&self, constructed: bool) -> DecodeResult<()> {
        if self.constructed == constructed {
            return Ok(());
        }
        let (expected, found) = if constructed {
            ("constructed", "primitive")
        } else {
            ("primitive", "constructed")
        };
        Err(DecodeError::malformed(format!(
            "expected {} content for tag [{:?} {}], found {}",
            expected, self.identity.class, self.identity.number, found
        )))
    }

    fn expect(&self, identity: TlvIdentity) -> DecodeResult<()> {
        if self.identity == identity {
            Ok(())
        } else {
            Err(DecodeError::malformed(format!(
                "expected tag [{:?} {}], found [{:?} {}]",
                identity.class, identity.number, self.identity.class, self.identity.number
            )))
        }
    }
}

/* Sequence of nodes inside constructed content */
struct Nodes<'a> {
    input: &'a [u8],
}

impl<'a> Nodes<'a> {
    fn peek(&self) -> DecodeResult<Option<RawNode<'a>>> {
        if self.input.is_empty() {
            return Ok(None);
        }
        RawNode::read(self.input).map(|(node, _)| Some(node))
    }

    fn next(&mut self) -> DecodeResult<Option<RawNode<'a>>> {
        if self.input.is_empty() {
            return Ok(None);
        }
        let (node, used) = RawNode::read(self.input)?;
        self.input = &self.input[used..];
        Ok(Some(node))
    }
}

pub fn decode(registry: &Registry, plan: &TypePlan, input: &[u8]) -> DecodeResult<Value> {
    let (node, used) = RawNode::read(input)?;
    if used != input.len() {
        return Err(DecodeError::new(DecodeErrorKind::TrailingData(input.len() - used)));
    }
    decode_plan(registry, plan, node, false)
}

/* `implicit`: the outermost identity was replaced by an enclosing tag */
fn decode_plan(registry: &Registry, plan: &TypePlan, node: RawNode<'_>, implicit: bool) -> DecodeResult<Value> {
    let tlv = tlv_plan(plan)?;
    let (node, implicit) = match tlv.own_tag {
        Some(tag) if tag.implicit => {
            if !implicit {
                node.expect(tag.into())?;
            }
            (node, true)
        }
        Some(_) if implicit => {
            let (inner, _) = RawNode::read(node.content)?;
            (inner, false)
        }
        Some(tag) => (node.unwrap_explicit(tag)?, false),
        None => (node, implicit),
    };

    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            check_base(tlv, &node, implicit)?;
            node.expect_form(true)?;
            let mut nodes = Nodes { input: node.content };
            let mut elements = Vec::new();
            while let Some(item) = nodes.next()? {
                let index = elements.len();
                let value = decode_slot(registry, &tlv.slots[0], element, item).within(|| ContextFrame::Index(index))?;
                elements.push(Some(value));
            }
            Ok(make_seq(registry, plan, elements))
        }
        ResolvedTypeKind::Record { fields, constraints } => {
            check_base(tlv, &node, implicit)?;
            node.expect_form(true)?;
            decode_record(registry, plan, tlv, fields, constraints, node.content)
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let index = claimant(plan, tlv, node.identity)?;
            let value = decode_slot(registry, &tlv.slots[index], &alternatives[index], node)
                .within(|| ContextFrame::Alternative(alternatives[index].name.clone()))?;
            Ok(make_union(registry, plan, index, value))
        }
    }
}

fn check_base(tlv: &TlvPlan, node: &RawNode<'_>, implicit: bool) -> DecodeResult<()> {
    match tlv.base {
        Some(base) if !implicit => node.expect(base),
        _ => Ok(()),
    }
}

/* First alternative claiming the node's identity */
fn claimant(plan: &TypePlan, tlv: &TlvPlan, identity: TlvIdentity) -> DecodeResult<usize> {
    match tlv.slots.iter().position(|slot| slot.claims_identity(identity)) {
        Some(index) => {
            trace!(type_name = %plan.type_name, alternative = %tlv.slots[index].name, "TLV claim");
            Ok(index)
        }
        None => Err(DecodeError::new(DecodeErrorKind::NoMatchingAlternative {
            class: format!("{:?}", identity.class),
            number: identity.number,
        })),
    }
}

fn decode_slot(registry: &Registry, slot: &TlvSlotPlan, element: &ResolvedElement, node: RawNode<'_>) -> DecodeResult<Value> {
    let (node, implicit) = match slot.tag {
        Some(tag) if tag.implicit => {
            node.expect(tag.into())?;
            (node, true)
        }
        Some(tag) => (node.unwrap_explicit(tag)?, false),
        None => (node, false),
    };
    match &element.ty {
        ElementType::Primitive(spec) => {
            if !implicit {
                node.expect(primitive_identity(spec.prim_type))?;
            }
            node.expect_form(false)?;
            decode_primitive(spec.prim_type, node.content)
        }
        ElementType::Named(name) => decode_plan(registry, registry.plan(name)?, node, implicit),
    }
}

fn decode_primitive(prim_type: PrimitiveType, content: &[u8]) -> DecodeResult<Value> {
    match prim_type {
        PrimitiveType::Integer => {
            if content.is_empty() || content.len() > 8 {
                return Err(DecodeError::malformed(format!("integer of {} octets", content.len())));
            }
            let negative = content[0] & 0x80 != 0;
            let start: i64 = if negative { -1 } else { 0 };
            Ok(Value::Integer(
                content.iter().fold(start, |acc, byte| (acc << 8) | i64::from(*byte)),
            ))
        }
        PrimitiveType::Boolean => match content {
            [byte] => Ok(Value::Boolean(*byte != 0)),
            _ => Err(DecodeError::malformed("boolean content must be one octet")),
        },
        PrimitiveType::Charstring => String::from_utf8(content.to_vec())
            .map(Value::Charstring)
            .map_err(|err| DecodeError::malformed(format!("charstring is not UTF-8: {}", err))),
        PrimitiveType::Octetstring => Ok(Value::Octetstring(content.to_vec())),
    }
}

/* Fields in order; open-type fields are captured raw and decoded once the
 * keys their constraint names are known */
fn decode_record(
    registry: &Registry,
    plan: &TypePlan,
    tlv: &TlvPlan,
    fields: &[ResolvedElement],
    constraints: &[OpenTypeConstraint],
    content: &[u8],
) -> DecodeResult<Value> {
    let mut nodes = Nodes { input: content };
    let mut decoded: Vec<Element> = vec![None; fields.len()];
    let mut deferred = Vec::new();

    for (index, (field, slot)) in fields.iter().zip(&tlv.slots).enumerate() {
        let claimed = match nodes.peek()? {
            Some(node) => slot.claims_identity(node.identity) || slot.claims.is_empty(),
            None => false,
        };
        if !claimed {
            if field.optional {
                continue;
            }
            return Err(DecodeError::malformed("required field is missing").within(ContextFrame::Field(field.name.clone())));
        }
        let Some(node) = nodes.next()? else {
            continue;
        };
        match constraints.iter().find(|constraint| constraint.field == field.name) {
            Some(constraint) => deferred.push((index, constraint, node)),
            None => {
                let value = decode_slot(registry, slot, field, node).within(|| ContextFrame::Field(field.name.clone()))?;
                decoded[index] = Some(value);
            }
        }
    }
    if let Some(extra) = nodes.next()? {
        return Err(DecodeError::malformed(format!(
            "unexpected node [{:?} {}] after the last field",
            extra.identity.class, extra.identity.number
        )));
    }

    for (index, constraint, node) in deferred {
        let field = &fields[index];
        let value = decode_open_type(registry, plan, &tlv.slots[index], field, constraint, &decoded, fields, node)
            .within(|| ContextFrame::Field(field.name.clone()))?;
        decoded[index] = Some(value);
    }
    Ok(make_record(registry, plan, decoded))
}

#[allow(clippy::too_many_arguments)]
fn decode_open_type(
    registry: &Registry,
    plan: &TypePlan,
    slot: &TlvSlotPlan,
    field: &ResolvedElement,
    constraint: &OpenTypeConstraint,
    decoded: &[Element],
    fields: &[ResolvedElement],
    node: RawNode<'_>,
) -> DecodeResult<Value> {
    let keys = key_values(constraint, decoded, fields);
    let selected = keys.as_deref().and_then(|keys| lookup(constraint, keys));

    let ElementType::Named(union_name) = &field.ty else {
        return decode_slot(registry, slot, field, node);
    };
    let union_plan = registry.plan(union_name)?;

    let Some(alternative) = selected else {
        let shown = match &keys {
            Some(keys) => keys.iter().map(|key| show_value(key)).collect::<Vec<_>>().join(", "),
            None => "unbound keys".to_string(),
        };
        let broken = DecodeError::new(DecodeErrorKind::BrokenConstraint {
            field: field.name.clone(),
            keys: shown.clone(),
        });
        match registry.config().broken_constraint {
            Severity::Error => return Err(broken.terminal()),
            Severity::Warning => {
                warn!(type_name = %plan.type_name, field = %field.name, keys = %shown, "component relation constraint broken, decoding by tag");
            }
            Severity::Ignore => {}
        }
        return decode_slot(registry, slot, field, node);
    };

    /* Strip the slot's own tag, then decode the selected alternative
     * regardless of claims */
    let node = match slot.tag {
        Some(tag) if !tag.implicit => node.unwrap_explicit(tag)?,
        _ => node,
    };
    let union_tlv = tlv_plan(union_plan)?;
    let node = match union_tlv.own_tag {
        Some(tag) => node.unwrap_explicit(tag)?,
        None => node,
    };
    let ResolvedTypeKind::Union { alternatives, .. } = &union_plan.kind else {
        return Err(DecodeError::malformed(format!("'{}' is not an open type", union_name)));
    };
    let index = alternatives
        .iter()
        .position(|alt| alt.name == alternative)
        .ok_or_else(|| DecodeError::malformed(format!("constraint names unknown alternative '{}'", alternative)))?;
    trace!(type_name = %plan.type_name, field = %field.name, alternative, "open type resolved by constraint");
    let value = decode_slot(registry, &union_tlv.slots[index], &alternatives[index], node)
        .within(|| ContextFrame::Alternative(alternative.to_string()))?;
    Ok(make_union(registry, union_plan, index, value))
}

/* Decoded key fields, `None` when one of them is absent */
fn key_values<'v>(constraint: &OpenTypeConstraint, decoded: &'v [Element], fields: &[ResolvedElement]) -> Option<Vec<&'v Value>> {
    constraint
        .keys
        .iter()
        .map(|key| {
            let index = fields.iter().position(|field| &field.name == key)?;
            decoded[index].as_ref()
        })
        .collect()
}

/* First row whose literals all match the key values */
fn lookup<'c>(constraint: &'c OpenTypeConstraint, keys: &[&Value]) -> Option<&'c str> {
    constraint
        .table
        .iter()
        .find(|row| row.values.len() == keys.len() && row.values.iter().zip(keys).all(|(literal, key)| rule_value_matches(key, literal)))
        .map(|row| row.alternative.as_str())
}

fn show_value(value: &Value) -> String {
    match value {
        Value::Integer(v) => v.to_string(),
        Value::Boolean(v) => v.to_string(),
        Value::Charstring(v) => format!("\"{}\"", v),
        Value::Octetstring(v) => format!("'{}'O", hex::encode_upper(v)),
        other => other.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_use_minimal_octets() {
        assert_eq!(integer_content(0), vec![0x00]);
        assert_eq!(integer_content(127), vec![0x7F]);
        assert_eq!(integer_content(128), vec![0x00, 0x80]);
        assert_eq!(integer_content(-1), vec![0xFF]);
        assert_eq!(integer_content(-129), vec![0xFF, 0x7F]);
        for value in [0, 1, -1, 255, -256, i64::MAX, i64::MIN] {
            assert_eq!(decode_primitive(PrimitiveType::Integer, &integer_content(value)).unwrap(), Value::Integer(value));
        }
    }

    #[test]
    fn long_form_identifiers_and_lengths() {
        let identity = TlvIdentity {
            class: TagClass::Context,
            number: 200,
        };
        assert_eq!(identifier_octets(identity, true), vec![0xBF, 0x81, 0x48]);
        assert_eq!(length_octets(300), vec![0x82, 0x01, 0x2C]);

        let node = Node {
            identity,
            constructed: false,
            content: vec![7; 300],
        };
        let bytes = node.into_bytes();
        let (read, used) = RawNode::read(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(read.identity, identity);
        assert_eq!(read.content.len(), 300);
    }

    #[test]
    fn set_ordering_pads_with_zeros() {
        assert_eq!(canonical_order(&[0x02, 0x01], &[0x02, 0x01, 0x00]), Ordering::Less);
        assert_eq!(canonical_order(&[0x04], &[0x02, 0xFF]), Ordering::Greater);
    }
}
