/* Bit-packed layouts
 *
 * Bits are filled from the least significant bit of each byte. Integer and
 * boolean fields are written with their declared bit order, strings byte by
 * byte. Optional record fields are preceded by a presence bit. */

use super::{
    bound_element, make_record, make_seq, make_union, primitive_mismatch, record_fields, rule_value_matches,
    seq_elements, union_selection, unsupported,
};
use crate::errors::{ContextFrame, DecodeContext, DecodeError, DecodeErrorKind, DecodeResult, EncodeError, EncodeResult};
use crate::registry::Registry;
use crate::value::{Element, Value};
use std::collections::{BTreeMap, HashMap};
use structgen_gen::codegen::shared::builder::{pad_bits, primitive_bits};
use structgen_gen::codegen::shared::plan::{RawAlternativePlan, RawPlan, RawRulePlan, TypePlan};
use structgen_gen::schema::{ElementType, Format, ResolvedElement, ResolvedTypeKind};
use structgen_types::{BitOrder, ExtensionBit, PrimitiveSpec, PrimitiveType};
use tracing::trace;

fn raw_plan(plan: &TypePlan) -> Result<&RawPlan, super::Unsupported> {
    plan.raw.as_ref().ok_or_else(|| unsupported(plan, Format::BitPacked))
}

fn follows_bit(convention: ExtensionBit, follows: bool) -> bool {
    match convention {
        ExtensionBit::Yes => follows,
        ExtensionBit::Reverse => !follows,
    }
}

/* ----------------------------------------------------------------- encode */

#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    len: u64,
}

impl BitWriter {
    fn push(&mut self, bit: bool) {
        let byte = (self.len / 8) as usize;
        if byte == self.bytes.len() {
            self.bytes.push(0);
        }
        if bit {
            self.bytes[byte] |= 1 << (self.len % 8);
        }
        self.len += 1;
    }

    fn write(&mut self, value: u64, width: u32, order: BitOrder) {
        match order {
            BitOrder::Lsb => (0..width).for_each(|i| self.push((value >> i) & 1 == 1)),
            BitOrder::Msb => (0..width).rev().for_each(|i| self.push((value >> i) & 1 == 1)),
        }
    }

    fn pad_from(&mut self, start: u64, padding: Option<u32>) {
        let target = start + pad_bits(self.len - start, padding);
        while self.len < target {
            self.push(false);
        }
    }
}

pub fn encode(registry: &Registry, plan: &TypePlan, value: &Value) -> EncodeResult<Vec<u8>> {
    let mut writer = BitWriter::default();
    encode_plan(registry, plan, value, &mut writer)?;
    Ok(writer.bytes)
}

fn encode_plan(registry: &Registry, plan: &TypePlan, value: &Value, writer: &mut BitWriter) -> EncodeResult<()> {
    let raw = raw_plan(plan)?;
    let start = writer.len;
    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let elements = seq_elements(plan, value)?;
            if let Some(count) = raw.count {
                if elements.len() != count {
                    return Err(EncodeError::Invalid {
                        type_name: plan.type_name.clone(),
                        reason: format!("{} elements where exactly {} are encoded", elements.len(), count),
                    });
                }
            }
            for (index, item) in elements.iter().enumerate() {
                let item = bound_element(plan, item, ContextFrame::Index(index))?;
                if let Some(convention) = raw.extension_bit {
                    writer.push(follows_bit(convention, true));
                }
                encode_element(registry, &element.ty, item, writer)?;
            }
            if let Some(convention) = raw.extension_bit {
                writer.push(follows_bit(convention, false));
            }
        }
        ResolvedTypeKind::Record { fields, .. } => {
            for (field, element) in fields.iter().zip(record_fields(plan, value)?) {
                if field.optional {
                    writer.push(element.is_some());
                }
                match element {
                    Some(item) => encode_element(registry, &field.ty, item, writer)?,
                    None if field.optional => {}
                    None => {
                        bound_element(plan, element, ContextFrame::Field(field.name.clone()))?;
                    }
                }
            }
        }
        ResolvedTypeKind::Union { alternatives, .. } => {
            let (index, inner) = union_selection(plan, value)?;
            encode_element(registry, &alternatives[index].ty, inner, writer)?;
        }
    }
    writer.pad_from(start, raw.padding);
    Ok(())
}

fn encode_element(registry: &Registry, ty: &ElementType, value: &Value, writer: &mut BitWriter) -> EncodeResult<()> {
    match ty {
        ElementType::Primitive(spec) => encode_primitive(spec, value, writer),
        ElementType::Named(name) => encode_plan(registry, registry.plan(name)?, value, writer),
    }
}

fn encode_primitive(spec: &PrimitiveSpec, value: &Value, writer: &mut BitWriter) -> EncodeResult<()> {
    let invalid = |reason: String| EncodeError::Invalid {
        type_name: spec.prim_type.keyword().to_string(),
        reason,
    };
    match (spec.prim_type, value) {
        (PrimitiveType::Integer, Value::Integer(v)) => {
            let width = spec.raw.bits.unwrap_or(8).min(64);
            if !integer_fits(*v, width, spec.raw.signed) {
                return Err(invalid(format!("{} does not fit in {} bits", v, width)));
            }
            writer.write(*v as u64, width, spec.raw.bit_order);
        }
        (PrimitiveType::Boolean, Value::Boolean(v)) => {
            writer.write(u64::from(*v), spec.raw.bits.unwrap_or(1).min(64), spec.raw.bit_order);
        }
        (PrimitiveType::Charstring | PrimitiveType::Octetstring, value) => {
            let bytes = match (spec.prim_type, value) {
                (PrimitiveType::Charstring, Value::Charstring(v)) => v.as_bytes(),
                (PrimitiveType::Octetstring, Value::Octetstring(v)) => v.as_slice(),
                (expected, found) => return Err(primitive_mismatch(expected, found).into()),
            };
            if let Some(fixed) = spec.raw.bytes {
                if bytes.len() != fixed as usize {
                    return Err(invalid(format!("{} bytes where exactly {} are encoded", bytes.len(), fixed)));
                }
            }
            for byte in bytes {
                writer.write(u64::from(*byte), 8, BitOrder::Lsb);
            }
        }
        (expected, found) => return Err(primitive_mismatch(expected, found).into()),
    }
    Ok(())
}

fn integer_fits(value: i64, width: u32, signed: bool) -> bool {
    match (signed, width) {
        (_, 0) => value == 0,
        (_, 64) => signed || value >= 0,
        (true, _) => {
            let half = 1i64 << (width - 1);
            (-half..half).contains(&value)
        }
        (false, _) => value >= 0 && (value as u64) < (1u64 << width),
    }
}

/* ----------------------------------------------------------------- decode */

/// Work done while decoding one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDecodeStats {
    /// Discriminator fields decoded ahead of their alternative.
    pub discriminator_decodes: usize,
    /// Discriminator lookups answered by the cache.
    pub cache_hits: usize,
    /// Full decodes attempted, keyed by `Union.alternative`.
    pub full_decodes: BTreeMap<String, usize>,
}

impl RawDecodeStats {
    pub fn full_decodes_of(&self, type_name: &str, alternative: &str) -> usize {
        self.full_decodes
            .get(&format!("{}.{}", type_name, alternative))
            .copied()
            .unwrap_or(0)
    }
}

struct BitReader<'a> {
    input: &'a [u8],
    len: u64,
}

impl BitReader<'_> {
    fn bit(&self, pos: u64) -> bool {
        (self.input[(pos / 8) as usize] >> (pos % 8)) & 1 == 1
    }

    fn bits(&self, pos: u64, width: u32, order: BitOrder) -> DecodeResult<u64> {
        if pos + u64::from(width) > self.len {
            return Err(DecodeError::unexpected_end());
        }
        let mut value = 0u64;
        for i in 0..width {
            let bit = u64::from(self.bit(pos + u64::from(i)));
            match order {
                BitOrder::Lsb => value |= bit << i,
                BitOrder::Msb => value = (value << 1) | bit,
            }
        }
        Ok(value)
    }
}

struct Decoder<'a> {
    registry: &'a Registry,
    reader: BitReader<'a>,
    pos: u64,
    /* Discriminators by field layout and absolute offset; `None` when the
     * field could not be read there */
    cache: HashMap<(PrimitiveSpec, u64), Option<Value>>,
    stats: RawDecodeStats,
}

pub fn decode(registry: &Registry, plan: &TypePlan, input: &[u8]) -> DecodeResult<Value> {
    decode_with_stats(registry, plan, input).0
}

/// Decode and report how much speculative work union selection needed.
pub fn decode_with_stats(registry: &Registry, plan: &TypePlan, input: &[u8]) -> (DecodeResult<Value>, RawDecodeStats) {
    let mut decoder = Decoder {
        registry,
        reader: BitReader {
            input,
            len: input.len() as u64 * 8,
        },
        pos: 0,
        cache: HashMap::new(),
        stats: RawDecodeStats::default(),
    };
    let result = decoder.decode_plan(plan).and_then(|value| {
        let remaining = decoder.reader.len - decoder.pos;
        if remaining >= 8 {
            Err(DecodeError::new(DecodeErrorKind::TrailingData((remaining / 8) as usize)))
        } else {
            Ok(value)
        }
    });
    (result, decoder.stats)
}

impl Decoder<'_> {
    fn remaining(&self) -> u64 {
        self.reader.len - self.pos
    }

    fn decode_plan(&mut self, plan: &TypePlan) -> DecodeResult<Value> {
        let raw = raw_plan(plan)?;
        let start = self.pos;
        let value = match &plan.kind {
            ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
                let elements = self.decode_elements(raw, element)?;
                make_seq(self.registry, plan, elements)
            }
            ResolvedTypeKind::Record { fields, .. } => {
                let mut decoded = Vec::with_capacity(fields.len());
                for field in fields {
                    if field.optional && !self.read_bit().within(|| ContextFrame::Field(field.name.clone()))? {
                        decoded.push(None);
                        continue;
                    }
                    let value = self.decode_element(&field.ty).within(|| ContextFrame::Field(field.name.clone()))?;
                    decoded.push(Some(value));
                }
                make_record(self.registry, plan, decoded)
            }
            ResolvedTypeKind::Union { alternatives, .. } => self.decode_union(plan, raw, alternatives)?,
        };
        let end = start + pad_bits(self.pos - start, raw.padding);
        if end > self.reader.len {
            return Err(DecodeError::unexpected_end());
        }
        self.pos = end;
        Ok(value)
    }

    fn read_bit(&mut self) -> DecodeResult<bool> {
        let bit = self.reader.bits(self.pos, 1, BitOrder::Lsb)? == 1;
        self.pos += 1;
        Ok(bit)
    }

    fn decode_elements(&mut self, raw: &RawPlan, element: &ResolvedElement) -> DecodeResult<Vec<Element>> {
        let mut elements = Vec::new();
        if let Some(count) = raw.count {
            for index in 0..count {
                let value = self.decode_element(&element.ty).within(|| ContextFrame::Index(index))?;
                elements.push(Some(value));
            }
        } else if let Some(convention) = raw.extension_bit {
            while self.read_bit()? == follows_bit(convention, true) {
                let index = elements.len();
                let value = self.decode_element(&element.ty).within(|| ContextFrame::Index(index))?;
                elements.push(Some(value));
            }
        } else {
            /* Greedy: stop at the end of input or the first element that
             * does not decode, rewinding past the last good one */
            while self.remaining() > 0 {
                let mark = self.pos;
                match self.decode_element(&element.ty) {
                    Ok(value) if self.pos > mark => elements.push(Some(value)),
                    _ => {
                        self.pos = mark;
                        break;
                    }
                }
            }
        }
        Ok(elements)
    }

    fn decode_element(&mut self, ty: &ElementType) -> DecodeResult<Value> {
        match ty {
            ElementType::Primitive(spec) => {
                let (value, width) = self.primitive_at(spec, self.pos)?;
                self.pos += width;
                Ok(value)
            }
            ElementType::Named(name) => {
                let plan = self.registry.plan(name)?;
                self.decode_plan(plan)
            }
        }
    }

    /* Primitive at an absolute position, with its width */
    fn primitive_at(&self, spec: &PrimitiveSpec, pos: u64) -> DecodeResult<(Value, u64)> {
        let order = spec.raw.bit_order;
        match spec.prim_type {
            PrimitiveType::Integer => {
                let width = spec.raw.bits.unwrap_or(8).min(64);
                let bits = self.reader.bits(pos, width, order)?;
                let value = if spec.raw.signed && width > 0 && width < 64 && (bits >> (width - 1)) & 1 == 1 {
                    (bits | (u64::MAX << width)) as i64
                } else {
                    bits as i64
                };
                Ok((Value::Integer(value), u64::from(width)))
            }
            PrimitiveType::Boolean => {
                let width = spec.raw.bits.unwrap_or(1).min(64);
                let bits = self.reader.bits(pos, width, order)?;
                Ok((Value::Boolean(bits != 0), u64::from(width)))
            }
            PrimitiveType::Charstring | PrimitiveType::Octetstring => {
                let width = match primitive_bits(spec) {
                    Some(width) => width,
                    None => {
                        let rest = self.reader.len - pos;
                        if rest % 8 != 0 {
                            return Err(DecodeError::malformed("string does not end on an octet boundary"));
                        }
                        rest
                    }
                };
                let mut bytes = Vec::with_capacity((width / 8) as usize);
                for index in 0..width / 8 {
                    bytes.push(self.reader.bits(pos + index * 8, 8, BitOrder::Lsb)? as u8);
                }
                let value = match spec.prim_type {
                    PrimitiveType::Charstring => Value::Charstring(
                        String::from_utf8(bytes)
                            .map_err(|err| DecodeError::malformed(format!("charstring is not UTF-8: {}", err)))?,
                    ),
                    _ => Value::Octetstring(bytes),
                };
                Ok((value, width))
            }
        }
    }

    /* Alternatives in declared order; the first whose full decode succeeds
     * and whose rule holds is kept */
    fn decode_union(&mut self, plan: &TypePlan, raw: &RawPlan, alternatives: &[ResolvedElement]) -> DecodeResult<Value> {
        let start = self.pos;
        for (index, (alternative, slot)) in raw.alternatives.iter().zip(alternatives).enumerate() {
            if let Some(rule) = alternative.rule.as_ref().filter(|rule| rule.static_offsets) {
                if !self.discriminators_hold(rule, start) {
                    trace!(type_name = %plan.type_name, alternative = %alternative.name, "discriminator rejects alternative");
                    continue;
                }
            }

            self.count_full_decode(plan, alternative);
            match self.decode_element(&slot.ty) {
                Ok(value) if self.rule_holds_after(alternative, &value) => {
                    trace!(type_name = %plan.type_name, alternative = %alternative.name, "alternative selected");
                    return Ok(make_union(self.registry, plan, index, value));
                }
                Ok(_) => {
                    trace!(type_name = %plan.type_name, alternative = %alternative.name, "decoded value breaks tag rule");
                }
                Err(err) => {
                    trace!(type_name = %plan.type_name, alternative = %alternative.name, error = %err, "trial decode failed");
                }
            }
            self.pos = start;
        }
        Err(DecodeError::new(DecodeErrorKind::NoUnionMemberFound {
            type_name: plan.type_name.clone(),
        }))
    }

    fn count_full_decode(&mut self, plan: &TypePlan, alternative: &RawAlternativePlan) {
        *self
            .stats
            .full_decodes
            .entry(format!("{}.{}", plan.type_name, alternative.name))
            .or_insert(0) += 1;
    }

    fn discriminators_hold(&mut self, rule: &RawRulePlan, start: u64) -> bool {
        rule.conditions.iter().all(|condition| {
            let Some(offset) = condition.bit_offset else {
                return false;
            };
            let key = (condition.field.clone(), start + offset);
            let value = match self.cache.get(&key).cloned() {
                Some(value) => {
                    self.stats.cache_hits += 1;
                    value
                }
                None => {
                    self.stats.discriminator_decodes += 1;
                    let value = self.primitive_at(&condition.field, start + offset).ok().map(|(value, _)| value);
                    self.cache.insert(key, value.clone());
                    value
                }
            };
            value.is_some_and(|value| condition.values.iter().any(|literal| rule_value_matches(&value, literal)))
        })
    }

    /* Rules without static offsets are checked on the decoded value */
    fn rule_holds_after(&self, alternative: &RawAlternativePlan, value: &Value) -> bool {
        let Some(rule) = alternative.rule.as_ref().filter(|rule| !rule.static_offsets) else {
            return true;
        };
        rule.conditions.iter().all(|condition| {
            let mut current = value;
            for segment in &condition.path {
                let field = match current.as_record().and_then(|record| record.field(segment)) {
                    Ok(Some(field)) => field,
                    _ => return false,
                };
                current = field;
            }
            condition.values.iter().any(|literal| rule_value_matches(current, literal))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_fills_low_bits_first() {
        let mut writer = BitWriter::default();
        writer.write(0b101, 3, BitOrder::Lsb);
        writer.write(0b1, 1, BitOrder::Lsb);
        assert_eq!(writer.bytes, vec![0b1101]);

        let mut writer = BitWriter::default();
        writer.write(0b100, 3, BitOrder::Msb);
        assert_eq!(writer.bytes, vec![0b001]);
    }

    #[test]
    fn integer_ranges() {
        assert!(integer_fits(255, 8, false));
        assert!(!integer_fits(256, 8, false));
        assert!(!integer_fits(-1, 8, false));
        assert!(integer_fits(-128, 8, true));
        assert!(!integer_fits(128, 8, true));
        assert!(integer_fits(i64::MIN, 64, true));
    }

    #[test]
    fn reader_round_trips_msb_fields() {
        let mut writer = BitWriter::default();
        writer.write(0x2A5, 12, BitOrder::Msb);
        let reader = BitReader {
            len: writer.len,
            input: &writer.bytes,
        };
        assert_eq!(reader.bits(0, 12, BitOrder::Msb).unwrap(), 0x2A5);
        assert!(reader.bits(4, 12, BitOrder::Msb).is_err());
    }
}
