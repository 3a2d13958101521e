/* Bit-packed codec façade generation */

use super::codec::open_codec_impl;
use crate::codegen::shared::plan::{RawConditionPlan, RawPlan, TypePlan};
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;
use structgen_types::ExtensionBit;

fn condition_text(condition: &RawConditionPlan) -> String {
  let values = condition.values.iter().map(|value| value.to_string()).collect::<Vec<_>>().join(" | ");
  match condition.bit_offset {
    Some(offset) => format!("{} = {} at bit {}", condition.path.join("."), values, offset),
    None => format!("{} = {}", condition.path.join("."), values),
  }
}

fn describe(w: &mut CodeWriter, raw: &RawPlan) {
  match raw.static_bits {
    Some(bits) => w.comment(format!("bit-packed: {} bits", bits)),
    None => w.comment("bit-packed: length depends on the value"),
  };
  if let Some(count) = raw.count {
    w.comment(format!("  exactly {} elements", count));
  }
  match raw.extension_bit {
    Some(ExtensionBit::Yes) => {
      w.comment("  extension bit before each element");
    }
    Some(ExtensionBit::Reverse) => {
      w.comment("  reversed extension bit before each element");
    }
    None => {}
  }
  if let Some(padding) = raw.padding {
    w.comment(format!("  padded to a multiple of {} bits", padding));
  }
  for alternative in &raw.alternatives {
    match &alternative.rule {
      Some(rule) => {
        let conditions = rule.conditions.iter().map(condition_text).collect::<Vec<_>>().join(" and ");
        let mode = if rule.static_offsets { "checked before decoding" } else { "checked after decoding" };
        w.comment(format!("  {} when {} ({})", alternative.name, conditions, mode))
      }
      None => w.comment(format!("  {} by trial decode", alternative.name)),
    };
  }
}

pub fn emit_raw(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let Some(raw) = &plan.raw else {
    return String::new();
  };
  describe(&mut w, raw);
  open_codec_impl(&mut w, plan, Format::BitPacked, rt);
  w.blank();

  let bits = match raw.static_bits {
    Some(bits) => format!("Some({})", bits),
    None => "None".to_string(),
  };
  w.line(format!("pub const BIT_PACKED_BITS: Option<u64> = {};", bits));
  w.blank();

  w.doc("Decode and report discriminator and trial-decode work.");
  w.open(format!(
    "pub fn decode_bit_packed_with_stats(registry: &{rt}::Registry, input: &[u8]) -> ({rt}::DecodeResult<Self>, {rt}::RawDecodeStats)"
  ));
  w.open("match registry.plan(Self::TYPE_NAME)");
  w.open("Ok(plan) =>");
  w.line(format!("let (result, stats) = {rt}::codec::raw::decode_with_stats(registry, plan, input);"));
  w.line("(result.map(Self), stats)");
  w.close();
  w.line(format!("Err(err) => (Err(err.into()), {rt}::RawDecodeStats::default()),"));
  w.close();
  w.close();
  w.close();
  w.finish()
}
