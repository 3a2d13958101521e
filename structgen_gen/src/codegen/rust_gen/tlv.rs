/* TLV codec façade generation */

use super::codec::open_codec_impl;
use crate::codegen::shared::plan::{TlvIdentity, TlvPlan, TypePlan};
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;
use structgen_types::{TagClass, TlvTag};

fn class_name(class: TagClass) -> &'static str {
  match class {
    TagClass::Universal => "UNIVERSAL",
    TagClass::Application => "APPLICATION",
    TagClass::Context => "CONTEXT",
    TagClass::Private => "PRIVATE",
  }
}

pub fn identity_text(identity: &TlvIdentity) -> String {
  format!("[{} {}]", class_name(identity.class), identity.number)
}

fn tag_text(tag: &TlvTag) -> String {
  let mode = if tag.implicit { "IMPLICIT" } else { "EXPLICIT" };
  format!("[{} {}] {}", class_name(tag.class), tag.number, mode)
}

fn describe(w: &mut CodeWriter, tlv: &TlvPlan) {
  match (&tlv.own_tag, &tlv.base) {
    (Some(tag), Some(base)) => w.comment(format!("TLV: {} around {}", tag_text(tag), identity_text(base))),
    (Some(tag), None) => w.comment(format!("TLV: {}", tag_text(tag))),
    (None, Some(base)) => w.comment(format!("TLV: {}", identity_text(base))),
    (None, None) => w.comment("TLV: untagged, the selected alternative is encoded directly"),
  };
  for slot in &tlv.slots {
    let claims = slot.claims.iter().map(identity_text).collect::<Vec<_>>().join(", ");
    match &slot.tag {
      Some(tag) => w.comment(format!("  {}: {} claims {}", slot.name, tag_text(tag), claims)),
      None => w.comment(format!("  {}: claims {}", slot.name, claims)),
    };
  }
  if tlv.sort_set {
    w.comment("element encodings are emitted in canonical order");
  }
  if tlv.open_type {
    w.comment("open type: alternatives are picked by the owning record's constraint table");
  }
}

pub fn emit_tlv(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let Some(tlv) = &plan.tlv else {
    return String::new();
  };
  describe(&mut w, tlv);
  open_codec_impl(&mut w, plan, Format::Tlv, rt);
  w.close();
  w.finish()
}
