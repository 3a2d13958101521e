/* Encode/decode methods shared by the per-format emitters */

use super::helpers::open_impl;
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;

pub fn format_variant(format: Format) -> &'static str {
  match format {
    Format::Tlv => "Tlv",
    Format::BitPacked => "BitPacked",
    Format::Text => "Text",
    Format::Xml => "Xml",
    Format::Json => "Json",
  }
}

pub fn method_suffix(format: Format) -> &'static str {
  match format {
    Format::Tlv => "tlv",
    Format::BitPacked => "bit_packed",
    Format::Text => "text",
    Format::Xml => "xml",
    Format::Json => "json",
  }
}

/* Open `impl Type {` with the three registry-backed codec entry points;
 * the caller adds format specifics and closes the block */
pub fn open_codec_impl(w: &mut CodeWriter, plan: &TypePlan, format: Format, rt: &str) {
  let variant = format_variant(format);
  let suffix = method_suffix(format);

  open_impl(w, plan);
  w.open(format!("pub fn encode_{suffix}(&self, registry: &{rt}::Registry) -> {rt}::EncodeResult<Vec<u8>>"));
  w.line(format!("registry.encode({rt}::Format::{variant}, Self::TYPE_NAME, &self.0)"));
  w.close().blank();

  w.open(format!("pub fn decode_{suffix}(registry: &{rt}::Registry, input: &[u8]) -> {rt}::DecodeResult<Self>"));
  w.line(format!(
    "registry.decode({rt}::Format::{variant}, Self::TYPE_NAME, input, {rt}::DecodeOptions::default()).map(Self)"
  ));
  w.close().blank();

  w.doc("Decode over this value; it is left unbound when decoding fails.");
  w.open(format!(
    "pub fn decode_{suffix}_into(&mut self, registry: &{rt}::Registry, input: &[u8], options: {rt}::DecodeOptions) -> {rt}::DecodeResult<()>"
  ));
  w.line(format!("registry.decode_into({rt}::Format::{variant}, Self::TYPE_NAME, input, &mut self.0, options)"));
  w.close();
}
