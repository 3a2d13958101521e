/* Token-text codec façade generation */

use super::codec::open_codec_impl;
use super::helpers::string_literal;
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;

pub fn emit_text(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let Some(text) = &plan.text else {
    return String::new();
  };
  open_codec_impl(&mut w, plan, Format::Text, rt);
  w.blank();
  w.line(format!("pub const TEXT_BEGIN: &'static str = {};", string_literal(&text.begin)));
  w.line(format!("pub const TEXT_SEPARATOR: &'static str = {};", string_literal(&text.separator)));
  w.line(format!("pub const TEXT_END: &'static str = {};", string_literal(&text.end)));
  w.close();
  w.finish()
}
