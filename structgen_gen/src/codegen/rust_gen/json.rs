/* JSON codec façade generation */

use super::codec::open_codec_impl;
use super::helpers::string_literal;
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;

pub fn emit_json(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let Some(json) = &plan.json else {
    return String::new();
  };
  if json.as_value {
    w.comment("JSON: the selected alternative is written as a bare value");
    for member in &json.members {
      let categories = member.categories.iter().map(|category| category.describe()).collect::<Vec<_>>().join(", ");
      w.comment(format!("  {} accepts {}", member.name, categories));
    }
  }
  open_codec_impl(&mut w, plan, Format::Json, rt);
  if !json.members.is_empty() {
    let keys = json.members.iter().map(|member| string_literal(&member.key)).collect::<Vec<_>>().join(", ");
    w.blank();
    w.line(format!("pub const JSON_KEYS: &'static [&'static str] = &[{}];", keys));
  }
  w.close();
  w.finish()
}
