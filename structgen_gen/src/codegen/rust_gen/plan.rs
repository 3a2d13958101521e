/* Plan export generation */

use super::helpers::{const_ident, raw_string_literal};
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;

pub fn emit_plan(plan: &TypePlan) -> Result<String, serde_json::Error> {
  let json = serde_json::to_string(plan)?;
  let mut w = CodeWriter::new();
  w.doc(format!("Codec plan of `{}` in the runtime registry's JSON form.", plan.type_name));
  w.line(format!("pub const {}_PLAN: &str = {};", const_ident(&plan.type_name), raw_string_literal(&json)));
  Ok(w.finish())
}
