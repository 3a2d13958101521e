/* Template-semantics façade generation */

use super::helpers::{string_literal, type_ident};
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::ResolvedTypeKind;

pub fn emit_template(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let value = type_ident(&plan.type_name);
  let ident = format!("{}Template", value);

  w.doc(format!("Matching template for `{}`.", plan.display_name));
  w.line("#[derive(Debug, Clone, Default, PartialEq)]");
  w.line(format!("pub struct {}(pub {}::Template);", ident, rt));
  w.blank();

  w.open(format!("impl {}", ident));
  match &plan.kind {
    ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } => {
      w.line(format!("pub const PERMUTATION: bool = {};", plan.template.permutation));
      w.line(format!("pub const SUPERSET_SUBSET: bool = {};", plan.template.superset_subset));
      w.comment(if plan.template.unordered {
        "specific templates match elements in any order"
      } else {
        "specific templates match elements in order, `*` spans any run"
      });
      w.blank();
    }
    ResolvedTypeKind::Union { .. } | ResolvedTypeKind::Record { .. } => {}
  }

  w.doc("Template matching exactly `value`.");
  w.open(format!("pub fn from_value(value: &{}) -> Self", value));
  w.line(format!("Self({}::Template::from_value(&value.0))", rt));
  w.close().blank();

  w.doc("Apply a module parameter given in text form, e.g. `{1, ?, *}`.");
  w.open(format!("pub fn set_param(&mut self, registry: &{rt}::Registry, text: &str) -> Result<(), {rt}::ParamError>"));
  w.line(format!("let node = {}::parse_param(text)?;", rt));
  w.line(format!("self.0.set_param(registry, {}, &node)", string_literal(&plan.type_name)));
  w.close().blank();

  w.open(format!("pub fn matches(&self, value: &{}) -> bool", value));
  w.line("self.0.matches(&value.0)");
  w.close().blank();

  w.open(format!("pub fn valueof(&self) -> {rt}::SemanticResult<{}>", value));
  w.line(format!("self.0.valueof().map({})", value));
  w.close().blank();

  w.open("pub fn is_value(&self) -> bool");
  w.line("self.0.is_value()");
  w.close();
  w.close();
  w.finish()
}
