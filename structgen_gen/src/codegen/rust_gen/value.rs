/* Value-semantics façade generation
 *
 * Every structured type becomes a newtype over the runtime `Value` with the
 * operations of its kind forwarded to the runtime sequence, union or record
 * implementation. */

use super::helpers::{describe_element, member_ident, open_impl, string_literal, type_ident, type_summary};
use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::{ResolvedElement, ResolvedTypeKind};

/* Methods every façade defines; member accessors must not shadow them */
const RESERVED_METHODS: &[&str] = &[
  "new", "from_value", "value", "into_value", "is_bound", "clean_up", "equals", "assign", "selected", "union", "record",
];

pub fn emit_value(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let ident = type_ident(&plan.type_name);

  w.doc(type_summary(plan));
  w.line("#[derive(Debug, Clone, PartialEq)]");
  w.line(format!("pub struct {}(pub {}::Value);", ident, rt));
  w.blank();

  open_impl(&mut w, plan);
  w.line(format!("pub const TYPE_NAME: &'static str = {};", string_literal(&plan.type_name)));
  w.blank();
  emit_common(&mut w, rt);

  match &plan.kind {
    ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => emit_sequence(&mut w, element, rt),
    ResolvedTypeKind::Union { alternatives, .. } => emit_union(&mut w, alternatives, rt),
    ResolvedTypeKind::Record { fields, .. } => emit_record(&mut w, fields, rt),
  }
  w.close();
  w.finish()
}

fn emit_common(w: &mut CodeWriter, rt: &str) {
  w.doc("Unbound value of this type.");
  w.open(format!("pub fn new(registry: &{rt}::Registry) -> {rt}::SemanticResult<Self>"));
  w.line("registry.new_value(Self::TYPE_NAME).map(Self)");
  w.close().blank();

  w.open(format!("pub fn from_value(value: {rt}::Value) -> {rt}::SemanticResult<Self>"));
  w.open("if value.type_name() != Self::TYPE_NAME");
  w.open(format!("return Err({rt}::SemanticError::TypeMismatch"));
  w.line("operation: \"conversion\",");
  w.line("expected: Self::TYPE_NAME.to_string(),");
  w.line("found: value.type_name().to_string(),");
  w.close_with(");");
  w.close();
  w.line("Ok(Self(value))");
  w.close().blank();

  w.open(format!("pub fn value(&self) -> &{rt}::Value"));
  w.line("&self.0");
  w.close().blank();

  w.open(format!("pub fn into_value(self) -> {rt}::Value"));
  w.line("self.0");
  w.close().blank();

  w.open("pub fn is_bound(&self) -> bool");
  w.line("self.0.is_bound()");
  w.close().blank();

  w.doc("Value equality; fails when either operand is unbound.");
  w.open(format!("pub fn equals(&self, other: &Self) -> {rt}::SemanticResult<bool>"));
  w.line("self.0.equals(&other.0)");
  w.close().blank();
}

fn emit_sequence(w: &mut CodeWriter, element: &ResolvedElement, rt: &str) {
  w.comment(format!("elements: {}", describe_element(&element.ty)));
  w.open(format!("fn seq(&self) -> {rt}::SemanticResult<&{rt}::SeqValue>"));
  w.line("self.0.as_seq()");
  w.close().blank();

  w.open(format!("fn seq_mut(&mut self) -> {rt}::SemanticResult<&mut {rt}::SeqValue>"));
  w.line("self.0.as_seq_mut()");
  w.close().blank();

  w.open(format!("fn derived(seq: {rt}::SemanticResult<{rt}::SeqValue>) -> {rt}::SemanticResult<Self>"));
  w.line(format!("seq.map(|seq| Self({rt}::Value::Seq(seq)))"));
  w.close().blank();

  w.open("pub fn clean_up(&mut self)");
  w.open("if let Ok(seq) = self.seq_mut()");
  w.line("seq.clean_up();");
  w.close();
  w.close().blank();

  w.doc("Assignment; slots with live handles keep their identity.");
  w.open(format!("pub fn assign(&mut self, other: &Self) -> {rt}::SemanticResult<()>"));
  w.line("let source = other.seq()?;");
  w.line("self.seq_mut()?.assign(source)");
  w.close().blank();

  w.open(format!("pub fn size_of(&self) -> {rt}::SemanticResult<usize>"));
  w.line("self.seq()?.size_of()");
  w.close().blank();

  w.doc("Number of elements up to the last bound one.");
  w.open(format!("pub fn length_of(&self) -> {rt}::SemanticResult<usize>"));
  w.line("self.seq()?.length_of()");
  w.close().blank();

  w.open(format!("pub fn equals_empty(&self) -> {rt}::SemanticResult<bool>"));
  w.line("self.seq()?.equals_empty()");
  w.close().blank();

  w.open(format!("pub fn element_at(&self, index: usize) -> {rt}::SemanticResult<&{rt}::Element>"));
  w.line("self.seq()?.element_at(index)");
  w.close().blank();

  w.doc("Mutable indexing; grows the value with unbound elements as needed.");
  w.open(format!("pub fn element_at_mut(&mut self, index: usize) -> {rt}::SemanticResult<&mut {rt}::Element>"));
  w.line("self.seq_mut()?.element_at_mut(index)");
  w.close().blank();

  w.open(format!("pub fn set_size(&mut self, size: usize) -> {rt}::SemanticResult<()>"));
  w.line("self.seq_mut()?.set_size(size)");
  w.close().blank();

  w.open(format!("pub fn concat(&self, other: &Self) -> {rt}::SemanticResult<Self>"));
  w.line("Self::derived(self.seq()?.concat(other.seq()?))");
  w.close().blank();

  w.open(format!("pub fn subrange(&self, start: usize, count: usize) -> {rt}::SemanticResult<Self>"));
  w.line("Self::derived(self.seq()?.subrange(start, count))");
  w.close().blank();

  w.open(format!("pub fn replace(&self, start: usize, count: usize, replacement: &Self) -> {rt}::SemanticResult<Self>"));
  w.line("Self::derived(self.seq()?.splice(start, count, replacement.seq()?))");
  w.close().blank();

  w.open(format!("pub fn rotate_left(&self, by: usize) -> {rt}::SemanticResult<Self>"));
  w.line("Self::derived(self.seq()?.rotate_left(by))");
  w.close().blank();

  w.open(format!("pub fn rotate_right(&self, by: usize) -> {rt}::SemanticResult<Self>"));
  w.line("Self::derived(self.seq()?.rotate_right(by))");
  w.close().blank();

  w.doc("Handle on an element that survives shrinking and assignment.");
  w.open(format!("pub fn reference(&mut self, index: usize) -> {rt}::SemanticResult<{rt}::ElementRef>"));
  w.line("self.seq_mut()?.reference(index)");
  w.close().blank();

  w.open(format!("pub fn release(&mut self, handle: {rt}::ElementRef) -> {rt}::SemanticResult<()>"));
  w.line("self.seq_mut()?.release(handle);");
  w.line("Ok(())");
  w.close();
}

/* Accessor name for a member, renamed when it would shadow a façade method */
fn accessor(slot: &ResolvedElement) -> String {
  let ident = member_ident(&slot.name);
  if RESERVED_METHODS.contains(&ident.as_str()) {
    format!("{}_member", ident)
  } else {
    ident
  }
}

fn plain(ident: &str) -> &str {
  ident.trim_start_matches("r#")
}

fn emit_union(w: &mut CodeWriter, alternatives: &[ResolvedElement], rt: &str) {
  w.open(format!("fn union(&self) -> {rt}::SemanticResult<&{rt}::UnionValue>"));
  w.line("self.0.as_union()");
  w.close().blank();

  w.open(format!("fn union_mut(&mut self) -> {rt}::SemanticResult<&mut {rt}::UnionValue>"));
  w.line("self.0.as_union_mut()");
  w.close().blank();

  w.open("pub fn clean_up(&mut self)");
  w.open("if let Ok(union) = self.union_mut()");
  w.line("union.clean_up();");
  w.close();
  w.close().blank();

  w.doc("Assignment; fails when `other` is unbound.");
  w.open(format!("pub fn assign(&mut self, other: &Self) -> {rt}::SemanticResult<()>"));
  w.line("let source = other.union()?;");
  w.line("self.union_mut()?.assign(source)");
  w.close().blank();

  w.doc("Name of the selected alternative, `None` while unbound.");
  w.open(format!("pub fn selected(&self) -> {rt}::SemanticResult<Option<&str>>"));
  w.line("Ok(self.union()?.selected_name())");
  w.close();

  for alternative in alternatives {
    let ident = accessor(alternative);
    let name = string_literal(&alternative.name);
    w.blank();
    w.doc(format!("Alternative `{}` ({}); fails unless it is selected.", alternative.name, describe_element(&alternative.ty)));
    w.open(format!("pub fn {}(&self) -> {rt}::SemanticResult<&{rt}::Element>", ident));
    w.line(format!("self.union()?.field({})", name));
    w.close().blank();

    w.doc("Selects the alternative, discarding the previous one.");
    w.open(format!("pub fn {}_mut(&mut self) -> {rt}::SemanticResult<&mut {rt}::Element>", plain(&ident)));
    w.line(format!("self.union_mut()?.field_mut({})", name));
    w.close().blank();

    w.open(format!("pub fn select_{}(&mut self, value: impl Into<{rt}::Value>) -> {rt}::SemanticResult<()>", plain(&ident)));
    w.line(format!("self.union_mut()?.select({}, value.into())", name));
    w.close().blank();

    w.open(format!("pub fn ischosen_{}(&self) -> {rt}::SemanticResult<bool>", plain(&ident)));
    w.line(format!("self.union()?.ischosen({})", name));
    w.close();
  }
}

fn emit_record(w: &mut CodeWriter, fields: &[ResolvedElement], rt: &str) {
  w.open(format!("fn record(&self) -> {rt}::SemanticResult<&{rt}::RecordValue>"));
  w.line("self.0.as_record()");
  w.close().blank();

  w.open(format!("fn record_mut(&mut self) -> {rt}::SemanticResult<&mut {rt}::RecordValue>"));
  w.line("self.0.as_record_mut()");
  w.close().blank();

  w.open("pub fn clean_up(&mut self)");
  w.open("if let Ok(record) = self.record_mut()");
  w.line("record.clean_up();");
  w.close();
  w.close().blank();

  w.doc("Assignment; fails when `other` is unbound.");
  w.open(format!("pub fn assign(&mut self, other: &Self) -> {rt}::SemanticResult<()>"));
  w.line("let source = other.record()?;");
  w.line("self.record_mut()?.assign(source)");
  w.close();

  for field in fields {
    let ident = accessor(field);
    let name = string_literal(&field.name);
    let optional = if field.optional { ", optional" } else { "" };
    w.blank();
    w.doc(format!("Field `{}` ({}{}).", field.name, describe_element(&field.ty), optional));
    w.open(format!("pub fn {}(&self) -> {rt}::SemanticResult<&{rt}::Element>", ident));
    w.line(format!("self.record()?.field({})", name));
    w.close().blank();

    w.open(format!("pub fn {}_mut(&mut self) -> {rt}::SemanticResult<&mut {rt}::Element>", plain(&ident)));
    w.line(format!("self.record_mut()?.field_mut({})", name));
    w.close().blank();

    w.open(format!("pub fn set_{}(&mut self, value: impl Into<{rt}::Value>) -> {rt}::SemanticResult<()>", plain(&ident)));
    w.line(format!("self.record_mut()?.set({}, value.into())", name));
    w.close();
  }
}
