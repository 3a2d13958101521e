/* Helper utilities for Rust code generation */

use crate::codegen::shared::plan::TypePlan;
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::{ElementType, ResolvedTypeKind};

/* Escape Rust keywords to valid identifiers */
pub fn escape_rust_keyword(name: &str) -> String {
  const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "static", "struct",
    "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
  ];

  if RUST_KEYWORDS.contains(&name) {
    format!("r#{}", name)
  } else {
    name.to_string()
  }
}

/* Split a descriptor name on `_`, `-`, `.` and lower-to-upper case changes */
fn words(name: &str) -> Vec<String> {
  let mut words = Vec::new();
  let mut current = String::new();
  let mut previous_lower = false;
  for c in name.chars() {
    if !c.is_ascii_alphanumeric() {
      if !current.is_empty() {
        words.push(std::mem::take(&mut current));
      }
      previous_lower = false;
      continue;
    }
    if c.is_ascii_uppercase() && previous_lower && !current.is_empty() {
      words.push(std::mem::take(&mut current));
    }
    previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
    current.push(c);
  }
  if !current.is_empty() {
    words.push(current);
  }
  words
}

/* `record_of-int` -> `RecordOfInt` */
pub fn type_ident(name: &str) -> String {
  let mut out = String::new();
  for word in words(name) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
      out.push(first.to_ascii_uppercase());
      out.extend(chars);
    }
  }
  if out.starts_with(|c: char| c.is_ascii_digit()) {
    out.insert(0, '_');
  }
  out
}

/* `innerValue` -> `inner_value` */
pub fn member_ident(name: &str) -> String {
  let joined = words(name).iter().map(|word| word.to_ascii_lowercase()).collect::<Vec<_>>().join("_");
  if joined.starts_with(|c: char| c.is_ascii_digit()) {
    return format!("_{}", joined);
  }
  /* not usable as raw identifiers */
  if matches!(joined.as_str(), "self" | "crate" | "super") {
    return format!("{}_", joined);
  }
  escape_rust_keyword(&joined)
}

/* `MsgHeader` -> `MSG_HEADER` */
pub fn const_ident(name: &str) -> String {
  words(name).iter().map(|word| word.to_ascii_uppercase()).collect::<Vec<_>>().join("_")
}

pub fn string_literal(text: &str) -> String {
  format!("{:?}", text)
}

/* Raw string literal with enough hashes to hold `text` verbatim */
pub fn raw_string_literal(text: &str) -> String {
  let mut hashes = 1;
  while text.contains(&format!("\"{}", "#".repeat(hashes))) {
    hashes += 1;
  }
  let fence = "#".repeat(hashes);
  format!("r{fence}\"{text}\"{fence}")
}

/* Human wording of a slot type, as printed in generated doc comments */
pub fn describe_element(ty: &ElementType) -> String {
  match ty {
    ElementType::Primitive(spec) => spec.prim_type.keyword().to_string(),
    ElementType::Named(name) => format!("`{}`", name),
  }
}

/* Doc comment headline for a type: `Name`: record of integer */
pub fn type_summary(plan: &TypePlan) -> String {
  let detail = match &plan.kind {
    ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
      format!("{} {}", plan.value.keyword, describe_element(&element.ty))
    }
    ResolvedTypeKind::Union { alternatives, .. } => format!("{} of {} alternatives", plan.value.keyword, alternatives.len()),
    ResolvedTypeKind::Record { fields, .. } => format!("{} of {} fields", plan.value.keyword, fields.len()),
  };
  format!("`{}`: {}", plan.display_name, detail)
}

/* Prefix used for runtime paths in generated code */
pub fn runtime_path(runtime_crate: &str) -> String {
  format!("::{}", runtime_crate.trim_start_matches("::"))
}

/* `impl Name {` block opener used by every emitter */
pub fn open_impl(w: &mut CodeWriter, plan: &TypePlan) {
  w.open(format!("impl {}", type_ident(&plan.type_name)));
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifiers_follow_rust_conventions() {
    assert_eq!(type_ident("record_of-int"), "RecordOfInt");
    assert_eq!(type_ident("MsgHeader"), "MsgHeader");
    assert_eq!(member_ident("innerValue"), "inner_value");
    assert_eq!(member_ident("type"), "r#type");
    assert_eq!(const_ident("MsgHeader"), "MSG_HEADER");
  }

  #[test]
  fn raw_strings_grow_their_fence() {
    assert_eq!(raw_string_literal("plain"), "r#\"plain\"#");
    assert_eq!(raw_string_literal("a\"#b"), "r##\"a\"#b\"##");
  }
}
