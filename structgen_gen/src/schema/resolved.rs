use super::errors::ResolutionError;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use structgen_types::{
  EncodingFlags, FieldJsonAttributes, FieldType, FormatAttributes, OpenTypeConstraint, PrimitiveSpec, PrimitiveType,
  RuleValue, TlvTag, TypeDescriptor, TypeKind,
};

/* Wire formats a structured type can be generated for */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
  Tlv,
  BitPacked,
  Text,
  Xml,
  Json,
}

impl Format {
  pub const ALL: [Format; 5] = [Format::Tlv, Format::BitPacked, Format::Text, Format::Xml, Format::Json];

  pub fn name(&self) -> &'static str {
    match self {
      Format::Tlv => "TLV",
      Format::BitPacked => "bit-packed",
      Format::Text => "text",
      Format::Xml => "XML",
      Format::Json => "JSON",
    }
  }

  pub fn is_enabled(&self, flags: &EncodingFlags) -> bool {
    match self {
      Format::Tlv => flags.tlv,
      Format::BitPacked => flags.bit_packed,
      Format::Text => flags.text,
      Format::Xml => flags.xml,
      Format::Json => flags.json,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
  Primitive(PrimitiveSpec),
  Named(String),
}

impl ElementType {
  pub fn describe(&self) -> String {
    match self {
      ElementType::Primitive(spec) => spec.prim_type.keyword().to_string(),
      ElementType::Named(name) => name.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedElement {
  pub name: String,
  pub display_name: String,
  pub ty: ElementType,
  pub optional: bool,
  pub tlv_tag: Option<TlvTag>,
  pub json: FieldJsonAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedTypeKind {
  RecordOf { element: ResolvedElement },
  SetOf { element: ResolvedElement },
  Union { alternatives: Vec<ResolvedElement>, open_type: bool },
  Record { fields: Vec<ResolvedElement>, constraints: Vec<OpenTypeConstraint> },
}

impl ResolvedTypeKind {
  pub fn slots(&self) -> &[ResolvedElement] {
    match self {
      ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => std::slice::from_ref(element),
      ResolvedTypeKind::Union { alternatives, .. } => alternatives,
      ResolvedTypeKind::Record { fields, .. } => fields,
    }
  }

  /* Element slot of a record-of/set-of */
  pub fn sequence_element(&self) -> Option<&ResolvedElement> {
    match self {
      ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => Some(element),
      _ => None,
    }
  }

  pub fn keyword(&self, abstract_notation: bool) -> &'static str {
    match (self, abstract_notation) {
      (ResolvedTypeKind::RecordOf { .. }, false) => "record of",
      (ResolvedTypeKind::RecordOf { .. }, true) => "SEQUENCE OF",
      (ResolvedTypeKind::SetOf { .. }, false) => "set of",
      (ResolvedTypeKind::SetOf { .. }, true) => "SET OF",
      (ResolvedTypeKind::Union { .. }, false) => "union",
      (ResolvedTypeKind::Union { .. }, true) => "CHOICE",
      (ResolvedTypeKind::Record { .. }, false) => "record",
      (ResolvedTypeKind::Record { .. }, true) => "SEQUENCE",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedType {
  pub name: String,
  pub display_name: String,
  pub abstract_notation: bool,
  pub encodings: EncodingFlags,
  pub kind: ResolvedTypeKind,
  pub attributes: FormatAttributes,
}

impl ResolvedType {
  pub fn supports(&self, format: Format) -> bool {
    format.is_enabled(&self.encodings)
  }

  pub fn slot(&self, name: &str) -> Option<(usize, &ResolvedElement)> {
    self.kind.slots().iter().enumerate().find(|(_, slot)| slot.name == name)
  }
}

/* Chain of record fields a tag-rule path walks through, ending at a primitive */
#[derive(Debug)]
pub struct FieldPath<'a> {
  pub steps: Vec<(&'a ResolvedType, usize)>,
  pub leaf: &'a PrimitiveSpec,
}

#[derive(Debug, Default)]
pub struct TypeResolver {
  descriptors: Vec<TypeDescriptor>,
  pub types: BTreeMap<String, ResolvedType>,
  pub resolution_order: Vec<String>,
}

impl TypeResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_descriptor(&mut self, descriptor: TypeDescriptor) {
    self.descriptors.push(descriptor);
  }

  pub fn descriptors(&self) -> &[TypeDescriptor] {
    &self.descriptors
  }

  pub fn get_type_info(&self, name: &str) -> Option<&ResolvedType> {
    self.types.get(name)
  }

  /* Resolve and validate every descriptor, then compute the generation order */
  pub fn resolve_all(&mut self) -> Result<(), ResolutionError> {
    self.types.clear();
    self.resolution_order.clear();

    let mut seen = HashSet::new();
    for descriptor in &self.descriptors {
      if !seen.insert(descriptor.name.as_str()) {
        return Err(ResolutionError::DuplicateType(descriptor.name.clone()));
      }
    }

    let mut types = BTreeMap::new();
    for descriptor in &self.descriptors {
      let resolved = resolve_descriptor(descriptor, &seen)?;
      types.insert(resolved.name.clone(), resolved);
    }
    self.types = types;

    for descriptor in &self.descriptors {
      let resolved = &self.types[&descriptor.name];
      self.validate_formats(resolved)?;
      self.validate_tag_rules(resolved)?;
      self.validate_constraints(resolved)?;
      self.validate_xml_modes(resolved)?;
      self.validate_tlv_tags(resolved)?;
    }

    self.resolution_order = self.compute_order();
    Ok(())
  }

  fn validate_formats(&self, resolved: &ResolvedType) -> Result<(), ResolutionError> {
    for format in Format::ALL {
      if !resolved.supports(format) {
        continue;
      }
      for slot in resolved.kind.slots() {
        if let ElementType::Named(target) = &slot.ty {
          if !self.types[target].supports(format) {
            return Err(ResolutionError::FormatNotSupported {
              type_name: resolved.name.clone(),
              slot: slot.name.clone(),
              element_type: target.clone(),
              format: format.name(),
            });
          }
        }
      }
    }
    Ok(())
  }

  fn validate_tag_rules(&self, resolved: &ResolvedType) -> Result<(), ResolutionError> {
    let rules = &resolved.attributes.raw.tag_rules;
    if rules.is_empty() {
      return Ok(());
    }
    if !matches!(resolved.kind, ResolvedTypeKind::Union { .. }) {
      return Err(ResolutionError::TagRulesOnNonUnion { type_name: resolved.name.clone() });
    }

    for (index, rule) in rules.iter().enumerate() {
      let (_, alternative) = resolved.slot(&rule.alternative).ok_or_else(|| ResolutionError::TagRuleUnknownAlternative {
        type_name: resolved.name.clone(),
        rule: index,
        alternative: rule.alternative.clone(),
      })?;
      if rule.conditions.is_empty() {
        return Err(ResolutionError::TagRuleWithoutConditions { type_name: resolved.name.clone(), rule: index });
      }
      for condition in &rule.conditions {
        let bad_field = |reason: String| ResolutionError::TagRuleBadField {
          type_name: resolved.name.clone(),
          rule: index,
          path: condition.field.join("."),
          reason,
        };
        let path = self.walk_field_path(alternative, &condition.field).map_err(bad_field)?;
        for value in &condition.values {
          if !rule_value_fits(path.leaf.prim_type, value) {
            return Err(bad_field(format!(
              "is a {} and cannot be compared with {}",
              path.leaf.prim_type.keyword(),
              value
            )));
          }
        }
      }
    }
    Ok(())
  }

  fn validate_constraints(&self, resolved: &ResolvedType) -> Result<(), ResolutionError> {
    let ResolvedTypeKind::Record { constraints, .. } = &resolved.kind else {
      return Ok(());
    };

    for constraint in constraints {
      let invalid = |reason: String| ResolutionError::InvalidConstraint {
        type_name: resolved.name.clone(),
        field: constraint.field.clone(),
        reason,
      };
      let (_, field) = resolved.slot(&constraint.field).ok_or_else(|| invalid("no such field".to_string()))?;
      let alternatives = match &field.ty {
        ElementType::Named(target) => match &self.types[target].kind {
          ResolvedTypeKind::Union { alternatives, open_type: true } => alternatives,
          _ => return Err(invalid(format!("'{}' is not an open type", target))),
        },
        ElementType::Primitive(_) => return Err(invalid("field is a primitive, not an open type".to_string())),
      };

      let mut key_types = Vec::with_capacity(constraint.keys.len());
      for key in &constraint.keys {
        let (_, key_field) = resolved
          .slot(key)
          .ok_or_else(|| invalid(format!("key '{}' is not a sibling field", key)))?;
        match &key_field.ty {
          ElementType::Primitive(spec) => key_types.push(spec.prim_type),
          ElementType::Named(_) => return Err(invalid(format!("key '{}' is not a primitive field", key))),
        }
      }

      for row in &constraint.table {
        if row.values.len() != key_types.len() {
          return Err(invalid(format!(
            "row for '{}' has {} values but {} keys are declared",
            row.alternative,
            row.values.len(),
            key_types.len()
          )));
        }
        if let Some((value, prim)) = row.values.iter().zip(&key_types).find(|(value, prim)| !rule_value_fits(**prim, value)) {
          return Err(invalid(format!("value {} does not fit key of type {}", value, prim.keyword())));
        }
        if !alternatives.iter().any(|alt| alt.name == row.alternative) {
          return Err(invalid(format!("row names unknown alternative '{}'", row.alternative)));
        }
      }
    }
    Ok(())
  }

  fn validate_xml_modes(&self, resolved: &ResolvedType) -> Result<(), ResolutionError> {
    let Some(element) = resolved.kind.sequence_element() else {
      return Ok(());
    };
    let xml = &resolved.attributes.xml;
    let mode = if xml.attribute {
      "attribute"
    } else if xml.list {
      "list"
    } else {
      return Ok(());
    };
    match element.ty {
      ElementType::Primitive(_) => Ok(()),
      ElementType::Named(_) => Err(ResolutionError::XmlModeNeedsPrimitive { type_name: resolved.name.clone(), mode }),
    }
  }

  fn validate_tlv_tags(&self, resolved: &ResolvedType) -> Result<(), ResolutionError> {
    if let (ResolvedTypeKind::Union { .. }, Some(tag)) = (&resolved.kind, &resolved.attributes.tlv.tag) {
      if tag.implicit {
        return Err(ResolutionError::ImplicitTagOnUnion { type_name: resolved.name.clone() });
      }
    }
    for slot in resolved.kind.slots() {
      let (Some(tag), ElementType::Named(target)) = (&slot.tlv_tag, &slot.ty) else {
        continue;
      };
      let target = &self.types[target];
      if tag.implicit && matches!(target.kind, ResolvedTypeKind::Union { .. }) && target.attributes.tlv.tag.is_none() {
        return Err(ResolutionError::ImplicitTagOnUnion { type_name: format!("{}.{}", resolved.name, slot.name) });
      }
    }
    Ok(())
  }

  /* Walk a record field path starting at an alternative slot */
  pub fn walk_field_path<'a>(&'a self, start: &'a ResolvedElement, path: &[String]) -> Result<FieldPath<'a>, String> {
    let mut steps = Vec::new();
    let mut current = &start.ty;
    for segment in path {
      let ElementType::Named(name) = current else {
        return Err(format!("descends into primitive before '{}'", segment));
      };
      let record = &self.types[name];
      let ResolvedTypeKind::Record { fields, .. } = &record.kind else {
        return Err(format!("descends into '{}' which is not a record", name));
      };
      let index = fields
        .iter()
        .position(|field| &field.name == segment)
        .ok_or_else(|| format!("does not name a field of '{}'", name))?;
      steps.push((record, index));
      current = &fields[index].ty;
    }
    match current {
      ElementType::Primitive(leaf) => Ok(FieldPath { steps, leaf }),
      ElementType::Named(name) => Err(format!("ends at '{}' which is not a primitive", name)),
    }
  }

  /* Referenced types before their referrers; recursion is broken by declaration order */
  fn compute_order(&self) -> Vec<String> {
    let mut order = Vec::with_capacity(self.descriptors.len());
    let mut visited = HashSet::new();
    for descriptor in &self.descriptors {
      self.visit(&descriptor.name, &mut visited, &mut order);
    }
    order
  }

  fn visit(&self, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
    if !visited.insert(name.to_string()) {
      return;
    }
    for slot in self.types[name].kind.slots() {
      if let ElementType::Named(target) = &slot.ty {
        self.visit(target, visited, order);
      }
    }
    order.push(name.to_string());
  }
}

fn rule_value_fits(prim_type: PrimitiveType, value: &RuleValue) -> bool {
  matches!(
    (prim_type, value),
    (PrimitiveType::Integer, RuleValue::Integer(_))
      | (PrimitiveType::Boolean, RuleValue::Boolean(_))
      | (PrimitiveType::Charstring, RuleValue::Text(_))
      | (PrimitiveType::Octetstring, RuleValue::Text(_))
  )
}

fn resolve_descriptor(descriptor: &TypeDescriptor, known: &HashSet<&str>) -> Result<ResolvedType, ResolutionError> {
  let type_name = &descriptor.name;
  let mut names = HashSet::new();
  let mut resolve_slots = |slots: &[structgen_types::ElementOrField]| -> Result<Vec<ResolvedElement>, ResolutionError> {
    slots
      .iter()
      .map(|slot| {
        if !names.insert(slot.name.clone()) {
          return Err(ResolutionError::DuplicateSlot { type_name: type_name.clone(), slot: slot.name.clone() });
        }
        let ty = match &slot.field_type {
          FieldType::Primitive(spec) => ElementType::Primitive(spec.clone()),
          FieldType::TypeRef(type_ref) => {
            if !known.contains(type_ref.name.as_str()) {
              return Err(ResolutionError::UnknownType {
                type_name: type_name.clone(),
                slot: slot.name.clone(),
                reference: type_ref.name.clone(),
              });
            }
            ElementType::Named(type_ref.name.clone())
          }
        };
        Ok(ResolvedElement {
          name: slot.name.clone(),
          display_name: slot.display_name().to_string(),
          ty,
          optional: slot.optional,
          tlv_tag: slot.tlv_tag,
          json: slot.json.clone(),
        })
      })
      .collect()
  };

  let kind = match &descriptor.kind {
    TypeKind::RecordOf(seq) => {
      let element = resolve_slots(std::slice::from_ref(&seq.element))?.remove(0);
      ResolvedTypeKind::RecordOf { element }
    }
    TypeKind::SetOf(seq) => {
      let element = resolve_slots(std::slice::from_ref(&seq.element))?.remove(0);
      ResolvedTypeKind::SetOf { element }
    }
    TypeKind::Union(union) => {
      if union.alternatives.is_empty() {
        return Err(ResolutionError::EmptyUnion(type_name.clone()));
      }
      ResolvedTypeKind::Union { alternatives: resolve_slots(&union.alternatives)?, open_type: union.open_type }
    }
    TypeKind::Record(record) => ResolvedTypeKind::Record {
      fields: resolve_slots(&record.fields)?,
      constraints: record.constraints.clone(),
    },
  };

  Ok(ResolvedType {
    name: type_name.clone(),
    display_name: descriptor.display_name().to_string(),
    abstract_notation: descriptor.from_abstract_notation,
    encodings: descriptor.encodings,
    kind,
    attributes: descriptor.attributes.clone(),
  })
}
