/* Matching templates
 *
 * A template is a selection plus the optional `ifpresent` and length
 * modifiers. The selection only changes through explicit assignment. */

use crate::errors::{SemanticError, SemanticResult};
use crate::matching::{match_ordered, match_subset, match_superset, match_unordered};
use crate::record::{RecordShape, RecordValue};
use crate::sequence::{SeqShape, SeqValue};
use crate::union::{UnionShape, UnionValue};
use crate::value::{Element, Value};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRestriction {
    Exact(usize),
    /* `max: None` is `infinity` */
    Range { min: usize, max: Option<usize> },
}

impl LengthRestriction {
    pub fn admits(&self, length: usize) -> bool {
        match *self {
            LengthRestriction::Exact(exact) => length == exact,
            LengthRestriction::Range { min, max } => length >= min && max.map_or(true, |max| length <= max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Uninitialized,
    Omit,
    AnyValue,
    AnyOrOmit,
    Specific(Specific),
    ValueList(Vec<Template>),
    ComplementedList(Vec<Template>),
    /* set-of only */
    Superset(Vec<Template>),
    Subset(Vec<Template>),
}

impl Selection {
    pub fn name(&self) -> &'static str {
        match self {
            Selection::Uninitialized => "an uninitialized template",
            Selection::Omit => "omit",
            Selection::AnyValue => "?",
            Selection::AnyOrOmit => "*",
            Selection::Specific(_) => "a specific value",
            Selection::ValueList(_) => "a value list",
            Selection::ComplementedList(_) => "a complemented list",
            Selection::Superset(_) => "superset",
            Selection::Subset(_) => "subset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Specific {
    Integer(i64),
    Boolean(bool),
    Charstring(String),
    Octetstring(Vec<u8>),
    Sequence(SequenceTemplate),
    Union(UnionTemplate),
    Record(RecordTemplate),
}

/// Per-element templates of a record-of/set-of. Permutation groups are
/// contiguous, non-overlapping item ranges (record-of only).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceTemplate {
    pub shape: SeqShape,
    pub items: Vec<Template>,
    pub permutations: Vec<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionTemplate {
    pub shape: UnionShape,
    pub alternative: usize,
    pub template: Box<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordTemplate {
    pub shape: RecordShape,
    pub fields: Vec<Template>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub selection: Selection,
    pub if_present: bool,
    pub length: Option<LengthRestriction>,
}

impl Default for Template {
    fn default() -> Self {
        Self::from_selection(Selection::Uninitialized)
    }
}

impl Template {
    pub fn from_selection(selection: Selection) -> Self {
        Self {
            selection,
            if_present: false,
            length: None,
        }
    }

    pub fn omit() -> Self {
        Self::from_selection(Selection::Omit)
    }

    pub fn any() -> Self {
        Self::from_selection(Selection::AnyValue)
    }

    pub fn any_or_omit() -> Self {
        Self::from_selection(Selection::AnyOrOmit)
    }

    pub fn specific(specific: Specific) -> Self {
        Self::from_selection(Selection::Specific(specific))
    }

    pub fn value_list(items: Vec<Template>) -> Self {
        Self::from_selection(Selection::ValueList(items))
    }

    pub fn complement(items: Vec<Template>) -> Self {
        Self::from_selection(Selection::ComplementedList(items))
    }

    pub fn superset(items: Vec<Template>) -> Self {
        Self::from_selection(Selection::Superset(items))
    }

    pub fn subset(items: Vec<Template>) -> Self {
        Self::from_selection(Selection::Subset(items))
    }

    pub fn sequence(shape: SeqShape, items: Vec<Template>) -> Self {
        Self::specific(Specific::Sequence(SequenceTemplate {
            shape,
            items,
            permutations: Vec::new(),
        }))
    }

    pub fn with_if_present(mut self) -> Self {
        self.if_present = true;
        self
    }

    pub fn with_length(mut self, length: LengthRestriction) -> Self {
        self.length = Some(length);
        self
    }

    /// Specific template matching exactly the given value.
    pub fn from_value(value: &Value) -> Self {
        let specific = match value {
            Value::Integer(v) => Specific::Integer(*v),
            Value::Boolean(v) => Specific::Boolean(*v),
            Value::Charstring(v) => Specific::Charstring(v.clone()),
            Value::Octetstring(v) => Specific::Octetstring(v.clone()),
            Value::Seq(seq) => match seq.elements() {
                Some(elements) => Specific::Sequence(SequenceTemplate {
                    shape: seq.shape().clone(),
                    items: elements.iter().map(Template::from_element).collect(),
                    permutations: Vec::new(),
                }),
                None => return Self::default(),
            },
            Value::Union(union) => match union.selection() {
                Some((alternative, inner)) => Specific::Union(UnionTemplate {
                    shape: union.shape().clone(),
                    alternative,
                    template: Box::new(Template::from_value(inner)),
                }),
                None => return Self::default(),
            },
            Value::Record(record) => match record.fields() {
                Some(fields) => Specific::Record(RecordTemplate {
                    shape: record.shape().clone(),
                    fields: fields
                        .iter()
                        .map(|field| match field {
                            Some(value) => Template::from_value(value),
                            None => Template::omit(),
                        })
                        .collect(),
                }),
                None => return Self::default(),
            },
        };
        Self::specific(specific)
    }

    fn from_element(element: &Element) -> Self {
        match element {
            Some(value) => Self::from_value(value),
            None => Self::default(),
        }
    }

    /* `*` inside a list matches any number of elements */
    pub fn is_star(&self) -> bool {
        matches!(self.selection, Selection::AnyOrOmit) && self.length.is_none()
    }

    /// Match against a slot that may be unbound or omitted.
    pub fn matches_element(&self, element: &Element) -> bool {
        match element {
            Some(value) => self.matches(value),
            None => {
                self.if_present
                    || match &self.selection {
                        Selection::Omit | Selection::AnyOrOmit => true,
                        Selection::ValueList(items) => items.iter().any(|item| item.matches_element(&None)),
                        Selection::ComplementedList(items) => !items.iter().any(|item| item.matches_element(&None)),
                        _ => false,
                    }
            }
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        if !value.is_bound() {
            return false;
        }
        if let (Some(length), Some(actual)) = (&self.length, value_length(value)) {
            if !length.admits(actual) {
                return false;
            }
        }
        match &self.selection {
            Selection::Uninitialized | Selection::Omit => false,
            Selection::AnyValue | Selection::AnyOrOmit => true,
            Selection::Specific(specific) => specific.matches(value),
            Selection::ValueList(items) => items.iter().any(|item| item.matches(value)),
            Selection::ComplementedList(items) => !items.iter().any(|item| item.matches(value)),
            Selection::Superset(items) => match set_elements(value) {
                Some(elements) => match_superset(items, elements, Template::matches_element),
                None => false,
            },
            Selection::Subset(items) => match set_elements(value) {
                Some(elements) => match_subset(items, elements, Template::matches_element),
                None => false,
            },
        }
    }

    /// Concrete value of a fully specific template.
    pub fn valueof(&self) -> SemanticResult<Value> {
        match &self.selection {
            Selection::Specific(specific) => specific.valueof(),
            other => Err(SemanticError::NotSpecific {
                selection: other.name().to_string(),
                operation: "valueof",
            }),
        }
    }

    pub fn is_value(&self) -> bool {
        self.valueof().is_ok()
    }
}

impl Specific {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Specific::Integer(a), Value::Integer(b)) => a == b,
            (Specific::Boolean(a), Value::Boolean(b)) => a == b,
            (Specific::Charstring(a), Value::Charstring(b)) => a == b,
            (Specific::Octetstring(a), Value::Octetstring(b)) => a == b,
            (Specific::Sequence(template), Value::Seq(seq)) => {
                let Some(elements) = seq.elements() else {
                    return false;
                };
                if template.shape.set_of {
                    match_unordered(&template.items, elements, Template::is_star, Template::matches_element)
                } else {
                    match_ordered(
                        &template.items,
                        &template.permutations,
                        elements,
                        Template::is_star,
                        Template::matches_element,
                    )
                }
            }
            (Specific::Union(template), Value::Union(union)) => match union.selection() {
                Some((alternative, inner)) => alternative == template.alternative && template.template.matches(inner),
                None => false,
            },
            (Specific::Record(template), Value::Record(record)) => match record.fields() {
                Some(fields) => template
                    .fields
                    .iter()
                    .zip(fields)
                    .all(|(field_template, field)| field_template.matches_element(field)),
                None => false,
            },
            _ => false,
        }
    }

    fn valueof(&self) -> SemanticResult<Value> {
        Ok(match self {
            Specific::Integer(v) => Value::Integer(*v),
            Specific::Boolean(v) => Value::Boolean(*v),
            Specific::Charstring(v) => Value::Charstring(v.clone()),
            Specific::Octetstring(v) => Value::Octetstring(v.clone()),
            Specific::Sequence(template) => {
                if !template.permutations.is_empty() {
                    return Err(SemanticError::NotSpecific {
                        selection: "a permutation".to_string(),
                        operation: "valueof",
                    });
                }
                let elements = template
                    .items
                    .iter()
                    .map(|item| item.valueof().map(Some))
                    .collect::<SemanticResult<Vec<_>>>()?;
                Value::Seq(SeqValue::with_elements(template.shape.clone(), elements))
            }
            Specific::Union(template) => {
                let mut union = UnionValue::unbound(template.shape.clone());
                *union.field_mut_at(template.alternative) = Some(template.template.valueof()?);
                Value::Union(union)
            }
            Specific::Record(template) => {
                let fields = template
                    .fields
                    .iter()
                    .map(|field| match field.selection {
                        Selection::Omit => Ok(None),
                        _ => field.valueof().map(Some),
                    })
                    .collect::<SemanticResult<Vec<_>>>()?;
                Value::Record(RecordValue::with_fields(template.shape.clone(), fields))
            }
        })
    }
}

/* Length a restriction applies to; scalars have none */
fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::Charstring(v) => Some(v.chars().count()),
        Value::Octetstring(v) => Some(v.len()),
        Value::Seq(seq) => seq.elements().map(<[Element]>::len),
        Value::Integer(_) | Value::Boolean(_) | Value::Union(_) | Value::Record(_) => None,
    }
}

fn set_elements(value: &Value) -> Option<&[Element]> {
    match value {
        Value::Seq(seq) if seq.is_set_of() => seq.elements(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use structgen_gen::codegen::shared::plan::Representation;

    fn ints(set_of: bool, values: &[i64]) -> Value {
        let shape = SeqShape::new("Ints", set_of, Representation::Shared);
        Value::Seq(SeqValue::with_elements(shape, values.iter().map(|v| Some(Value::Integer(*v))).collect()))
    }

    fn int(v: i64) -> Template {
        Template::specific(Specific::Integer(v))
    }

    #[test]
    fn length_is_checked_before_elements() {
        let template = Template::any().with_length(LengthRestriction::Range { min: 1, max: Some(2) });
        assert!(template.matches(&ints(false, &[1, 2])));
        assert!(!template.matches(&ints(false, &[1, 2, 3])));
        assert!(!template.matches(&ints(false, &[])));
    }

    #[test]
    fn omitted_slots_need_omit_or_ifpresent() {
        assert!(Template::omit().matches_element(&None));
        assert!(Template::any_or_omit().matches_element(&None));
        assert!(!Template::any().matches_element(&None));
        assert!(int(1).with_if_present().matches_element(&None));
        assert!(!Template::omit().matches(&Value::Integer(1)));
    }

    #[test]
    fn superset_and_subset_on_set_of() {
        let value = ints(true, &[3, 1, 2]);
        assert!(Template::superset(vec![int(1), int(2)]).matches(&value));
        assert!(!Template::superset(vec![int(1), int(4)]).matches(&value));
        assert!(Template::subset(vec![int(1), int(2), int(3), int(4)]).matches(&value));
        assert!(!Template::subset(vec![int(1), int(2)]).matches(&value));
        assert!(!Template::superset(vec![int(1)]).matches(&ints(false, &[1])));
    }

    #[test]
    fn valueof_requires_specific_template() {
        let shape = SeqShape::new("Ints", false, Representation::Shared);
        let template = Template::sequence(shape.clone(), vec![int(1), int(2)]);
        assert_eq!(template.valueof().unwrap(), ints(false, &[1, 2]));

        let wild = Template::sequence(shape, vec![int(1), Template::any()]);
        assert!(!wild.is_value());
        assert!(matches!(wild.valueof(), Err(SemanticError::NotSpecific { .. })));
    }
}
