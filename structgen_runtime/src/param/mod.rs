/* External parameter trees and their ingestion into templates */

mod parser;

pub use parser::parse_param;

use crate::errors::SemanticError;
use crate::registry::Registry;
use crate::sequence::{slots_for_index, MAX_ELEMENTS};
use crate::template::{LengthRestriction, RecordTemplate, Selection, SequenceTemplate, Specific, Template, UnionTemplate};
use std::fmt;
use structgen_gen::codegen::shared::plan::TypePlan;
use structgen_gen::schema::{ElementType, ResolvedElement, ResolvedTypeKind};
use structgen_types::{PrimitiveSpec, PrimitiveType};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamId {
    Name(String),
    Index(usize),
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::Name(name) => write!(f, ".{}", name),
            ParamId::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// One node of a parameter tree: an optional path into the target, the
/// value shape and its modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    pub path: Vec<ParamId>,
    pub value: ParamValue,
    pub if_present: bool,
    pub length: Option<LengthRestriction>,
}

impl ParamNode {
    pub fn new(value: ParamValue) -> Self {
        Self {
            path: Vec::new(),
            value,
            if_present: false,
            length: None,
        }
    }

    pub fn at(mut self, path: Vec<ParamId>) -> Self {
        self.path = path;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Omit,
    Any,
    AnyOrOmit,
    Integer(i64),
    Boolean(bool),
    Charstring(String),
    Octetstring(Vec<u8>),
    /* `{a, -, permutation(b, c)}` */
    ValueList(Vec<ParamItem>),
    /* `{[0] := a, [3] := b}` */
    IndexedList(Vec<(usize, ParamNode)>),
    /* `{name := a}` */
    AssignmentList(Vec<(String, ParamNode)>),
    /* `(a, b)` */
    TemplateList(Vec<ParamNode>),
    Complement(Vec<ParamNode>),
    Superset(Vec<ParamNode>),
    Subset(Vec<ParamNode>),
}

impl ParamValue {
    fn describe(&self) -> &'static str {
        match self {
            ParamValue::Omit => "omit",
            ParamValue::Any => "?",
            ParamValue::AnyOrOmit => "*",
            ParamValue::Integer(_) => "an integer",
            ParamValue::Boolean(_) => "a boolean",
            ParamValue::Charstring(_) => "a charstring",
            ParamValue::Octetstring(_) => "an octetstring",
            ParamValue::ValueList(_) => "a value list",
            ParamValue::IndexedList(_) => "an indexed list",
            ParamValue::AssignmentList(_) => "an assignment list",
            ParamValue::TemplateList(_) => "a template list",
            ParamValue::Complement(_) => "a complemented list",
            ParamValue::Superset(_) => "superset",
            ParamValue::Subset(_) => "subset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamItem {
    Node(ParamNode),
    /* `-` keeps whatever the position already holds */
    NotUsed,
    Permutation(Vec<ParamNode>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("type '{type_name}' has no alternative or field named '{name}'")]
    UnknownName { type_name: String, name: String },

    #[error("{shape} cannot be assigned to a template of type '{type_name}'")]
    Incompatible { type_name: String, shape: String },

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
}

type ParamResult<T> = Result<T, ParamError>;

/* What a template position holds */
#[derive(Clone, Copy)]
enum Target<'a> {
    Plan(&'a TypePlan),
    Primitive(&'a PrimitiveSpec),
}

impl Target<'_> {
    fn name(&self) -> &str {
        match self {
            Target::Plan(plan) => &plan.type_name,
            Target::Primitive(spec) => spec.prim_type.keyword(),
        }
    }

    fn incompatible(&self, shape: impl Into<String>) -> ParamError {
        ParamError::Incompatible {
            type_name: self.name().to_string(),
            shape: shape.into(),
        }
    }
}

fn slot_target<'a>(registry: &'a Registry, slot: &'a ResolvedElement) -> ParamResult<Target<'a>> {
    Ok(match &slot.ty {
        ElementType::Primitive(spec) => Target::Primitive(spec),
        ElementType::Named(name) => Target::Plan(registry.plan(name)?),
    })
}

/* Extend `items` with uninitialized templates until `index` is valid */
fn grow_to_index(plan: &TypePlan, items: &mut Vec<Template>, index: usize) -> ParamResult<()> {
    let len = slots_for_index(index).ok_or_else(|| SemanticError::SizeLimit {
        type_name: plan.type_name.clone(),
        requested: index.saturating_add(1),
        limit: MAX_ELEMENTS,
    })?;
    if items.len() < len {
        items.resize(len, Template::default());
    }
    Ok(())
}

fn unknown_name(plan: &TypePlan, name: &str) -> ParamError {
    ParamError::UnknownName {
        type_name: plan.type_name.clone(),
        name: name.to_string(),
    }
}

impl Template {
    /// Apply a parameter tree node to this template of type `type_name`.
    pub fn set_param(&mut self, registry: &Registry, type_name: &str, node: &ParamNode) -> ParamResult<()> {
        let plan = registry.plan(type_name)?;
        self.apply(registry, Target::Plan(plan), &node.path, node)
    }

    fn apply(&mut self, registry: &Registry, target: Target<'_>, path: &[ParamId], node: &ParamNode) -> ParamResult<()> {
        if let Some((first, rest)) = path.split_first() {
            return self.descend(registry, target, first, rest, node);
        }
        let mut template = build(registry, target, node, self)?;
        template.if_present = node.if_present;
        template.length = node.length;
        *self = template;
        Ok(())
    }

    fn descend(
        &mut self,
        registry: &Registry,
        target: Target<'_>,
        id: &ParamId,
        rest: &[ParamId],
        node: &ParamNode,
    ) -> ParamResult<()> {
        let Target::Plan(plan) = target else {
            return Err(target.incompatible(format!("a reference to '{}'", id)));
        };
        match (&plan.kind, id) {
            (ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element }, ParamId::Index(index)) => {
                let slot = slot_target(registry, element)?;
                self.with_sequence(registry, plan, |items| {
                    grow_to_index(plan, items, *index)?;
                    items[*index].apply(registry, slot, rest, node)
                })
            }
            (ResolvedTypeKind::Union { alternatives, .. }, ParamId::Name(name)) => {
                let alternative = alternatives
                    .iter()
                    .position(|alt| &alt.name == name)
                    .ok_or_else(|| unknown_name(plan, name))?;
                let slot = slot_target(registry, &alternatives[alternative])?;
                self.with_union(registry, plan, alternative, |inner| inner.apply(registry, slot, rest, node))
            }
            (ResolvedTypeKind::Record { fields, .. }, ParamId::Name(name)) => {
                let field = fields
                    .iter()
                    .position(|field| &field.name == name)
                    .ok_or_else(|| unknown_name(plan, name))?;
                let slot = slot_target(registry, &fields[field])?;
                self.with_record(registry, plan, |fields| fields[field].apply(registry, slot, rest, node))
            }
            _ => Err(target.incompatible(format!("a reference to '{}'", id))),
        }
    }

    /* Run `f` on the items of this template as a specific record-of/set-of,
     * converting it first if it holds anything else */
    fn with_sequence<R>(
        &mut self,
        registry: &Registry,
        plan: &TypePlan,
        f: impl FnOnce(&mut Vec<Template>) -> R,
    ) -> R {
        let mut sequence = match std::mem::replace(&mut self.selection, Selection::Uninitialized) {
            Selection::Specific(Specific::Sequence(sequence)) => sequence,
            _ => {
                self.reset_modifiers();
                SequenceTemplate {
                    shape: registry.seq_shape(plan),
                    items: Vec::new(),
                    permutations: Vec::new(),
                }
            }
        };
        let result = f(&mut sequence.items);
        self.selection = Selection::Specific(Specific::Sequence(sequence));
        result
    }

    fn with_union<R>(
        &mut self,
        registry: &Registry,
        plan: &TypePlan,
        alternative: usize,
        f: impl FnOnce(&mut Template) -> R,
    ) -> R {
        let mut union = match std::mem::replace(&mut self.selection, Selection::Uninitialized) {
            Selection::Specific(Specific::Union(union)) if union.alternative == alternative => union,
            _ => {
                self.reset_modifiers();
                UnionTemplate {
                    shape: registry.union_shape(plan),
                    alternative,
                    template: Box::default(),
                }
            }
        };
        let result = f(&mut union.template);
        self.selection = Selection::Specific(Specific::Union(union));
        result
    }

    fn with_record<R>(
        &mut self,
        registry: &Registry,
        plan: &TypePlan,
        f: impl FnOnce(&mut Vec<Template>) -> R,
    ) -> R {
        let mut record = match std::mem::replace(&mut self.selection, Selection::Uninitialized) {
            Selection::Specific(Specific::Record(record)) => record,
            _ => {
                self.reset_modifiers();
                RecordTemplate {
                    shape: registry.record_shape(plan),
                    fields: vec![Template::default(); plan.kind.slots().len()],
                }
            }
        };
        let result = f(&mut record.fields);
        self.selection = Selection::Specific(Specific::Record(record));
        result
    }

    fn reset_modifiers(&mut self) {
        self.if_present = false;
        self.length = None;
    }
}

/* Fresh template for a node without a path; `existing` supplies positions a
 * value list leaves unused and the base of an indexed list */
fn build(registry: &Registry, target: Target<'_>, node: &ParamNode, existing: &Template) -> ParamResult<Template> {
    let value = &node.value;
    match value {
        ParamValue::Omit => Ok(Template::omit()),
        ParamValue::Any => Ok(Template::any()),
        ParamValue::AnyOrOmit => Ok(Template::any_or_omit()),
        ParamValue::Integer(v) => literal(target, PrimitiveType::Integer, value, Specific::Integer(*v)),
        ParamValue::Boolean(v) => literal(target, PrimitiveType::Boolean, value, Specific::Boolean(*v)),
        ParamValue::Charstring(v) => literal(target, PrimitiveType::Charstring, value, Specific::Charstring(v.clone())),
        ParamValue::Octetstring(v) => literal(target, PrimitiveType::Octetstring, value, Specific::Octetstring(v.clone())),
        ParamValue::TemplateList(nodes) => Ok(Template::value_list(build_all(registry, target, nodes)?)),
        ParamValue::Complement(nodes) => Ok(Template::complement(build_all(registry, target, nodes)?)),
        ParamValue::Superset(nodes) | ParamValue::Subset(nodes) => {
            let plan = match target {
                Target::Plan(plan) if plan.template.superset_subset => plan,
                _ => return Err(target.incompatible(value.describe())),
            };
            let element = element_target(registry, plan)?;
            let items = build_all(registry, element, nodes)?;
            Ok(match value {
                ParamValue::Superset(_) => Template::superset(items),
                _ => Template::subset(items),
            })
        }
        ParamValue::ValueList(items) => build_value_list(registry, target, value, items, existing),
        ParamValue::IndexedList(entries) => {
            let Target::Plan(plan) = target else {
                return Err(target.incompatible(value.describe()));
            };
            let element = match &plan.kind {
                ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => element,
                _ => return Err(target.incompatible(value.describe())),
            };
            let element = slot_target(registry, element)?;
            let mut template = existing.clone();
            template.with_sequence(registry, plan, |items| {
                for (index, entry) in entries {
                    grow_to_index(plan, items, *index)?;
                    items[*index].apply(registry, element, &entry.path, entry)?;
                }
                Ok::<_, ParamError>(())
            })?;
            Ok(template)
        }
        ParamValue::AssignmentList(entries) => {
            let Target::Plan(plan) = target else {
                return Err(target.incompatible(value.describe()));
            };
            match &plan.kind {
                ResolvedTypeKind::Union { .. } => {
                    let [(name, entry)] = entries.as_slice() else {
                        return Err(target.incompatible("an assignment list naming several alternatives"));
                    };
                    let mut template = existing.clone();
                    template.descend(registry, target, &ParamId::Name(name.clone()), &entry.path, entry)?;
                    Ok(template)
                }
                ResolvedTypeKind::Record { .. } => {
                    let mut template = existing.clone();
                    for (name, entry) in entries {
                        template.descend(registry, target, &ParamId::Name(name.clone()), &entry.path, entry)?;
                    }
                    Ok(template)
                }
                _ => Err(target.incompatible(value.describe())),
            }
        }
    }
}

fn build_all(registry: &Registry, target: Target<'_>, nodes: &[ParamNode]) -> ParamResult<Vec<Template>> {
    nodes
        .iter()
        .map(|node| {
            let mut template = Template::default();
            template.apply(registry, target, &node.path, node)?;
            Ok(template)
        })
        .collect()
}

fn literal(target: Target<'_>, expected: PrimitiveType, value: &ParamValue, specific: Specific) -> ParamResult<Template> {
    match target {
        Target::Primitive(spec) if spec.prim_type == expected => Ok(Template::specific(specific)),
        _ => Err(target.incompatible(value.describe())),
    }
}

fn element_target<'a>(registry: &'a Registry, plan: &'a TypePlan) -> ParamResult<Target<'a>> {
    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => slot_target(registry, element),
        _ => Err(Target::Plan(plan).incompatible("an element list")),
    }
}

/* Positional list: elements of a record-of/set-of or fields of a record */
fn build_value_list(
    registry: &Registry,
    target: Target<'_>,
    value: &ParamValue,
    items: &[ParamItem],
    existing: &Template,
) -> ParamResult<Template> {
    let Target::Plan(plan) = target else {
        return Err(target.incompatible(value.describe()));
    };

    match &plan.kind {
        ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
            let element = slot_target(registry, element)?;
            let previous: &[Template] = match &existing.selection {
                Selection::Specific(Specific::Sequence(sequence)) => &sequence.items,
                _ => &[],
            };
            let mut built = Vec::with_capacity(items.len());
            let mut permutations = Vec::new();
            for item in items {
                let position = built.len();
                match item {
                    ParamItem::NotUsed => built.push(previous.get(position).cloned().unwrap_or_default()),
                    ParamItem::Node(node) => {
                        let mut template = previous.get(position).cloned().unwrap_or_default();
                        template.apply(registry, element, &node.path, node)?;
                        built.push(template);
                    }
                    ParamItem::Permutation(nodes) => {
                        if !plan.template.permutation {
                            return Err(target.incompatible("permutation"));
                        }
                        built.extend(build_all(registry, element, nodes)?);
                        permutations.push(position..built.len());
                    }
                }
            }
            Ok(Template::specific(Specific::Sequence(SequenceTemplate {
                shape: registry.seq_shape(plan),
                items: built,
                permutations,
            })))
        }
        ResolvedTypeKind::Record { fields, .. } => {
            if items.len() != fields.len() {
                return Err(target.incompatible(format!("a value list of {} items", items.len())));
            }
            let mut template = existing.clone();
            template.with_record(registry, plan, |slots| {
                for ((item, field), slot) in items.iter().zip(fields).zip(slots.iter_mut()) {
                    match item {
                        ParamItem::NotUsed => {}
                        ParamItem::Node(node) => slot.apply(registry, slot_target(registry, field)?, &node.path, node)?,
                        ParamItem::Permutation(_) => return Err(target.incompatible("permutation")),
                    }
                }
                Ok(())
            })?;
            Ok(template)
        }
        ResolvedTypeKind::Union { .. } => Err(target.incompatible(value.describe())),
    }
}
