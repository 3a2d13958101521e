use super::plan::*;
use crate::codegen::context::GenerationOptions;
use crate::schema::{ElementType, Format, ResolvedElement, ResolvedType, ResolvedTypeKind, TypeResolver};
use std::collections::BTreeSet;
use structgen_types::{JsonCategory, PrimitiveSpec, PrimitiveType, TagClass, TagRule};
use thiserror::Error;
use tracing::debug;

/// Builds codec plans from resolved structured types.
pub struct PlanBuilder<'a> {
    resolver: &'a TypeResolver,
    options: &'a GenerationOptions,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(resolver: &'a TypeResolver, options: &'a GenerationOptions) -> Self {
        Self { resolver, options }
    }

    /// Builds plans for every resolved type in resolution order.
    pub fn build_all(&self) -> Result<PlanSet, PlanBuildError> {
        let mut types = Vec::with_capacity(self.resolver.resolution_order.len());
        for name in &self.resolver.resolution_order {
            let ty = self.lookup(name)?;
            types.push(self.build_type(ty)?);
        }
        Ok(PlanSet::new(types))
    }

    /// Builds the plan for a single resolved type.
    pub fn build_type(&self, ty: &ResolvedType) -> Result<TypePlan, PlanBuildError> {
        let enabled = |format: Format| ty.supports(format) && self.options.emits(format);

        let plan = TypePlan {
            type_name: ty.name.clone(),
            display_name: ty.display_name.clone(),
            abstract_notation: ty.abstract_notation,
            kind: ty.kind.clone(),
            value: ValuePlan {
                representation: self.options.representation,
                keyword: ty.kind.keyword(ty.abstract_notation).to_string(),
            },
            template: TemplatePlan {
                permutation: matches!(ty.kind, ResolvedTypeKind::RecordOf { .. }),
                superset_subset: matches!(ty.kind, ResolvedTypeKind::SetOf { .. }),
                unordered: matches!(ty.kind, ResolvedTypeKind::SetOf { .. }),
            },
            tlv: if enabled(Format::Tlv) { Some(self.build_tlv(ty)?) } else { None },
            raw: if enabled(Format::BitPacked) { Some(self.build_raw(ty)?) } else { None },
            text: if enabled(Format::Text) { Some(build_text(ty)) } else { None },
            xml: if enabled(Format::Xml) { Some(self.build_xml(ty)?) } else { None },
            json: if enabled(Format::Json) { Some(self.build_json(ty)?) } else { None },
        };
        debug!(type_name = %ty.name, "built codec plan");
        Ok(plan)
    }

    fn lookup(&self, name: &str) -> Result<&'a ResolvedType, PlanBuildError> {
        self.resolver
            .get_type_info(name)
            .ok_or_else(|| PlanBuildError::MissingType { type_name: name.to_string() })
    }

    /* ------------------------------------------------------------------ TLV */

    fn build_tlv(&self, ty: &ResolvedType) -> Result<TlvPlan, PlanBuildError> {
        let (base, open_type) = match &ty.kind {
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::Record { .. } => {
                (Some(TlvIdentity::universal(UNIVERSAL_SEQUENCE)), false)
            }
            ResolvedTypeKind::SetOf { .. } => (Some(TlvIdentity::universal(UNIVERSAL_SET)), false),
            ResolvedTypeKind::Union { open_type, .. } => (None, *open_type),
        };

        let mut slots = Vec::with_capacity(ty.kind.slots().len());
        for slot in ty.kind.slots() {
            let mut visiting = BTreeSet::new();
            slots.push(TlvSlotPlan {
                name: slot.name.clone(),
                tag: slot.tlv_tag,
                claims: self.slot_claims(slot, &mut visiting)?,
            });
        }

        /* Open types are selected through their constraint table, so their
         * alternatives may share identities */
        if matches!(ty.kind, ResolvedTypeKind::Union { open_type: false, .. }) {
            for (index, first) in slots.iter().enumerate() {
                for second in &slots[index + 1..] {
                    if let Some(identity) = first.claims.iter().find(|claim| second.claims.contains(claim)) {
                        return Err(PlanBuildError::AmbiguousTlvAlternatives {
                            type_name: ty.name.clone(),
                            first: first.name.clone(),
                            second: second.name.clone(),
                            class: identity.class,
                            number: identity.number,
                        });
                    }
                }
            }
        }

        Ok(TlvPlan {
            own_tag: ty.attributes.tlv.tag,
            base,
            slots,
            sort_set: matches!(ty.kind, ResolvedTypeKind::SetOf { .. }),
            open_type,
        })
    }

    fn slot_claims(
        &self,
        slot: &ResolvedElement,
        visiting: &mut BTreeSet<String>,
    ) -> Result<Vec<TlvIdentity>, PlanBuildError> {
        if let Some(tag) = slot.tlv_tag {
            return Ok(vec![tag.into()]);
        }
        match &slot.ty {
            ElementType::Primitive(spec) => Ok(vec![primitive_identity(spec.prim_type)]),
            ElementType::Named(name) => self.type_claims(name, visiting),
        }
    }

    fn type_claims(&self, name: &str, visiting: &mut BTreeSet<String>) -> Result<Vec<TlvIdentity>, PlanBuildError> {
        let ty = self.lookup(name)?;
        if let Some(tag) = ty.attributes.tlv.tag {
            return Ok(vec![tag.into()]);
        }
        match &ty.kind {
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::Record { .. } => {
                Ok(vec![TlvIdentity::universal(UNIVERSAL_SEQUENCE)])
            }
            ResolvedTypeKind::SetOf { .. } => Ok(vec![TlvIdentity::universal(UNIVERSAL_SET)]),
            ResolvedTypeKind::Union { alternatives, .. } => {
                if !visiting.insert(name.to_string()) {
                    return Ok(Vec::new());
                }
                let mut claims = Vec::new();
                for alternative in alternatives {
                    for claim in self.slot_claims(alternative, visiting)? {
                        if !claims.contains(&claim) {
                            claims.push(claim);
                        }
                    }
                }
                visiting.remove(name);
                Ok(claims)
            }
        }
    }

    /* ----------------------------------------------------------- Bit-packed */

    fn build_raw(&self, ty: &ResolvedType) -> Result<RawPlan, PlanBuildError> {
        let raw = &ty.attributes.raw;
        let mut alternatives = Vec::new();
        if let ResolvedTypeKind::Union { alternatives: slots, .. } = &ty.kind {
            for slot in slots {
                alternatives.push(RawAlternativePlan {
                    name: slot.name.clone(),
                    rule: self.raw_rule(slot, &raw.tag_rules)?,
                });
            }
        }
        Ok(RawPlan {
            static_bits: self.type_bits(&ty.name, &mut BTreeSet::new()),
            count: raw.count,
            extension_bit: raw.extension_bit,
            padding: raw.padding,
            alternatives,
        })
    }

    /* Rules naming the same alternative are merged, all conditions must hold */
    fn raw_rule(&self, slot: &ResolvedElement, rules: &[TagRule]) -> Result<Option<RawRulePlan>, PlanBuildError> {
        let mut conditions = Vec::new();
        for rule in rules.iter().filter(|rule| rule.alternative == slot.name) {
            for condition in &rule.conditions {
                let path = self
                    .resolver
                    .walk_field_path(slot, &condition.field)
                    .map_err(|reason| PlanBuildError::UnresolvedRulePath {
                        alternative: slot.name.clone(),
                        path: condition.field.join("."),
                        reason,
                    })?;

                let mut offset = Some(0u64);
                for (record, index) in &path.steps {
                    let ResolvedTypeKind::Record { fields, .. } = &record.kind else {
                        offset = None;
                        break;
                    };
                    if fields[*index].optional {
                        offset = None;
                        break;
                    }
                    for preceding in &fields[..*index] {
                        let bits = if preceding.optional {
                            None
                        } else {
                            self.element_bits(&preceding.ty, &mut BTreeSet::new())
                        };
                        offset = offset.zip(bits).map(|(acc, bits)| acc + bits);
                    }
                }

                conditions.push(RawConditionPlan {
                    path: condition.field.clone(),
                    field: path.leaf.clone(),
                    bit_offset: offset,
                    values: condition.values.clone(),
                });
            }
        }
        if conditions.is_empty() {
            return Ok(None);
        }
        let static_offsets = conditions.iter().all(|condition| condition.bit_offset.is_some());
        Ok(Some(RawRulePlan {
            conditions,
            static_offsets,
        }))
    }

    fn element_bits(&self, element: &ElementType, visiting: &mut BTreeSet<String>) -> Option<u64> {
        match element {
            ElementType::Primitive(spec) => primitive_bits(spec),
            ElementType::Named(name) => self.type_bits(name, visiting),
        }
    }

    /* Encoded width that does not depend on the value; recursive types have none */
    fn type_bits(&self, name: &str, visiting: &mut BTreeSet<String>) -> Option<u64> {
        let ty = self.resolver.get_type_info(name)?;
        if !visiting.insert(name.to_string()) {
            return None;
        }
        let raw = &ty.attributes.raw;
        let bits = match &ty.kind {
            ResolvedTypeKind::Record { fields, .. } => fields
                .iter()
                .map(|field| {
                    if field.optional {
                        None
                    } else {
                        self.element_bits(&field.ty, visiting)
                    }
                })
                .sum::<Option<u64>>(),
            ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
                match (raw.count, raw.extension_bit) {
                    (Some(count), None) => self.element_bits(&element.ty, visiting).map(|bits| bits * count as u64),
                    _ => None,
                }
            }
            ResolvedTypeKind::Union { alternatives, .. } => {
                let mut widths = alternatives.iter().map(|alt| self.element_bits(&alt.ty, visiting));
                match widths.next().flatten() {
                    Some(first) if widths.all(|width| width == Some(first)) => Some(first),
                    _ => None,
                }
            }
        };
        visiting.remove(name);
        bits.map(|bits| pad_bits(bits, raw.padding))
    }

    /* ------------------------------------------------------------------ XML */

    fn build_xml(&self, ty: &ResolvedType) -> Result<XmlPlan, PlanBuildError> {
        let xml = &ty.attributes.xml;
        let mut alternatives = Vec::new();
        if let ResolvedTypeKind::Union { alternatives: slots, .. } = &ty.kind {
            for slot in slots {
                let mut identities = Vec::new();
                self.xml_identities(slot, &mut BTreeSet::new(), &mut identities)?;
                alternatives.push(XmlAlternativePlan {
                    name: slot.name.clone(),
                    element_name: slot.display_name.clone(),
                    identities,
                });
            }
        }
        Ok(XmlPlan {
            element_name: xml.name.clone().unwrap_or_else(|| ty.display_name.clone()),
            untagged: xml.untagged,
            attribute: xml.attribute,
            list: xml.list,
            use_type: xml.use_type,
            alternatives,
        })
    }

    /* Start-tag names a slot's encoding can begin with, looking through
     * untagged children */
    fn xml_identities(
        &self,
        slot: &ResolvedElement,
        visiting: &mut BTreeSet<String>,
        out: &mut Vec<String>,
    ) -> Result<(), PlanBuildError> {
        let target = match &slot.ty {
            ElementType::Named(name) => self.lookup(name)?,
            ElementType::Primitive(_) => {
                push_unique(out, &slot.display_name);
                return Ok(());
            }
        };
        if !target.attributes.xml.untagged {
            push_unique(out, &slot.display_name);
            return Ok(());
        }
        if !visiting.insert(target.name.clone()) {
            return Ok(());
        }
        match &target.kind {
            ResolvedTypeKind::Union { alternatives, .. } => {
                for alternative in alternatives {
                    self.xml_identities(alternative, visiting, out)?;
                }
            }
            ResolvedTypeKind::RecordOf { element } | ResolvedTypeKind::SetOf { element } => {
                self.xml_identities(element, visiting, out)?;
            }
            ResolvedTypeKind::Record { fields, .. } => match fields.first() {
                Some(first) => self.xml_identities(first, visiting, out)?,
                None => push_unique(out, &slot.display_name),
            },
        }
        visiting.remove(&target.name);
        Ok(())
    }

    /* ----------------------------------------------------------------- JSON */

    fn build_json(&self, ty: &ResolvedType) -> Result<JsonPlan, PlanBuildError> {
        let members = match &ty.kind {
            ResolvedTypeKind::Union { alternatives: slots, .. } | ResolvedTypeKind::Record { fields: slots, .. } => {
                let mut members = Vec::with_capacity(slots.len());
                for slot in slots {
                    let categories = match &slot.json.accepts {
                        Some(accepts) => accepts.iter().copied().collect::<BTreeSet<_>>(),
                        None => self.element_categories(&slot.ty, &mut BTreeSet::new())?,
                    };
                    members.push(JsonMemberPlan {
                        name: slot.name.clone(),
                        key: slot.json.alias.clone().unwrap_or_else(|| slot.name.clone()),
                        categories: categories.into_iter().collect(),
                    });
                }
                members
            }
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } => Vec::new(),
        };
        Ok(JsonPlan {
            as_value: ty.attributes.json.as_value,
            members,
        })
    }

    fn element_categories(
        &self,
        element: &ElementType,
        visiting: &mut BTreeSet<String>,
    ) -> Result<BTreeSet<JsonCategory>, PlanBuildError> {
        let name = match element {
            ElementType::Primitive(spec) => return Ok(BTreeSet::from([primitive_category(spec.prim_type)])),
            ElementType::Named(name) => name,
        };
        let ty = self.lookup(name)?;
        let categories = match &ty.kind {
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } => BTreeSet::from([JsonCategory::Array]),
            ResolvedTypeKind::Record { .. } => BTreeSet::from([JsonCategory::Object]),
            ResolvedTypeKind::Union { alternatives, .. } if ty.attributes.json.as_value => {
                let mut categories = BTreeSet::new();
                if visiting.insert(name.clone()) {
                    for alternative in alternatives {
                        match &alternative.json.accepts {
                            Some(accepts) => categories.extend(accepts.iter().copied()),
                            None => categories.extend(self.element_categories(&alternative.ty, visiting)?),
                        }
                    }
                    visiting.remove(name);
                }
                categories
            }
            ResolvedTypeKind::Union { .. } => BTreeSet::from([JsonCategory::Object]),
        };
        Ok(categories)
    }
}

fn build_text(ty: &ResolvedType) -> TextPlan {
    let text = &ty.attributes.text;
    let default_separator = match ty.kind {
        ResolvedTypeKind::Union { .. } => "",
        _ => ",",
    };
    TextPlan {
        begin: text.begin.clone().unwrap_or_default(),
        separator: text.separator.clone().unwrap_or_else(|| default_separator.to_string()),
        end: text.end.clone().unwrap_or_default(),
    }
}

pub fn primitive_identity(prim_type: PrimitiveType) -> TlvIdentity {
    TlvIdentity::universal(match prim_type {
        PrimitiveType::Integer => UNIVERSAL_INTEGER,
        PrimitiveType::Boolean => UNIVERSAL_BOOLEAN,
        PrimitiveType::Octetstring => UNIVERSAL_OCTET_STRING,
        PrimitiveType::Charstring => UNIVERSAL_UTF8_STRING,
    })
}

/// Bit width of a primitive field, `None` for greedy strings.
pub fn primitive_bits(spec: &PrimitiveSpec) -> Option<u64> {
    match spec.prim_type {
        PrimitiveType::Integer => Some(u64::from(spec.raw.bits.unwrap_or(8))),
        PrimitiveType::Boolean => Some(u64::from(spec.raw.bits.unwrap_or(1))),
        PrimitiveType::Charstring | PrimitiveType::Octetstring => spec.raw.bytes.map(|bytes| u64::from(bytes) * 8),
    }
}

pub fn pad_bits(bits: u64, padding: Option<u32>) -> u64 {
    match padding {
        Some(multiple) if multiple > 1 => bits.div_ceil(u64::from(multiple)) * u64::from(multiple),
        _ => bits,
    }
}

fn primitive_category(prim_type: PrimitiveType) -> JsonCategory {
    match prim_type {
        PrimitiveType::Integer => JsonCategory::Number,
        PrimitiveType::Boolean => JsonCategory::Literal,
        PrimitiveType::Charstring | PrimitiveType::Octetstring => JsonCategory::String,
    }
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|existing| existing == name) {
        out.push(name.to_string());
    }
}

#[derive(Debug, Error)]
pub enum PlanBuildError {
    #[error("alternatives '{first}' and '{second}' of '{type_name}' both claim TLV tag [{class:?} {number}]")]
    AmbiguousTlvAlternatives {
        type_name: String,
        first: String,
        second: String,
        class: TagClass,
        number: u32,
    },
    #[error("tag rule path '{path}' of alternative '{alternative}' {reason}")]
    UnresolvedRulePath {
        alternative: String,
        path: String,
        reason: String,
    },
    #[error("type '{type_name}' referenced in plan builder but not found in resolver")]
    MissingType { type_name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_rounds_up_to_multiple() {
        assert_eq!(pad_bits(9, Some(8)), 16);
        assert_eq!(pad_bits(16, Some(8)), 16);
        assert_eq!(pad_bits(3, None), 3);
        assert_eq!(pad_bits(3, Some(1)), 3);
    }

    #[test]
    fn greedy_strings_have_no_static_width() {
        let mut spec = PrimitiveSpec::new(PrimitiveType::Charstring);
        assert_eq!(primitive_bits(&spec), None);
        spec.raw.bytes = Some(3);
        assert_eq!(primitive_bits(&spec), Some(24));
        assert_eq!(primitive_bits(&PrimitiveSpec::new(PrimitiveType::Boolean)), Some(1));
    }
}
