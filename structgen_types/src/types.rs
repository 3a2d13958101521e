use crate::attributes::{FieldJsonAttributes, FormatAttributes, RawPrimitiveAttributes, TlvTag};
use crate::rules::OpenTypeConstraint;
use serde_derive::{Deserialize, Serialize};

/* Primitive element types. Scalar codegen lives elsewhere; these are the
 * leaves structured types recurse into. */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveType {
    Integer,
    Boolean,
    Charstring,
    Octetstring,
}

impl PrimitiveType {
    /* Name used in diagnostics and as the default XML element name */
    pub fn keyword(&self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Charstring => "charstring",
            PrimitiveType::Octetstring => "octetstring",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct PrimitiveSpec {
    #[serde(rename = "type")]
    pub prim_type: PrimitiveType,
    #[serde(default)]
    pub raw: RawPrimitiveAttributes,
}

impl PrimitiveSpec {
    pub fn new(prim_type: PrimitiveType) -> Self {
        Self {
            prim_type,
            raw: RawPrimitiveAttributes::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeRefType {
    pub name: String,
}

/* Reference from an element/field slot to its type */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    Primitive(PrimitiveSpec),
    TypeRef(TypeRefType),
}

impl FieldType {
    pub fn primitive(prim_type: PrimitiveType) -> Self {
        FieldType::Primitive(PrimitiveSpec::new(prim_type))
    }

    pub fn type_ref(name: &str) -> Self {
        FieldType::TypeRef(TypeRefType {
            name: name.to_string(),
        })
    }

    /* Referenced type name, if this slot points at another descriptor */
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            FieldType::TypeRef(type_ref) => Some(&type_ref.name),
            FieldType::Primitive(_) => None,
        }
    }
}

/// One element of a record-of/set-of, one alternative of a union, or one
/// field of a record.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ElementOrField {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub field_type: FieldType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub tlv_tag: Option<TlvTag>,
    #[serde(default)]
    pub json: FieldJsonAttributes,
}

impl ElementOrField {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            field_type,
            optional: false,
            tlv_tag: None,
            json: FieldJsonAttributes::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct SequenceType {
    pub element: ElementOrField,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct UnionType {
    pub alternatives: Vec<ElementOrField>,
    /* Open types are unions whose alternative is fixed by a constraint
     * table owned by the enclosing record */
    #[serde(default)]
    pub open_type: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct RecordType {
    pub fields: Vec<ElementOrField>,
    #[serde(default)]
    pub constraints: Vec<OpenTypeConstraint>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    RecordOf(SequenceType),
    SetOf(SequenceType),
    Union(UnionType),
    Record(RecordType),
}

impl TypeKind {
    pub fn keyword(&self, abstract_notation: bool) -> &'static str {
        match (self, abstract_notation) {
            (TypeKind::RecordOf(_), false) => "record of",
            (TypeKind::RecordOf(_), true) => "SEQUENCE OF",
            (TypeKind::SetOf(_), false) => "set of",
            (TypeKind::SetOf(_), true) => "SET OF",
            (TypeKind::Union(_), false) => "union",
            (TypeKind::Union(_), true) => "CHOICE",
            (TypeKind::Record(_), false) => "record",
            (TypeKind::Record(_), true) => "SEQUENCE",
        }
    }

    /* Every element/alternative/field slot of this kind, in declared order */
    pub fn slots(&self) -> &[ElementOrField] {
        match self {
            TypeKind::RecordOf(seq) | TypeKind::SetOf(seq) => std::slice::from_ref(&seq.element),
            TypeKind::Union(union) => &union.alternatives,
            TypeKind::Record(record) => &record.fields,
        }
    }
}

/* Per-format applicability flags (needsTLV .. needsJSON) */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub struct EncodingFlags {
    #[serde(default)]
    pub tlv: bool,
    #[serde(default)]
    pub bit_packed: bool,
    #[serde(default)]
    pub text: bool,
    #[serde(default)]
    pub xml: bool,
    #[serde(default)]
    pub json: bool,
}

impl EncodingFlags {
    pub fn all() -> Self {
        Self {
            tlv: true,
            bit_packed: true,
            text: true,
            xml: true,
            json: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub from_abstract_notation: bool,
    #[serde(default)]
    pub encodings: EncodingFlags,
    #[serde(with = "serde_yml::with::singleton_map_recursive")]
    pub kind: TypeKind,
    #[serde(default)]
    pub attributes: FormatAttributes,
}

impl TypeDescriptor {
    pub fn new(name: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            from_abstract_notation: false,
            encodings: EncodingFlags::default(),
            kind,
            attributes: FormatAttributes::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
