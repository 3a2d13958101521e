//! Codec plans shared by the emitters and the runtime interpreter.
//!
//! A plan captures every decision the generator makes about a type that a
//! codec needs at runtime: which alternative claims which TLV identity, where
//! bit-packed discriminator fields sit, which JSON categories an as-value
//! alternative accepts. Emitters print plans into generated sources; the
//! runtime `Registry` loads the same plans (usually from their JSON export).
//!
//! # Example
//! ```
//! use structgen_gen::codegen::shared::plan::*;
//!
//! let plans = PlanSet::new(vec![]);
//! assert_eq!(plans.version, PLAN_SCHEMA_VERSION);
//! assert!(plans.get("Missing").is_none());
//! ```

use crate::schema::ResolvedTypeKind;
use serde_derive::{Deserialize, Serialize};
use structgen_types::{ExtensionBit, JsonCategory, PrimitiveSpec, RuleValue, TagClass, TlvTag};

/// Schema version used for every serialized plan export.
pub const PLAN_SCHEMA_VERSION: u32 = 1;

/// Container for the plans of a set of resolved types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSet {
    /// Plan schema version (mirrors `PLAN_SCHEMA_VERSION`).
    pub version: u32,
    /// Per-type plans in generation order.
    pub types: Vec<TypePlan>,
}

impl PlanSet {
    /// Creates a new plan container, wiring the schema version.
    pub fn new(types: Vec<TypePlan>) -> Self {
        Self {
            version: PLAN_SCHEMA_VERSION,
            types,
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&TypePlan> {
        self.types.iter().find(|plan| plan.type_name == type_name)
    }
}

/// Value storage strategy of generated record-of/set-of types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Representation {
    /// Reference-counted copy-on-write element arena.
    #[default]
    Shared,
    /// Plain vector copied on every assignment.
    Flat,
}

/// Everything generated for one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePlan {
    pub type_name: String,
    pub display_name: String,
    #[serde(default)]
    pub abstract_notation: bool,
    /// Resolved structure, slots in declared order.
    pub kind: ResolvedTypeKind,
    pub value: ValuePlan,
    pub template: TemplatePlan,
    #[serde(default)]
    pub tlv: Option<TlvPlan>,
    #[serde(default)]
    pub raw: Option<RawPlan>,
    #[serde(default)]
    pub text: Option<TextPlan>,
    #[serde(default)]
    pub xml: Option<XmlPlan>,
    #[serde(default)]
    pub json: Option<JsonPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePlan {
    pub representation: Representation,
    /// Kind wording used in runtime error messages ("record of", "CHOICE").
    pub keyword: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePlan {
    /// Record-of specific templates may carry permutation groups.
    pub permutation: bool,
    /// Set-of templates may use superset/subset selections.
    pub superset_subset: bool,
    /// Specific templates match elements in any order.
    pub unordered: bool,
}

/* ============================================================================
   TLV
   ============================================================================ */

/// Class and number of a TLV identifier octet sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TlvIdentity {
    pub class: TagClass,
    pub number: u32,
}

impl TlvIdentity {
    pub const fn universal(number: u32) -> Self {
        Self {
            class: TagClass::Universal,
            number,
        }
    }
}

impl From<TlvTag> for TlvIdentity {
    fn from(tag: TlvTag) -> Self {
        Self {
            class: tag.class,
            number: tag.number,
        }
    }
}

pub const UNIVERSAL_BOOLEAN: u32 = 1;
pub const UNIVERSAL_INTEGER: u32 = 2;
pub const UNIVERSAL_OCTET_STRING: u32 = 4;
pub const UNIVERSAL_UTF8_STRING: u32 = 12;
pub const UNIVERSAL_SEQUENCE: u32 = 16;
pub const UNIVERSAL_SET: u32 = 17;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlvPlan {
    /// Type-level tag applied around the base encoding.
    #[serde(default)]
    pub own_tag: Option<TlvTag>,
    /// Universal identity of the base encoding; untagged unions have none.
    #[serde(default)]
    pub base: Option<TlvIdentity>,
    /// Per element/alternative/field slot.
    pub slots: Vec<TlvSlotPlan>,
    /// Set-of element encodings are sorted canonically.
    #[serde(default)]
    pub sort_set: bool,
    #[serde(default)]
    pub open_type: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlvSlotPlan {
    pub name: String,
    #[serde(default)]
    pub tag: Option<TlvTag>,
    /// Identities the slot's encoding can start with.
    pub claims: Vec<TlvIdentity>,
}

impl TlvSlotPlan {
    pub fn claims_identity(&self, identity: TlvIdentity) -> bool {
        self.claims.contains(&identity)
    }
}

/* ============================================================================
   Bit-packed
   ============================================================================ */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlan {
    /// Encoded length when it does not depend on the value.
    #[serde(default)]
    pub static_bits: Option<u64>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub extension_bit: Option<ExtensionBit>,
    #[serde(default)]
    pub padding: Option<u32>,
    /// Union alternatives in declared order; empty for other kinds.
    #[serde(default)]
    pub alternatives: Vec<RawAlternativePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlternativePlan {
    pub name: String,
    #[serde(default)]
    pub rule: Option<RawRulePlan>,
}

/// Tag rule of one alternative with its discriminator locations resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRulePlan {
    pub conditions: Vec<RawConditionPlan>,
    /// Every condition field has a static bit offset.
    pub static_offsets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConditionPlan {
    pub path: Vec<String>,
    pub field: PrimitiveSpec,
    /// Offset of the field from the start of the alternative.
    #[serde(default)]
    pub bit_offset: Option<u64>,
    pub values: Vec<RuleValue>,
}

/* ============================================================================
   Text, XML, JSON
   ============================================================================ */

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextPlan {
    #[serde(default)]
    pub begin: String,
    #[serde(default)]
    pub separator: String,
    #[serde(default)]
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlPlan {
    pub element_name: String,
    #[serde(default)]
    pub untagged: bool,
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub use_type: bool,
    /// Union alternatives in declared order; empty for other kinds.
    #[serde(default)]
    pub alternatives: Vec<XmlAlternativePlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlAlternativePlan {
    pub name: String,
    pub element_name: String,
    /// Start-tag names this alternative can start with.
    pub identities: Vec<String>,
}

impl XmlAlternativePlan {
    pub fn can_start_with(&self, identity: &str) -> bool {
        self.identities.iter().any(|candidate| candidate == identity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPlan {
    #[serde(default)]
    pub as_value: bool,
    /// One member per alternative or field, empty for sequences.
    #[serde(default)]
    pub members: Vec<JsonMemberPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMemberPlan {
    pub name: String,
    /// Object key, the alias when one is declared.
    pub key: String,
    /// Token categories the member's encoding can start with.
    pub categories: Vec<JsonCategory>,
}

impl JsonMemberPlan {
    pub fn accepts(&self, category: JsonCategory) -> bool {
        self.categories.contains(&category)
    }
}
