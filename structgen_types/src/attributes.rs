use crate::rules::TagRule;
use serde_derive::{Deserialize, Serialize};

/* ============================================================================
   TLV (BER) annotations
   ============================================================================ */

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TagClass {
    Universal,
    Application,
    #[default]
    Context,
    Private,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub struct TlvTag {
    #[serde(default)]
    pub class: TagClass,
    pub number: u32,
    /* Implicit tags replace the inner identity, explicit tags wrap it */
    #[serde(default)]
    pub implicit: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TlvAttributes {
    #[serde(default)]
    pub tag: Option<TlvTag>,
}

/* ============================================================================
   Bit-packed annotations
   ============================================================================ */

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BitOrder {
    #[default]
    Lsb,
    Msb,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawPrimitiveAttributes {
    /* Integer/boolean field length in bits */
    #[serde(default)]
    pub bits: Option<u32>,
    /* Fixed string length in bytes; strings without it consume the rest */
    #[serde(default)]
    pub bytes: Option<u32>,
    #[serde(default)]
    pub signed: bool,
    #[serde(default)]
    pub bit_order: BitOrder,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionBit {
    /* 1 = another element follows */
    Yes,
    /* 0 = another element follows */
    Reverse,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawAttributes {
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub extension_bit: Option<ExtensionBit>,
    #[serde(default)]
    pub padding: Option<u32>,
    #[serde(default)]
    pub tag_rules: Vec<TagRule>,
}

/* ============================================================================
   Text, XML and JSON annotations
   ============================================================================ */

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TextAttributes {
    #[serde(default)]
    pub begin: Option<String>,
    #[serde(default)]
    pub separator: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct XmlAttributes {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub untagged: bool,
    #[serde(default)]
    pub attribute: bool,
    #[serde(default)]
    pub list: bool,
    #[serde(default)]
    pub use_type: bool,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct JsonAttributes {
    #[serde(default)]
    pub as_value: bool,
}

/* Literal categories a JSON token can fall into */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum JsonCategory {
    Number,
    String,
    /* true, false and null */
    Literal,
    Array,
    Object,
}

impl JsonCategory {
    pub fn describe(&self) -> &'static str {
        match self {
            JsonCategory::Number => "a number",
            JsonCategory::String => "a string",
            JsonCategory::Literal => "a literal",
            JsonCategory::Array => "an array",
            JsonCategory::Object => "an object",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct FieldJsonAttributes {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub accepts: Option<Vec<JsonCategory>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct FormatAttributes {
    #[serde(default)]
    pub tlv: TlvAttributes,
    #[serde(default)]
    pub raw: RawAttributes,
    #[serde(default)]
    pub text: TextAttributes,
    #[serde(default)]
    pub xml: XmlAttributes,
    #[serde(default)]
    pub json: JsonAttributes,
}
