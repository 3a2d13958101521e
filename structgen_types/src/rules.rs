use serde_derive::{Deserialize, Serialize};
use std::fmt;

/* Literal compared against an already-decoded field */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
#[serde(untagged)]
pub enum RuleValue {
    Integer(i64),
    Boolean(bool),
    /* Charstring content, or hex digits for octetstring fields */
    Text(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Integer(v) => write!(f, "{}", v),
            RuleValue::Boolean(v) => write!(f, "{}", v),
            RuleValue::Text(v) => write!(f, "\"{}\"", v),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TagCondition {
    /* Field path relative to the alternative's value */
    pub field: Vec<String>,
    pub values: Vec<RuleValue>,
}

/// Bit-packed discriminator rule: the alternative is selected when every
/// condition holds.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct TagRule {
    pub alternative: String,
    pub conditions: Vec<TagCondition>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ConstraintRow {
    pub values: Vec<RuleValue>,
    pub alternative: String,
}

/* Component relation constraint fixing the alternative of an open-type field
 * from the values of sibling fields */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct OpenTypeConstraint {
    pub field: String,
    pub keys: Vec<String>,
    pub table: Vec<ConstraintRow>,
}

impl OpenTypeConstraint {
    /* Alternative selected by the given key values, first matching row wins */
    pub fn lookup(&self, key_values: &[RuleValue]) -> Option<&str> {
        self.table
            .iter()
            .find(|row| row.values.as_slice() == key_values)
            .map(|row| row.alternative.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_values_parse_by_shape() {
        let values: Vec<RuleValue> = serde_yml::from_str("[7, true, \"0a\"]").unwrap();
        assert_eq!(
            values,
            vec![RuleValue::Integer(7), RuleValue::Boolean(true), RuleValue::Text("0a".into())]
        );
    }

    #[test]
    fn first_matching_row_selects_the_alternative() {
        let constraint: OpenTypeConstraint = serde_yml::from_str(
            "field: payload\nkeys: [id, flag]\ntable:\n  - {values: [1, true], alternative: a}\n  - {values: [1, true], alternative: b}\n  - {values: [2, false], alternative: c}\n",
        )
        .unwrap();
        assert_eq!(constraint.lookup(&[RuleValue::Integer(1), RuleValue::Boolean(true)]), Some("a"));
        assert_eq!(constraint.lookup(&[RuleValue::Integer(2), RuleValue::Boolean(false)]), Some("c"));
        assert_eq!(constraint.lookup(&[RuleValue::Integer(3), RuleValue::Boolean(false)]), None);
    }
}
