use thiserror::Error;

/// Fatal generation-time errors. Every variant names the offending type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
  #[error("type '{0}' is defined more than once")]
  DuplicateType(String),

  #[error("type '{type_name}' references unknown type '{reference}' in '{slot}'")]
  UnknownType {
    type_name: String,
    slot: String,
    reference: String,
  },

  #[error("type '{type_name}' declares '{slot}' more than once")]
  DuplicateSlot { type_name: String, slot: String },

  #[error("union type '{0}' has no alternatives")]
  EmptyUnion(String),

  #[error("type '{type_name}' requests {format} encoding but '{slot}' of type '{element_type}' does not support it")]
  FormatNotSupported {
    type_name: String,
    slot: String,
    element_type: String,
    format: &'static str,
  },

  #[error("type '{type_name}' declares tag rules but is not a union")]
  TagRulesOnNonUnion { type_name: String },

  #[error("tag rule #{rule} of type '{type_name}' names unknown alternative '{alternative}'")]
  TagRuleUnknownAlternative {
    type_name: String,
    rule: usize,
    alternative: String,
  },

  #[error("tag rule #{rule} of type '{type_name}' has no conditions")]
  TagRuleWithoutConditions { type_name: String, rule: usize },

  #[error("tag rule #{rule} of type '{type_name}' uses field path '{path}' which {reason}")]
  TagRuleBadField {
    type_name: String,
    rule: usize,
    path: String,
    reason: String,
  },

  #[error("open-type constraint on '{type_name}.{field}' is invalid: {reason}")]
  InvalidConstraint {
    type_name: String,
    field: String,
    reason: String,
  },

  #[error("union type '{type_name}' cannot be tagged implicitly")]
  ImplicitTagOnUnion { type_name: String },

  #[error("type '{type_name}' uses XML {mode} mode but its element is not a primitive")]
  XmlModeNeedsPrimitive {
    type_name: String,
    mode: &'static str,
  },
}
