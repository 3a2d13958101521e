/* Runtime registry: the plans of every generated type plus runtime
 * configuration. Generated code and the CLI reach the codecs through it. */

use crate::codec;
use crate::errors::{DecodeError, DecodeResult, EncodeResult, SemanticError, SemanticResult};
use crate::record::{RecordShape, RecordValue};
use crate::sequence::{SeqShape, SeqValue};
use crate::union::{UnionShape, UnionValue};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use structgen_gen::codegen::shared::plan::{PlanSet, Representation, TypePlan, PLAN_SCHEMA_VERSION};
use structgen_gen::schema::{ElementType, Format, ResolvedTypeKind};
use thiserror::Error;
use tracing::error;

/* How a broken component relation constraint is reported */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RuntimeConfig {
    /* Overrides the representation baked into the plans */
    pub representation: Option<Representation>,
    pub broken_constraint: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOptions {
    /* Report failures through the return value only */
    pub silent: bool,
}

impl DecodeOptions {
    pub fn silent() -> Self {
        Self { silent: true }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to parse plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plan schema version {found} is not supported (expected {expected})")]
    Version { found: u32, expected: u32 },
}

#[derive(Debug, Clone)]
pub struct Registry {
    plans: BTreeMap<String, TypePlan>,
    config: RuntimeConfig,
}

impl Registry {
    pub fn new(plans: PlanSet) -> Self {
        Self::with_config(plans, RuntimeConfig::default())
    }

    pub fn with_config(plans: PlanSet, config: RuntimeConfig) -> Self {
        let plans = plans
            .types
            .into_iter()
            .map(|plan| (plan.type_name.clone(), plan))
            .collect();
        Self { plans, config }
    }

    pub fn from_json(json: &str, config: RuntimeConfig) -> Result<Self, RegistryError> {
        let plans: PlanSet = serde_json::from_str(json)?;
        if plans.version != PLAN_SCHEMA_VERSION {
            return Err(RegistryError::Version {
                found: plans.version,
                expected: PLAN_SCHEMA_VERSION,
            });
        }
        Ok(Self::with_config(plans, config))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    pub fn plan(&self, type_name: &str) -> SemanticResult<&TypePlan> {
        self.plans.get(type_name).ok_or_else(|| SemanticError::UnknownType {
            type_name: type_name.to_string(),
        })
    }

    pub fn representation(&self, plan: &TypePlan) -> Representation {
        self.config.representation.unwrap_or(plan.value.representation)
    }

    pub fn seq_shape(&self, plan: &TypePlan) -> SeqShape {
        let set_of = matches!(plan.kind, ResolvedTypeKind::SetOf { .. });
        SeqShape::new(&plan.type_name, set_of, self.representation(plan))
    }

    pub fn union_shape(&self, plan: &TypePlan) -> UnionShape {
        UnionShape::new(&plan.type_name, slot_names(plan))
    }

    pub fn record_shape(&self, plan: &TypePlan) -> RecordShape {
        RecordShape::new(&plan.type_name, slot_names(plan))
    }

    /// Unbound value of a generated type.
    pub fn new_value(&self, type_name: &str) -> SemanticResult<Value> {
        let plan = self.plan(type_name)?;
        Ok(self.unbound_value(plan))
    }

    pub fn unbound_value(&self, plan: &TypePlan) -> Value {
        match plan.kind {
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } => {
                Value::Seq(SeqValue::unbound(self.seq_shape(plan)))
            }
            ResolvedTypeKind::Union { .. } => Value::Union(UnionValue::unbound(self.union_shape(plan))),
            ResolvedTypeKind::Record { .. } => Value::Record(RecordValue::unbound(self.record_shape(plan))),
        }
    }

    /* Plan of a slot's type, `None` for primitives */
    pub fn element_plan(&self, element: &ElementType) -> SemanticResult<Option<&TypePlan>> {
        match element {
            ElementType::Primitive(_) => Ok(None),
            ElementType::Named(name) => self.plan(name).map(Some),
        }
    }

    pub fn encode(&self, format: Format, type_name: &str, value: &Value) -> EncodeResult<Vec<u8>> {
        let plan = self.plan(type_name)?;
        codec::encode(self, format, plan, value)
    }

    pub fn decode(&self, format: Format, type_name: &str, input: &[u8], options: DecodeOptions) -> DecodeResult<Value> {
        let result = self
            .plan(type_name)
            .map_err(DecodeError::from)
            .and_then(|plan| codec::decode(self, format, plan, input));
        result.map_err(|err| {
            if !options.silent {
                error!(type_name, format = format.name(), error = %err, "decode failed");
            }
            err.terminal()
        })
    }

    /// Decode into an existing value; the target is cleared on failure.
    pub fn decode_into(
        &self,
        format: Format,
        type_name: &str,
        input: &[u8],
        target: &mut Value,
        options: DecodeOptions,
    ) -> DecodeResult<()> {
        match self.decode(format, type_name, input, options) {
            Ok(value) => {
                *target = value;
                Ok(())
            }
            Err(err) => {
                clean_up(target);
                Err(err)
            }
        }
    }
}

fn slot_names(plan: &TypePlan) -> Vec<String> {
    plan.kind.slots().iter().map(|slot| slot.name.clone()).collect()
}

/* Back to the unbound state, keeping the type */
fn clean_up(value: &mut Value) {
    match value {
        Value::Seq(seq) => seq.clean_up(),
        Value::Union(union) => union.clean_up(),
        Value::Record(record) => record.clean_up(),
        Value::Integer(_) | Value::Boolean(_) | Value::Charstring(_) | Value::Octetstring(_) => {}
    }
}
