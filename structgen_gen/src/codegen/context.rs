use super::artifact::ArtifactBundle;
use super::shared::plan::{PlanSet, Representation, TypePlan};
use crate::schema::Format;
use serde_derive::{Deserialize, Serialize};

pub const DEFAULT_RUNTIME_CRATE: &str = "structgen_runtime";

/// Knobs shared by every emitter of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GenerationOptions {
  /* Storage strategy baked into value plans */
  pub representation: Representation,
  /* Path generated code uses to reach the runtime library */
  pub runtime_crate: String,
  /* Restrict emitted codecs; `None` emits every format a type asks for */
  pub formats: Option<Vec<Format>>,
}

impl Default for GenerationOptions {
  fn default() -> Self {
    Self { representation: Representation::Shared, runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(), formats: None }
  }
}

impl GenerationOptions {
  pub fn emits(&self, format: Format) -> bool {
    self.formats.as_ref().map_or(true, |formats| formats.contains(&format))
  }
}

/* Output of one generation run. Contexts are plain values; any number of
 * them can be alive at once. */
#[derive(Debug, Default)]
pub struct GenerationContext {
  options: GenerationOptions,
  plans: Vec<TypePlan>,
  bundles: Vec<ArtifactBundle>,
}

impl GenerationContext {
  pub fn new(options: GenerationOptions) -> Self {
    Self { options, plans: Vec::new(), bundles: Vec::new() }
  }

  pub fn options(&self) -> &GenerationOptions {
    &self.options
  }

  pub fn add_plan(&mut self, plan: TypePlan) {
    self.plans.push(plan);
  }

  pub fn add_bundle(&mut self, bundle: ArtifactBundle) {
    self.bundles.push(bundle);
  }

  pub fn plans(&self) -> &[TypePlan] {
    &self.plans
  }

  pub fn bundles(&self) -> &[ArtifactBundle] {
    &self.bundles
  }

  pub fn bundle(&self, type_name: &str) -> Option<&ArtifactBundle> {
    self.bundles.iter().find(|bundle| bundle.type_name == type_name)
  }

  pub fn plan_set(&self) -> PlanSet {
    PlanSet::new(self.plans.clone())
  }

  pub fn into_parts(self) -> (PlanSet, Vec<ArtifactBundle>) {
    (PlanSet::new(self.plans), self.bundles)
  }
}
