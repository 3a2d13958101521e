pub mod artifact;
pub mod context;
pub mod rust_gen;
pub mod shared;

use crate::schema::{ResolutionError, TypeResolver};
use context::GenerationContext;
use shared::builder::{PlanBuildError, PlanBuilder};
use structgen_types::TypeDescriptor;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error(transparent)]
  Resolution(#[from] ResolutionError),

  #[error(transparent)]
  Plan(#[from] PlanBuildError),

  #[error("failed to export the plan of '{type_name}': {source}")]
  PlanExport {
    type_name: String,
    #[source]
    source: serde_json::Error,
  },
}

/* Plan and emit every resolved type, least dependent first. Bundles and plans
 * accumulate in `ctx`; nothing is written anywhere. */
pub fn generate_all(ctx: &mut GenerationContext, resolver: &TypeResolver) -> Result<(), GenerationError> {
  let options = ctx.options().clone();
  let builder = PlanBuilder::new(resolver, &options);

  for name in &resolver.resolution_order {
    let ty = resolver
      .get_type_info(name)
      .ok_or_else(|| PlanBuildError::MissingType { type_name: name.clone() })?;
    let plan = builder.build_type(ty)?;
    let bundle = rust_gen::emit_bundle(&plan, &options)
      .map_err(|source| GenerationError::PlanExport { type_name: name.clone(), source })?;
    debug!(type_name = %name, artifacts = bundle.artifacts.len(), "generated type");
    ctx.add_bundle(bundle);
    ctx.add_plan(plan);
  }
  Ok(())
}

/* Resolve `descriptors` and generate them into `ctx` */
pub fn generate_descriptors(
  ctx: &mut GenerationContext,
  descriptors: impl IntoIterator<Item = TypeDescriptor>,
) -> Result<TypeResolver, GenerationError> {
  let mut resolver = TypeResolver::new();
  for descriptor in descriptors {
    resolver.add_descriptor(descriptor);
  }
  resolver.resolve_all()?;
  generate_all(ctx, &resolver)?;
  Ok(resolver)
}
