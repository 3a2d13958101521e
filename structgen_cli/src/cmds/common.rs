/* Loading and resolution shared by every command */

use crate::config::CliConfig;
use crate::Inputs;
use anyhow::Context;
use structgen_gen::codegen::shared::builder::PlanBuilder;
use structgen_gen::schema::TypeResolver;
use structgen_loader::{normalize_type_refs, ImportResolver};
use structgen_runtime::Registry;
use tracing::debug;

/* Load the input files with their imports and resolve every descriptor */
pub fn load_and_resolve(inputs: &Inputs) -> anyhow::Result<TypeResolver> {
    let mut imports = ImportResolver::new(inputs.include_dirs.clone());
    for file in &inputs.files {
        imports.load_file_with_imports(file)?;
    }

    let mut descriptors = imports.get_all_types().to_vec();
    normalize_type_refs(&mut descriptors, &imports);
    debug!(
        files = imports.loaded_file_count(),
        types = descriptors.len(),
        "loaded descriptors"
    );

    let mut resolver = TypeResolver::new();
    for descriptor in descriptors {
        resolver.add_descriptor(descriptor);
    }
    resolver.resolve_all().context("type resolution failed")?;
    Ok(resolver)
}

/* Runtime registry over freshly built plans of the input types */
pub fn load_registry(inputs: &Inputs, config: &CliConfig) -> anyhow::Result<Registry> {
    let resolver = load_and_resolve(inputs)?;
    let plans = PlanBuilder::new(&resolver, &config.generation)
        .build_all()
        .context("failed to build codec plans")?;
    Ok(Registry::with_config(plans, config.runtime.clone()))
}
