/* Codegen command - generate runtime support code from descriptors */

use super::common::load_and_resolve;
use crate::config::CliConfig;
use crate::partition::partitioner;
use crate::{Inputs, PartitionPolicy};
use anyhow::Context;
use std::path::Path;
use structgen_gen::codegen::artifact::partition;
use structgen_gen::codegen::context::GenerationContext;
use structgen_gen::codegen::generate_all;
use tracing::info;

pub const PLANS_FILE: &str = "plans.json";

const UNIT_HEADER: &str = "/* Generated by structgen. Do not edit. */\n\n";

/* Execute the codegen command */
pub fn run(
    inputs: &Inputs,
    config: &CliConfig,
    policy: PartitionPolicy,
    output_dir: &Path,
    verbose: bool,
) -> anyhow::Result<()> {
    if verbose {
        println!("[~] Configuration:");
        println!("  Output directory: {}", output_dir.display());
        println!("  Partition: {:?}", policy);
        println!("  Runtime crate: {}", config.generation.runtime_crate);
        println!("  Representation: {:?}", config.generation.representation);
        if let Some(formats) = &config.generation.formats {
            let names: Vec<_> = formats.iter().map(|format| format.name()).collect();
            println!("  Formats: {}", names.join(", "));
        }
        println!("  Input files: {}", inputs.files.len());
        for file in &inputs.files {
            println!("    - {}", file.display());
        }
        println!();
    }

    let resolver = load_and_resolve(inputs)?;
    let mut ctx = GenerationContext::new(config.generation.clone());
    generate_all(&mut ctx, &resolver)?;

    let units = partition(ctx.bundles(), partitioner(policy).as_ref());
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory '{}'", output_dir.display()))?;

    for (unit, code) in &units {
        let path = output_dir.join(unit);
        std::fs::write(&path, format!("{}{}\n", UNIT_HEADER, code))
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        if verbose {
            println!("[✓] Generated {}", path.display());
        }
    }

    let plans_path = output_dir.join(PLANS_FILE);
    std::fs::write(&plans_path, serde_json::to_string_pretty(&ctx.plan_set())?)
        .with_context(|| format!("failed to write '{}'", plans_path.display()))?;

    info!(
        types = ctx.bundles().len(),
        units = units.len(),
        output = %output_dir.display(),
        "code generation finished"
    );
    if verbose {
        println!("[✓] Wrote plans to {}", plans_path.display());
    }
    Ok(())
}
