/* Analyze command - show how descriptors resolve and what gets generated */

use super::common::load_and_resolve;
use crate::config::CliConfig;
use crate::Inputs;
use structgen_gen::codegen::context::GenerationContext;
use structgen_gen::codegen::generate_all;
use structgen_gen::schema::{Format, ResolvedTypeKind};

pub fn run(inputs: &Inputs, config: &CliConfig, print_plans: bool, print_type: Option<&str>) -> anyhow::Result<()> {
    let resolver = load_and_resolve(inputs)?;
    let mut ctx = GenerationContext::new(config.generation.clone());
    generate_all(&mut ctx, &resolver)?;

    println!("[~] Resolution order ({} types):", resolver.resolution_order.len());
    for plan in ctx.plans() {
        let formats: Vec<&str> = Format::ALL
            .into_iter()
            .filter(|format| match format {
                Format::Tlv => plan.tlv.is_some(),
                Format::BitPacked => plan.raw.is_some(),
                Format::Text => plan.text.is_some(),
                Format::Xml => plan.xml.is_some(),
                Format::Json => plan.json.is_some(),
            })
            .map(|format| format.name())
            .collect();
        let slots = match &plan.kind {
            ResolvedTypeKind::RecordOf { .. } | ResolvedTypeKind::SetOf { .. } => String::new(),
            ResolvedTypeKind::Union { alternatives, .. } => format!(", {} alternatives", alternatives.len()),
            ResolvedTypeKind::Record { fields, .. } => format!(", {} fields", fields.len()),
        };
        let formats = if formats.is_empty() {
            "no codecs".to_string()
        } else {
            formats.join(", ")
        };
        let bits = match plan.raw.as_ref().and_then(|raw| raw.static_bits) {
            Some(bits) => format!(" ({} bits)", bits),
            None => String::new(),
        };
        println!("  - {} ({}{}): {}{}", plan.display_name, plan.value.keyword, slots, formats, bits);
    }

    if let Some(type_name) = print_type {
        let bundle = ctx
            .bundle(type_name)
            .ok_or_else(|| anyhow::anyhow!("type '{}' not found", type_name))?;
        for artifact in &bundle.artifacts {
            println!("\n/* ---- {} ---- */", artifact.name);
            println!("{}", artifact.code);
        }
    }

    if print_plans {
        println!("\n{}", serde_json::to_string_pretty(&ctx.plan_set())?);
    }
    Ok(())
}
