/* Encode and decode commands - move values between wire formats */

use super::common::load_registry;
use crate::config::CliConfig;
use crate::Inputs;
use anyhow::Context;
use std::path::{Path, PathBuf};
use structgen_runtime::codec::raw::decode_with_stats;
use structgen_runtime::{DecodeOptions, Format, Registry, Value};

pub struct Request {
    pub type_name: String,
    pub data_file: PathBuf,
    pub hex: bool,
}

fn is_binary(format: Format) -> bool {
    matches!(format, Format::Tlv | Format::BitPacked)
}

fn read_input(request: &Request) -> anyhow::Result<Vec<u8>> {
    let bytes = std::fs::read(&request.data_file)
        .with_context(|| format!("failed to read '{}'", request.data_file.display()))?;
    if !request.hex {
        return Ok(bytes);
    }
    let digits: String = String::from_utf8(bytes)
        .context("hex input is not valid UTF-8")?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    hex::decode(digits).context("invalid hex input")
}

/* Binary encodings are shown as hex, the others as text */
fn render(format: Format, bytes: &[u8]) -> String {
    if is_binary(format) {
        hex::encode(bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn decode_value(registry: &Registry, format: Format, type_name: &str, input: &[u8]) -> anyhow::Result<Value> {
    registry
        .decode(format, type_name, input, DecodeOptions::silent())
        .with_context(|| format!("failed to decode '{}' from {}", type_name, format.name()))
}

pub fn encode(
    inputs: &Inputs,
    config: &CliConfig,
    request: &Request,
    from: Format,
    to: Format,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = load_registry(inputs, config)?;
    let input = read_input(request)?;
    let value = decode_value(&registry, from, &request.type_name, &input)?;

    let encoded = registry
        .encode(to, &request.type_name, &value)
        .with_context(|| format!("failed to encode '{}' as {}", request.type_name, to.name()))?;

    match output {
        Some(path) => {
            std::fs::write(path, &encoded).with_context(|| format!("failed to write '{}'", path.display()))?;
        }
        None => println!("{}", render(to, &encoded)),
    }
    Ok(())
}

pub fn decode(inputs: &Inputs, config: &CliConfig, request: &Request, format: Format, stats: bool) -> anyhow::Result<()> {
    let registry = load_registry(inputs, config)?;
    let input = read_input(request)?;

    let value = if stats && format == Format::BitPacked {
        let plan = registry.plan(&request.type_name)?;
        let (result, stats) = decode_with_stats(&registry, plan, &input);
        eprintln!("discriminator decodes: {}", stats.discriminator_decodes);
        eprintln!("cache hits: {}", stats.cache_hits);
        for (alternative, count) in &stats.full_decodes {
            eprintln!("full decodes of {}: {}", alternative, count);
        }
        result.with_context(|| format!("failed to decode '{}' from {}", request.type_name, format.name()))?
    } else {
        decode_value(&registry, format, &request.type_name, &input)?
    };

    /* JSON when the type has a JSON codec, the value tree otherwise */
    match registry.encode(Format::Json, &request.type_name, &value) {
        Ok(json) => {
            let text = String::from_utf8(json)?;
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(pretty) => println!("{}", serde_json::to_string_pretty(&pretty)?),
                Err(_) => println!("{}", text),
            }
        }
        Err(_) => println!("{:#?}", value),
    }
    Ok(())
}
