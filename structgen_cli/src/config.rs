/* Tool configuration: an optional YAML file, then command-line overrides */

use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use structgen_gen::codegen::context::GenerationOptions;
use structgen_gen::codegen::shared::plan::Representation;
use structgen_gen::schema::Format;
use structgen_runtime::{RuntimeConfig, Severity};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CliConfig {
    pub generation: GenerationOptions,
    pub runtime: RuntimeConfig,
}

impl CliConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_yml::from_str(contents)?)
    }

    pub fn override_generation(
        &mut self,
        runtime_crate: Option<String>,
        representation: Option<Representation>,
        formats: Vec<Format>,
    ) {
        if let Some(runtime_crate) = runtime_crate {
            self.generation.runtime_crate = runtime_crate;
        }
        if let Some(representation) = representation {
            self.generation.representation = representation;
        }
        if !formats.is_empty() {
            self.generation.formats = Some(formats);
        }
    }

    pub fn override_runtime(&mut self, broken_constraint: Option<Severity>) {
        if let Some(severity) = broken_constraint {
            self.runtime.broken_constraint = severity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_sections_keep_defaults() {
        let config = CliConfig::parse("runtime:\n  broken-constraint: warning\n").unwrap();
        assert_eq!(config.generation, GenerationOptions::default());
        assert_eq!(config.runtime.broken_constraint, Severity::Warning);
        assert_eq!(config.runtime.representation, None);
    }

    #[test]
    fn flags_override_the_file() {
        let mut config = CliConfig::parse(
            "generation:\n  representation: flat\n  runtime-crate: rt\n  formats: [tlv, json]\n",
        )
        .unwrap();
        assert_eq!(config.generation.formats, Some(vec![Format::Tlv, Format::Json]));

        config.override_generation(None, Some(Representation::Shared), Vec::new());
        assert_eq!(config.generation.representation, Representation::Shared);
        assert_eq!(config.generation.runtime_crate, "rt");
        assert_eq!(config.generation.formats, Some(vec![Format::Tlv, Format::Json]));

        config.override_generation(Some("other".into()), None, vec![Format::Xml]);
        assert_eq!(config.generation.runtime_crate, "other");
        assert_eq!(config.generation.formats, Some(vec![Format::Xml]));

        config.override_runtime(Some(Severity::Ignore));
        assert_eq!(config.runtime.broken_constraint, Severity::Ignore);
    }
}
