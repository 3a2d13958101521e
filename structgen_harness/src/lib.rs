//! Façades generated from `fixtures/facades.yaml` at build time, compiled
//! against `structgen_runtime` together with the plan set they were
//! generated with.

use structgen_runtime::{Registry, RegistryError, RuntimeConfig};

include!(concat!(env!("OUT_DIR"), "/facades.rs"));

const PLANS: &str = include_str!(concat!(env!("OUT_DIR"), "/plans.json"));

/// Registry over the plans emitted next to the façades.
pub fn registry() -> Result<Registry, RegistryError> {
    Registry::from_json(PLANS, RuntimeConfig::default())
}
