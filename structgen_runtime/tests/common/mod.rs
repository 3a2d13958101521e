/* Shared helpers: descriptors written as YAML, resolved, planned and loaded
 * into a registry the way generated code does it. */

#![allow(dead_code)]

use structgen_gen::codegen::context::GenerationOptions;
use structgen_gen::codegen::shared::builder::PlanBuilder;
use structgen_gen::schema::TypeResolver;
use structgen_runtime::{Element, Registry, RuntimeConfig, SeqValue, Value};
use structgen_types::DescriptorFile;

const ALL_FORMATS: &str = "encodings: {tlv: true, bit-packed: true, text: true, xml: true, json: true}";

pub fn registry(yaml: &str) -> Registry {
    registry_with(yaml, RuntimeConfig::default())
}

pub fn registry_with(yaml: &str, config: RuntimeConfig) -> Registry {
    let yaml = yaml.replace("encodings: all", ALL_FORMATS);
    let file: DescriptorFile = serde_yml::from_str(&yaml).expect("parse descriptor YAML");

    let mut resolver = TypeResolver::new();
    for descriptor in file.types {
        resolver.add_descriptor(descriptor);
    }
    resolver.resolve_all().expect("resolve descriptors");

    let options = GenerationOptions::default();
    let plans = PlanBuilder::new(&resolver, &options).build_all().expect("build plans");
    Registry::with_config(plans, config)
}

pub fn seq(registry: &Registry, type_name: &str, elements: Vec<Element>) -> Value {
    let plan = registry.plan(type_name).expect("known type");
    Value::Seq(SeqValue::with_elements(registry.seq_shape(plan), elements))
}

pub fn ints(registry: &Registry, type_name: &str, items: &[i64]) -> Value {
    seq(registry, type_name, items.iter().map(|item| Some(Value::Integer(*item))).collect())
}

pub fn union(registry: &Registry, type_name: &str, alternative: &str, value: Value) -> Value {
    let mut union = registry.new_value(type_name).expect("known type");
    union
        .as_union_mut()
        .expect("union value")
        .select(alternative, value)
        .expect("known alternative");
    union
}

pub fn record(registry: &Registry, type_name: &str, fields: &[(&str, Value)]) -> Value {
    let mut record = registry.new_value(type_name).expect("known type");
    let slots = record.as_record_mut().expect("record value");
    for (name, value) in fields {
        slots.set(name, value.clone()).expect("known field");
    }
    record
}
