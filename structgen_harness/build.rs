/* Generates the façades of `fixtures/facades.yaml` into OUT_DIR so that the
 * library compiles them against the runtime. */

use std::{env, fs, path::PathBuf};
use structgen_gen::codegen::artifact::{partition, Artifact, ArtifactBundle, OutputPartitioner};
use structgen_gen::codegen::context::{GenerationContext, GenerationOptions};
use structgen_gen::codegen::generate_descriptors;
use structgen_types::DescriptorFile;

const FIXTURE: &str = "fixtures/facades.yaml";
const UNIT: &str = "facades.rs";

struct Single;

impl OutputPartitioner for Single {
    fn unit_for(&self, _bundle: &ArtifactBundle, _artifact: &Artifact) -> String {
        UNIT.to_string()
    }
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let yaml = fs::read_to_string(FIXTURE).unwrap();
    let file: DescriptorFile = serde_yml::from_str(&yaml).unwrap();

    let mut ctx = GenerationContext::new(GenerationOptions::default());
    if let Err(err) = generate_descriptors(&mut ctx, file.types) {
        panic!("{}: {}", FIXTURE, err);
    }

    let plans = serde_json::to_string_pretty(&ctx.plan_set()).unwrap();
    let mut units = partition(ctx.bundles(), &Single);
    let code = units.shift_remove(UNIT).unwrap_or_default();

    fs::write(out_dir.join(UNIT), code).unwrap();
    fs::write(out_dir.join("plans.json"), plans).unwrap();
    println!("cargo:rerun-if-changed={}", FIXTURE);
    println!("cargo:rerun-if-changed=build.rs");
}
