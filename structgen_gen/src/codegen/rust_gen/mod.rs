pub mod codec;
pub mod helpers;
pub mod json;
pub mod plan;
pub mod raw;
pub mod template;
pub mod text;
pub mod tlv;
pub mod value;
pub mod xml;

use crate::codegen::artifact::{ArtifactBundle, ArtifactKind};
use crate::codegen::context::GenerationOptions;
use crate::codegen::shared::plan::TypePlan;
use crate::schema::Format;
use helpers::runtime_path;

pub use plan::emit_plan;
pub use template::emit_template;
pub use value::emit_value;

/* Source of one codec façade; empty when the plan has no codec for `format` */
pub fn emit_codec(plan: &TypePlan, format: Format, rt: &str) -> String {
  match format {
    Format::Tlv => tlv::emit_tlv(plan, rt),
    Format::BitPacked => raw::emit_raw(plan, rt),
    Format::Text => text::emit_text(plan, rt),
    Format::Xml => xml::emit_xml(plan, rt),
    Format::Json => json::emit_json(plan, rt),
  }
}

/* Every artifact of one planned type */
pub fn emit_bundle(plan: &TypePlan, options: &GenerationOptions) -> Result<ArtifactBundle, serde_json::Error> {
  let rt = runtime_path(&options.runtime_crate);
  let mut bundle = ArtifactBundle::new(&plan.type_name);
  bundle.push(ArtifactKind::Plan, emit_plan(plan)?);
  bundle.push(ArtifactKind::ValueSemantics, emit_value(plan, &rt));
  bundle.push(ArtifactKind::TemplateSemantics, emit_template(plan, &rt));
  for format in Format::ALL {
    let code = emit_codec(plan, format, &rt);
    if !code.is_empty() {
      bundle.push(ArtifactKind::Codec(format), code);
    }
  }
  Ok(bundle)
}
