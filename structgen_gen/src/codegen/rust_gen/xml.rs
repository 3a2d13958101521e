/* XML codec façade generation */

use super::codec::open_codec_impl;
use super::helpers::string_literal;
use crate::codegen::shared::plan::{TypePlan, XmlPlan};
use crate::codegen::shared::writer::CodeWriter;
use crate::schema::Format;

fn mode(xml: &XmlPlan) -> &'static str {
  if xml.attribute {
    "attribute"
  } else if xml.list {
    "space separated list"
  } else if xml.use_type {
    "`type` attribute names the alternative"
  } else if xml.untagged {
    "untagged"
  } else {
    "element"
  }
}

pub fn emit_xml(plan: &TypePlan, rt: &str) -> String {
  let mut w = CodeWriter::new();
  let Some(xml) = &plan.xml else {
    return String::new();
  };
  w.comment(format!("XML: <{}>, {}", xml.element_name, mode(xml)));
  for alternative in &xml.alternatives {
    w.comment(format!("  {} starts with <{}>", alternative.name, alternative.identities.join(">, <")));
  }
  open_codec_impl(&mut w, plan, Format::Xml, rt);
  w.blank();
  w.line(format!("pub const XML_ELEMENT: &'static str = {};", string_literal(&xml.element_name)));
  w.close();
  w.finish()
}
