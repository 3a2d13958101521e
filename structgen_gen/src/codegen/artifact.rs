use crate::schema::Format;
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
  Plan,
  ValueSemantics,
  TemplateSemantics,
  Codec(Format),
}

impl fmt::Display for ArtifactKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArtifactKind::Plan => write!(f, "plan"),
      ArtifactKind::ValueSemantics => write!(f, "value"),
      ArtifactKind::TemplateSemantics => write!(f, "template"),
      ArtifactKind::Codec(Format::Tlv) => write!(f, "codec-tlv"),
      ArtifactKind::Codec(Format::BitPacked) => write!(f, "codec-bit-packed"),
      ArtifactKind::Codec(Format::Text) => write!(f, "codec-text"),
      ArtifactKind::Codec(Format::Xml) => write!(f, "codec-xml"),
      ArtifactKind::Codec(Format::Json) => write!(f, "codec-json"),
    }
  }
}

/// One named piece of generated source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
  pub name: String,
  pub kind: ArtifactKind,
  pub code: String,
}

/// Everything generated for one type, unplaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
  pub type_name: String,
  pub artifacts: Vec<Artifact>,
}

impl ArtifactBundle {
  pub fn new(type_name: &str) -> Self {
    Self { type_name: type_name.to_string(), artifacts: Vec::new() }
  }

  pub fn push(&mut self, kind: ArtifactKind, code: String) {
    let name = format!("{}::{}", self.type_name, kind);
    self.artifacts.push(Artifact { name, kind, code });
  }

  pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
    self.artifacts.iter().find(|artifact| artifact.kind == kind)
  }
}

/* Placement policy. The engine hands bundles over and never decides which
 * unit an artifact lands in. */
pub trait OutputPartitioner {
  fn unit_for(&self, bundle: &ArtifactBundle, artifact: &Artifact) -> String;
}

/* Group artifact code by output unit, keeping first-seen unit order */
pub fn partition(bundles: &[ArtifactBundle], partitioner: &dyn OutputPartitioner) -> IndexMap<String, String> {
  let mut units: IndexMap<String, String> = IndexMap::new();
  for bundle in bundles {
    for artifact in &bundle.artifacts {
      let unit = units.entry(partitioner.unit_for(bundle, artifact)).or_default();
      if !unit.is_empty() {
        unit.push('\n');
      }
      unit.push_str(&artifact.code);
    }
  }
  units
}
