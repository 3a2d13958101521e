/* Output placement policies for generated artifacts */

use crate::PartitionPolicy;
use structgen_gen::codegen::artifact::{Artifact, ArtifactBundle, ArtifactKind, OutputPartitioner};
use structgen_gen::schema::Format;

pub struct Single;

impl OutputPartitioner for Single {
    fn unit_for(&self, _bundle: &ArtifactBundle, _artifact: &Artifact) -> String {
        "generated.rs".to_string()
    }
}

pub struct ByKind;

impl OutputPartitioner for ByKind {
    fn unit_for(&self, _bundle: &ArtifactBundle, artifact: &Artifact) -> String {
        let stem = match artifact.kind {
            ArtifactKind::Plan => "plans",
            ArtifactKind::ValueSemantics => "values",
            ArtifactKind::TemplateSemantics => "templates",
            ArtifactKind::Codec(Format::Tlv) => "codec_tlv",
            ArtifactKind::Codec(Format::BitPacked) => "codec_bit_packed",
            ArtifactKind::Codec(Format::Text) => "codec_text",
            ArtifactKind::Codec(Format::Xml) => "codec_xml",
            ArtifactKind::Codec(Format::Json) => "codec_json",
        };
        format!("{}.rs", stem)
    }
}

pub struct ByName;

impl OutputPartitioner for ByName {
    fn unit_for(&self, bundle: &ArtifactBundle, _artifact: &Artifact) -> String {
        format!("{}.rs", file_stem(&bundle.type_name))
    }
}

/* `MsgHeader` -> `msg_header` */
fn file_stem(type_name: &str) -> String {
    let mut stem = String::new();
    let mut previous_lower = false;
    for c in type_name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && previous_lower {
                stem.push('_');
            }
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            stem.push(c.to_ascii_lowercase());
        } else {
            if !stem.is_empty() && !stem.ends_with('_') {
                stem.push('_');
            }
            previous_lower = false;
        }
    }
    stem
}

pub fn partitioner(policy: PartitionPolicy) -> Box<dyn OutputPartitioner> {
    match policy {
        PartitionPolicy::Single => Box::new(Single),
        PartitionPolicy::ByKind => Box::new(ByKind),
        PartitionPolicy::ByName => Box::new(ByName),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use structgen_gen::codegen::artifact::partition;

    fn bundles() -> Vec<ArtifactBundle> {
        let mut header = ArtifactBundle::new("MsgHeader");
        header.push(ArtifactKind::ValueSemantics, "struct MsgHeader;".to_string());
        header.push(ArtifactKind::Codec(Format::Tlv), "impl MsgHeader {}".to_string());
        let mut body = ArtifactBundle::new("body-parts");
        body.push(ArtifactKind::ValueSemantics, "struct BodyParts;".to_string());
        vec![header, body]
    }

    #[test]
    fn single_unit_holds_everything_in_order() {
        let units = partition(&bundles(), &Single);
        assert_eq!(units.len(), 1);
        assert_eq!(units["generated.rs"], "struct MsgHeader;\nimpl MsgHeader {}\nstruct BodyParts;");
    }

    #[test]
    fn by_kind_and_by_name_split_units() {
        let units = partition(&bundles(), &ByKind);
        assert_eq!(units.keys().collect::<Vec<_>>(), vec!["values.rs", "codec_tlv.rs"]);
        assert_eq!(units["values.rs"], "struct MsgHeader;\nstruct BodyParts;");

        let units = partition(&bundles(), &ByName);
        assert_eq!(units.keys().collect::<Vec<_>>(), vec!["msg_header.rs", "body_parts.rs"]);
    }
}
