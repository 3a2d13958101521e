use crate::types::TypeDescriptor;
use serde_derive::{Deserialize, Serialize};

/* Metadata for a descriptor file */
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleMetadata {
    /* Module the descriptors were produced from (e.g. "Messages") */
    pub name: String,

    #[serde(default)]
    pub description: String,

    /* Paths of descriptor files this one references */
    #[serde(default)]
    pub imports: Vec<String>,
}

/* Complete descriptor file: metadata and resolved type descriptors */
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DescriptorFile {
    pub module: ModuleMetadata,

    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

impl DescriptorFile {
    pub fn module_name(&self) -> &str {
        &self.module.name
    }

    pub fn imports(&self) -> &[String] {
        &self.module.imports
    }

    pub fn get_types(&self) -> &[TypeDescriptor] {
        &self.types
    }
}
