use crate::resolver::ImportResolver;
use std::path::{Path, PathBuf};
use structgen_types::{DescriptorFile, FieldType, ModuleMetadata, TypeDescriptor, TypeKind};
use tracing::debug;

/// Flatten a descriptor file by resolving all imports and inlining their types.
pub fn flatten(file_path: &Path, include_dirs: &[PathBuf]) -> anyhow::Result<DescriptorFile> {
    let mut resolver = ImportResolver::new(include_dirs.to_vec());
    resolver.load_file_with_imports(file_path)?;

    /* The last file is the root file (it's added after its imports) */
    let root_file = resolver
        .get_all_files()
        .last()
        .ok_or_else(|| anyhow::anyhow!("No descriptor files loaded"))?;

    let mut all_types = resolver.get_all_types().to_vec();
    normalize_type_refs(&mut all_types, &resolver);

    let flattened = DescriptorFile {
        module: ModuleMetadata {
            name: root_file.module.name.clone(),
            description: root_file.module.description.clone(),
            imports: Vec::new(),
        },
        types: all_types,
    };

    debug!(
        files = resolver.loaded_file_count(),
        types = flattened.types.len(),
        "flattened descriptor files"
    );

    Ok(flattened)
}

/// Flatten a descriptor file and return the result as a YAML string.
pub fn flatten_to_yaml(file_path: &Path, include_dirs: &[PathBuf]) -> anyhow::Result<String> {
    let flattened = flatten(file_path, include_dirs)?;
    Ok(serde_yml::to_string(&flattened)?)
}

/// Rewrite module-qualified type references to simple names.
pub fn normalize_type_refs(descriptors: &mut [TypeDescriptor], resolver: &ImportResolver) {
    for descriptor in descriptors.iter_mut() {
        let slots = match &mut descriptor.kind {
            TypeKind::RecordOf(seq) | TypeKind::SetOf(seq) => std::slice::from_mut(&mut seq.element),
            TypeKind::Union(union) => union.alternatives.as_mut_slice(),
            TypeKind::Record(record) => record.fields.as_mut_slice(),
        };
        for slot in slots {
            if let FieldType::TypeRef(type_ref) = &mut slot.field_type {
                if let Some(simple_name) = resolver.resolve_type_name(&type_ref.name) {
                    type_ref.name = simple_name;
                }
            }
        }
    }
}
