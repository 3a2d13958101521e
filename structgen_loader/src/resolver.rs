use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use structgen_types::{DescriptorFile, TypeDescriptor};
use tracing::debug;

/* Parse descriptor file contents */
pub fn parse_descriptor_file(contents: &str) -> anyhow::Result<DescriptorFile> {
    let file: DescriptorFile = serde_yml::from_str(contents)?;
    Ok(file)
}

/* Import resolver for loading and merging imported descriptor files */
pub struct ImportResolver {
    /* Track loaded files to detect circular imports */
    loaded_files: HashSet<PathBuf>,

    /* Include directories for searching imports */
    include_dirs: Vec<PathBuf>,

    /* All collected type descriptors */
    all_types: Vec<TypeDescriptor>,

    /* All loaded descriptor files, imports before importers */
    all_files: Vec<DescriptorFile>,

    /* Map from module name to the types it declares */
    module_types: HashMap<String, Vec<String>>,
}

impl ImportResolver {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        Self {
            loaded_files: HashSet::new(),
            include_dirs,
            all_types: Vec::new(),
            all_files: Vec::new(),
            module_types: HashMap::new(),
        }
    }

    /* Resolve an import path relative to the importing file or the include directories */
    fn resolve_import_path(&self, import_path: &str, base_file: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = base_file.parent() {
            let relative_path = parent.join(import_path);
            if relative_path.exists() {
                return Ok(relative_path.canonicalize()?);
            }
        }

        for include_dir in &self.include_dirs {
            let include_path = include_dir.join(import_path);
            if include_path.exists() {
                return Ok(include_path.canonicalize()?);
            }
        }

        anyhow::bail!(
            "Import '{}' not found relative to '{}' or in include directories",
            import_path,
            base_file.display()
        )
    }

    /* Load a descriptor file and recursively load its imports */
    pub fn load_file_with_imports(&mut self, file_path: &Path) -> anyhow::Result<()> {
        let canonical_path = file_path.canonicalize()?;

        if self.loaded_files.contains(&canonical_path) {
            debug!(file = %file_path.display(), "skipping already loaded descriptor file");
            return Ok(());
        }

        /* Mark as loaded before processing imports so import cycles terminate */
        self.loaded_files.insert(canonical_path);

        let contents = std::fs::read_to_string(file_path)?;
        let file = parse_descriptor_file(&contents)
            .map_err(|e| anyhow::anyhow!("{}: {}", file_path.display(), e))?;

        debug!(
            file = %file_path.display(),
            module = file.module_name(),
            imports = file.imports().len(),
            types = file.get_types().len(),
            "loaded descriptor file"
        );

        let imports = file.imports().to_vec();
        for import in &imports {
            let import_path = self.resolve_import_path(import, file_path)?;
            self.load_file_with_imports(&import_path)?;
        }

        self.add_file(file)
    }

    /* Register an already parsed file (no import processing) */
    pub fn add_file(&mut self, file: DescriptorFile) -> anyhow::Result<()> {
        for descriptor in file.get_types() {
            if self.all_types.iter().any(|t| t.name == descriptor.name) {
                anyhow::bail!(
                    "Type '{}' in module '{}' is already defined by another descriptor file",
                    descriptor.name,
                    file.module_name()
                );
            }
        }

        let type_names: Vec<String> = file.get_types().iter().map(|t| t.name.clone()).collect();
        self.all_types.extend(file.get_types().iter().cloned());
        self.module_types
            .entry(file.module_name().to_string())
            .or_default()
            .extend(type_names);
        self.all_files.push(file);
        Ok(())
    }

    pub fn get_all_types(&self) -> &[TypeDescriptor] {
        &self.all_types
    }

    pub fn get_all_files(&self) -> &[DescriptorFile] {
        &self.all_files
    }

    pub fn loaded_file_count(&self) -> usize {
        self.loaded_files.len()
    }

    /* Resolve a possibly module-qualified name ("Module.Type") to the simple type name */
    pub fn resolve_type_name(&self, type_name: &str) -> Option<String> {
        match type_name.rsplit_once('.') {
            Some((module, simple)) => self
                .module_types
                .get(module)
                .filter(|types| types.iter().any(|t| t == simple))
                .map(|_| simple.to_string()),
            None => Some(type_name.to_string()),
        }
    }

    pub fn get_module_for_type(&self, type_name: &str) -> Option<String> {
        self.module_types
            .iter()
            .find(|(_, types)| types.iter().any(|t| t == type_name))
            .map(|(module, _)| module.clone())
    }

    pub fn get_modules(&self) -> Vec<String> {
        self.module_types.keys().cloned().collect()
    }
}
