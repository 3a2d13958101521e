use std::fs;
use std::path::{Path, PathBuf};
use structgen_loader::structgen_types::{FieldType, TypeKind};
use structgen_loader::{flatten, flatten_to_yaml, parse_descriptor_file, ImportResolver};
use tempfile::TempDir;

const COMMON: &str = r#"
module:
  name: Common
  description: shared building blocks
types:
  - name: Ints
    kind:
      record-of:
        element:
          name: item
          field-type: {primitive: {type: integer}}
"#;

const MESSAGES: &str = r#"
module:
  name: Messages
  imports: [common.yaml]
types:
  - name: Message
    kind:
      record:
        fields:
          - name: values
            field-type: {type-ref: {name: Common.Ints}}
"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn type_names(resolver: &ImportResolver) -> Vec<&str> {
    resolver.get_all_types().iter().map(|t| t.name.as_str()).collect()
}

#[test]
fn imports_load_before_their_importers() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common.yaml", COMMON);
    let root = write(dir.path(), "messages.yaml", MESSAGES);

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&root).unwrap();

    assert_eq!(resolver.loaded_file_count(), 2);
    assert_eq!(type_names(&resolver), vec!["Ints", "Message"]);
    let modules: Vec<_> = resolver.get_all_files().iter().map(|f| f.module_name()).collect();
    assert_eq!(modules, vec!["Common", "Messages"]);
    assert_eq!(resolver.get_module_for_type("Ints"), Some("Common".to_string()));
}

#[test]
fn imports_are_found_in_include_dirs() {
    let dir = TempDir::new().unwrap();
    let lib = dir.path().join("lib");
    write(&lib, "common.yaml", COMMON);
    let root = write(&dir.path().join("src"), "messages.yaml", MESSAGES);

    let mut resolver = ImportResolver::new(Vec::new());
    let err = resolver.load_file_with_imports(&root).unwrap_err();
    assert!(err.to_string().contains("Import 'common.yaml' not found"));

    let mut resolver = ImportResolver::new(vec![lib]);
    resolver.load_file_with_imports(&root).unwrap();
    assert_eq!(type_names(&resolver), vec!["Ints", "Message"]);
}

#[test]
fn import_cycles_terminate() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "a.yaml",
        "module:\n  name: A\n  imports: [b.yaml]\ntypes:\n  - name: TypeA\n    kind:\n      set-of:\n        element: {name: x, field-type: {primitive: {type: boolean}}}\n",
    );
    let b = write(
        dir.path(),
        "b.yaml",
        "module:\n  name: B\n  imports: [a.yaml]\ntypes:\n  - name: TypeB\n    kind:\n      set-of:\n        element: {name: x, field-type: {primitive: {type: boolean}}}\n",
    );

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&b).unwrap();
    assert_eq!(type_names(&resolver), vec!["TypeA", "TypeB"]);

    /* loading an already loaded file again is a no-op */
    resolver.load_file_with_imports(&b).unwrap();
    assert_eq!(resolver.get_all_types().len(), 2);
}

#[test]
fn types_defined_twice_across_files_are_rejected() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common.yaml", COMMON);
    let other = write(dir.path(), "other.yaml", &COMMON.replace("name: Common", "name: Other"));

    let mut resolver = ImportResolver::new(Vec::new());
    resolver.load_file_with_imports(&dir.path().join("common.yaml")).unwrap();
    let err = resolver.load_file_with_imports(&other).unwrap_err();
    assert!(err.to_string().contains("Type 'Ints' in module 'Other' is already defined"));
}

#[test]
fn qualified_names_resolve_through_their_module() {
    let mut resolver = ImportResolver::new(Vec::new());
    resolver.add_file(parse_descriptor_file(COMMON).unwrap()).unwrap();

    assert_eq!(resolver.resolve_type_name("Common.Ints"), Some("Ints".to_string()));
    assert_eq!(resolver.resolve_type_name("Ints"), Some("Ints".to_string()));
    assert_eq!(resolver.resolve_type_name("Common.Missing"), None);
    assert_eq!(resolver.resolve_type_name("Elsewhere.Ints"), None);
    assert_eq!(resolver.get_modules(), vec!["Common".to_string()]);
}

#[test]
fn malformed_files_name_their_path() {
    let dir = TempDir::new().unwrap();
    let bad = write(dir.path(), "bad.yaml", "module:\n  name: Bad\ntypes:\n  - name: X\n    kind: {tuple: {}}\n");

    let mut resolver = ImportResolver::new(Vec::new());
    let err = resolver.load_file_with_imports(&bad).unwrap_err();
    assert!(err.to_string().contains("bad.yaml"));
}

#[test]
fn flatten_inlines_imports_and_simplifies_references() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "common.yaml", COMMON);
    let root = write(dir.path(), "messages.yaml", MESSAGES);

    let flattened = flatten(&root, &[]).unwrap();
    assert_eq!(flattened.module.name, "Messages");
    assert!(flattened.module.imports.is_empty());

    let names: Vec<_> = flattened.types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Ints", "Message"]);

    let TypeKind::Record(record) = &flattened.types[1].kind else {
        panic!("Message should stay a record");
    };
    assert_eq!(record.fields[0].field_type, FieldType::type_ref("Ints"));

    /* the YAML form parses back into the same file */
    let yaml = flatten_to_yaml(&root, &[]).unwrap();
    let reparsed = parse_descriptor_file(&yaml).unwrap();
    assert_eq!(reparsed.module.name, "Messages");
    assert_eq!(reparsed.types, flattened.types);
}
