/* Flatten command - inline every import of a descriptor file */

use std::path::{Path, PathBuf};

pub fn run(file: &Path, include_dirs: &[PathBuf], output: &Path, verbose: bool) -> anyhow::Result<()> {
    if verbose {
        println!("Flattening: {}", file.display());
        for dir in include_dirs {
            println!("  Include dir: {}", dir.display());
        }
    }

    let yaml = structgen_loader::flatten_to_yaml(file, include_dirs)?;
    std::fs::write(output, &yaml)?;

    if verbose {
        println!("Written to: {}", output.display());
    }

    Ok(())
}
