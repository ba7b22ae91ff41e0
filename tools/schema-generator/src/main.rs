//! Generate the JSON schema of descriptor catalogs
//!
//! Writes `json_schema/qbo-mirror.schema.json` at the workspace root, or to the
//! path given as first argument. Editors pick it up through a
//! `# yaml-language-server: $schema=...` line at the top of a catalog.

use qbo_mirror_schemas::Catalog;
use schemars::schema_for;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn default_output() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map(PathBuf::from)
        .ok_or("schema-generator must live two levels below the workspace root")?;

    Ok(root.join("json_schema").join("qbo-mirror.schema.json"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_for!(Catalog);
    let schema_json = serde_json::to_string_pretty(&schema)?;

    let output_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => default_output()?,
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&output_path)?;
    file.write_all(schema_json.as_bytes())?;

    println!("Generated JSON schema at: {}", output_path.display());

    Ok(())
}
