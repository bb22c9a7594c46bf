//! Schema command

use super::util::print_json;
use super::SchemaKind;
use declgen::{Config, DeclarationFile, GenerationMeta, Result};

/// Print the JSON schema of an input format
pub fn cmd_schema(kind: SchemaKind) -> Result<()> {
    let schema = match kind {
        SchemaKind::Declarations => DeclarationFile::json_schema(),
        SchemaKind::Config => serde_json::to_value(schemars::schema_for!(Config))?,
        SchemaKind::Meta => serde_json::to_value(schemars::schema_for!(GenerationMeta))?,
    };
    print_json(&schema)
}
