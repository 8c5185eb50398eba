//! JSON Schema generation for CLI output types.
//!
//! Schemas are generated with schemars and exported via the `schema`
//! subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// Returns all JSON schemas for commands that support --json output.
/// Uses BTreeMap for deterministic ordering (important for diffable output).
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    // capabilities command (a list, one entry per selected dialect)
    schemas.insert(
        "capabilities",
        schema_for!(Vec<crate::dialect::DialectCapabilities>),
    );

    // copy command
    schemas.insert("copy", schema_for!(crate::pipeline::CommandPlan));

    // load command
    schemas.insert("load", schema_for!(crate::command::LoadCommand));

    schemas
}

/// Generate a single schema by command name.
pub fn get_schema(command: &str) -> Option<Schema> {
    all_schemas().remove(command)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
