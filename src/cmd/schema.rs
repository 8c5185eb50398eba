use clap::Args;
use dbpipe::json_schema;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Command whose --json output to describe (all when omitted)
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let output = match args.command {
        Some(name) => match json_schema::get_schema(&name) {
            Some(schema) => serde_json::to_string_pretty(&schema)?,
            None => anyhow::bail!(
                "No schema for '{}'. Available: {}",
                name,
                json_schema::schema_names().join(", ")
            ),
        },
        None => serde_json::to_string_pretty(&json_schema::all_schemas())?,
    };
    println!("{}", output);
    Ok(())
}
