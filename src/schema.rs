use schemars::schema_for;

use bitgpt_core::model::EventJournal;

/// Generate the JSON Schema for event journals.
pub fn get_schema_json() -> String {
    let schema = schema_for!(EventJournal);
    serde_json::to_string_pretty(&schema).expect("schema serializes")
}

pub fn run() -> anyhow::Result<()> {
    println!("{}", get_schema_json());
    Ok(())
}
