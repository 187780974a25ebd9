use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::Script;

/// Emit the JSON Schema for script documents.
pub fn script_json_schema() -> RootSchema {
    schema_for!(Script)
}
