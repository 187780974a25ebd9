use std::path::Path;

use serde_json::Value;

use crate::errors::{Result, ScriptError, ValidationIssue, ValidationReport};
use crate::model::Script;
use crate::schema::script_json_schema;
use crate::validate::{ValidatedScript, validate_script, validate_script_json};

/// Read and validate a script file.
pub fn load_script(path: &Path) -> Result<ValidatedScript> {
    let contents = std::fs::read_to_string(path)?;
    parse_script(&contents)
}

/// Parse and validate script source text.
///
/// Structural validation against the script JSON Schema runs first; a script
/// is only returned when both structural and semantic checks pass.
pub fn parse_script(source: &str) -> Result<ValidatedScript> {
    let script_json: Value = serde_json::from_str(source)?;
    let script_schema = serde_json::to_value(script_json_schema())?;

    let structural = validate_script_json(&script_json, &script_schema)?;
    if !structural.is_ok() {
        return Err(ScriptError::Invalid(structural));
    }

    let script: Script = serde_json::from_value(script_json).map_err(|err| {
        let mut report = ValidationReport::default();
        report.push(ValidationIssue::error(
            "invalid_script_json",
            "/",
            err.to_string(),
            None,
        ));
        ScriptError::Invalid(report)
    })?;

    let report = validate_script(&script);
    if !report.is_ok() {
        return Err(ScriptError::Invalid(report));
    }

    Ok(ValidatedScript {
        script,
        warnings: report.warnings,
    })
}
