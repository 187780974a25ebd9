use jsonschema::JSONSchema;
use serde_json::Value;

use skygen_core::{SCRIPT_VERSION, Schema, validate_schema};

use crate::errors::{ScriptError, ValidationIssue, ValidationReport};
use crate::model::{Distribution, Rule, Script, check_probability};

/// Allowed slack when summing branch probabilities.
const PROBABILITY_EPSILON: f64 = 1e-9;

/// Validated script with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedScript {
    pub script: Script,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a script JSON document against the script JSON Schema.
pub fn validate_script_json(
    script_json: &Value,
    script_schema: &Value,
) -> Result<ValidationReport, ScriptError> {
    let compiled =
        JSONSchema::compile(script_schema).map_err(|err| ScriptError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(script_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
                None,
            ));
        }
    }

    Ok(report)
}

/// Validate a parsed script: schema invariants, property references and
/// rule parameters.
pub fn validate_script(script: &Script) -> ValidationReport {
    let mut report = ValidationReport::default();

    if script.script_version != SCRIPT_VERSION {
        report.push(ValidationIssue::error(
            "script_version_mismatch",
            "/script_version",
            format!(
                "script_version '{}' is not supported (expected '{}')",
                script.script_version, SCRIPT_VERSION
            ),
            Some(format!("set script_version to \"{SCRIPT_VERSION}\"")),
        ));
    }

    if let Some(schema) = &script.schema {
        if let Err(err) = validate_schema(schema) {
            report.push(ValidationIssue::error(
                "invalid_schema",
                "/schema/properties",
                err.to_string(),
                None,
            ));
        }
        if schema.is_empty() {
            report.push(ValidationIssue::warning(
                "schema_empty",
                "/schema/properties",
                "schema declares no properties",
                Some("remove the schema block or declare properties".to_string()),
            ));
        }
    }

    let mut walker = RuleWalker {
        schema: script.schema.as_ref(),
        report: &mut report,
        emits: 0,
    };
    walker.walk(&script.generate, "/generate");
    let emits = walker.emits;

    if emits == 0 {
        report.push(ValidationIssue::warning(
            "no_emit",
            "/generate",
            "rule tree never emits an event",
            Some("add an emit rule".to_string()),
        ));
    }

    report
}

struct RuleWalker<'a> {
    schema: Option<&'a Schema>,
    report: &'a mut ValidationReport,
    emits: usize,
}

impl RuleWalker<'_> {
    fn walk(&mut self, rule: &Rule, path: &str) {
        match rule {
            Rule::Sequence(sequence) => {
                if sequence.rules.is_empty() {
                    self.report.push(ValidationIssue::warning(
                        "sequence_empty",
                        format!("{path}/rules"),
                        "sequence has no rules",
                        None,
                    ));
                }
                for (idx, child) in sequence.rules.iter().enumerate() {
                    self.walk(child, &format!("{path}/rules/{idx}"));
                }
            }
            Rule::Branch(branch) => {
                if branch.arms.is_empty() {
                    self.report.push(ValidationIssue::warning(
                        "branch_empty",
                        format!("{path}/arms"),
                        "branch has no arms",
                        None,
                    ));
                }
                let mut total = 0.0;
                for (idx, arm) in branch.arms.iter().enumerate() {
                    let arm_path = format!("{path}/arms/{idx}");
                    if let Err(message) = check_probability(arm.probability) {
                        self.report.push(ValidationIssue::error(
                            "probability_out_of_range",
                            format!("{arm_path}/probability"),
                            message,
                            None,
                        ));
                    }
                    total += arm.probability;
                    self.walk(&arm.rule, &format!("{arm_path}/rule"));
                }
                if total > 1.0 + PROBABILITY_EPSILON {
                    self.report.push(ValidationIssue::error(
                        "probability_sum_exceeds_one",
                        format!("{path}/arms"),
                        format!("branch probabilities sum to {total}"),
                        Some("probabilities must add up to at most 1".to_string()),
                    ));
                }
            }
            Rule::Repeat(repeat) => {
                if let Err(message) = repeat.count.bounds() {
                    self.report.push(ValidationIssue::error(
                        "invalid_repeat_count",
                        format!("{path}/count"),
                        message,
                        None,
                    ));
                }
                self.walk(&repeat.rule, &format!("{path}/rule"));
            }
            Rule::Set(set) => {
                self.check_property(&set.property, &set.distribution, path, "property");
                self.check_distribution(&set.distribution, &format!("{path}/distribution"));
            }
            Rule::Emit(emit) => {
                self.emits += 1;
                for (name, distribution) in &emit.values {
                    let value_path = format!("{path}/values/{name}");
                    self.check_property(name, distribution, &value_path, "");
                    self.check_distribution(distribution, &value_path);
                }
            }
            Rule::Advance(advance) => {
                if let Err(message) = advance.check() {
                    self.report.push(ValidationIssue::error(
                        "invalid_advance",
                        path.to_string(),
                        message,
                        None,
                    ));
                }
            }
            Rule::Exit(exit) => {
                if let Err(message) = check_probability(exit.probability) {
                    self.report.push(ValidationIssue::error(
                        "probability_out_of_range",
                        format!("{path}/probability"),
                        message,
                        None,
                    ));
                }
            }
        }
    }

    fn check_property(&mut self, name: &str, distribution: &Distribution, path: &str, field: &str) {
        let Some(schema) = self.schema else {
            return;
        };
        let issue_path = if field.is_empty() {
            path.to_string()
        } else {
            format!("{path}/{field}")
        };

        let Some(property) = schema.property(name) else {
            self.report.push(ValidationIssue::error(
                "unknown_property",
                issue_path,
                format!("property '{name}' is not declared in the schema"),
                Some("declare the property in schema.properties".to_string()),
            ));
            return;
        };

        for output in distribution.output_types() {
            if !property.data_type.accepts(output) {
                self.report.push(ValidationIssue::error(
                    "type_mismatch",
                    issue_path.clone(),
                    format!(
                        "property '{name}' is declared as {} but the distribution produces {output}",
                        property.data_type
                    ),
                    None,
                ));
            }
        }
    }

    fn check_distribution(&mut self, distribution: &Distribution, path: &str) {
        if let Err(message) = distribution.check() {
            self.report.push(ValidationIssue::error(
                "invalid_distribution",
                path.to_string(),
                message,
                None,
            ));
        }
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
