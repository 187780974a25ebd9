//! Script contracts, validation and loading for skygen.

pub mod errors;
pub mod load;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, Result, ScriptError, ValidationIssue, ValidationReport};
pub use load::{load_script, parse_script};
pub use model::{
    AdvanceRule, BranchArm, BranchRule, Distribution, EmitRule, ExitRule, Literal, RepeatCount,
    RepeatRule, Rule, Script, SequenceRule, SetRule, Timeline, WeightedOption, check_probability,
};
pub use schema::script_json_schema;
pub use validate::{ValidatedScript, validate_script, validate_script_json};
