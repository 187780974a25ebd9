use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use skygen_core::{DataType, PropertyValue, Schema};

/// Canonical script definition for generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Script {
    /// Contract version for the script format.
    pub script_version: String,
    /// Optional schema synchronized with the remote table before streaming.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Optional synthetic timeline settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    /// Rule tree walked once per generated object.
    pub generate: Rule,
}

impl Script {
    /// Start instant of every object's synthetic clock.
    pub fn start(&self) -> DateTime<Utc> {
        self.timeline
            .as_ref()
            .map(|timeline| timeline.start)
            .unwrap_or_else(default_start)
    }
}

/// Synthetic timeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    /// Clock value of the first event of every object.
    pub start: DateTime<Utc>,
}

fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Node of the generation rule tree.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Run child rules in order.
    Sequence(SequenceRule),
    /// Pick at most one arm with a single draw.
    Branch(BranchRule),
    /// Re-enter a subtree a fixed or drawn number of times.
    Repeat(RepeatRule),
    /// Set an object-level property that sticks to later events.
    Set(SetRule),
    /// Emit one event at the current clock.
    Emit(EmitRule),
    /// Move the object's clock forward.
    Advance(AdvanceRule),
    /// End the object's sequence with some probability.
    Exit(ExitRule),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SequenceRule {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BranchRule {
    /// Arms evaluated in declaration order. Probabilities summing below one
    /// leave room for taking no arm at all.
    pub arms: Vec<BranchArm>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BranchArm {
    pub probability: f64,
    pub rule: Rule,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RepeatRule {
    pub count: RepeatCount,
    pub rule: Box<Rule>,
}

/// Repeat count; either a literal or an inclusive range drawn once.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RepeatCount {
    Fixed(i64),
    Range { min: i64, max: i64 },
}

impl RepeatCount {
    /// Inclusive bounds of the count, or a description of why they are malformed.
    pub fn bounds(&self) -> Result<(u64, u64), String> {
        let (min, max) = match *self {
            RepeatCount::Fixed(count) => (count, count),
            RepeatCount::Range { min, max } => (min, max),
        };
        if min < 0 || max < 0 {
            return Err(format!("repeat count must not be negative (got {min}..={max})"));
        }
        if min > max {
            return Err(format!("repeat count min {min} exceeds max {max}"));
        }
        Ok((min as u64, max as u64))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetRule {
    pub property: String,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EmitRule {
    /// Per-event values, drawn in property-name order.
    #[serde(default)]
    pub values: BTreeMap<String, Distribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AdvanceRule {
    pub min_secs: i64,
    pub max_secs: i64,
}

impl AdvanceRule {
    pub fn check(&self) -> Result<(), String> {
        if self.min_secs < 0 || self.max_secs < 0 {
            return Err("advance bounds must not be negative".to_string());
        }
        if self.min_secs > self.max_secs {
            return Err(format!(
                "advance min_secs {} exceeds max_secs {}",
                self.min_secs, self.max_secs
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExitRule {
    pub probability: f64,
}

/// Source of a property value.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Constant { value: Literal },
    UniformInt { min: i64, max: i64 },
    UniformFloat { min: f64, max: f64 },
    Normal { mean: f64, std_dev: f64 },
    Bernoulli { probability: f64 },
    Choice { options: Vec<WeightedOption> },
    /// Timestamp at the object clock plus a drawn offset.
    Clock {
        min_offset_secs: i64,
        max_offset_secs: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeightedOption {
    pub value: Literal,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Literal script value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&Literal> for PropertyValue {
    fn from(value: &Literal) -> Self {
        match value {
            Literal::Boolean(value) => PropertyValue::Boolean(*value),
            Literal::Integer(value) => PropertyValue::Integer(*value),
            Literal::Float(value) => PropertyValue::Float(*value),
            Literal::String(value) => PropertyValue::String(value.clone()),
        }
    }
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Integer(_) => DataType::Integer,
            Literal::Float(_) => DataType::Float,
            Literal::String(_) => DataType::String,
        }
    }
}

impl Distribution {
    /// Check distribution parameters, describing the first problem found.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Distribution::Constant { .. } => Ok(()),
            Distribution::UniformInt { min, max } => {
                if min > max {
                    return Err(format!("uniform_int min {min} exceeds max {max}"));
                }
                Ok(())
            }
            Distribution::UniformFloat { min, max } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err("uniform_float bounds must be finite".to_string());
                }
                if min > max {
                    return Err(format!("uniform_float min {min} exceeds max {max}"));
                }
                Ok(())
            }
            Distribution::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(format!("normal std_dev must be finite and non-negative (got {std_dev})"));
                }
                Ok(())
            }
            Distribution::Bernoulli { probability } => check_probability(*probability),
            Distribution::Choice { options } => {
                if options.is_empty() {
                    return Err("choice requires at least one option".to_string());
                }
                if options
                    .iter()
                    .any(|option| !option.weight.is_finite() || option.weight < 0.0)
                {
                    return Err("choice weights must be finite and non-negative".to_string());
                }
                if options.iter().map(|option| option.weight).sum::<f64>() <= 0.0 {
                    return Err("choice weights must not all be zero".to_string());
                }
                Ok(())
            }
            Distribution::Clock {
                min_offset_secs,
                max_offset_secs,
            } => {
                if min_offset_secs > max_offset_secs {
                    return Err(format!(
                        "clock min_offset_secs {min_offset_secs} exceeds max_offset_secs {max_offset_secs}"
                    ));
                }
                Ok(())
            }
        }
    }

    /// Data types the distribution can produce.
    pub fn output_types(&self) -> Vec<DataType> {
        match self {
            Distribution::Constant { value } => vec![value.data_type()],
            Distribution::UniformInt { .. } => vec![DataType::Integer],
            Distribution::UniformFloat { .. } | Distribution::Normal { .. } => {
                vec![DataType::Float]
            }
            Distribution::Bernoulli { .. } => vec![DataType::Boolean],
            Distribution::Choice { options } => {
                let mut types: Vec<DataType> = Vec::new();
                for option in options {
                    let data_type = option.value.data_type();
                    if !types.contains(&data_type) {
                        types.push(data_type);
                    }
                }
                types
            }
            Distribution::Clock { .. } => vec![DataType::Timestamp],
        }
    }
}

/// Check that a probability lies in `[0, 1]`.
pub fn check_probability(probability: f64) -> Result<(), String> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(format!("probability must be within [0, 1] (got {probability})"));
    }
    Ok(())
}
