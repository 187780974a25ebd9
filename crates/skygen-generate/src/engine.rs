use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

use skygen_core::{Event, PropertyValue, Schema};
use skygen_script::{BranchRule, RepeatCount, Rule, Script, check_probability};

use crate::distributions::{SampleContext, sample};
use crate::errors::GenerationError;
use crate::model::GenerateOptions;
use crate::random::RandomSource;

/// Allowed slack when summing branch probabilities.
const PROBABILITY_EPSILON: f64 = 1e-9;

/// Walks a script's rule tree to synthesize one object's events.
#[derive(Debug, Clone)]
pub struct GenerationEngine<'a> {
    script: &'a Script,
    options: GenerateOptions,
}

impl<'a> GenerationEngine<'a> {
    pub fn new(script: &'a Script, options: GenerateOptions) -> Self {
        Self { script, options }
    }

    /// Generate the ordered events of one object.
    ///
    /// Every stochastic choice draws from `rng` in tree order, so the same
    /// stream state always yields the same events.
    pub fn generate(
        &self,
        object_id: &str,
        rng: &mut RandomSource,
    ) -> Result<Vec<Event>, GenerationError> {
        let mut object = ObjectRun {
            schema: self.script.schema.as_ref(),
            object_id,
            clock: self.script.start(),
            state: BTreeMap::new(),
            events: Vec::new(),
            limit: self.options.max_events_per_object,
            steps: 0,
            step_limit: self.options.max_steps_per_object,
        };
        object.run(&self.script.generate, "/generate", rng)?;
        Ok(object.events)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

struct ObjectRun<'a> {
    schema: Option<&'a Schema>,
    object_id: &'a str,
    clock: DateTime<Utc>,
    /// Values set on the object, carried onto every later event.
    state: BTreeMap<String, PropertyValue>,
    events: Vec<Event>,
    limit: usize,
    /// Rule visits so far; bounds trees that loop without emitting.
    steps: u64,
    step_limit: u64,
}

impl ObjectRun<'_> {
    fn run(
        &mut self,
        rule: &Rule,
        path: &str,
        rng: &mut RandomSource,
    ) -> Result<Flow, GenerationError> {
        if self.steps >= self.step_limit {
            return Err(GenerationError::StepLimitExceeded {
                limit: self.step_limit,
                path: path.to_string(),
            });
        }
        self.steps += 1;

        match rule {
            Rule::Sequence(sequence) => {
                for (idx, child) in sequence.rules.iter().enumerate() {
                    if self.run(child, &format!("{path}/rules/{idx}"), rng)? == Flow::Exit {
                        return Ok(Flow::Exit);
                    }
                }
                Ok(Flow::Continue)
            }
            Rule::Branch(branch) => self.branch(branch, path, rng),
            Rule::Repeat(repeat) => {
                let (min, max) =
                    repeat
                        .count
                        .bounds()
                        .map_err(|message| GenerationError::InvalidParameter {
                            path: format!("{path}/count"),
                            message,
                        })?;
                let count = match repeat.count {
                    RepeatCount::Fixed(_) => min,
                    RepeatCount::Range { .. } => rng.range_u64(min, max),
                };
                let child_path = format!("{path}/rule");
                for _ in 0..count {
                    if self.run(&repeat.rule, &child_path, rng)? == Flow::Exit {
                        return Ok(Flow::Exit);
                    }
                }
                Ok(Flow::Continue)
            }
            Rule::Set(set) => {
                let value_path = format!("{path}/distribution");
                let value = self.draw(&set.property, &set.distribution, &value_path, rng)?;
                self.state.insert(set.property.clone(), value);
                Ok(Flow::Continue)
            }
            Rule::Emit(emit) => {
                if self.events.len() >= self.limit {
                    return Err(GenerationError::EventLimitExceeded { limit: self.limit });
                }

                let mut event = Event::new(self.object_id, self.clock);
                event.values = self.state.clone();
                for (name, distribution) in &emit.values {
                    let value_path = format!("{path}/values/{name}");
                    let value = self.draw(name, distribution, &value_path, rng)?;
                    event.values.insert(name.clone(), value);
                }
                self.events.push(event);
                self.clear_transient_state();
                Ok(Flow::Continue)
            }
            Rule::Advance(advance) => {
                advance
                    .check()
                    .map_err(|message| GenerationError::InvalidParameter {
                        path: path.to_string(),
                        message,
                    })?;
                let secs = rng.range_i64(advance.min_secs, advance.max_secs);
                self.clock = TimeDelta::try_seconds(secs)
                    .and_then(|delta| self.clock.checked_add_signed(delta))
                    .ok_or_else(|| GenerationError::ClockOverflow {
                        path: path.to_string(),
                    })?;
                Ok(Flow::Continue)
            }
            Rule::Exit(exit) => {
                check_probability(exit.probability).map_err(|message| {
                    GenerationError::InvalidParameter {
                        path: format!("{path}/probability"),
                        message,
                    }
                })?;
                if rng.next_f64() < exit.probability {
                    Ok(Flow::Exit)
                } else {
                    Ok(Flow::Continue)
                }
            }
        }
    }

    fn branch(
        &mut self,
        branch: &BranchRule,
        path: &str,
        rng: &mut RandomSource,
    ) -> Result<Flow, GenerationError> {
        let mut total = 0.0;
        for (idx, arm) in branch.arms.iter().enumerate() {
            check_probability(arm.probability).map_err(|message| {
                GenerationError::InvalidParameter {
                    path: format!("{path}/arms/{idx}/probability"),
                    message,
                }
            })?;
            total += arm.probability;
        }
        if total > 1.0 + PROBABILITY_EPSILON {
            return Err(GenerationError::InvalidParameter {
                path: format!("{path}/arms"),
                message: format!("branch probabilities sum to {total}"),
            });
        }

        let roll = rng.next_f64();
        let mut cumulative = 0.0;
        for (idx, arm) in branch.arms.iter().enumerate() {
            cumulative += arm.probability;
            if roll < cumulative {
                return self.run(&arm.rule, &format!("{path}/arms/{idx}/rule"), rng);
            }
        }
        Ok(Flow::Continue)
    }

    /// Draw a value for `property`, checking it against the schema when one exists.
    fn draw(
        &self,
        property: &str,
        distribution: &skygen_script::Distribution,
        path: &str,
        rng: &mut RandomSource,
    ) -> Result<PropertyValue, GenerationError> {
        let declared = match self.schema {
            Some(schema) => Some(schema.property(property).ok_or_else(|| {
                GenerationError::UndeclaredProperty {
                    property: property.to_string(),
                    path: path.to_string(),
                }
            })?),
            None => None,
        };

        let ctx = SampleContext {
            clock: self.clock,
            path,
        };
        let value = sample(distribution, &ctx, rng)?;

        match declared {
            Some(definition) => {
                let found = value.data_type();
                value
                    .coerce(definition.data_type)
                    .map_err(|_| GenerationError::TypeMismatch {
                        property: property.to_string(),
                        expected: definition.data_type,
                        found,
                    })
            }
            None => Ok(value),
        }
    }

    fn clear_transient_state(&mut self) {
        let Some(schema) = self.schema else {
            return;
        };
        self.state.retain(|name, _| {
            schema
                .property(name)
                .is_none_or(|property| !property.transient)
        });
    }
}
