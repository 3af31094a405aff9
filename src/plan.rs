//! Training Plan
//!
//! The ordered phases of a training run. Every step activates its own
//! question pool and thresholds; the leaf budget is shared by all steps.
use crate::errors::CartError;
use crate::properties::{PropertyMap, PropertyMapRef};
use crate::question::QuestionList;
use crate::utils::{validate_count_parameter, validate_positive_float_parameter};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// What a step does with the open leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StepAction {
    /// Grow the tree by splitting leaves.
    Split,
    /// Any other action tag. Accepted in plans but not executed.
    Reserved(String),
}

impl FromStr for StepAction {
    type Err = CartError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CartError::ParseString(
                s.to_string(),
                "StepAction".to_string(),
                "split or a reserved action name".to_string(),
            ));
        }
        if s.eq_ignore_ascii_case("split") {
            Ok(StepAction::Split)
        } else {
            Ok(StepAction::Reserved(s.to_string()))
        }
    }
}

impl TryFrom<String> for StepAction {
    type Error = CartError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StepAction> for String {
    fn from(action: StepAction) -> Self {
        action.to_string()
    }
}

impl Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StepAction::Split => write!(f, "split"),
            StepAction::Reserved(name) => write!(f, "{}", name),
        }
    }
}

/// One phase of a training plan.
#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub action: StepAction,
    /// Minimal observation mass on each side of a split.
    pub min_obs: f64,
    /// A split must reduce the score by more than this.
    pub min_gain: f64,
    /// Number of questions drawn per leaf, 1 asks every question.
    pub n_random_question: usize,
    pub questions: QuestionList,
}

impl Step {
    pub fn new(name: &str, questions: QuestionList) -> Self {
        Step {
            name: name.to_string(),
            action: StepAction::Split,
            min_obs: 1.0,
            min_gain: 0.0,
            n_random_question: 1,
            questions,
        }
    }

    pub fn set_action(mut self, action: StepAction) -> Self {
        self.action = action;
        self
    }

    pub fn set_min_obs(mut self, min_obs: f64) -> Self {
        self.min_obs = min_obs;
        self
    }

    pub fn set_min_gain(mut self, min_gain: f64) -> Self {
        self.min_gain = min_gain;
        self
    }

    pub fn set_n_random_question(mut self, n_random_question: usize) -> Self {
        self.n_random_question = n_random_question;
        self
    }

    pub fn is_randomized(&self) -> bool {
        self.n_random_question > 1
    }

    pub fn validate_parameters(&self, map: &PropertyMap) -> Result<(), CartError> {
        validate_positive_float_parameter(self.min_obs, "min_obs")?;
        validate_positive_float_parameter(self.min_gain, "min_gain")?;
        validate_count_parameter(self.n_random_question, 1, "n_random_question")?;
        for q in &self.questions {
            q.validate(map)?;
        }
        Ok(())
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "step \"{}\": action={} min-obs={} min-gain={} questions={}",
            self.name,
            self.action,
            self.min_obs,
            self.min_gain,
            self.questions.len()
        )?;
        if self.is_randomized() {
            write!(f, " randomize={}", self.n_random_question)?;
        }
        Ok(())
    }
}

/// Steps run in order against one schema.
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    map: PropertyMapRef,
    max_leaves: usize,
    steps: Vec<Step>,
}

impl TrainingPlan {
    pub fn new(map: PropertyMapRef) -> Result<Self, CartError> {
        map.require_set()?;
        Ok(TrainingPlan {
            map,
            max_leaves: usize::MAX,
            steps: Vec::new(),
        })
    }

    /// Cap on the number of leaves of the trained tree.
    pub fn set_max_leaves(mut self, max_leaves: usize) -> Self {
        self.max_leaves = max_leaves;
        self
    }

    /// Append a step after checking its thresholds and questions.
    pub fn add_step(&mut self, step: Step) -> Result<(), CartError> {
        step.validate_parameters(&self.map)?;
        self.steps.push(step);
        Ok(())
    }

    pub fn map(&self) -> &PropertyMap {
        &self.map
    }

    pub fn map_ref(&self) -> &PropertyMapRef {
        &self.map
    }

    pub fn max_leaves(&self) -> usize {
        self.max_leaves
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl Display for TrainingPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "training plan:")?;
        if self.max_leaves != usize::MAX {
            writeln!(f, "  max-leaves: {}", self.max_leaves)?;
        }
        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }
        Ok(())
    }
}
