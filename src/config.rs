//! Configuration
//!
//! Serializable descriptors of property schemas, question pools, example
//! lists and training plans, and the builders turning them into the
//! in-memory objects the trainer works on.
use crate::constants::PREDICATE_VALUE;
use crate::errors::CartError;
use crate::example::{Example, ExampleList, FloatBox};
use crate::plan::{Step, StepAction, TrainingPlan};
use crate::properties::{PropertyMap, PropertyMapRef, StoredProperties};
use crate::question::{Question, QuestionList, QuestionRef};
use crate::scorer::ScorerKind;
use crate::trainer::DecisionTreeTrainer;
use hashbrown::HashMap;
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;

fn default_n_obs() -> f64 {
    1.0
}
fn default_min_obs() -> f64 {
    1.0
}
fn default_action() -> StepAction {
    StepAction::Split
}
fn default_n_question() -> usize {
    5
}

/// One question, or a template expanding to several.
///
/// Without `for_each_key` the question is asked about `key`. With
/// `for_each_key` it is asked about every listed key, an empty list meaning
/// every key of the schema. Without `for_each_value` one question per key
/// accepts `values`: a single value makes a scalar question, several values a
/// set question, no value the predicate value "true". With `for_each_value`
/// one scalar question is made per listed value, an empty list meaning the
/// whole vocabulary of the key. A key with two values then gets a single
/// question, since its second question would be the negation of the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub for_each_key: Option<Vec<String>>,
    #[serde(default)]
    pub for_each_value: Option<Vec<String>>,
}

impl QuestionConfig {
    /// Expand the template into questions bound to `map`.
    pub fn build(&self, map: &PropertyMap) -> Result<Vec<QuestionRef>, CartError> {
        map.require_set()?;
        let keys: Vec<String> = match (&self.for_each_key, &self.key) {
            (Some(keys), _) if keys.is_empty() => map.keys().to_vec(),
            (Some(keys), _) => keys.clone(),
            (None, Some(key)) => vec![key.clone()],
            (None, None) => {
                return Err(CartError::InvalidParameter(
                    "question".to_string(),
                    "a key or for_each_key".to_string(),
                    "neither".to_string(),
                ))
            }
        };
        let mut questions = Vec::new();
        for key in &keys {
            match &self.for_each_value {
                Some(values) if values.is_empty() => {
                    let vocabulary = map.values(map.require_key(key)?)?;
                    let symbols = if vocabulary.len() == 2 {
                        &vocabulary.symbols()[..1]
                    } else {
                        vocabulary.symbols()
                    };
                    for value in symbols {
                        questions.push(Rc::new(Question::scalar(map, key, value, &self.description)?));
                    }
                }
                Some(values) => {
                    for value in values {
                        questions.push(Rc::new(Question::scalar(map, key, value, &self.description)?));
                    }
                }
                None => questions.push(Rc::new(self.single(map, key)?)),
            }
        }
        Ok(questions)
    }

    fn single(&self, map: &PropertyMap, key: &str) -> Result<Question, CartError> {
        match self.values.as_slice() {
            [] => {
                warn!("no values for question on key \"{}\", assume predicate", key);
                Question::scalar(map, key, PREDICATE_VALUE, &self.description)
            }
            [value] => Question::scalar(map, key, value, &self.description),
            values => Question::set(map, key, values, &self.description),
        }
    }
}

/// Expand a sequence of question templates into one pool.
pub fn build_questions(configs: &[QuestionConfig], map: &PropertyMap) -> Result<QuestionList, CartError> {
    let mut list = QuestionList::new();
    for config in configs {
        for question in config.build(map)? {
            list.push(question);
        }
    }
    Ok(list)
}

/// Properties by name, an observation matrix given by rows and a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleConfig {
    pub properties: HashMap<String, String>,
    #[serde(default)]
    pub matrix: Vec<Vec<f64>>,
    #[serde(default = "default_n_obs")]
    pub n_obs: f64,
}

impl ExampleConfig {
    pub fn build(&self, map: &PropertyMapRef) -> Result<Example, CartError> {
        let mut pairs: Vec<(&String, &String)> = self.properties.iter().collect();
        pairs.sort();
        let properties = StoredProperties::from_pairs(map.clone(), &pairs)?;
        let rows = self.matrix.len();
        let columns = self.matrix.first().map_or(0, |r| r.len());
        let mut values = FloatBox::new(rows, columns)?;
        for (i, row) in self.matrix.iter().enumerate() {
            if row.len() != columns {
                return Err(CartError::InvalidShape(rows, columns, row.len()));
            }
            for (j, v) in row.iter().enumerate() {
                values.set_at(i, j, *v);
            }
        }
        Ok(Example::new(properties, values, self.n_obs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleListConfig {
    pub properties: PropertyMap,
    pub examples: Vec<ExampleConfig>,
}

impl ExampleListConfig {
    pub fn build(&self) -> Result<ExampleList, CartError> {
        self.build_with_map(Rc::new(self.properties.clone()))
    }

    /// Build against an already shared schema, which must equal the described one.
    pub fn build_with_map(&self, map: PropertyMapRef) -> Result<ExampleList, CartError> {
        check_map(&map, &self.properties)?;
        let mut list = ExampleList::new(map.clone())?;
        for example in &self.examples {
            list.add(example.build(&map)?)?;
        }
        Ok(list)
    }
}

/// Sampling of the questions tried per leaf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomizeConfig {
    #[serde(default = "default_n_question")]
    pub n_question: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_action")]
    pub action: StepAction,
    #[serde(default = "default_min_obs")]
    pub min_obs: f64,
    #[serde(default)]
    pub min_gain: f64,
    #[serde(default)]
    pub randomize: Option<RandomizeConfig>,
    pub questions: Vec<QuestionConfig>,
}

impl StepConfig {
    pub fn build(&self, map: &PropertyMap) -> Result<Step, CartError> {
        let n_random_question = self.randomize.map_or(1, |r| r.n_question.max(1));
        Ok(Step::new(&self.name, build_questions(&self.questions, map)?)
            .set_action(self.action.clone())
            .set_min_obs(self.min_obs)
            .set_min_gain(self.min_gain)
            .set_n_random_question(n_random_question))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlanConfig {
    pub properties: PropertyMap,
    #[serde(default)]
    pub max_leaves: Option<usize>,
    pub steps: Vec<StepConfig>,
}

impl TrainingPlanConfig {
    pub fn build(&self) -> Result<TrainingPlan, CartError> {
        self.build_with_map(Rc::new(self.properties.clone()))
    }

    /// Build against an already shared schema, which must equal the described one.
    pub fn build_with_map(&self, map: PropertyMapRef) -> Result<TrainingPlan, CartError> {
        check_map(&map, &self.properties)?;
        let mut plan = TrainingPlan::new(map.clone())?.set_max_leaves(self.max_leaves.unwrap_or(usize::MAX));
        for step in &self.steps {
            plan.add_step(step.build(&map)?)?;
        }
        Ok(plan)
    }
}

/// Trainer settings together with the plan it follows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default)]
    pub scorer: ScorerKind,
    #[serde(default)]
    pub seed: u64,
    pub plan: TrainingPlanConfig,
}

impl TrainerConfig {
    pub fn build(&self) -> Result<DecisionTreeTrainer, CartError> {
        self.build_with_map(Rc::new(self.plan.properties.clone()))
    }

    pub fn build_with_map(&self, map: PropertyMapRef) -> Result<DecisionTreeTrainer, CartError> {
        Ok(DecisionTreeTrainer::new(self.plan.build_with_map(map)?)
            .set_scorer_kind(self.scorer)
            .set_seed(self.seed))
    }
}

fn check_map(map: &PropertyMap, described: &PropertyMap) -> Result<(), CartError> {
    let diff = map.diff(described);
    if diff.has_differences() {
        Err(CartError::PropertyMapMismatch(diff.to_string()))
    } else {
        Ok(())
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save a configuration as a json object to a file.
    ///
    /// * `path` - Path to save the configuration.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CartError> {
        fs::write(path, self.json_dump()?).map_err(|e| CartError::UnableToWrite(e.to_string()))
    }

    /// Dump a configuration as a json object
    fn json_dump(&self) -> Result<String, CartError> {
        serde_json::to_string(self).map_err(|e| CartError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, CartError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| CartError::UnableToRead(e.to_string()))
    }

    /// Load a configuration from a path to a json object.
    ///
    /// * `path` - Path to load the configuration from.
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, CartError> {
        let json_str = fs::read_to_string(path).map_err(|e| CartError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for PropertyMap {}
impl ConfigIO for ExampleListConfig {}
impl ConfigIO for TrainingPlanConfig {}
impl ConfigIO for TrainerConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"[
        {"key": "central", "values": ["a", "e", "i"]},
        {"key": "boundary", "values": ["true", "false"]}
    ]"#;

    fn map() -> PropertyMap {
        PropertyMap::from_json(SCHEMA).unwrap()
    }

    fn describe(questions: &QuestionList, map: &PropertyMap) -> Vec<String> {
        questions.iter().map(|q| q.describe(map).to_string()).collect()
    }

    #[test]
    fn test_single_questions() {
        let map = map();
        let configs: Vec<QuestionConfig> = serde_json::from_str(
            r#"[
                {"key": "central", "values": ["a"]},
                {"key": "central", "values": ["i", "e"], "description": "front"},
                {"key": "boundary"}
            ]"#,
        )
        .unwrap();
        let questions = build_questions(&configs, &map).unwrap();
        assert_eq!(
            describe(&questions, &map),
            vec![
                "Does the value of \"central\" equal \"a\"?",
                "[front] Is the value of \"central\" in {e i}?",
                "Does the value of \"boundary\" equal \"true\"?",
            ]
        );
    }

    #[test]
    fn test_templates() {
        let map = map();
        let all_values = QuestionConfig {
            for_each_key: Some(Vec::new()),
            for_each_value: Some(Vec::new()),
            ..Default::default()
        };
        // three questions on central, a single one on the binary key
        assert_eq!(all_values.build(&map).unwrap().len(), 4);

        let listed = QuestionConfig {
            for_each_key: Some(vec!["central".to_string()]),
            for_each_value: Some(vec!["a".to_string(), "i".to_string()]),
            ..Default::default()
        };
        let questions: QuestionList = listed.build(&map).unwrap().into_iter().collect();
        assert_eq!(
            describe(&questions, &map),
            vec![
                "Does the value of \"central\" equal \"a\"?",
                "Does the value of \"central\" equal \"i\"?",
            ]
        );

        let fixed = QuestionConfig {
            for_each_key: Some(vec!["central".to_string(), "boundary".to_string()]),
            values: vec!["a".to_string()],
            ..Default::default()
        };
        assert!(matches!(fixed.build(&map), Err(CartError::UnknownValue(..))));

        assert!(QuestionConfig::default().build(&map).is_err());
    }

    #[test]
    fn test_example_list() {
        let json = format!(
            r#"{{"properties": {}, "examples": [
                {{"properties": {{"central": "a", "boundary": "true"}}, "matrix": [[1.0, 2.0], [3.0, 4.0]], "n_obs": 2.5}},
                {{"properties": {{"central": "e"}}, "matrix": [[0.5]]}}
            ]}}"#,
            SCHEMA
        );
        let config = ExampleListConfig::from_json(&json).unwrap();
        let examples = config.build().unwrap();
        assert_eq!(examples.len(), 2);
        assert_eq!(examples.n_obs(), 3.5);
        let first = examples.get(0).unwrap();
        assert_eq!(first.values.rows(), 2);
        assert_eq!(first.values.at(1, 0), 3.0);
        assert_eq!(first.properties.to_string(), "central=a boundary=true");

        let mut ragged = config.clone();
        ragged.examples[0].matrix = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(ragged.build(), Err(CartError::InvalidShape(..))));

        let mut unknown = config;
        unknown.examples[1].properties.insert("stress".to_string(), "1".to_string());
        assert!(matches!(unknown.build(), Err(CartError::UnknownKey(_))));
    }

    #[test]
    fn test_training_plan() {
        let json = format!(
            r#"{{"scorer": "Id3", "seed": 3, "plan": {{"properties": {}, "max_leaves": 4, "steps": [
                {{"name": "coarse", "min_obs": 2, "questions": [{{"for_each_key": ["central"], "for_each_value": []}}]}},
                {{"name": "fine", "action": "split", "min_gain": 0.1, "randomize": {{}}, "questions": [{{"key": "boundary"}}]}},
                {{"name": "later", "action": "cluster", "randomize": {{"n_question": 0}}, "questions": []}}
            ]}}}}"#,
            SCHEMA
        );
        let config = TrainerConfig::from_json(&json).unwrap();
        let trainer = config.build().unwrap();
        assert_eq!(trainer.seed(), 3);
        let plan = trainer.plan();
        assert_eq!(plan.max_leaves(), 4);
        let steps = plan.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].questions.len(), 3);
        assert_eq!(steps[0].min_obs, 2.0);
        assert_eq!(steps[1].n_random_question, 5);
        assert_eq!(steps[1].min_obs, 1.0);
        assert_eq!(steps[2].action, StepAction::Reserved("cluster".to_string()));
        assert_eq!(steps[2].n_random_question, 1);

        let foreign = Rc::new(
            PropertyMap::new(vec!["central".to_string()], vec![vec!["a".to_string(), "o".to_string()]]).unwrap(),
        );
        assert!(matches!(
            config.plan.build_with_map(foreign),
            Err(CartError::PropertyMapMismatch(_))
        ));
    }

    #[test]
    fn test_config_file_round_trip() {
        let config = TrainingPlanConfig {
            properties: map(),
            max_leaves: None,
            steps: vec![StepConfig {
                name: "all".to_string(),
                action: StepAction::Split,
                min_obs: 1.0,
                min_gain: 0.0,
                randomize: None,
                questions: vec![QuestionConfig {
                    for_each_key: Some(Vec::new()),
                    for_each_value: Some(Vec::new()),
                    ..Default::default()
                }],
            }],
        };
        let path = std::env::temp_dir().join(format!("cartree-plan-{}.json", std::process::id()));
        config.save(&path).unwrap();
        let loaded = TrainingPlanConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.build().unwrap().max_leaves(), usize::MAX);
        assert!(matches!(
            TrainingPlanConfig::load("/nonexistent/plan.json"),
            Err(CartError::UnableToRead(_))
        ));
    }
}
