// Modules
pub mod binary_tree;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod decision_tree;
pub mod errors;
pub mod example;
pub mod grower;
pub mod plan;
pub mod properties;
pub mod question;
pub mod sampler;
pub mod scorer;
pub mod trainer;
pub mod utils;

// Individual classes, and functions
pub use cluster::{Cluster, ClusterList};
pub use decision_tree::DecisionTree;
pub use errors::CartError;
pub use example::{Example, ExampleList, FloatBox};
pub use plan::{Step, StepAction, TrainingPlan};
pub use properties::{Properties, PropertyMap, StoredProperties};
pub use question::{Answer, Question, QuestionList};
pub use scorer::{Id3, Scorer, ScorerKind, Variance};
pub use trainer::{DecisionTreeTrainer, TrainingOutcome};
