//! Decision Tree Trainer
//!
//! Grows a decision tree over an example list following a training plan.
//! Splits are searched best-first: every open leaf queues its best split and
//! the split with the largest gain over all leaves is committed next.
use crate::cluster::{Cluster, ClusterList};
use crate::constants::NEGATIVE_GAIN_TOLERANCE;
use crate::decision_tree::{ClassId, DecisionTree, DecisionTreeNode, TrainingInformation};
use crate::errors::CartError;
use crate::example::{Example, ExampleList, ExampleRef};
use crate::grower::{Grower, SplitCandidate};
use crate::plan::{Step, StepAction, TrainingPlan};
use crate::properties::PropertyMap;
use crate::question::{Answer, QuestionList, QuestionRef};
use crate::sampler::{question_sampler, QuestionSampler};
use crate::scorer::{scorer_from_kind, Score, Scorer, ScorerKind};
use crate::utils::{fmt_vec_output, kahan_sum};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;
use std::fmt::{self, Display};
use std::mem;
use std::rc::Rc;

/// How often and how well a question was used for splitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionStatistic {
    pub count: usize,
    pub sum_gain: f64,
    pub min_gain: f64,
    pub max_gain: f64,
    pub sum_depth: usize,
    pub min_depth: usize,
    pub max_depth: usize,
}

impl QuestionStatistic {
    pub fn record(&mut self, gain: Score, depth: usize) {
        if self.count == 0 {
            self.min_gain = gain;
            self.max_gain = gain;
            self.min_depth = depth;
            self.max_depth = depth;
        } else {
            self.min_gain = self.min_gain.min(gain);
            self.max_gain = self.max_gain.max(gain);
            self.min_depth = self.min_depth.min(depth);
            self.max_depth = self.max_depth.max(depth);
        }
        self.count += 1;
        self.sum_gain += gain;
        self.sum_depth += depth;
    }

    pub fn avg_gain(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_gain / self.count as f64)
    }

    pub fn avg_depth(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_depth as f64 / self.count as f64)
    }
}

/// Totals of a training run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub initial_score: Score,
    pub total_gain: Score,
    pub n_obs: f64,
    pub n_splits: usize,
    pub n_leaves: usize,
    /// Every question offered by a split step, with its usage.
    pub question_statistics: Vec<(QuestionRef, QuestionStatistic)>,
}

impl TrainingSummary {
    pub fn final_score(&self) -> Score {
        self.initial_score - self.total_gain
    }

    /// One line per offered question with its usage.
    pub fn write_question_statistics(&self, f: &mut dyn fmt::Write, map: &PropertyMap) -> fmt::Result {
        writeln!(f, "question statistics: {}", self.question_statistics.len())?;
        for (i, (question, stat)) in self.question_statistics.iter().enumerate() {
            write!(f, "{:>3}. {} count={}", i, question.describe(map), stat.count)?;
            if let (Some(avg_gain), Some(avg_depth)) = (stat.avg_gain(), stat.avg_depth()) {
                write!(
                    f,
                    " gain=[{}] depth=[{}, {:.2}, {}]",
                    fmt_vec_output(&[stat.min_gain, avg_gain, stat.max_gain]),
                    stat.min_depth,
                    avg_depth,
                    stat.max_depth
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Display for TrainingSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "initial-score={:.4} total-gain={:.4} total-score={:.4} nObs={} nSplit={} nLeaf={}",
            self.initial_score,
            self.total_gain,
            self.final_score(),
            self.n_obs,
            self.n_splits,
            self.n_leaves
        )
    }
}

/// Everything a training run produces.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub tree: DecisionTree,
    pub clusters: ClusterList,
    pub summary: TrainingSummary,
}

/// Decision tree trainer.
pub struct DecisionTreeTrainer {
    plan: TrainingPlan,
    scorer: Box<dyn Scorer>,
    seed: u64,
}

impl DecisionTreeTrainer {
    /// Trainer for `plan`, scoring with ID3.
    pub fn new(plan: TrainingPlan) -> Self {
        DecisionTreeTrainer {
            plan,
            scorer: scorer_from_kind(ScorerKind::default()),
            seed: 0,
        }
    }

    /// Set the seed of the question sampling.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the homogeneity criterion.
    pub fn set_scorer(mut self, scorer: Box<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn set_scorer_kind(self, kind: ScorerKind) -> Self {
        self.set_scorer(scorer_from_kind(kind))
    }

    pub fn plan(&self) -> &TrainingPlan {
        &self.plan
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Grow a tree over `examples` and partition them into one cluster per leaf.
    pub fn train(&self, examples: &ExampleList) -> Result<TrainingOutcome, CartError> {
        if !Rc::ptr_eq(self.plan.map_ref(), examples.map_ref()) {
            let diff = self.plan.map().diff(examples.map());
            if diff.has_differences() {
                return Err(CartError::PropertyMapMismatch(diff.to_string()));
            }
        }
        info!(
            "train decision tree on {} examples with {} scorer",
            examples.len(),
            self.scorer.name()
        );
        let mut training = Training::new(self.scorer.as_ref(), &self.plan, examples.as_slice(), self.seed);
        training.run();
        training.finish(examples)
    }
}

/// Tree node while growing, addressed by its arena index.
struct GrowingNode {
    order: u32,
    depth: usize,
    mass: f64,
    score: Score,
    examples: Vec<usize>,
    /// Ids of the questions still available to this node.
    questions: Vec<usize>,
    /// Committed question id and the true and false children.
    split: Option<(usize, usize, usize)>,
}

struct Training<'a> {
    scorer: &'a dyn Scorer,
    plan: &'a TrainingPlan,
    examples: &'a [ExampleRef],
    rng: StdRng,
    nodes: Vec<GrowingNode>,
    open: Vec<usize>,
    candidates: BinaryHeap<SplitCandidate>,
    questions: Vec<QuestionRef>,
    statistics: Vec<QuestionStatistic>,
    next_order: u32,
    initial_score: Score,
    total_gain: Score,
    n_obs: f64,
    n_splits: usize,
}

impl<'a> Training<'a> {
    fn new(scorer: &'a dyn Scorer, plan: &'a TrainingPlan, examples: &'a [ExampleRef], seed: u64) -> Self {
        let refs: Vec<&Example> = examples.iter().map(|e| e.as_ref()).collect();
        let initial_score = scorer.score(&refs);
        let n_obs = kahan_sum(examples.iter().map(|e| e.n_obs));
        info!("initial-score={:.4} nObs={}", initial_score, n_obs);
        let root = GrowingNode {
            order: 0,
            depth: 0,
            mass: n_obs,
            score: initial_score,
            examples: (0..examples.len()).collect(),
            questions: Vec::new(),
            split: None,
        };
        Training {
            scorer,
            plan,
            examples,
            rng: StdRng::seed_from_u64(seed),
            nodes: vec![root],
            open: vec![0],
            candidates: BinaryHeap::new(),
            questions: Vec::new(),
            statistics: Vec::new(),
            next_order: 1,
            initial_score,
            total_gain: 0.0,
            n_obs,
            n_splits: 0,
        }
    }

    fn run(&mut self) {
        let plan = self.plan;
        let max_leaves = plan.max_leaves();
        for step in plan.steps() {
            if self.open.len() >= max_leaves {
                info!("leaf budget of {} reached, remaining steps are skipped", max_leaves);
                break;
            }
            info!("{}", step);
            if let StepAction::Reserved(action) = &step.action {
                warn!("step \"{}\": action \"{}\" is not supported, step skipped", step.name, action);
                continue;
            }
            self.split(step, max_leaves);
        }
    }

    /// Run one split step on the open leaves.
    fn split(&mut self, step: &Step, max_leaves: usize) {
        if step.questions.is_empty() {
            warn!("step \"{}\" has no questions", step.name);
        }
        if self.n_obs < 2.0 * step.min_obs {
            warn!(
                "step \"{}\": min-obs {} cannot be reached with {} observations",
                step.name, step.min_obs, self.n_obs
            );
        }
        let first = self.questions.len();
        self.questions.extend(step.questions.iter().cloned());
        self.statistics.resize(self.questions.len(), QuestionStatistic::default());
        let question_ids: Vec<usize> = (first..self.questions.len()).collect();

        let mut sampler = question_sampler(step.n_random_question);
        let n_splits = self.n_splits;
        let gain = self.total_gain;
        for node in mem::take(&mut self.open) {
            self.nodes[node].questions = question_ids.clone();
            self.suggest_split(node, step, sampler.as_mut());
        }
        while self.open.len() + self.candidates.n_candidates() < max_leaves {
            match self.candidates.next_candidate() {
                Some(candidate) => self.commit_split(candidate, step, sampler.as_mut()),
                None => break,
            }
        }
        for candidate in self.candidates.drain_candidates() {
            self.open.push(candidate.node);
        }
        info!(
            "step \"{}\": nSplit={} gain={:.4} total-score={:.4} nLeaf={}",
            step.name,
            self.n_splits - n_splits,
            self.total_gain - gain,
            self.initial_score - self.total_gain,
            self.open.len()
        );
    }

    /// Queue the best split of a leaf, or park the leaf as open.
    fn suggest_split(&mut self, node: usize, step: &Step, sampler: &mut dyn QuestionSampler) {
        match self.best_split(node, step, sampler) {
            Some(candidate) => self.candidates.add_candidate(candidate),
            None => self.open.push(node),
        }
    }

    fn best_split(&mut self, node_id: usize, step: &Step, sampler: &mut dyn QuestionSampler) -> Option<SplitCandidate> {
        let node = &self.nodes[node_id];
        if node.mass < 2.0 * step.min_obs {
            return None;
        }
        let slots: Vec<usize> = (0..node.questions.len()).collect();
        let eligible = sampler.sample(&mut self.rng, &slots);

        let mut best: Option<SplitCandidate> = None;
        for slot in eligible {
            let question = &self.questions[node.questions[slot]];
            let (true_examples, false_examples): (Vec<usize>, Vec<usize>) = node
                .examples
                .iter()
                .partition(|i| question.evaluate(&self.examples[**i].properties) == Answer::True);
            let true_refs: Vec<&Example> = true_examples.iter().map(|i| self.examples[*i].as_ref()).collect();
            let false_refs: Vec<&Example> = false_examples.iter().map(|i| self.examples[*i].as_ref()).collect();
            let true_mass = kahan_sum(true_refs.iter().map(|e| e.n_obs));
            let false_mass = kahan_sum(false_refs.iter().map(|e| e.n_obs));
            if true_mass < step.min_obs || false_mass < step.min_obs {
                continue;
            }
            if true_mass <= 0.0 || false_mass <= 0.0 {
                continue;
            }
            let split = self.scorer.split_score(&true_refs, &false_refs, node.score);
            if split.gain < 0.0 {
                if split.gain < NEGATIVE_GAIN_TOLERANCE {
                    error!("negative split gain of {}; gain must be positive", split.gain);
                }
                continue;
            }
            // NaN gains fail here as well.
            if !(split.gain > step.min_gain && split.gain > 0.0) {
                continue;
            }
            if best.as_ref().map_or(true, |b| split.gain > b.gain) {
                best = Some(SplitCandidate {
                    node: node_id,
                    order: node.order,
                    question_slot: slot,
                    gain: split.gain,
                    true_examples,
                    false_examples,
                    true_score: split.left,
                    false_score: split.right,
                    true_mass,
                    false_mass,
                });
            }
        }
        best
    }

    /// Turn the candidate's leaf into an internal node and look for splits
    /// of its children.
    fn commit_split(&mut self, candidate: SplitCandidate, step: &Step, sampler: &mut dyn QuestionSampler) {
        let (depth, question_id, questions) = {
            let node = &mut self.nodes[candidate.node];
            let mut questions = mem::take(&mut node.questions);
            let question_id = questions.swap_remove(candidate.question_slot);
            node.examples = Vec::new();
            (node.depth, question_id, questions)
        };
        let true_child = self.add_node(
            depth + 1,
            candidate.true_mass,
            candidate.true_score,
            candidate.true_examples,
            questions.clone(),
        );
        let false_child = self.add_node(
            depth + 1,
            candidate.false_mass,
            candidate.false_score,
            candidate.false_examples,
            questions,
        );
        self.nodes[candidate.node].split = Some((question_id, true_child, false_child));

        self.n_splits += 1;
        self.total_gain += candidate.gain;
        self.statistics[question_id].record(candidate.gain, depth);
        let node = &self.nodes[candidate.node];
        debug!(
            "split node {} (depth={} score={:.4} nObs={}) with \"{}\": gain={:.4} yes: order={} score={:.4} nObs={} no: order={} score={:.4} nObs={} total-score={:.4}",
            node.order,
            depth,
            node.score,
            node.mass,
            self.questions[question_id].describe(self.plan.map()),
            candidate.gain,
            self.nodes[true_child].order,
            candidate.true_score,
            candidate.true_mass,
            self.nodes[false_child].order,
            candidate.false_score,
            candidate.false_mass,
            self.initial_score - self.total_gain
        );

        self.suggest_split(true_child, step, sampler);
        self.suggest_split(false_child, step, sampler);
    }

    fn add_node(&mut self, depth: usize, mass: f64, score: Score, examples: Vec<usize>, questions: Vec<usize>) -> usize {
        let order = self.next_order;
        self.next_order += 1;
        self.nodes.push(GrowingNode {
            order,
            depth,
            mass,
            score,
            examples,
            questions,
            split: None,
        });
        self.nodes.len() - 1
    }

    /// Build the decision tree from the arena, keeping only the questions
    /// that were used, and collect the clusters.
    fn finish(self, examples: &ExampleList) -> Result<TrainingOutcome, CartError> {
        let mut used = QuestionList::new();
        let mut question_ids = vec![None; self.questions.len()];
        for (id, (question, stat)) in self.questions.iter().zip(self.statistics.iter()).enumerate() {
            if stat.count > 0 {
                question_ids[id] = Some(used.push(question.clone()));
            }
        }

        let mut n_leaves = 0;
        let root = self.commit_node(0, &question_ids, &mut n_leaves)?;
        let tree = DecisionTree::new(self.plan.map_ref().clone(), used, Some(root))?;

        let mut clusters: Vec<Cluster> = (0..n_leaves).map(Cluster::new).collect();
        for example in examples {
            let class_id = tree.classify(&example.properties)?;
            clusters[class_id].push(example.clone());
        }
        let mut cluster_list = ClusterList::new(self.plan.map_ref().clone());
        for cluster in clusters {
            cluster_list.add(cluster);
        }

        let summary = TrainingSummary {
            initial_score: self.initial_score,
            total_gain: self.total_gain,
            n_obs: self.n_obs,
            n_splits: self.n_splits,
            n_leaves,
            question_statistics: self.questions.into_iter().zip(self.statistics).collect(),
        };
        info!("{}", summary);
        Ok(TrainingOutcome {
            tree,
            clusters: cluster_list,
            summary,
        })
    }

    fn commit_node(
        &self,
        id: usize,
        question_ids: &[Option<usize>],
        n_leaves: &mut ClassId,
    ) -> Result<DecisionTreeNode, CartError> {
        let node = &self.nodes[id];
        let info = TrainingInformation {
            order: node.order,
            size: node.mass,
            score: node.score,
        };
        match node.split {
            Some((question_id, true_child, false_child)) => {
                let tree_id = question_ids
                    .get(question_id)
                    .copied()
                    .flatten()
                    .ok_or(CartError::InvalidQuestionIndex(question_id, question_ids.len()))?;
                let true_child = self.commit_node(true_child, question_ids, n_leaves)?;
                let false_child = self.commit_node(false_child, question_ids, n_leaves)?;
                Ok(DecisionTreeNode::internal(tree_id, info, true_child, false_child))
            }
            None => {
                let class_id = *n_leaves;
                *n_leaves += 1;
                Ok(DecisionTreeNode::leaf(class_id, info))
            }
        }
    }
}
