//! Scorer
//!
//! Homogeneity criteria for clusters of examples. Lower scores mean more
//! homogeneous clusters; the gain of a split is the score reduction from the
//! father to its two children.
use crate::errors::CartError;
use crate::example::{Example, FloatBox};
use crate::utils::{entropy_term, items_to_strings, kahan_sum};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type Score = f64;

/// Result of scoring a candidate split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitScore {
    pub gain: Score,
    pub left: Score,
    pub right: Score,
}

pub trait Scorer {
    fn name(&self) -> &'static str;
    /// Score of a range of examples taken as one cluster.
    fn score(&self, examples: &[&Example]) -> Score;
    /// Score both sides of a split of a cluster whose score is `father`.
    fn split_score(&self, left: &[&Example], right: &[&Example], father: Score) -> SplitScore;
}

/// Available scorers.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum ScorerKind {
    #[default]
    Id3,
    Variance,
}

impl FromStr for ScorerKind {
    type Err = CartError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id3" => Ok(ScorerKind::Id3),
            "variance" => Ok(ScorerKind::Variance),
            _ => Err(CartError::ParseString(
                s.to_string(),
                "ScorerKind".to_string(),
                items_to_strings(vec!["Id3", "Variance"]),
            )),
        }
    }
}

pub fn scorer_from_kind(kind: ScorerKind) -> Box<dyn Scorer> {
    match kind {
        ScorerKind::Id3 => Box::new(Id3),
        ScorerKind::Variance => Box::new(Variance),
    }
}

fn mass(examples: &[&Example]) -> f64 {
    kahan_sum(examples.iter().map(|e| e.n_obs))
}

/// Children's scores weighted by their share of the father's mass.
fn weighted_gain(left: &[&Example], right: &[&Example], father: Score, left_score: Score, right_score: Score) -> Score {
    let left_mass = mass(left);
    let right_mass = mass(right);
    let total = left_mass + right_mass;
    if total <= 0.0 {
        return 0.0;
    }
    father - (left_mass / total) * left_score - (right_mass / total) * right_score
}

/// Entropy of the distribution of observation vectors.
///
/// Every distinct observation box is one symbol, counted with the example's
/// observation mass. The entropy is measured in bits.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3;

impl Id3 {
    fn entropy(&self, examples: &[&Example]) -> Score {
        let mut counts: HashMap<&FloatBox, f64> = HashMap::new();
        let mut total = 0.0;
        for e in examples {
            *counts.entry(&e.values).or_insert(0.0) += e.n_obs;
            total += e.n_obs;
        }
        if total <= 0.0 {
            return 0.0;
        }
        // Sort for a summation order that does not depend on hashing.
        let mut counts: Vec<f64> = counts.into_values().collect();
        counts.sort_by(|a, b| a.total_cmp(b));
        counts.iter().map(|c| entropy_term(*c, total)).sum()
    }
}

impl Scorer for Id3 {
    fn name(&self) -> &'static str {
        "ID3"
    }

    fn score(&self, examples: &[&Example]) -> Score {
        self.entropy(examples)
    }

    fn split_score(&self, left: &[&Example], right: &[&Example], father: Score) -> SplitScore {
        let left_score = self.entropy(left);
        let right_score = self.entropy(right);
        SplitScore {
            gain: weighted_gain(left, right, father, left_score, right_score),
            left: left_score,
            right: right_score,
        }
    }
}

/// Weighted sum of squared deviations of the observation vectors from
/// their weighted mean.
#[derive(Debug, Default, Clone, Copy)]
pub struct Variance;

impl Variance {
    fn sum_of_squares(&self, examples: &[&Example]) -> Score {
        let dim = examples.iter().map(|e| e.values.len()).max().unwrap_or(0);
        let mut sum = vec![0.0; dim];
        let mut sum_sq = 0.0;
        let mut total = 0.0;
        for e in examples {
            for (s, v) in sum.iter_mut().zip(e.values.as_slice()) {
                *s += e.n_obs * v;
                sum_sq += e.n_obs * v * v;
            }
            total += e.n_obs;
        }
        if total <= 0.0 {
            return 0.0;
        }
        let between: f64 = sum.iter().map(|s| s * s).sum::<f64>() / total;
        (sum_sq - between).max(0.0)
    }
}

impl Scorer for Variance {
    fn name(&self) -> &'static str {
        "Variance"
    }

    fn score(&self, examples: &[&Example]) -> Score {
        self.sum_of_squares(examples)
    }

    fn split_score(&self, left: &[&Example], right: &[&Example], father: Score) -> SplitScore {
        let left_score = self.sum_of_squares(left);
        let right_score = self.sum_of_squares(right);
        SplitScore {
            gain: father - left_score - right_score,
            left: left_score,
            right: right_score,
        }
    }
}
