//! Sampler
//!
//! Strategies for choosing which questions of a leaf's pool are tried when
//! the leaf's best split is searched.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

// A sampler selects the question ids evaluated for one leaf.
pub trait QuestionSampler {
    /// Sample the candidate question ids, returning them in ascending order.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Vec<usize>;
}

/// Every question is tried.
pub struct AllQuestions;

impl QuestionSampler for AllQuestions {
    fn sample(&mut self, _rng: &mut StdRng, index: &[usize]) -> Vec<usize> {
        let mut chosen = index.to_vec();
        chosen.sort_unstable();
        chosen
    }
}

/// A uniform draw without replacement of `n_question` questions.
pub struct RandomQuestions {
    n_question: usize,
}

impl RandomQuestions {
    pub fn new(n_question: usize) -> Self {
        RandomQuestions { n_question }
    }
}

impl QuestionSampler for RandomQuestions {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> Vec<usize> {
        let mut chosen: Vec<usize> = index.choose_multiple(rng, self.n_question).copied().collect();
        chosen.sort_unstable();
        chosen
    }
}

/// Sampler for a step drawing `n_random_question` questions per leaf.
pub fn question_sampler(n_random_question: usize) -> Box<dyn QuestionSampler> {
    if n_random_question > 1 {
        Box::new(RandomQuestions::new(n_random_question))
    } else {
        Box::new(AllQuestions)
    }
}
