use crate::scorer::Score;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Best split found for an open leaf, waiting to be committed.
#[derive(Debug, Clone)]
pub struct SplitCandidate {
    /// Arena index of the leaf.
    pub node: usize,
    /// Creation order of the leaf, breaks ties between equal gains.
    pub order: u32,
    /// Position of the question in the leaf's question id list.
    pub question_slot: usize,
    pub gain: Score,
    pub true_examples: Vec<usize>,
    pub false_examples: Vec<usize>,
    pub true_score: Score,
    pub false_score: Score,
    pub true_mass: f64,
    pub false_mass: f64,
}

impl PartialEq for SplitCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitCandidate {}

impl PartialOrd for SplitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitCandidate {
    // Greater gain first, older leaves first on equal gain.
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .total_cmp(&other.gain)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Trait for handling the growth of the tree.
pub trait Grower {
    /// Queue the best split of a leaf.
    fn add_candidate(&mut self, candidate: SplitCandidate);
    /// Next split to commit, if any.
    fn next_candidate(&mut self) -> Option<SplitCandidate>;
    /// Number of queued splits.
    fn n_candidates(&self) -> usize;
    /// Remove every queued split.
    fn drain_candidates(&mut self) -> Vec<SplitCandidate>;
}

impl Grower for BinaryHeap<SplitCandidate> {
    fn add_candidate(&mut self, candidate: SplitCandidate) {
        self.push(candidate);
    }

    fn next_candidate(&mut self) -> Option<SplitCandidate> {
        self.pop()
    }

    fn n_candidates(&self) -> usize {
        self.len()
    }

    fn drain_candidates(&mut self) -> Vec<SplitCandidate> {
        let mut drained: Vec<SplitCandidate> = self.drain().collect();
        drained.sort_by(|a, b| a.order.cmp(&b.order));
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(node: usize, order: u32, gain: Score) -> SplitCandidate {
        SplitCandidate {
            node,
            order,
            question_slot: 0,
            gain,
            true_examples: Vec::new(),
            false_examples: Vec::new(),
            true_score: 0.0,
            false_score: 0.0,
            true_mass: 0.0,
            false_mass: 0.0,
        }
    }

    #[test]
    fn test_best_first_order() {
        let mut grower: BinaryHeap<SplitCandidate> = BinaryHeap::new();
        grower.add_candidate(candidate(0, 0, 0.5));
        grower.add_candidate(candidate(1, 1, 2.0));
        grower.add_candidate(candidate(2, 2, 1.0));
        grower.add_candidate(candidate(3, 3, 2.0));
        assert_eq!(grower.n_candidates(), 4);
        let nodes: Vec<usize> = std::iter::from_fn(|| grower.next_candidate()).map(|c| c.node).collect();
        assert_eq!(nodes, vec![1, 3, 2, 0]);
        assert!(grower.next_candidate().is_none());
    }

    #[test]
    fn test_drain_by_creation_order() {
        let mut grower: BinaryHeap<SplitCandidate> = BinaryHeap::new();
        grower.add_candidate(candidate(5, 4, 0.1));
        grower.add_candidate(candidate(6, 2, 3.0));
        grower.add_candidate(candidate(7, 3, 1.0));
        let drained: Vec<usize> = grower.drain_candidates().iter().map(|c| c.node).collect();
        assert_eq!(drained, vec![6, 7, 5]);
        assert_eq!(grower.n_candidates(), 0);
    }
}
