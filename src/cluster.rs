//! Clusters
//!
//! The partition of the training examples produced by the trainer: one
//! cluster per leaf of the decision tree.
use crate::decision_tree::{ClassId, DecisionTree, DecisionTreeNode};
use crate::example::{ExampleList, ExampleRef};
use crate::properties::{PropertyMap, PropertyMapRef};
use crate::utils::kahan_sum;
use hashbrown::HashSet;
use std::fmt::{self, Display};
use std::rc::Rc;

/// Examples that reached one leaf.
#[derive(Debug, Clone)]
pub struct Cluster {
    class_id: ClassId,
    examples: Vec<ExampleRef>,
}

impl Cluster {
    pub fn new(class_id: ClassId) -> Self {
        Cluster {
            class_id,
            examples: Vec::new(),
        }
    }

    /// Class id of the leaf the cluster belongs to.
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    /// The leaf itself, looked up in the tree the cluster was built from.
    pub fn node<'a>(&self, tree: &'a DecisionTree) -> Option<&'a DecisionTreeNode> {
        tree.leaf(self.class_id)
    }

    pub fn push(&mut self, example: ExampleRef) {
        self.examples.push(example);
    }

    pub fn examples(&self) -> &[ExampleRef] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn n_obs(&self) -> f64 {
        kahan_sum(self.examples.iter().map(|e| e.n_obs))
    }
}

/// Clusters indexed by class id.
#[derive(Debug, Clone)]
pub struct ClusterList {
    map: PropertyMapRef,
    clusters: Vec<Cluster>,
}

impl ClusterList {
    pub fn new(map: PropertyMapRef) -> Self {
        ClusterList {
            map,
            clusters: Vec::new(),
        }
    }

    pub fn add(&mut self, cluster: Cluster) {
        self.clusters.push(cluster);
    }

    pub fn map(&self) -> &PropertyMap {
        &self.map
    }

    pub fn get(&self, class_id: ClassId) -> Option<&Cluster> {
        self.clusters.get(class_id).filter(|c| c.class_id == class_id)
    }

    pub fn get_mut(&mut self, class_id: ClassId) -> Option<&mut Cluster> {
        self.clusters.get_mut(class_id).filter(|c| c.class_id == class_id)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    /// True when the clusters are pairwise disjoint and together hold
    /// exactly the examples of `examples`.
    pub fn is_partition_of(&self, examples: &ExampleList) -> bool {
        let mut seen = HashSet::new();
        for e in self.clusters.iter().flat_map(|c| c.examples.iter()) {
            if !seen.insert(Rc::as_ptr(e)) {
                return false;
            }
        }
        seen.len() == examples.len() && examples.iter().all(|e| seen.contains(&Rc::as_ptr(e)))
    }
}

impl<'a> IntoIterator for &'a ClusterList {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;
    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

impl Display for ClusterList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "clusters: {}", self.clusters.len())?;
        for c in &self.clusters {
            writeln!(f, "{:>5}: {} examples, nObs={}", c.class_id, c.len(), c.n_obs())?;
        }
        Ok(())
    }
}
