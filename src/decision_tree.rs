//! Decision Tree
//!
//! A [`BinaryTree`] whose internal node ids index a question list and whose
//! leaf ids are class ids. Classification walks from the root to a leaf,
//! following the true child when a question is answered with yes.
use crate::binary_tree::{BinaryTree, Node, NodeId};
use crate::constants::INVALID_ORDER;
use crate::errors::CartError;
use crate::properties::{Properties, PropertyMap, PropertyMapRef};
use crate::question::{Answer, Branches, Question, QuestionList, QuestionRef, UndefPolicy};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs;
use std::rc::Rc;

pub type ClassId = NodeId;
pub type QuestionId = NodeId;

/// Statistics the trainer stores in every node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingInformation {
    /// Position of the node in creation order.
    pub order: u32,
    /// Observation mass that reached the node.
    pub size: f64,
    /// Homogeneity score of the node's examples.
    pub score: f64,
}

impl Default for TrainingInformation {
    fn default() -> Self {
        TrainingInformation {
            order: INVALID_ORDER,
            size: 0.0,
            score: 0.0,
        }
    }
}

pub type DecisionTreeNode = Node<TrainingInformation>;

/// Questions asked on the way to a leaf, with the answers given.
pub struct Path<'a> {
    pub steps: Vec<(QuestionRef, Answer)>,
    pub leaf: &'a DecisionTreeNode,
    map: &'a PropertyMap,
}

impl<'a> Display for Path<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (question, answer) in &self.steps {
            writeln!(f, "{} {}", question.describe(self.map), answer)?;
        }
        writeln!(f, "class id: {}", self.leaf.id())
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    map: PropertyMapRef,
    questions: QuestionList,
    tree: BinaryTree<TrainingInformation>,
}

#[derive(Serialize)]
struct DecisionTreeDumpRef<'a> {
    properties: &'a PropertyMap,
    questions: Vec<&'a Question>,
    tree: &'a BinaryTree<TrainingInformation>,
}

#[derive(Deserialize)]
struct DecisionTreeDump {
    properties: PropertyMap,
    questions: Vec<Question>,
    tree: BinaryTree<TrainingInformation>,
}

impl DecisionTree {
    /// Assemble a tree and check that it is consistent with its schema
    /// and question list.
    pub fn new(map: PropertyMapRef, questions: QuestionList, root: Option<DecisionTreeNode>) -> Result<Self, CartError> {
        map.require_set()?;
        for q in &questions {
            q.validate(&map)?;
        }
        let tree = match root {
            Some(root) => {
                for node in root.preorder().filter(|n| !n.is_leaf()) {
                    questions.require(node.id())?;
                }
                BinaryTree::new(root)
            }
            None => BinaryTree::default(),
        };
        Ok(DecisionTree { map, questions, tree })
    }

    pub fn map(&self) -> &PropertyMap {
        &self.map
    }

    pub fn map_ref(&self) -> &PropertyMapRef {
        &self.map
    }

    pub fn questions(&self) -> &QuestionList {
        &self.questions
    }

    pub fn tree(&self) -> &BinaryTree<TrainingInformation> {
        &self.tree
    }

    pub fn root(&self) -> Option<&DecisionTreeNode> {
        self.tree.root()
    }

    pub fn n_leaves(&self) -> usize {
        self.tree.n_leaves()
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    fn question(&self, node: &DecisionTreeNode) -> Result<&QuestionRef, CartError> {
        self.questions.require(node.id())
    }

    /// Leaf reached by a record. Undefined answers follow the false branch.
    pub fn find(&self, properties: &dyn Properties) -> Result<&DecisionTreeNode, CartError> {
        let mut node = self.tree.require_root()?;
        while let Some((t, f)) = node.children() {
            let question = self.question(node)?;
            let answer = question.evaluate(properties);
            if answer == Answer::Undef {
                warn!("undefined answer to \"{}\", assume false", question.describe(&self.map));
            }
            node = match answer.branches(UndefPolicy::AssumeFalse) {
                Branches::True => t,
                _ => f,
            };
        }
        Ok(node)
    }

    /// Every node visited when undefined answers follow both branches,
    /// in depth-first order with the true branch first.
    pub fn find_all(&self, properties: &dyn Properties) -> Result<Vec<&DecisionTreeNode>, CartError> {
        let mut visited = Vec::new();
        let mut stack = vec![self.tree.require_root()?];
        while let Some(node) = stack.pop() {
            visited.push(node);
            if let Some((t, f)) = node.children() {
                match self.question(node)?.evaluate(properties).branches(UndefPolicy::FollowBoth) {
                    Branches::True => stack.push(t),
                    Branches::False => stack.push(f),
                    Branches::Both => {
                        stack.push(f);
                        stack.push(t);
                    }
                }
            }
        }
        Ok(visited)
    }

    /// Leaves among the nodes of [`DecisionTree::find_all`].
    pub fn find_leaves(&self, properties: &dyn Properties) -> Result<Vec<&DecisionTreeNode>, CartError> {
        Ok(self.find_all(properties)?.into_iter().filter(|n| n.is_leaf()).collect())
    }

    /// Like [`DecisionTree::find`], but also records the questions and answers.
    pub fn find_path(&self, properties: &dyn Properties) -> Result<Path<'_>, CartError> {
        let mut steps = Vec::new();
        let mut node = self.tree.require_root()?;
        while let Some((t, f)) = node.children() {
            let question = self.question(node)?;
            let answer = question.evaluate(properties);
            if answer == Answer::Undef {
                warn!("undefined answer to \"{}\", assume false", question.describe(&self.map));
            }
            steps.push((question.clone(), answer));
            node = match answer.branches(UndefPolicy::AssumeFalse) {
                Branches::True => t,
                _ => f,
            };
        }
        Ok(Path {
            steps,
            leaf: node,
            map: &self.map,
        })
    }

    pub fn classify(&self, properties: &dyn Properties) -> Result<ClassId, CartError> {
        Ok(self.find(properties)?.id())
    }

    /// Leaf carrying a class id.
    pub fn leaf(&self, class_id: ClassId) -> Option<&DecisionTreeNode> {
        self.tree.root()?.leaves().find(|n| n.id() == class_id)
    }

    /// Graphviz rendering of the tree.
    pub fn draw(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        self.tree.draw(f, "decision-tree")
    }

    /// Dump the schema, questions and nodes as a json object.
    pub fn json_dump(&self) -> Result<String, CartError> {
        let dump = DecisionTreeDumpRef {
            properties: &self.map,
            questions: self.questions.iter().map(|q| q.as_ref()).collect(),
            tree: &self.tree,
        };
        match serde_json::to_string(&dump) {
            Ok(s) => Ok(s),
            Err(e) => Err(CartError::UnableToWrite(e.to_string())),
        }
    }

    /// Load a tree from a json string.
    ///
    /// * `json_str` - String produced by [`DecisionTree::json_dump`].
    pub fn from_json(json_str: &str) -> Result<Self, CartError> {
        let dump = match serde_json::from_str::<DecisionTreeDump>(json_str) {
            Ok(d) => d,
            Err(e) => return Err(CartError::UnableToRead(e.to_string())),
        };
        let questions = dump.questions.into_iter().map(Rc::new).collect();
        let mut tree = DecisionTree::new(Rc::new(dump.properties), questions, None)?;
        if let Some(root) = dump.tree.root() {
            for node in root.preorder().filter(|n| !n.is_leaf()) {
                tree.questions.require(node.id())?;
            }
        }
        tree.tree = dump.tree;
        Ok(tree)
    }

    /// Save a tree as a json object to a file.
    ///
    /// * `path` - Path to save the tree.
    pub fn save(&self, path: &str) -> Result<(), CartError> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(CartError::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }

    /// Load a tree from a path to a json tree object.
    pub fn load(path: &str) -> Result<Self, CartError> {
        let json_str = match fs::read_to_string(path) {
            Ok(s) => Ok(s),
            Err(e) => Err(CartError::UnableToRead(e.to_string())),
        }?;
        Self::from_json(&json_str)
    }
}

impl Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.map)?;
        writeln!(f)?;
        self.questions.write(f, &self.map)?;
        writeln!(f)?;
        writeln!(f, "decision tree:")?;
        self.tree.write(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::StoredProperties;
    use crate::question::Question;

    fn map() -> PropertyMapRef {
        Rc::new(
            PropertyMap::new(
                vec!["central".to_string(), "boundary".to_string()],
                vec![
                    vec!["a".to_string(), "e".to_string(), "i".to_string()],
                    vec!["yes".to_string(), "no".to_string()],
                ],
            )
            .unwrap(),
        )
    }

    fn info(order: u32) -> TrainingInformation {
        TrainingInformation {
            order,
            size: 1.0,
            score: 0.0,
        }
    }

    // q0: central == a ?  yes -> class 0
    //                     no  -> q1: boundary == yes ? yes -> class 1, no -> class 2
    fn tree() -> DecisionTree {
        let map = map();
        let questions: QuestionList = vec![
            Rc::new(Question::scalar(&map, "central", "a", "").unwrap()),
            Rc::new(Question::scalar(&map, "boundary", "yes", "").unwrap()),
        ]
        .into_iter()
        .collect();
        let inner = Node::internal(1, info(2), Node::leaf(1, info(3)), Node::leaf(2, info(4)));
        let root = Node::internal(0, info(0), Node::leaf(0, info(1)), inner);
        DecisionTree::new(map, questions, Some(root)).unwrap()
    }

    fn props(tree: &DecisionTree, pairs: &[(&str, &str)]) -> StoredProperties {
        StoredProperties::from_pairs(tree.map_ref().clone(), pairs).unwrap()
    }

    #[test]
    fn test_classify() {
        let tree = tree();
        assert_eq!(tree.classify(&props(&tree, &[("central", "a")])).unwrap(), 0);
        assert_eq!(
            tree.classify(&props(&tree, &[("central", "e"), ("boundary", "yes")])).unwrap(),
            1
        );
        assert_eq!(
            tree.classify(&props(&tree, &[("central", "i"), ("boundary", "no")])).unwrap(),
            2
        );
        // undefined central is treated as "no", undefined boundary as well
        assert_eq!(tree.classify(&props(&tree, &[])).unwrap(), 2);
    }

    #[test]
    fn test_find_all_follows_both_branches() {
        let tree = tree();
        let p = props(&tree, &[]);
        let ids: Vec<usize> = tree.find_all(&p).unwrap().iter().map(|n| n.info().order as usize).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        let leaves: Vec<ClassId> = tree.find_leaves(&p).unwrap().iter().map(|n| n.id()).collect();
        assert_eq!(leaves, vec![0, 1, 2]);

        let p = props(&tree, &[("central", "e")]);
        let leaves: Vec<ClassId> = tree.find_leaves(&p).unwrap().iter().map(|n| n.id()).collect();
        assert_eq!(leaves, vec![1, 2]);
        let p = props(&tree, &[("central", "a")]);
        assert_eq!(tree.find_all(&p).unwrap().len(), 2);
    }

    #[test]
    fn test_find_path() {
        let tree = tree();
        let p = props(&tree, &[("central", "e")]);
        let path = tree.find_path(&p).unwrap();
        assert_eq!(path.leaf.id(), 2);
        let answers: Vec<Answer> = path.steps.iter().map(|(_, a)| *a).collect();
        assert_eq!(answers, vec![Answer::False, Answer::Undef]);
        let text = path.to_string();
        assert!(text.contains("Does the value of \"central\" equal \"a\"? No!"));
        assert!(text.ends_with("class id: 2\n"));
    }

    #[test]
    fn test_leaf_lookup() {
        let tree = tree();
        assert_eq!(tree.leaf(1).unwrap().info().order, 3);
        assert!(tree.leaf(9).is_none());
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_precondition_violations() {
        let map = map();
        let empty = DecisionTree::new(map.clone(), QuestionList::new(), None).unwrap();
        let p = StoredProperties::new(map.clone()).unwrap();
        assert!(matches!(empty.classify(&p), Err(CartError::EmptyTree)));
        assert!(matches!(empty.find_all(&p), Err(CartError::EmptyTree)));

        let root = Node::internal(3, info(0), Node::leaf(0, info(1)), Node::leaf(1, info(2)));
        let bad = DecisionTree::new(map.clone(), QuestionList::new(), Some(root));
        assert!(matches!(bad, Err(CartError::InvalidQuestionIndex(3, 0))));

        let unset = DecisionTree::new(Rc::new(PropertyMap::default()), QuestionList::new(), None);
        assert!(matches!(unset, Err(CartError::UnsetPropertyMap)));
    }

    #[test]
    fn test_json_round_trip_classifies_identically() {
        let tree = tree();
        let json = tree.json_dump().unwrap();
        let loaded = DecisionTree::from_json(&json).unwrap();
        assert_eq!(loaded.map(), tree.map());
        assert_eq!(loaded.questions().len(), 2);
        assert_eq!(loaded.tree(), tree.tree());
        for c in ["a", "e", "i"] {
            for b in ["yes", "no"] {
                let p = props(&tree, &[("central", c), ("boundary", b)]);
                assert_eq!(loaded.classify(&p).unwrap(), tree.classify(&p).unwrap());
            }
        }
        assert!(matches!(DecisionTree::from_json("{"), Err(CartError::UnableToRead(_))));
    }

    #[test]
    fn test_from_json_with_unsorted_set() {
        let map = map();
        let questions: QuestionList = vec![Rc::new(Question::set(&map, "central", &["a", "i"], "").unwrap())]
            .into_iter()
            .collect();
        let root = Node::internal(0, info(0), Node::leaf(0, info(1)), Node::leaf(1, info(2)));
        let tree = DecisionTree::new(map, questions, Some(root)).unwrap();
        let json = tree.json_dump().unwrap();
        assert!(json.contains(r#""Set":[0,2]"#));
        let loaded = DecisionTree::from_json(&json.replace(r#""Set":[0,2]"#, r#""Set":[2,0]"#)).unwrap();
        assert_eq!(loaded.classify(&props(&loaded, &[("central", "a")])).unwrap(), 0);
        assert_eq!(loaded.classify(&props(&loaded, &[("central", "i")])).unwrap(), 0);
        assert_eq!(loaded.classify(&props(&loaded, &[("central", "e")])).unwrap(), 1);
    }

    #[test]
    fn test_display() {
        let tree = tree();
        let text = tree.to_string();
        assert!(text.starts_with("properties:\n  central: a e i\n"));
        assert!(text.contains("decision tree:\nquestion id: 0\n  class id: 0\n  question id: 1\n"));
        let mut dot = String::new();
        tree.draw(&mut dot).unwrap();
        assert!(dot.contains("label=yes"));
    }
}
