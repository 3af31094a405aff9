//! Binary Tree
//!
//! A generic binary tree whose nodes own their children. Every node carries an
//! id and an information payload of type `I`. Children are held in a single
//! slot, so a node has either both children or none.
use crate::errors::CartError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<I> {
    id: NodeId,
    info: I,
    children: Option<Box<(Node<I>, Node<I>)>>,
}

impl<I> Node<I> {
    pub fn leaf(id: NodeId, info: I) -> Self {
        Node {
            id,
            info,
            children: None,
        }
    }

    pub fn internal(id: NodeId, info: I, true_child: Node<I>, false_child: Node<I>) -> Self {
        Node {
            id,
            info,
            children: Some(Box::new((true_child, false_child))),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set_id(&mut self, id: NodeId) {
        self.id = id;
    }

    pub fn info(&self) -> &I {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut I {
        &mut self.info
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Child followed when the node's question is answered with yes.
    pub fn true_child(&self) -> Option<&Node<I>> {
        self.children.as_deref().map(|(t, _)| t)
    }

    /// Child followed when the node's question is not answered with yes.
    pub fn false_child(&self) -> Option<&Node<I>> {
        self.children.as_deref().map(|(_, f)| f)
    }

    pub fn children(&self) -> Option<(&Node<I>, &Node<I>)> {
        self.children.as_deref().map(|(t, f)| (t, f))
    }

    pub fn set_children(&mut self, true_child: Node<I>, false_child: Node<I>) {
        self.children = Some(Box::new((true_child, false_child)));
    }

    /// Detach the children, turning the node into a leaf.
    pub fn take_children(&mut self) -> Option<(Node<I>, Node<I>)> {
        self.children.take().map(|c| *c)
    }

    /// Nodes of the subtree in depth-first order, true child first.
    pub fn preorder(&self) -> Preorder<'_, I> {
        Preorder { stack: vec![self] }
    }

    pub fn leaves(&self) -> impl Iterator<Item = &Node<I>> {
        self.preorder().filter(|n| n.is_leaf())
    }

    pub fn n_nodes(&self) -> usize {
        self.preorder().count()
    }

    pub fn n_leaves(&self) -> usize {
        self.leaves().count()
    }

    /// Number of edges on the longest path to a leaf.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            if let Some((t, f)) = node.children() {
                stack.push((f, depth + 1));
                stack.push((t, depth + 1));
            }
        }
        height
    }
}

pub struct Preorder<'a, I> {
    stack: Vec<&'a Node<I>>,
}

impl<'a, I> Iterator for Preorder<'a, I> {
    type Item = &'a Node<I>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some((t, f)) = node.children() {
            self.stack.push(f);
            self.stack.push(t);
        }
        Some(node)
    }
}

/// Owner of the root node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryTree<I> {
    root: Option<Node<I>>,
}

impl<I> Default for BinaryTree<I> {
    fn default() -> Self {
        BinaryTree { root: None }
    }
}

impl<I> BinaryTree<I> {
    pub fn new(root: Node<I>) -> Self {
        BinaryTree { root: Some(root) }
    }

    pub fn root(&self) -> Option<&Node<I>> {
        self.root.as_ref()
    }

    /// The root node, [`CartError::EmptyTree`] if there is none.
    pub fn require_root(&self) -> Result<&Node<I>, CartError> {
        self.root.as_ref().ok_or(CartError::EmptyTree)
    }

    pub fn set_root(&mut self, root: Node<I>) {
        self.root = Some(root);
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn n_nodes(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.n_nodes())
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.n_leaves())
    }

    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.height())
    }

    /// Indented listing of the node ids.
    pub fn write(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        let root = match &self.root {
            Some(r) => r,
            None => return writeln!(f, "[empty]"),
        };
        let mut stack = vec![(root, 0)];
        while let Some((node, depth)) = stack.pop() {
            let label = if node.is_leaf() { "class id" } else { "question id" };
            writeln!(f, "{:indent$}{}: {}", "", label, node.id, indent = 2 * depth)?;
            if let Some((t, fc)) = node.children() {
                stack.push((fc, depth + 1));
                stack.push((t, depth + 1));
            }
        }
        Ok(())
    }

    /// Graphviz rendering; leaves are double circles, edges are labelled yes/no.
    pub fn draw(&self, f: &mut dyn fmt::Write, name: &str) -> fmt::Result {
        writeln!(f, "digraph \"{}\" {{", name)?;
        writeln!(f, "node [fontname=\"Helvetica\"]")?;
        writeln!(f, "edge [fontname=\"Helvetica\"]")?;
        if let Some(root) = &self.root {
            let mut next = 0;
            draw_node(f, root, &mut next)?;
        }
        writeln!(f, "}}")
    }
}

fn draw_node<I>(f: &mut dyn fmt::Write, node: &Node<I>, next: &mut usize) -> Result<usize, fmt::Error> {
    let this = *next;
    *next += 1;
    match node.children() {
        None => writeln!(f, "n{} [shape=doublecircle label={}]", this, node.id)?,
        Some((t, fc)) => {
            writeln!(f, "n{} [shape=circle label={}]", this, node.id)?;
            writeln!(f, "n{} -> n{}[label=yes]", this, *next)?;
            draw_node(f, t, next)?;
            writeln!(f, "n{} -> n{}[label=no]", this, *next)?;
            draw_node(f, fc, next)?;
        }
    }
    Ok(this)
}
