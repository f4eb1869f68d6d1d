//! Namespace node types

use core_types::MountId;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// A directory: an ordered set of named children
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: BTreeMap<String, Node>,
}

impl Directory {
    /// Creates a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an entry by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    /// Gets a mutable entry by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries.get_mut(name)
    }

    /// Inserts or replaces an entry
    pub fn insert(&mut self, name: String, node: Node) {
        self.entries.insert(name, node);
    }

    /// Removes an entry
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        self.entries.remove(name)
    }

    /// Child names in order
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// A namespace entry
#[derive(Debug, Clone)]
pub enum Node {
    /// Directory of further nodes
    Directory(Directory),
    /// Structured document (`properties` + `metadata` by convention)
    Data(Value),
    /// Mount point bound to exactly one capability
    Mount(MountId),
    /// Named pipe: FIFO of documents
    Pipe(VecDeque<Value>),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Directory(_) => NodeKind::Directory,
            Node::Data(_) => NodeKind::Data,
            Node::Mount(_) => NodeKind::Mount,
            Node::Pipe(_) => NodeKind::Pipe,
        }
    }
}

/// Discriminant of [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    Data,
    Mount,
    Pipe,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_names_are_ordered() {
        let mut dir = Directory::new();
        dir.insert("var".into(), Node::Directory(Directory::new()));
        dir.insert("dev".into(), Node::Directory(Directory::new()));
        dir.insert("etc".into(), Node::Directory(Directory::new()));
        assert_eq!(dir.names(), vec!["dev", "etc", "var"]);
    }

    #[test]
    fn test_remove_entry() {
        let mut dir = Directory::new();
        dir.insert("a".into(), Node::Data(Value::Null));
        assert_eq!(dir.count(), 1);
        assert!(dir.remove("a").is_some());
        assert!(dir.is_empty());
        assert!(dir.remove("a").is_none());
    }

    #[test]
    fn test_node_kind() {
        assert_eq!(Node::Mount(MountId::new()).kind(), NodeKind::Mount);
        assert_eq!(Node::Pipe(VecDeque::new()).kind(), NodeKind::Pipe);
    }
}
