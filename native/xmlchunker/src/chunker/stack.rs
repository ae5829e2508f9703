//! Element Stack and Chunk Matching
//!
//! The chunker keeps its own record of open element local names, root first,
//! since the reader offers no random access to ancestors.

use super::path::ContainerPath;

/// Local names of the currently open elements, root first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementStack {
    names: Vec<String>,
}

impl ElementStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, local_name: impl Into<String>) {
        self.names.push(local_name.into());
    }

    /// Pop the innermost element; an empty stack stays empty
    pub fn pop(&mut self) -> Option<String> {
        self.names.pop()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

/// Whether the element just pushed starts a chunk: the path must be a
/// rooted prefix of the open chain
///
/// Entries deeper than the path are not compared. The chunker never asks
/// from inside a matched subtree, so in practice the stack is exactly as
/// deep as the path when this returns true.
pub fn matches(stack: &ElementStack, path: &ContainerPath) -> bool {
    stack.len() >= path.len()
        && stack
            .as_slice()
            .iter()
            .zip(path.segments())
            .all(|(open, want)| open == want)
}
