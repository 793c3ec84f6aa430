use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::errors::DialogueWarning;

/// Stable name of a dialogue tree inside a [`TreeRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(String);

impl TreeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TreeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TreeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TreeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle to a voice-over or sound cue. The engine only needs its name, for
/// the host to look up, and its length, for pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub name: String,
    pub duration: Duration,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

/// One speaker turn.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueNode {
    pub speaker: String,
    pub text: String,
    pub clip: Option<AudioClip>,
}

impl DialogueNode {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            clip: None,
        }
    }

    pub fn with_clip(mut self, clip: AudioClip) -> Self {
        self.clip = Some(clip);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub label: String,
    pub response_tree: TreeId,
}

impl Answer {
    pub fn new(label: impl Into<String>, response_tree: impl Into<TreeId>) -> Self {
        Self {
            label: label.into(),
            response_tree: response_tree.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipleChoiceNode {
    pub question: String,
    pub answers: Vec<Answer>,
}

impl MultipleChoiceNode {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answers: Vec::new(),
        }
    }

    pub fn with_answer(mut self, answer: Answer) -> Self {
        self.answers.push(answer);
        self
    }
}

/// An ordered run of nodes, optionally ending in a branch or handing over
/// to another tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DialogueTree {
    pub nodes: Vec<DialogueNode>,
    pub branch: Option<MultipleChoiceNode>,
    pub successor: Option<TreeId>,
}

impl DialogueTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: DialogueNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_branch(mut self, branch: MultipleChoiceNode) -> Self {
        self.branch = Some(branch);
        self
    }

    pub fn with_successor(mut self, successor: impl Into<TreeId>) -> Self {
        self.successor = Some(successor.into());
        self
    }

    /// Nodes in playback order.
    pub fn nodes(&self) -> impl Iterator<Item = &DialogueNode> {
        self.nodes.iter()
    }

    /// The branch to resolve once the nodes run out.
    ///
    /// Branches with fewer than two answers aren't worth asking; they come
    /// back as a warning and playback carries on as if there were none.
    pub fn resolve_branch(&self, id: &TreeId) -> Result<Option<&MultipleChoiceNode>, DialogueWarning> {
        match &self.branch {
            Some(branch) if branch.answers.len() < 2 => Err(DialogueWarning::InvalidBranch {
                tree: id.clone(),
                answers: branch.answers.len(),
            }),
            branch => Ok(branch.as_ref()),
        }
    }

    pub fn successor(&self) -> Option<&TreeId> {
        self.successor.as_ref()
    }

    /// Copy of this tree with every line given to `speaker`.
    pub fn with_speaker(&self, speaker: &str) -> Self {
        let mut tree = self.clone();
        for node in &mut tree.nodes {
            node.speaker = speaker.to_string();
        }
        tree
    }
}

/// All loaded trees, addressed by id. Trees point at each other by id only,
/// so successor and answer loops are fine.
#[derive(Debug, Clone, Default)]
pub struct TreeRegistry {
    trees: HashMap<TreeId, DialogueTree>,
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<TreeId>, tree: DialogueTree) -> Option<DialogueTree> {
        self.trees.insert(id.into(), tree)
    }

    pub fn with_tree(mut self, id: impl Into<TreeId>, tree: DialogueTree) -> Self {
        self.insert(id, tree);
        self
    }

    pub fn get(&self, id: &str) -> Option<&DialogueTree> {
        self.trees.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut DialogueTree> {
        self.trees.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.trees.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &TreeId> {
        self.trees.keys()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
