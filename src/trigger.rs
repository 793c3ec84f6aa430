use log::*;

use crate::errors::Result;
use crate::presentation::PresentationAdapter;
use crate::tree::{DialogueNode, DialogueTree, TreeId};
use crate::DialogueRunner;

/// Starts a particular tree, e.g. when the player talks to an NPC or a
/// cutscene reaches a line.
#[derive(Debug, Clone)]
pub struct DialogueTrigger {
    pub tree: TreeId,
}

impl DialogueTrigger {
    pub fn new(tree: impl Into<TreeId>) -> Self {
        Self { tree: tree.into() }
    }

    pub fn trigger<P: PresentationAdapter>(&self, runner: &mut DialogueRunner<P>) -> Result<()> {
        debug!("Triggering dialogue tree {}", self.tree);
        runner.start_dialogue(Some(self.tree.as_str()))
    }

    /// Swaps in new lines for the trigger's tree.
    pub fn set_content<P: PresentationAdapter>(
        &self,
        runner: &mut DialogueRunner<P>,
        nodes: Vec<DialogueNode>,
    ) -> Result<()> {
        runner.set_tree_content(&self.tree, nodes)
    }

    /// Replays the lines of `content` in the trigger's tree, all spoken by
    /// `speaker`, and starts it.
    pub fn play_as<P: PresentationAdapter>(
        &self,
        runner: &mut DialogueRunner<P>,
        speaker: &str,
        content: &DialogueTree,
    ) -> Result<()> {
        debug!("Replaying {} line(s) as {} in {}", content.nodes.len(), speaker, self.tree);
        self.set_content(runner, content.with_speaker(speaker).nodes)?;
        self.trigger(runner)
    }
}
