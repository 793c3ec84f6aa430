//! Multiple-choice resolution: show the answers, remember the latest pick,
//! hand back the chosen answer on submit.

use log::*;

use crate::presentation::{AnswerOption, OptionHandle, PresentationAdapter};
use crate::tree::{Answer, MultipleChoiceNode};

/// Positional label for the answer at `index`: "A.", "B.", "C.", ...
pub fn choice_label(index: usize) -> String {
    let c = std::char::from_u32('A' as u32 + index as u32).unwrap_or('?');
    format!("{}.", c)
}

struct ActiveChoice {
    node: MultipleChoiceNode,
    handles: Vec<OptionHandle>,
    current: Option<String>,
}

#[derive(Default)]
pub struct ChoiceResolver {
    active: Option<ActiveChoice>,
}

impl ChoiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_choice(&self) -> Option<&str> {
        self.active.as_ref().and_then(|active| active.current.as_deref())
    }

    /// Options currently on screen, in answer order.
    pub fn options(&self) -> Vec<AnswerOption> {
        self.active
            .as_ref()
            .map(|active| build_options(&active.node))
            .unwrap_or_default()
    }

    /// Instantiates one widget per answer. Anything left over from an
    /// earlier branch is released first.
    pub fn present<P: PresentationAdapter + ?Sized>(&mut self, node: &MultipleChoiceNode, presenter: &mut P) {
        self.release(presenter);

        let options = build_options(node);
        debug!("Presenting {} options for \"{}\"", options.len(), node.question);
        let handles = presenter.instantiate_answer_options(&node.question, &options);

        self.active = Some(ActiveChoice {
            node: node.clone(),
            handles,
            current: None,
        });
    }

    /// Records the player's latest pick. Doesn't submit.
    pub fn set_current_choice(&mut self, label: &str) {
        match &mut self.active {
            Some(active) => {
                debug!("Current choice: {}", label);
                active.current = Some(label.to_string());
            }
            None => debug!("Ignoring choice \"{}\" with no question on screen", label),
        }
    }

    /// Resolves the recorded pick.
    ///
    /// Returns `None` and changes nothing if nothing has been picked yet.
    /// Otherwise the widgets are released and the first answer whose label
    /// matches is returned; duplicate labels are not told apart. A pick that
    /// matches no answer is dropped and the question stays up.
    pub fn submit_choice<P: PresentationAdapter + ?Sized>(&mut self, presenter: &mut P) -> Option<Answer> {
        let active = self.active.as_mut()?;
        let current = active.current.take()?;
        let answer = active
            .node
            .answers
            .iter()
            .find(|answer| answer.label == current)
            .cloned();

        match answer {
            Some(answer) => {
                self.release(presenter);
                Some(answer)
            }
            None => {
                warn!("Submitted choice \"{}\" matches no answer", current);
                None
            }
        }
    }

    /// Destroys any instantiated widgets and forgets the question.
    pub fn release<P: PresentationAdapter + ?Sized>(&mut self, presenter: &mut P) {
        if let Some(active) = self.active.take() {
            presenter.destroy_answer_options(&active.handles);
        }
    }
}

fn build_options(node: &MultipleChoiceNode) -> Vec<AnswerOption> {
    node.answers
        .iter()
        .enumerate()
        .map(|(i, answer)| AnswerOption {
            choice: choice_label(i),
            answer: answer.label.clone(),
        })
        .collect()
}
