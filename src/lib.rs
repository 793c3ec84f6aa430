use std::collections::VecDeque;
use std::mem;
use std::time::Duration;

use log::*;

pub use crate::{
    bundle::{load_bundle, load_from_paths, read_string_table, LineInfo},
    choice::{choice_label, ChoiceResolver},
    config::{ContinueMode, DialogueConfig, FinishPolicy, PanelSounds, RevealMode},
    errors::{DialogueError, DialogueWarning, Result},
    presentation::{AnswerOption, OptionHandle, PresentationAdapter, Surfaces},
    timer::{Fired, TaskSlot, TaskToken},
    tree::{Answer, AudioClip, DialogueNode, DialogueTree, MultipleChoiceNode, TreeId, TreeRegistry},
    trigger::DialogueTrigger,
    typewriter::{full_delay, is_punctuation, punctuation_count, Phase, Step, Typewriter, PUNCTUATION},
};

pub mod colloquy_proto {
    include!(concat!(env!("OUT_DIR"), "/colloquy.rs"));
}

mod bundle;
mod choice;
mod config;
mod errors;
mod presentation;
mod timer;
mod tree;
mod trigger;
mod typewriter;

/// Steps allowed at a single instant before `update` gives the frame back.
/// Only content that loops with zero delays gets near it.
const MAX_STEPS_PER_INSTANT: usize = 10_000;

/// Warnings kept for the host; the oldest are dropped past this.
const MAX_WARNINGS: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Opening,
    /// Typing the current node.
    Revealing,
    /// The node is out and the player has to continue.
    AwaitingContinue,
    /// The node is out; holding for its pacing or voice-over before moving on.
    AutoAdvancing,
    /// Waiting on a multiple-choice answer.
    Resolving,
    Closing,
}

/// Signals a UI can send. They never touch playback state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    Continue,
    SelectAnswer(String),
    SubmitChoice,
}

struct PlaybackSession {
    tree: TreeId,
    // Copies of the tree's nodes; the registry's tree is never consumed.
    pending: VecDeque<DialogueNode>,
    typewriter: Option<Typewriter>,
}

/// Plays dialogue trees on a presentation surface.
///
/// Time only moves when the host calls [`update`](Self::update), so a game
/// loop, a test and the terminal runner all drive it the same way.
pub struct DialogueRunner<P: PresentationAdapter> {
    config: DialogueConfig,
    registry: TreeRegistry,
    presenter: P,
    resolver: ChoiceResolver,
    timer: TaskSlot,
    session: Option<PlaybackSession>,
    state: PlaybackState,
    is_playing: bool,
    panel_open: Option<bool>,
    // Successor waiting for its turn in the timer slot.
    handoff: Option<(TaskToken, TreeId)>,
    // Trees loaded since a node was last shown or a question asked.
    unrevealed: Vec<TreeId>,
    now: Duration,
    warnings: Vec<DialogueWarning>,
}

impl<P: PresentationAdapter> DialogueRunner<P> {
    pub fn new(config: DialogueConfig, registry: TreeRegistry, presenter: P) -> Self {
        Self {
            config,
            registry,
            presenter,
            resolver: ChoiceResolver::new(),
            timer: TaskSlot::new(),
            session: None,
            state: PlaybackState::Idle,
            is_playing: false,
            panel_open: None,
            handoff: None,
            unrevealed: Vec::new(),
            now: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    /// New settings apply from the next node on.
    pub fn set_config(&mut self, config: DialogueConfig) {
        self.config = config;
    }

    pub fn registry(&self) -> &TreeRegistry {
        &self.registry
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// True from the start of a dialogue until its panel closes. Other
    /// systems can use it to hold back conflicting input.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_awaiting_continue(&self) -> bool {
        self.state == PlaybackState::AwaitingContinue
    }

    /// Time the runner has been driven for.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn current_tree(&self) -> Option<&TreeId> {
        self.session.as_ref().map(|session| &session.tree)
    }

    pub fn current_node(&self) -> Option<&DialogueNode> {
        self.typewriter().map(Typewriter::node)
    }

    /// The part of the current node revealed so far.
    pub fn typed_so_far(&self) -> &str {
        self.typewriter().map_or("", Typewriter::typed)
    }

    pub fn pending_nodes(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.pending.len())
    }

    /// Answers on screen while resolving a branch.
    pub fn options(&self) -> Vec<AnswerOption> {
        self.resolver.options()
    }

    pub fn current_choice(&self) -> Option<&str> {
        self.resolver.current_choice()
    }

    /// Drains the warnings raised so far. Only the latest 256 are kept, so
    /// hosts that care should drain regularly.
    pub fn take_warnings(&mut self) -> Vec<DialogueWarning> {
        mem::take(&mut self.warnings)
    }

    fn typewriter(&self) -> Option<&Typewriter> {
        self.session.as_ref().and_then(|session| session.typewriter.as_ref())
    }

    /// Starts playing `tree`.
    ///
    /// With no tree, or one the registry doesn't know, there is nothing to
    /// say and any running dialogue is closed. Fails without touching
    /// anything if text and audio are both turned off. A dialogue already
    /// in progress is cut off: its pending reveal never writes again.
    pub fn start_dialogue(&mut self, tree: Option<&str>) -> Result<()> {
        let id = match tree {
            Some(id) => TreeId::new(id),
            None => {
                debug!("No dialogue tree given; nothing to say");
                self.end_dialogue();
                return Ok(());
            }
        };

        if let Err(err) = self.config.validate() {
            error!("{}", err);
            return Err(err);
        }

        self.unrevealed.clear();
        self.load_tree(id);
        Ok(())
    }

    /// Replaces the nodes of a tree, e.g. from a trigger that generates its
    /// lines. The tree that is playing can't be changed.
    pub fn set_tree_content(&mut self, id: &TreeId, nodes: Vec<DialogueNode>) -> Result<()> {
        if self.is_playing && self.current_tree() == Some(id) {
            return Err(DialogueError::TreeInUse(id.clone()));
        }

        match self.registry.get_mut(id.as_str()) {
            Some(tree) => {
                tree.nodes = nodes;
                Ok(())
            }
            None => Err(DialogueError::UnknownTree(id.clone())),
        }
    }

    pub fn handle_input(&mut self, input: PlayerInput) {
        match input {
            PlayerInput::Continue => self.continue_requested(),
            PlayerInput::SelectAnswer(label) => self.select_answer(&label),
            PlayerInput::SubmitChoice => self.submit_choice(),
        }
    }

    /// The player asked to move on.
    pub fn continue_requested(&mut self) {
        match self.state {
            PlaybackState::Idle | PlaybackState::Resolving => {
                debug!("Ignoring continue in {:?}", self.state);
            }
            _ => self.display_next(),
        }
    }

    pub fn select_answer(&mut self, label: &str) {
        if self.state != PlaybackState::Resolving {
            debug!("Ignoring answer \"{}\" in {:?}", label, self.state);
            return;
        }
        self.resolver.set_current_choice(label);
    }

    /// Plays the response to the selected answer. Does nothing until an
    /// answer has been selected.
    pub fn submit_choice(&mut self) {
        if self.state != PlaybackState::Resolving {
            debug!("Ignoring submit in {:?}", self.state);
            return;
        }

        if let Some(answer) = self.resolver.submit_choice(&mut self.presenter) {
            info!("Chose \"{}\"", answer.label);
            self.unrevealed.clear();
            self.load_tree(answer.response_tree);
        }
    }

    /// Moves time forward by `delta`, running every reveal step that falls
    /// due on the way.
    pub fn update(&mut self, delta: Duration) {
        let target = self.now + delta;
        let mut instant = None;
        let mut steps = 0;

        while let Some(due) = self.timer.due().filter(|due| *due <= target) {
            if instant == Some(due) {
                steps += 1;
                if steps >= MAX_STEPS_PER_INSTANT {
                    warn!("Dialogue made no progress in time after {} steps; yielding", steps);
                    break;
                }
            } else {
                instant = Some(due);
                steps = 0;
            }

            let fired = match self.timer.fire(target) {
                Some(fired) => fired,
                None => break,
            };
            // Steps run at the time they were due, so coarse frames don't
            // stretch the pacing.
            self.now = fired.due;

            if let Some((token, next)) = self.handoff.take() {
                if token == fired.token {
                    self.load_tree(next);
                    continue;
                }
            }

            let step = match self.session.as_mut().and_then(|session| session.typewriter.as_mut()) {
                Some(typewriter) => typewriter.resume(fired.due, &mut self.presenter),
                None => continue,
            };
            self.apply_step(step, Some(fired.token));
        }

        self.now = target;
    }

    /// Shows the next node, or, mid-reveal and waiting on input, applies
    /// the finish policy to the node being typed.
    pub fn display_next(&mut self) {
        let config = self.config.normalized();

        let session = match &mut self.session {
            Some(session) => session,
            None => {
                debug!("No dialogue playing");
                return;
            }
        };

        if let Some(typewriter) = session.typewriter.as_mut().filter(|typewriter| typewriter.is_running()) {
            if !config.waits_for_input() {
                debug!("Line still playing; ignoring continue");
                return;
            }

            match config.finish_policy {
                FinishPolicy::InstantFinish => {
                    self.timer.cancel();
                    typewriter.finish_now(&mut self.presenter);
                    self.state = PlaybackState::AwaitingContinue;
                }
                FinishPolicy::SpeedupFinish => {
                    typewriter.speed_up();
                    if self.timer.is_pending() {
                        self.timer.schedule(self.now);
                    }
                }
            }
            self.presenter.set_continue_indicator_visible(true);
            return;
        }

        match session.pending.pop_front() {
            Some(node) => self.start_node(node),
            None => self.finish_tree(),
        }
    }

    /// Closes the panel and forgets the session. Does nothing when no
    /// dialogue is playing.
    pub fn end_dialogue(&mut self) {
        if !self.is_playing {
            return;
        }

        self.state = PlaybackState::Closing;
        self.timer.cancel();
        self.presenter.stop_clip();
        self.resolver.release(&mut self.presenter);

        if let Some(animated) = self.panel_open.take() {
            self.presenter.set_open_state(false, animated);
            if let Some(clip) = self.config.sounds.close(animated) {
                self.presenter.play_one_shot(clip, self.config.volume);
            }
        }

        self.presenter.set_continue_indicator_visible(false);
        self.presenter.set_auto_advance_indicator_visible(false);

        self.session = None;
        self.handoff = None;
        self.unrevealed.clear();
        self.is_playing = false;
        self.state = PlaybackState::Idle;
        info!("Dialogue complete");
    }

    fn load_tree(&mut self, id: TreeId) {
        let config = self.config.normalized();

        // Only one reveal at a time: whatever was running stops here.
        self.timer.cancel();
        self.handoff = None;
        self.resolver.release(&mut self.presenter);

        let pending: VecDeque<DialogueNode> = match self.registry.get(id.as_str()) {
            Some(tree) => tree.nodes().cloned().collect(),
            None => {
                self.warn(DialogueWarning::UnknownTree(id));
                self.end_dialogue();
                return;
            }
        };

        if self.unrevealed.contains(&id) {
            self.warn(DialogueWarning::SuccessorCycle(id));
            self.end_dialogue();
            return;
        }
        self.unrevealed.push(id.clone());

        if !self.is_playing {
            self.open(&config);
        }
        self.is_playing = true;
        self.presenter.set_auto_advance_indicator_visible(!config.waits_for_input());

        info!("Starting dialogue tree {} ({} nodes)", id, pending.len());
        self.session = Some(PlaybackSession {
            tree: id,
            pending,
            typewriter: None,
        });
        self.state = PlaybackState::Revealing;

        self.display_next();
    }

    fn open(&mut self, config: &DialogueConfig) {
        self.state = PlaybackState::Opening;
        if !config.print_text {
            return;
        }

        let animated = config.use_open_close_animation;
        self.presenter.set_open_state(true, animated);
        if let Some(clip) = config.sounds.open(animated) {
            self.presenter.play_one_shot(clip, config.volume);
        }
        self.panel_open = Some(animated);
    }

    fn start_node(&mut self, node: DialogueNode) {
        let config = self.config.normalized();
        self.timer.cancel();

        debug!("{}: {}", node.speaker, node.text);

        if config.print_text {
            self.presenter.set_speaker_name(&node.speaker);
        }
        if config.waits_for_input() {
            self.presenter.set_continue_indicator_visible(false);
        }

        self.presenter.stop_clip();
        self.unrevealed.clear();

        let mut typewriter = Typewriter::new(node, &config);
        if config.play_with_audio {
            match typewriter.node().clip.clone() {
                Some(clip) => {
                    self.presenter.play_clip(&clip, config.volume);
                    typewriter.set_audio_started(self.now);
                }
                None => {
                    let tree = self.current_tree().cloned().unwrap_or_else(|| TreeId::new(""));
                    let speaker = typewriter.node().speaker.clone();
                    self.warn(DialogueWarning::MissingAudioClip { tree, speaker });
                }
            }
        }

        let step = typewriter.start(self.now, &mut self.presenter);
        if let Some(session) = self.session.as_mut() {
            session.typewriter = Some(typewriter);
        }
        self.state = PlaybackState::Revealing;
        self.apply_step(step, None);
    }

    fn finish_tree(&mut self) {
        let id = match self.current_tree() {
            Some(id) => id.clone(),
            None => return,
        };

        let (branch, successor) = match self.registry.get(id.as_str()) {
            Some(tree) => (
                tree.resolve_branch(&id).map(|branch| branch.cloned()),
                tree.successor().cloned(),
            ),
            None => (Ok(None), None),
        };

        match branch {
            Ok(Some(branch)) => {
                self.resolve(&branch);
                return;
            }
            Ok(None) => {}
            Err(warning) => self.warn(warning),
        }

        match successor {
            Some(next) => {
                // Loaded from the timer slot, not from here, so a chain of
                // trees never nests.
                debug!("Tree {} continues with {}", id, next);
                self.timer.cancel();
                let token = self.timer.schedule(self.now);
                self.handoff = Some((token, next));
                self.state = PlaybackState::AutoAdvancing;
            }
            None => self.end_dialogue(),
        }
    }

    fn resolve(&mut self, branch: &MultipleChoiceNode) {
        self.timer.cancel();
        if let Some(session) = self.session.as_mut() {
            session.typewriter = None;
        }

        self.unrevealed.clear();
        self.presenter.set_body_text("");
        self.presenter.set_continue_indicator_visible(false);
        self.presenter.set_auto_advance_indicator_visible(false);

        self.state = PlaybackState::Resolving;
        self.resolver.present(branch, &mut self.presenter);
    }

    /// Acts on what the typewriter asked for. Follow-ups of a fired timer
    /// only go ahead while that timer's token still owns the slot.
    fn apply_step(&mut self, step: Step, origin: Option<TaskToken>) {
        let due = match step {
            Step::Wait(wait) => self.now + wait,
            Step::WaitUntil(at) => at,
            Step::Parked => {
                self.state = PlaybackState::AwaitingContinue;
                self.presenter.set_continue_indicator_visible(true);
                return;
            }
            Step::Advance => {
                self.display_next();
                return;
            }
        };

        let scheduled = match origin {
            Some(token) => self.timer.reschedule(token, due).is_some(),
            None => {
                self.timer.schedule(due);
                true
            }
        };
        if !scheduled {
            debug!("Dropping stale reveal step");
            return;
        }

        self.state = match self.typewriter().map(Typewriter::phase) {
            Some(Phase::Typing) => PlaybackState::Revealing,
            _ => PlaybackState::AutoAdvancing,
        };
    }

    fn warn(&mut self, warning: DialogueWarning) {
        warn!("{}", warning);
        if self.warnings.len() >= MAX_WARNINGS {
            self.warnings.remove(0);
        }
        self.warnings.push(warning);
    }
}
