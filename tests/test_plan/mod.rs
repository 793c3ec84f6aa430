use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use prost::Message;

use colloquy::colloquy_proto as proto;
use colloquy::*;

/// Every adapter call, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Speaker(String),
    Body(String),
    PlayClip(String, f32),
    StopClip,
    OneShot(String),
    Open(bool, bool),
    ContinueIndicator(bool),
    AutoIndicator(bool),
    Options(String, Vec<String>),
    DestroyOptions(usize),
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    next_handle: u64,
}

impl Recorder {
    pub fn body_writes(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Body(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn speakers(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Speaker(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }
}

impl PresentationAdapter for Recorder {
    fn set_speaker_name(&mut self, text: &str) {
        self.calls.push(Call::Speaker(text.to_string()));
    }

    fn set_body_text(&mut self, text: &str) {
        self.calls.push(Call::Body(text.to_string()));
    }

    fn play_clip(&mut self, clip: &AudioClip, volume: f32) {
        self.calls.push(Call::PlayClip(clip.name.clone(), volume));
    }

    fn stop_clip(&mut self) {
        self.calls.push(Call::StopClip);
    }

    fn play_one_shot(&mut self, clip: &AudioClip, _volume: f32) {
        self.calls.push(Call::OneShot(clip.name.clone()));
    }

    fn set_open_state(&mut self, is_open: bool, use_animation: bool) {
        self.calls.push(Call::Open(is_open, use_animation));
    }

    fn set_continue_indicator_visible(&mut self, visible: bool) {
        self.calls.push(Call::ContinueIndicator(visible));
    }

    fn set_auto_advance_indicator_visible(&mut self, visible: bool) {
        self.calls.push(Call::AutoIndicator(visible));
    }

    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle> {
        let labels = options
            .iter()
            .map(|option| format!("{} {}", option.choice, option.answer))
            .collect();
        self.calls.push(Call::Options(question.to_string(), labels));

        options
            .iter()
            .map(|_| {
                self.next_handle += 1;
                OptionHandle(self.next_handle)
            })
            .collect()
    }

    fn destroy_answer_options(&mut self, handles: &[OptionHandle]) {
        self.calls.push(Call::DestroyOptions(handles.len()));
    }
}

/// A recorder that stays inspectable after being handed to [`Surfaces`].
#[derive(Debug, Default, Clone)]
pub struct SharedRecorder(pub Rc<RefCell<Recorder>>);

impl PresentationAdapter for SharedRecorder {
    fn set_speaker_name(&mut self, text: &str) {
        self.0.borrow_mut().set_speaker_name(text)
    }

    fn set_body_text(&mut self, text: &str) {
        self.0.borrow_mut().set_body_text(text)
    }

    fn play_clip(&mut self, clip: &AudioClip, volume: f32) {
        self.0.borrow_mut().play_clip(clip, volume)
    }

    fn stop_clip(&mut self) {
        self.0.borrow_mut().stop_clip()
    }

    fn play_one_shot(&mut self, clip: &AudioClip, volume: f32) {
        self.0.borrow_mut().play_one_shot(clip, volume)
    }

    fn set_open_state(&mut self, is_open: bool, use_animation: bool) {
        self.0.borrow_mut().set_open_state(is_open, use_animation)
    }

    fn set_continue_indicator_visible(&mut self, visible: bool) {
        self.0.borrow_mut().set_continue_indicator_visible(visible)
    }

    fn set_auto_advance_indicator_visible(&mut self, visible: bool) {
        self.0.borrow_mut().set_auto_advance_indicator_visible(visible)
    }

    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle> {
        self.0.borrow_mut().instantiate_answer_options(question, options)
    }

    fn destroy_answer_options(&mut self, handles: &[OptionHandle]) {
        self.0.borrow_mut().destroy_answer_options(handles)
    }
}

pub fn encode_bundle(bundle: &proto::Bundle) -> Vec<u8> {
    let mut data = Vec::new();
    bundle.encode(&mut data).unwrap();
    data
}

pub fn node(speaker: &str, line_id: &str) -> proto::Node {
    proto::Node {
        speaker: speaker.to_string(),
        line_id: line_id.to_string(),
        clip: String::new(),
    }
}

pub fn answer(line_id: &str, response_tree: &str) -> proto::Answer {
    proto::Answer {
        line_id: line_id.to_string(),
        response_tree: response_tree.to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PlanStep {
    Line(String),
    Option(String),
    Select(usize),
    Stop,
}

impl PlanStep {
    fn new(line: &str) -> Self {
        let mut split_line = line.splitn(2, ": ");
        match split_line.next() {
            Some("line") => Self::Line(split_line.next().unwrap().to_owned()),
            Some("option") => Self::Option(split_line.next().unwrap().to_owned()),
            Some("select") => {
                let index: usize = split_line.next().and_then(|s| s.parse().ok()).unwrap();
                if index < 1 {
                    panic!("Select index must be 1 or greater.");
                }
                Self::Select(index - 1)
            }
            Some("stop") => Self::Stop,
            Some(step) => panic!("Could not parse test plan step \"{}\" in line \"{}\"", step, line),
            None => panic!("Could not parse test plan step in line \"{}\"", line),
        }
    }
}

pub struct TestPlan {
    steps: Vec<PlanStep>,
    next_step_index: usize,
}

impl TestPlan {
    pub fn load(plan_path: &Path) -> io::Result<Self> {
        let plan_text = fs::read_to_string(plan_path)?;
        let steps: Vec<_> = plan_text
            .lines()
            .map(|line| line.trim_start())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PlanStep::new)
            .collect();

        Ok(Self {
            steps,
            next_step_index: 0,
        })
    }

    /// Next expected step. Running off the end means the plan expects a stop.
    pub fn next(&mut self) -> &PlanStep {
        let step = self.steps.get(self.next_step_index).unwrap_or(&PlanStep::Stop);
        self.next_step_index += 1;
        step
    }

    /// Takes the run of option steps at the cursor.
    pub fn options(&mut self) -> Vec<String> {
        let mut options = Vec::new();
        while let Some(PlanStep::Option(option)) = self.steps.get(self.next_step_index) {
            options.push(option.clone());
            self.next_step_index += 1;
        }
        options
    }
}

/// Plays the `Start` tree of a bundle with the string table
/// `test_files/<name>.csv` and checks it against `test_files/<name>.testplan`.
pub struct PlanRunner {
    runner: DialogueRunner<Recorder>,
    plan: TestPlan,
}

impl PlanRunner {
    pub fn new(name: &str, bundle: &proto::Bundle) -> Self {
        let _ = pretty_env_logger::try_init();

        let base = Path::new("test_files").join(name);
        let string_table = read_string_table(base.with_extension("csv")).unwrap();
        let registry = load_bundle(&encode_bundle(bundle), &string_table).unwrap();

        let config = DialogueConfig::text_only()
            .with_audio(false)
            .with_continue_mode(ContinueMode::WaitForInput);
        let runner = DialogueRunner::new(config, registry, Recorder::default());

        let plan = TestPlan::load(&base.with_extension("testplan")).unwrap();

        Self { runner, plan }
    }

    pub fn run(&mut self) {
        self.runner.start_dialogue(Some("Start")).unwrap();

        loop {
            // Long enough for any line in the fixtures to finish typing.
            self.runner.update(Duration::from_secs(600));

            match self.runner.state() {
                PlaybackState::AwaitingContinue => {
                    let node = self.runner.current_node().unwrap();
                    let line_text = format!("{}: {}", node.speaker, self.runner.typed_so_far());
                    let step_index = self.plan.next_step_index;
                    let plan_step = self.plan.next();
                    assert!(
                        matches!(plan_step, PlanStep::Line(plan_text) if *plan_text == line_text),
                        "[{}] Expected the line {:?}, got \"{}\"",
                        step_index,
                        plan_step,
                        line_text
                    );
                    self.runner.continue_requested();
                }
                PlaybackState::Resolving => {
                    let expected = self.plan.options();
                    let options = self.runner.options();
                    let shown: Vec<String> = options
                        .iter()
                        .map(|option| format!("{} {}", option.choice, option.answer))
                        .collect();
                    assert_eq!(shown, expected);

                    match self.plan.next() {
                        PlanStep::Select(i) => {
                            let i = *i;
                            self.runner.select_answer(&options[i].answer);
                            self.runner.submit_choice();
                        }
                        step => panic!("Expected PlanStep::Select, got {:?}", step),
                    }
                }
                PlaybackState::Idle => {
                    assert_eq!(*self.plan.next(), PlanStep::Stop);
                    break;
                }
                state => panic!("Runner settled in unexpected state {:?}", state),
            }
        }

        assert!(!self.runner.is_playing());
    }
}
