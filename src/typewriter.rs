//! Reveals a single node over time.
//!
//! A [`Typewriter`] never sleeps on its own. Each call returns a [`Step`]
//! saying how long to wait before it should be resumed, and the runner
//! keeps that wait in its one timer slot. Dropping the typewriter and
//! cancelling the slot is all it takes to abandon a reveal.

use std::time::Duration;

use log::*;

use crate::config::{ContinueMode, DialogueConfig, RevealMode};
use crate::presentation::PresentationAdapter;
use crate::tree::DialogueNode;

/// Characters that get `punctuation_delay` instead of `char_delay`.
pub const PUNCTUATION: [char; 5] = [',', ';', '.', '?', '!'];

pub fn is_punctuation(c: char) -> bool {
    PUNCTUATION.contains(&c)
}

pub fn punctuation_count(text: &str) -> usize {
    text.chars().filter(|c| is_punctuation(*c)).count()
}

/// How long typing `text` character by character would take, plus one
/// closing pause: `char_delay * len + punctuation * punctuation_delay +
/// punctuation_delay`. Instant reveals use it to pace auto-advance.
pub fn full_delay(text: &str, char_delay: Duration, punctuation_delay: Duration) -> Duration {
    let len = text.chars().count() as u32;
    let punctuation = punctuation_count(text) as u32;
    char_delay * len + punctuation_delay * punctuation + punctuation_delay
}

/// What the runner should do after driving the typewriter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// Resume after this long, counted from the time the step ran.
    Wait(Duration),
    /// Resume at this absolute time.
    WaitUntil(Duration),
    /// The line is out; wait for the player to continue.
    Parked,
    /// Move on to the next node.
    Advance,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Typing,
    /// Text shown, holding for the line's pacing before auto-advancing.
    Holding,
    /// Closing pause after a line that didn't end in punctuation.
    Trailing,
    AwaitingAudio,
    Done,
}

#[derive(Debug)]
pub struct Typewriter {
    node: DialogueNode,
    chars: Vec<char>,
    typed: String,
    revealed: usize,
    phase: Phase,
    char_delay: Duration,
    punctuation_delay: Duration,
    reveal_mode: RevealMode,
    continue_mode: ContinueMode,
    print_text: bool,
    audio_ends_at: Option<Duration>,
}

impl Typewriter {
    pub fn new(node: DialogueNode, config: &DialogueConfig) -> Self {
        let chars = node.text.chars().collect();
        // Hidden text has nothing to type; the line is paced as if shown
        // all at once.
        let reveal_mode = if config.print_text {
            config.reveal_mode
        } else {
            RevealMode::Instant
        };

        Self {
            node,
            chars,
            typed: String::new(),
            revealed: 0,
            phase: Phase::Typing,
            char_delay: config.char_delay,
            punctuation_delay: config.punctuation_delay,
            reveal_mode,
            continue_mode: config.continue_mode,
            print_text: config.print_text,
            audio_ends_at: None,
        }
    }

    pub fn node(&self) -> &DialogueNode {
        &self.node
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Text revealed so far.
    pub fn typed(&self) -> &str {
        &self.typed
    }

    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// Still typing, or holding before auto-advance.
    pub fn is_running(&self) -> bool {
        self.phase != Phase::Done
    }

    /// Marks the voice-over as playing from `now` until the clip ends.
    pub fn set_audio_started(&mut self, now: Duration) {
        self.audio_ends_at = self.node.clip.as_ref().map(|clip| now + clip.duration);
    }

    /// Begins the reveal. The first character, or the whole line, is written
    /// immediately.
    pub fn start<P: PresentationAdapter + ?Sized>(&mut self, now: Duration, presenter: &mut P) -> Step {
        match self.reveal_mode {
            RevealMode::Instant => self.reveal_instantly(presenter),
            RevealMode::CharByChar => {
                if self.print_text {
                    presenter.set_body_text("");
                }
                self.type_next(now, presenter)
            }
        }
    }

    /// Picks the reveal back up once the step's wait has passed.
    pub fn resume<P: PresentationAdapter + ?Sized>(&mut self, now: Duration, presenter: &mut P) -> Step {
        match self.phase {
            Phase::Typing => self.type_next(now, presenter),
            Phase::Holding => self.advance(),
            Phase::Trailing => self.await_audio(now),
            Phase::AwaitingAudio => self.await_audio(now),
            Phase::Done => Step::Parked,
        }
    }

    /// Fills in the rest of the line at once and stops the timed loop.
    pub fn finish_now<P: PresentationAdapter + ?Sized>(&mut self, presenter: &mut P) {
        self.revealed = self.chars.len();
        self.typed = self.node.text.clone();
        if self.print_text {
            presenter.set_body_text(&self.typed);
        }
        self.phase = Phase::Done;
    }

    /// Drops every remaining delay to zero; typing carries on one
    /// character per step.
    pub fn speed_up(&mut self) {
        self.char_delay = Duration::ZERO;
        self.punctuation_delay = Duration::ZERO;
    }

    fn reveal_instantly<P: PresentationAdapter + ?Sized>(&mut self, presenter: &mut P) -> Step {
        self.revealed = self.chars.len();
        self.typed = self.node.text.clone();
        if self.print_text {
            presenter.set_body_text(&self.typed);
        }

        if self.continue_mode == ContinueMode::WaitForInput {
            self.phase = Phase::Done;
            return Step::Parked;
        }

        // Voice-over is the better guide to how long the line takes.
        let hold = match &self.node.clip {
            Some(clip) => clip.duration,
            None => full_delay(&self.node.text, self.char_delay, self.punctuation_delay),
        };
        debug!("Holding instant line for {:?}", hold);
        self.phase = Phase::Holding;
        Step::Wait(hold)
    }

    fn type_next<P: PresentationAdapter + ?Sized>(&mut self, now: Duration, presenter: &mut P) -> Step {
        let c = match self.chars.get(self.revealed) {
            Some(&c) => c,
            None => return self.finish_typing(now),
        };

        self.typed.push(c);
        self.revealed += 1;
        if self.print_text {
            presenter.set_body_text(&self.typed);
        }

        if is_punctuation(c) {
            Step::Wait(self.punctuation_delay)
        } else {
            Step::Wait(self.char_delay)
        }
    }

    fn finish_typing(&mut self, now: Duration) -> Step {
        if self.continue_mode == ContinueMode::WaitForInput {
            self.phase = Phase::Done;
            return Step::Parked;
        }

        // No double pause after a line that already ended on punctuation.
        let ends_in_punctuation = self.chars.last().map_or(false, |c| is_punctuation(*c));
        if ends_in_punctuation {
            self.await_audio(now)
        } else {
            self.phase = Phase::Trailing;
            Step::Wait(self.punctuation_delay)
        }
    }

    fn await_audio(&mut self, now: Duration) -> Step {
        match self.audio_ends_at {
            Some(ends_at) if ends_at > now => {
                self.phase = Phase::AwaitingAudio;
                Step::WaitUntil(ends_at)
            }
            _ => self.advance(),
        }
    }

    fn advance(&mut self) -> Step {
        self.phase = Phase::Done;
        Step::Advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::{AnswerOption, OptionHandle};
    use crate::tree::AudioClip;

    #[derive(Default)]
    struct TextLog {
        writes: Vec<String>,
    }

    impl PresentationAdapter for TextLog {
        fn set_speaker_name(&mut self, _text: &str) {}
        fn set_body_text(&mut self, text: &str) {
            self.writes.push(text.to_string());
        }
        fn play_clip(&mut self, _clip: &AudioClip, _volume: f32) {}
        fn stop_clip(&mut self) {}
        fn set_open_state(&mut self, _is_open: bool, _use_animation: bool) {}
        fn set_continue_indicator_visible(&mut self, _visible: bool) {}
        fn set_auto_advance_indicator_visible(&mut self, _visible: bool) {}
        fn instantiate_answer_options(&mut self, _question: &str, _options: &[AnswerOption]) -> Vec<OptionHandle> {
            Vec::new()
        }
        fn destroy_answer_options(&mut self, _handles: &[OptionHandle]) {}
    }

    fn config() -> DialogueConfig {
        DialogueConfig::default()
            .with_char_delay(Duration::from_millis(100))
            .with_punctuation_delay(Duration::from_secs(1))
    }

    /// Runs a reveal to completion, collecting every wait it asks for.
    fn run(typewriter: &mut Typewriter, log: &mut TextLog) -> (Vec<Step>, Duration) {
        let mut now = Duration::ZERO;
        let mut steps = vec![typewriter.start(now, log)];
        loop {
            match *steps.last().unwrap() {
                Step::Wait(wait) => now += wait,
                Step::WaitUntil(at) => now = at,
                Step::Parked | Step::Advance => return (steps, now),
            }
            steps.push(typewriter.resume(now, log));
        }
    }

    #[test]
    fn test_full_delay_example() {
        let delay = full_delay("Hi, there!", Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(delay, Duration::from_secs(4));
    }

    #[test]
    fn test_full_delay_without_punctuation() {
        let delay = full_delay("Hmm", Duration::from_millis(50), Duration::from_millis(500));
        assert_eq!(delay, Duration::from_millis(650));
    }

    #[test]
    fn test_text_grows_one_character_per_step() {
        let text = "Hi, there!";
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", text), &config());

        run(&mut typewriter, &mut log);

        assert_eq!(log.writes.len(), text.len() + 1);
        for (i, write) in log.writes.iter().enumerate() {
            assert_eq!(write.chars().count(), i);
            assert!(text.starts_with(write.as_str()));
        }
    }

    #[test]
    fn test_punctuation_replaces_char_delay() {
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Hi, there!"), &config());

        let (steps, _) = run(&mut typewriter, &mut log);

        let waits: Vec<Duration> = steps
            .iter()
            .take(10)
            .map(|step| match step {
                Step::Wait(wait) => *wait,
                other => panic!("Expected a wait, got {:?}", other),
            })
            .collect();
        let ms = Duration::from_millis;
        assert_eq!(
            waits,
            vec![ms(100), ms(100), ms(1000), ms(100), ms(100), ms(100), ms(100), ms(100), ms(100), ms(1000)]
        );
    }

    #[test]
    fn test_auto_advance_skips_trailing_pause_after_punctuation() {
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Ok."), &config());

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(steps.last(), Some(&Step::Advance));
        assert_eq!(elapsed, Duration::from_millis(1200));
    }

    #[test]
    fn test_auto_advance_adds_trailing_pause_otherwise() {
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Ok"), &config());

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(steps.last(), Some(&Step::Advance));
        assert_eq!(elapsed, Duration::from_millis(1200));
    }

    #[test]
    fn test_auto_advance_waits_for_voice_over() {
        let node = DialogueNode::new("Ada", "Ok.").with_clip(AudioClip::new("ok", Duration::from_secs(5)));
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(node, &config());
        typewriter.set_audio_started(Duration::ZERO);

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(steps[steps.len() - 2], Step::WaitUntil(Duration::from_secs(5)));
        assert_eq!(elapsed, Duration::from_secs(5));
    }

    #[test]
    fn test_instant_reveal_paced_by_full_delay() {
        let mut log = TextLog::default();
        let config = config().with_reveal_mode(RevealMode::Instant);
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Hi, there!"), &config);

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(log.writes, vec!["Hi, there!".to_string()]);
        assert_eq!(steps, vec![Step::Wait(Duration::from_secs(4)), Step::Advance]);
        assert_eq!(elapsed, Duration::from_secs(4));
    }

    #[test]
    fn test_instant_reveal_paced_by_clip_when_present() {
        let node = DialogueNode::new("Ada", "Hi, there!").with_clip(AudioClip::new("hi", Duration::from_millis(1500)));
        let mut log = TextLog::default();
        let config = config().with_reveal_mode(RevealMode::Instant);
        let mut typewriter = Typewriter::new(node, &config);
        typewriter.set_audio_started(Duration::ZERO);

        let (_, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(elapsed, Duration::from_millis(1500));
    }

    #[test]
    fn test_wait_for_input_parks_after_reveal() {
        let mut log = TextLog::default();
        let config = config().with_continue_mode(ContinueMode::WaitForInput);
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Ok"), &config);

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(steps.last(), Some(&Step::Parked));
        assert_eq!(elapsed, Duration::from_millis(200));
        assert!(!typewriter.is_running());
    }

    #[test]
    fn test_finish_now_fills_remaining_text() {
        let mut log = TextLog::default();
        let config = config().with_continue_mode(ContinueMode::WaitForInput);
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Hello"), &config);

        typewriter.start(Duration::ZERO, &mut log);
        typewriter.finish_now(&mut log);

        assert_eq!(typewriter.typed(), "Hello");
        assert_eq!(log.writes.last().map(String::as_str), Some("Hello"));
        assert!(!typewriter.is_running());
    }

    #[test]
    fn test_speed_up_keeps_typing_without_delays() {
        let mut log = TextLog::default();
        let config = config().with_continue_mode(ContinueMode::WaitForInput);
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Hi, you"), &config);

        typewriter.start(Duration::ZERO, &mut log);
        typewriter.speed_up();
        let mut steps = Vec::new();
        loop {
            let step = typewriter.resume(Duration::ZERO, &mut log);
            steps.push(step);
            if step == Step::Parked {
                break;
            }
        }

        assert!(steps[..steps.len() - 1].iter().all(|step| *step == Step::Wait(Duration::ZERO)));
        assert_eq!(log.writes.len(), "Hi, you".len() + 1);
        assert_eq!(typewriter.typed(), "Hi, you");
    }

    #[test]
    fn test_hidden_text_writes_nothing() {
        let mut log = TextLog::default();
        let config = config().with_print_text(false);
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", "Hi."), &config);

        let (steps, _) = run(&mut typewriter, &mut log);

        assert!(log.writes.is_empty());
        assert_eq!(steps.last(), Some(&Step::Advance));
        assert_eq!(typewriter.typed(), "Hi.");
    }

    #[test]
    fn test_empty_line_still_pauses() {
        let mut log = TextLog::default();
        let mut typewriter = Typewriter::new(DialogueNode::new("Ada", ""), &config());

        let (steps, elapsed) = run(&mut typewriter, &mut log);

        assert_eq!(steps, vec![Step::Wait(Duration::from_secs(1)), Step::Advance]);
        assert_eq!(elapsed, Duration::from_secs(1));
    }
}
