use std::env;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use colloquy::*;

const DEFAULT_START_TREE: &str = "Start";
const FRAME: Duration = Duration::from_millis(16);

/// Prints dialogue to the terminal.
#[derive(Default)]
struct Console {
    shown: String,
    options: Vec<AnswerOption>,
}

impl Console {
    fn flush() {
        let _ = io::stdout().flush();
    }
}

impl PresentationAdapter for Console {
    fn set_speaker_name(&mut self, text: &str) {
        println!();
        print!("{}: ", text);
        Console::flush();
    }

    fn set_body_text(&mut self, text: &str) {
        // Only print what is new since the last write.
        if text.starts_with(self.shown.as_str()) {
            print!("{}", &text[self.shown.len()..]);
        } else if !text.is_empty() {
            print!("\n{}", text);
        }
        self.shown = text.to_string();
        Console::flush();
    }

    fn play_clip(&mut self, clip: &AudioClip, volume: f32) {
        log::info!("Playing {} at volume {}", clip.name, volume);
    }

    fn stop_clip(&mut self) {}

    fn set_open_state(&mut self, is_open: bool, _use_animation: bool) {
        if is_open {
            println!("== Dialogue ==");
        } else {
            println!("\n== Dialogue complete ==");
        }
    }

    fn set_continue_indicator_visible(&mut self, visible: bool) {
        if visible {
            print!(" [enter]");
            Console::flush();
        }
    }

    fn set_auto_advance_indicator_visible(&mut self, _visible: bool) {}

    fn instantiate_answer_options(&mut self, question: &str, options: &[AnswerOption]) -> Vec<OptionHandle> {
        println!("\n== {} ==", question);
        for (i, option) in options.iter().enumerate() {
            println!("{}: {} {}", i + 1, option.choice, option.answer);
        }
        self.options = options.to_vec();
        (0..options.len() as u64).map(OptionHandle).collect()
    }

    fn destroy_answer_options(&mut self, _handles: &[OptionHandle]) {
        self.options.clear();
    }
}

/// What to play and how, from the command line.
#[derive(Debug)]
struct Options {
    bundle_path: PathBuf,
    start_tree: String,
    config: DialogueConfig,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Options> {
    let bundle_path = PathBuf::from(args.next()?);

    let mut start_tree = DEFAULT_START_TREE.to_string();
    let mut config = DialogueConfig::default();
    for arg in args {
        match arg.as_str() {
            "--instant" => config = config.with_reveal_mode(RevealMode::Instant),
            "--wait" => config = config.with_continue_mode(ContinueMode::WaitForInput),
            "--speedup" => config = config.with_finish_policy(FinishPolicy::SpeedupFinish),
            "--silent" => config = config.with_audio(false),
            tree => start_tree = tree.to_string(),
        }
    }

    Some(Options {
        bundle_path,
        start_tree,
        config,
    })
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let _ = pretty_env_logger::try_init();

    let Options {
        bundle_path,
        start_tree,
        config,
    } = match parse_args(env::args().skip(1)) {
        Some(options) => options,
        None => {
            eprintln!("Usage: colloquy-run <bundle.colloquy> [start-tree] [--instant] [--wait] [--speedup] [--silent]");
            return Ok(());
        }
    };

    let registry = load_from_paths(&bundle_path)?;
    if !registry.contains(&start_tree) {
        eprintln!("Could not find start tree: {}", start_tree);
        return Ok(());
    }

    // Read stdin off the main thread so the frame loop never blocks.
    let (input_tx, input_rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    let mut runner = DialogueRunner::new(config, registry, Console::default());
    runner.start_dialogue(Some(start_tree.as_str()))?;

    let mut last_frame = Instant::now();
    while runner.is_playing() {
        thread::sleep(FRAME);
        let now = Instant::now();
        runner.update(now - last_frame);
        last_frame = now;

        while let Ok(line) = input_rx.try_recv() {
            let line = line.trim();
            if runner.state() == PlaybackState::Resolving {
                let picked = line
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| runner.presenter().options.get(i).cloned());
                match picked {
                    Some(option) => {
                        runner.handle_input(PlayerInput::SelectAnswer(option.answer));
                        runner.handle_input(PlayerInput::SubmitChoice);
                    }
                    None => println!("Pick a number between 1 and {}", runner.options().len()),
                }
            } else {
                runner.handle_input(PlayerInput::Continue);
            }
        }

        for warning in runner.take_warnings() {
            log::debug!("{}", warning);
        }
    }

    Ok(())
}
