//! readaloud main entry point
//!
//! Reads text aloud through the platform speech engine. The event loop
//! waits on two sources:
//! 1. speech engine events - fed to the session controller
//! 2. command lines (p = pause/resume, s = stop, q = quit), read from
//!    stdin, or from the controlling terminal when stdin carries the text

use log::{debug, error, info};
use readaloud::speech::{create_engine, OptionsUpdate, SpeechController};
use readaloud::state::config::Config;
use readaloud::widgets::{ReadAloudButton, VoiceSettings};
use readaloud::{ReadAloudError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::process;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// How long to wait for an engine event before checking stdin commands
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const USAGE: &str = concat!(
    "Usage: readaloud [--debug] [--voices] [--lang L] [--rate R] [--volume V] [--pitch P] ",
    "[TEXT...]\n",
    "Without TEXT the text is read from stdin and commands from the terminal."
);

/// Parsed command line
#[derive(Debug, Default)]
struct Args {
    debug: bool,
    list_voices: bool,
    overrides: OptionsUpdate,
    text: Vec<String>,
}

fn main() {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    };

    // Initialize logger
    if args.debug {
        // Debug mode: write to readaloud.log file
        use std::fs::OpenOptions;
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open("readaloud.log")
        {
            Ok(log_file) => {
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Debug)
                    .target(env_logger::Target::Pipe(Box::new(log_file)))
                    .init();
            }
            Err(e) => {
                eprintln!("Warning: Failed to open readaloud.log for debug logging: {}", e);
                eprintln!("Continuing without file logging...");
                env_logger::Builder::new()
                    .filter_level(log::LevelFilter::Warn)
                    .init();
            }
        }

        info!(
            "readaloud version {} starting (debug mode, logging to readaloud.log)",
            readaloud::VERSION
        );
    } else {
        // Normal mode: minimal logging to stderr, only errors
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Error)
            .init();
    }

    if let Err(e) = run(args) {
        error!("Fatal error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_args(mut iter: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();

    fn number(flag: &str, value: Option<String>) -> Result<f32> {
        let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
        value
            .parse()
            .map_err(|_| ReadAloudError::Other(format!("{}: not a number: {}", flag, value)))
    }

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--debug" | "-d" => args.debug = true,
            "--voices" => args.list_voices = true,
            "--lang" => {
                let lang = iter.next().ok_or("--lang needs a value")?;
                args.overrides.lang = Some(lang);
            }
            "--rate" => args.overrides.rate = Some(number("--rate", iter.next())?),
            "--volume" => args.overrides.volume = Some(number("--volume", iter.next())?),
            "--pitch" => args.overrides.pitch = Some(number("--pitch", iter.next())?),
            _ => args.text.push(arg),
        }
    }

    Ok(args)
}

fn has_overrides(update: &OptionsUpdate) -> bool {
    update.lang.is_some()
        || update.rate.is_some()
        || update.volume.is_some()
        || update.pitch.is_some()
}

fn run(args: Args) -> Result<()> {
    debug!("Initializing readaloud");

    let mut config = Config::load()?;
    info!("Configuration loaded from {:?}", config.path());

    let persist = has_overrides(&args.overrides);
    let options = config.options_update().and(args.overrides);

    let engine = create_engine()?;
    let (mut controller, events) = SpeechController::with_channel(engine, options);

    if let Some(id) = config.voice_id() {
        let configured = controller.voices().iter().find(|v| v.id == id).cloned();
        match configured {
            Some(voice) => controller.set_voice(voice),
            None => info!(
                "Configured voice {} not offered, keeping {:?}",
                id,
                controller.current_voice()
            ),
        }
    }

    if args.list_voices {
        println!("{}", serde_json::to_string_pretty(controller.voices())?);
        return Ok(());
    }

    if persist {
        let options = controller.options();
        config.apply_settings(&VoiceSettings {
            lang: options.lang.clone(),
            voice: controller.current_voice().cloned(),
            rate: options.rate,
            volume: options.volume,
            pitch: options.pitch,
        });
        config.save()?;
        info!("Saved settings to {:?}", config.path());
    }

    // Text from the command line leaves stdin free for commands
    let (text, commands) = if args.text.is_empty() {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        let commands = match File::open("/dev/tty") {
            Ok(tty) => Some(spawn_command_reader(BufReader::new(tty))),
            Err(e) => {
                info!("No terminal for commands: {}", e);
                None
            }
        };
        (text, commands)
    } else {
        (args.text.join(" "), Some(spawn_command_reader(BufReader::new(io::stdin()))))
    };

    let text = text.trim();
    if text.is_empty() {
        eprintln!("Nothing to read");
        return Ok(());
    }

    let button = ReadAloudButton::new(text);
    {
        let button = button.clone();
        controller.on_state_change(move |state| {
            let view = button.render(state);
            eprintln!("{} {}", view.icon, view.label);
        });
    }

    button.click(&mut controller);

    // Run until the session drops its utterance: end, error or stop
    while controller.active_utterance().is_some() || controller.is_speaking() {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => controller.handle_engine_event(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("Speech engine went away");
                break;
            }
        }
        controller.pump(&events);

        if let Some(commands) = &commands {
            while let Ok(command) = commands.try_recv() {
                match command.trim() {
                    "p" | "r" => button.click(&mut controller),
                    "s" => button.click_stop(&mut controller),
                    "q" => {
                        controller.stop();
                        return Ok(());
                    }
                    other => debug!("Unknown command {:?}", other),
                }
            }
        }
    }

    Ok(())
}

/// Forward command lines from `source` to the event loop
fn spawn_command_reader(source: impl BufRead + Send + 'static) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in source.lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
