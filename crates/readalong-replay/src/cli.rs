#![forbid(unsafe_code)]

//! Command-line argument parsing for the replay tool.
//!
//! Parses args by hand. Environment variables with the `READALONG_REPLAY_*`
//! prefix supply defaults; explicit flags override them.

use std::env;
use std::path::PathBuf;
use std::process;

use readalong::Size;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
readalong-replay: drive the highlight engine with a simulated clock

USAGE:
    readalong-replay --text=FILE --timing=FILE [OPTIONS]

OPTIONS:
    --text=FILE          Text file shown to the reader
    --timing=FILE        Word timing JSON for the text
    --rate=R             Playback rate (default: 1.0)
    --viewport=WxH       Viewport size in pixels (default: 640x480)
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    READALONG_REPLAY_TEXT       Default for --text
    READALONG_REPLAY_TIMING     Default for --timing
    READALONG_REPLAY_RATE       Default for --rate
    READALONG_REPLAY_VIEWPORT   Default for --viewport
    READALONG_FULLSCREEN_DELAY_MS, READALONG_SCROLL_MIN_MS,
    READALONG_SCROLL_MAX_MS, READALONG_FRAME_BUDGET_MS
                                Engine configuration overrides
    RUST_LOG                    Log filter (default: info)";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    /// Text file.
    pub text: PathBuf,
    /// Timing file.
    pub timing: PathBuf,
    /// Playback rate multiplier.
    pub rate: f64,
    /// Viewport size in pixels.
    pub viewport: Size,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Replay(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or invalid input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match parse_from(&args, |key| env::var(key).ok()) {
            Ok(Command::Replay(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("readalong-replay {VERSION}");
                process::exit(0);
            }
            Err(message) => {
                eprintln!("{message}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }
}

/// Parse `args` (without the program name) with environment lookups
/// through `get`.
pub fn parse_from<F>(args: &[String], get: F) -> Result<Command, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut text = get("READALONG_REPLAY_TEXT").map(PathBuf::from);
    let mut timing = get("READALONG_REPLAY_TIMING").map(PathBuf::from);
    let mut rate = 1.0;
    let mut viewport = Size::new(640.0, 480.0);

    // Malformed environment defaults are ignored; malformed flags are errors.
    if let Some(val) = get("READALONG_REPLAY_RATE")
        && let Ok(r) = parse_rate(&val)
    {
        rate = r;
    }
    if let Some(val) = get("READALONG_REPLAY_VIEWPORT")
        && let Ok(v) = parse_viewport(&val)
    {
        viewport = v;
    }

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            other => {
                if let Some(val) = other.strip_prefix("--text=") {
                    text = Some(PathBuf::from(val));
                } else if let Some(val) = other.strip_prefix("--timing=") {
                    timing = Some(PathBuf::from(val));
                } else if let Some(val) = other.strip_prefix("--rate=") {
                    rate = parse_rate(val)?;
                } else if let Some(val) = other.strip_prefix("--viewport=") {
                    viewport = parse_viewport(val)?;
                } else {
                    return Err(format!("Unknown argument: {other}"));
                }
            }
        }
    }

    let text = text.ok_or("Missing --text=FILE")?;
    let timing = timing.ok_or("Missing --timing=FILE")?;
    Ok(Command::Replay(Opts {
        text,
        timing,
        rate,
        viewport,
    }))
}

fn parse_rate(val: &str) -> Result<f64, String> {
    match val.parse::<f64>() {
        Ok(r) if r.is_finite() && r > 0.0 => Ok(r),
        _ => Err(format!("Invalid --rate value: {val}")),
    }
}

fn parse_viewport(val: &str) -> Result<Size, String> {
    let invalid = || format!("Invalid --viewport value: {val} (expected WxH)");
    let (w, h) = val.split_once(['x', 'X']).ok_or_else(invalid)?;
    let w: f32 = w.trim().parse().map_err(|_| invalid())?;
    let h: f32 = h.trim().parse().map_err(|_| invalid())?;
    let size = Size::new(w, h);
    if size.is_empty() || !w.is_finite() || !h.is_finite() {
        return Err(invalid());
    }
    Ok(size)
}
