#![forbid(unsafe_code)]

//! Readalong replay binary entry point.

mod cli;
mod replay;

use std::fs;

use readalong::EngineConfig;
use tracing_subscriber::EnvFilter;

use crate::replay::{ReplaySettings, replay};

fn main() {
    let opts = cli::Opts::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(e) = run(&opts) {
        eprintln!("Replay failed: {e}");
        std::process::exit(1);
    }
}

fn run(opts: &cli::Opts) -> readalong::Result<()> {
    let text = fs::read_to_string(&opts.text)?;
    let timing = fs::read_to_string(&opts.timing)?;
    let config = EngineConfig::from_env();
    tracing::info!(
        text = %opts.text.display(),
        timing = %opts.timing.display(),
        rate = opts.rate,
        width = opts.viewport.width,
        height = opts.viewport.height,
        "replay starting"
    );

    let settings = ReplaySettings {
        rate: opts.rate,
        viewport: opts.viewport,
    };
    let report = replay(&text, &timing, config, settings)?;
    if report.status.highlighting_unavailable() {
        tracing::warn!(status = ?report.status, "highlighting unavailable for this content");
    }
    for event in &report.events {
        println!("{event}");
    }

    let cache = report.cache.unwrap_or_default();
    let lookups = report.lookups.unwrap_or_default();
    tracing::info!(
        frames = report.frames,
        repaints = report.repaints,
        cache_hit_rate = cache.hit_rate(),
        cache_size = cache.size,
        hint_hits = lookups.hint_hits,
        full_searches = lookups.full_searches,
        "replay finished"
    );
    Ok(())
}
