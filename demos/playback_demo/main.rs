//! Playback demo.
//!
//! Builds a small project, optionally bounds playback to a tag and drives the
//! engine with a simulated clock, logging every frame change.
//!
//! # Usage
//!
//! ```bash
//! # Loop over six frames of 100 ms for two seconds
//! cargo run --example playback_demo -- --frames 6 --duration 2000
//!
//! # Loop inside frames 2..=4 and dump the project afterwards
//! cargo run --example playback_demo -- --frames 6 --tag 2:4 --snapshot project.json
//! ```

use std::{
	path::PathBuf,
	time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use celforge::prelude::*;

#[derive(Parser)]
#[command(name = "playback_demo")]
#[command(author = "celforge project")]
#[command(version)]
#[command(about = "Simulate timed playback over an animation timeline", long_about = None)]
struct Cli {
	/// Number of frames in the timeline
	#[arg(short, long, default_value_t = 6)]
	frames: usize,

	/// Frame durations in milliseconds, cycled over the frames
	#[arg(long, value_delimiter = ',', default_value = "100")]
	durations: Vec<u32>,

	/// Restrict playback to a tag over `START:END` (inclusive frame indices)
	#[arg(short, long, value_name = "START:END")]
	tag: Option<String>,

	/// Simulated run time in milliseconds
	#[arg(short, long, default_value_t = 1000)]
	duration: u64,

	/// Engine configuration file (TOML)
	#[arg(short, long, env = "CELFORGE_CONFIG")]
	config: Option<PathBuf>,

	/// Write the project snapshot as JSON after playback
	#[arg(short, long, value_name = "FILE")]
	snapshot: Option<PathBuf>,
}

fn parse_range(text: &str) -> Result<(usize, usize)> {
	let Some((start, end)) = text.split_once(':') else {
		bail!("expected START:END, got {text:?}");
	};
	let start = start.trim().parse().with_context(|| format!("invalid tag start {start:?}"))?;
	let end = end.trim().parse().with_context(|| format!("invalid tag end {end:?}"))?;
	Ok((start, end))
}

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
	let cli = Cli::parse();

	if cli.frames == 0 {
		bail!("the timeline needs at least one frame");
	}

	let config = EngineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
	info!("=== Playback Demo ===");
	info!("Canvas: {}x{}", config.canvas_width, config.canvas_height);

	let mut store = AnimationStore::new(config);
	let first = store.current_frame();
	let mut durations = cli.durations.iter().copied().cycle();
	if let Some(duration) = durations.next() {
		store.set_frame_duration(first, duration);
	}
	for _ in 1..cli.frames {
		store.add_frame(durations.next());
	}

	store.subscribe(|event| {
		if let StoreEvent::CurrentFrameChanged {
			index,
			..
		} = event
		{
			info!("  -> frame #{index}");
		}
	});

	if let Some(range) = &cli.tag {
		let (start, end) = parse_range(range)?;
		let Some(tag) = store.add_tag("loop", Color::rgb(0, 128, 255), start, end) else {
			bail!("tag {start}:{end} does not fit a timeline of {} frames", cli.frames);
		};
		store.set_playback_mode(PlaybackMode::Tag(tag));
		if let Some(frame) = store.frames().get(start).map(|frame| frame.id) {
			store.select_frame(frame);
		}
	}

	let start = Instant::now();
	let end = start + Duration::from_millis(cli.duration);
	store.play(start);
	info!("{}", store.playback_state());

	let mut advances = 0;
	while let Some(deadline) = store.next_deadline() {
		if deadline > end {
			break;
		}
		if store.tick(deadline).is_some() {
			advances += 1;
		}
	}
	store.stop();

	info!("{advances} advances in {} ms, stopped on frame #{}", cli.duration, store.current_index());

	if let Some(path) = &cli.snapshot {
		let json = serde_json::to_string_pretty(&store.snapshot())?;
		std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
		info!("Snapshot written to {}", path.display());
	}

	Ok(())
}
