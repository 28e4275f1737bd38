//! Palette sync demo.
//!
//! Paints a gradient of palette indices into a few cels (one of them shared by
//! a hard link), applies one palette edit and logs how the index buffers and
//! colours follow.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example palette_demo -- reorder 1 3
//! cargo run --example palette_demo -- remove 2
//! cargo run --example palette_demo -- ephemeral 1
//! cargo run --example palette_demo -- insert 2 "#ffffff"
//! cargo run --example palette_demo -- replace "#0000ff" "#ff0000" --no-remap
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::info;

use celforge::prelude::*;

#[derive(Parser)]
#[command(name = "palette_demo")]
#[command(author = "celforge project")]
#[command(version)]
#[command(about = "Apply a palette edit and watch index buffers follow", long_about = None)]
struct Cli {
	/// Starting palette
	#[arg(short, long, value_delimiter = ',', default_value = "#ff0000,#00ff00,#0000ff,#ffff00")]
	palette: Vec<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Move the colour at FROM to TO
	Reorder {
		/// Index to move
		from: u8,
		/// Destination index
		to: u8,
	},
	/// Remove a main colour
	Remove {
		/// Index to remove
		index: u8,
	},
	/// Move a main colour to the ephemeral region
	Ephemeral {
		/// Index to move
		index: u8,
	},
	/// Insert a colour
	Insert {
		/// Insertion index
		index: u8,
		/// Colour as `#rrggbb`
		color: String,
	},
	/// Replace the whole palette
	Replace {
		/// New colours as `#rrggbb`
		#[arg(required = true)]
		colors: Vec<String>,
		/// Rebuild RGBA from the unchanged indices instead of remapping by colour
		#[arg(long)]
		no_remap: bool,
	},
}

fn describe(store: &AnimationStore, layer: LayerId, frame: FrameId) -> String {
	let Some(cel) = store.cel(layer, frame) else {
		return "<missing>".to_string();
	};
	let surface = cel.surface();
	let Some(indices) = &surface.indices else {
		return "<text>".to_string();
	};
	let colors: Vec<String> = indices
		.iter()
		.map(|&index| store.palette().color_at(index).map_or_else(|| "--".to_string(), |color| color.to_hex()))
		.collect();
	format!("{indices:?} {}", colors.join(" "))
}

fn main() -> Result<()> {
	env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
	let cli = Cli::parse();

	let palette = Palette::from_hex(&cli.palette).context("invalid starting palette")?;
	let count = palette.len() as u8;
	let mut store = AnimationStore::with_palette(EngineConfig::with_canvas(count as u32 + 1, 1), palette);
	let layer = store.layers()[0].id;
	let first = store.current_frame();
	let second = store.add_frame(None);
	let third = store.add_frame(None);

	let gradient: Vec<u8> = (0..=count).collect();
	let reversed: Vec<u8> = gradient.iter().rev().copied().collect();
	store.update_cel_index_buffer(layer, first, gradient);
	store.update_cel_index_buffer(layer, third, reversed);
	store.link_cels(&[CelKey::new(layer, first), CelKey::new(layer, second)], LinkType::Hard);

	info!("=== Palette Demo ===");
	info!("{}", store.palette());
	for frame in [first, second, third] {
		info!("  before {frame}: {}", describe(&store, layer, frame));
	}

	let report = match cli.command {
		Command::Reorder {
			from,
			to,
		} => store.reorder_palette(from, to),
		Command::Remove {
			index,
		} => store.remove_palette_color(index),
		Command::Ephemeral {
			index,
		} => store.move_palette_color_to_ephemeral(index),
		Command::Insert {
			index,
			color,
		} => store.insert_palette_color(index, Color::from_hex(&color)?),
		Command::Replace {
			colors,
			no_remap,
		} => {
			let main = colors.iter().map(|c| Color::from_hex(c)).collect::<Result<Vec<_>, _>>()?;
			store.replace_palette(main, Vec::new(), !no_remap)
		}
	};

	let Some(report) = report else {
		bail!("the palette rejected the edit");
	};

	info!("{}", store.palette());
	info!("Synced: {} remapped, {} rebuilt, {} mismatched", report.remapped, report.rebuilt, report.mismatched);
	for frame in [first, second, third] {
		info!("  after  {frame}: {}", describe(&store, layer, frame));
	}

	Ok(())
}
