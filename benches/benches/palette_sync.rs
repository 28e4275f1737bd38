//! Benchmark suite for the palette codec and palette sync
//!
//! Measures index decoding, RGBA encoding and the full-project remap that
//! runs after every structural palette edit.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use celforge_benches::{SEED, generate_indices, generate_palette, generate_store, sizes};
use celforge_types::{codec, prelude::*, sync};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::SmallRng};
use std::hint::black_box;

/// Benchmark index buffer to RGBA decoding
fn bench_decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("codec_decode");
	let palette = generate_palette(Palette::MAX_COLORS);
	let mut rng = SmallRng::seed_from_u64(SEED);

	for (name, (width, height)) in [("sprite", sizes::SPRITE), ("scene", sizes::SCENE), ("large", sizes::LARGE)] {
		let indices = generate_indices(width, height, palette.len() as u8, &mut rng);
		group.throughput(Throughput::Elements(indices.len() as u64));
		group.bench_with_input(BenchmarkId::new("decode", name), &indices, |b, indices| {
			b.iter(|| black_box(codec::decode(black_box(indices), &palette)));
		});
	}

	group.finish();
}

/// Benchmark RGBA to index buffer encoding with nearest-colour fallback
fn bench_encode(c: &mut Criterion) {
	let mut group = c.benchmark_group("codec_encode");
	let palette = generate_palette(64);
	let mut rng = SmallRng::seed_from_u64(SEED);

	for (name, (width, height)) in [("sprite", sizes::SPRITE), ("scene", sizes::SCENE)] {
		// decode against the full palette so most colours miss the smaller one
		let indices = generate_indices(width, height, 200, &mut rng);
		let rgba = codec::decode(&indices, &generate_palette(Palette::MAX_COLORS));
		group.throughput(Throughput::Elements(indices.len() as u64));
		group.bench_with_input(BenchmarkId::new("nearest", name), &rgba, |b, rgba| {
			b.iter_batched(
				|| palette.clone(),
				|mut palette| black_box(codec::encode(rgba, &mut palette, MissingColor::Nearest)),
				BatchSize::SmallInput,
			);
		});
	}

	group.finish();
}

/// Benchmark a palette reorder across a whole project
fn bench_reorder_sync(c: &mut Criterion) {
	let mut group = c.benchmark_group("palette_reorder");

	for (name, layers, frames) in [("small", 2, 8), ("medium", 4, 24)] {
		let store = generate_store(sizes::SPRITE, layers, frames, 3);
		let cels = (layers * frames) as u64;
		group.throughput(Throughput::Elements(cels));
		group.bench_function(BenchmarkId::new("reorder_1_to_200", name), |b| {
			b.iter_batched(
				|| store.snapshot(),
				|snapshot| {
					let mut store = AnimationStore::from_snapshot(EngineConfig::with_canvas(64, 64), snapshot).ok()?;
					store.reorder_palette(1, 200)
				},
				BatchSize::LargeInput,
			);
		});
	}

	group.finish();
}

/// Benchmark the full-replace remap, the most expensive sync path
fn bench_replace_sync(c: &mut Criterion) {
	let mut group = c.benchmark_group("palette_replace");
	let mut rng = SmallRng::seed_from_u64(SEED);
	let old = generate_palette(Palette::MAX_COLORS);
	let mut reversed: Vec<Color> = old.main().to_vec();
	reversed.reverse();

	let (width, height) = sizes::SCENE;
	let indices = generate_indices(width, height, old.len() as u8, &mut rng);
	let rgba = codec::decode(&indices, &old);
	let surface = Surface {
		pixels: PixelBuffer::from_rgba(width, height, rgba).unwrap(),
		indices: Some(indices),
	};

	group.throughput(Throughput::Elements(surface.pixels.pixel_count() as u64));
	group.bench_function("replace_reversed_scene", |b| {
		b.iter_batched(
			|| (surface.clone(), old.clone()),
			|(mut surface, mut palette)| {
				let change = palette.replace(reversed.clone(), Vec::new())?;
				Some(sync::apply_to_surface(&mut surface, &change, &palette))
			},
			BatchSize::LargeInput,
		);
	});

	group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_reorder_sync, bench_replace_sync);

criterion_main!(benches);
