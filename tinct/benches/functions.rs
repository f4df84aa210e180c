use criterion::{
	black_box, criterion_group, criterion_main, measurement::WallTime, BenchmarkGroup, BenchmarkId, Criterion,
	SamplingMode,
};
use image::{Rgba, RgbaImage};
use std::time::Duration;
use tinct::{ColorClusters, ColorFormat, Options, Palette, PixelBuffer, SortBy};

/// Gradient images with many distinct colors, at the sizes the clusterer is expected to see
#[allow(clippy::cast_possible_truncation)]
fn gradients() -> Vec<(String, PixelBuffer)> {
	[(18, 18), (18, 10), (64, 64), (256, 144)]
		.into_iter()
		.map(|(width, height)| {
			let image = RgbaImage::from_fn(width, height, |x, y| {
				Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) % 256) as u8, 255])
			});
			(format!("{width}x{height}"), PixelBuffer::from(image))
		})
		.collect()
}

fn create_group<'a>(c: &'a mut Criterion, name: &'a str) -> BenchmarkGroup<'a, WallTime> {
	let mut group = c.benchmark_group(name);
	group
		.sample_size(30)
		.noise_threshold(0.05)
		.sampling_mode(SamplingMode::Flat)
		.warm_up_time(Duration::from_millis(500));
	group
}

fn clustering(c: &mut Criterion) {
	let mut group = create_group(c, "clustering");

	for (size, pixels) in gradients() {
		for threshold in [0.0, 10.0, 50.0] {
			group.bench_with_input(BenchmarkId::new(format!("threshold {threshold}"), &size), &pixels, |b, pixels| {
				b.iter(|| ColorClusters::from_pixels(pixels, black_box(threshold)));
			});
		}
	}
}

fn formatting(c: &mut Criterion) {
	let mut group = create_group(c, "formatting");

	let pixels = gradients().pop().map(|(_, pixels)| pixels).expect("at least one image");
	let palette = Palette::from_clusters(&ColorClusters::from_pixels(&pixels, 10.0), SortBy::Dominance);

	for format in ColorFormat::ALL {
		group.bench_with_input(BenchmarkId::from_parameter(format), &palette, |b, palette| {
			b.iter(|| palette.format(black_box(format), black_box(64)));
		});
	}
}

fn all_steps(c: &mut Criterion) {
	let mut group = create_group(c, "all steps");

	for (size, pixels) in gradients() {
		for sort_by in [SortBy::Dominance, SortBy::Vibrance] {
			let options = Options::DEFAULT.with_sort_by(sort_by);
			group.bench_with_input(BenchmarkId::new(format!("{sort_by:?}"), &size), &pixels, |b, pixels| {
				b.iter(|| Palette::from_pixels(pixels, black_box(&options)).format(options.format, options.max_colors));
			});
		}
	}
}

criterion_group!(benches, clustering, formatting, all_steps);
criterion_main!(benches);
