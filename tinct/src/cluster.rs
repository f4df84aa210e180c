//! Groups the opaque pixels of an image into clusters of similar colors

use crate::{Color, ExtractError};
use image::RgbaImage;
use palette::{rgb::channels::Rgba, Srgb, Srgba};
use std::{collections::HashMap, str::FromStr};

/// Pixels with an alpha below this are treated as transparent and ignored
pub const ALPHA_CUTOFF: u8 = 125;

/// A row-major buffer of RGBA8 pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
	/// Width in pixels
	width: u32,
	/// Height in pixels
	height: u32,
	/// Four bytes per pixel in R, G, B, A order
	data: Vec<u8>,
}

impl PixelBuffer {
	/// Create a pixel buffer, checking that `data` holds exactly `width * height * 4` bytes.
	///
	/// # Errors
	/// Returns [`ExtractError::BufferSize`] if the length does not match the dimensions.
	pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ExtractError> {
		let expected = usize::try_from(u64::from(width) * u64::from(height))
			.ok()
			.and_then(|pixels| pixels.checked_mul(4))
			.ok_or(ExtractError::BufferSize { expected: usize::MAX, actual: data.len() })?;

		if data.len() == expected {
			Ok(Self { width, height, data })
		} else {
			Err(ExtractError::BufferSize { expected, actual: data.len() })
		}
	}

	/// The width of the buffer in pixels
	#[must_use]
	pub const fn width(&self) -> u32 {
		self.width
	}

	/// The height of the buffer in pixels
	#[must_use]
	pub const fn height(&self) -> u32 {
		self.height
	}

	/// The raw RGBA bytes
	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		&self.data
	}

	/// View the bytes as pixels
	#[must_use]
	pub fn pixels(&self) -> &[Srgba<u8>] {
		// the length is a multiple of 4, checked in new
		palette::cast::from_component_slice(&self.data)
	}
}

impl From<RgbaImage> for PixelBuffer {
	fn from(image: RgbaImage) -> Self {
		let (width, height) = image.dimensions();
		Self { width, height, data: image.into_raw() }
	}
}

/// The criterion used to rank clusters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SortBy {
	/// Descending number of pixels
	#[default]
	Dominance,
	/// Descending saturation times value of the cluster's representative
	Vibrance,
}

impl FromStr for SortBy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"dominance" => Ok(Self::Dominance),
			"vibrance" => Ok(Self::Vibrance),
			_ => Err(format!("{s:?} is not one of dominance, vibrance")),
		}
	}
}

/// Squared Euclidean distance between the RGB channels of two colors
fn squared_distance(x: Srgb<u8>, y: Srgb<u8>) -> u32 {
	let dr = i32::from(x.red) - i32::from(y.red);
	let dg = i32::from(x.green) - i32::from(y.green);
	let db = i32::from(x.blue) - i32::from(y.blue);
	// at most 3 * 255^2
	dr.unsigned_abs().pow(2) + dg.unsigned_abs().pow(2) + db.unsigned_abs().pow(2)
}

/// Clusters of similar colors, in the order they were created
#[derive(Debug, Clone, Default)]
pub struct ColorClusters {
	/// The first pixel of each cluster
	representatives: Vec<Srgba<u8>>,
	/// The number of pixels in each cluster
	counts: Vec<u32>,
}

impl ColorClusters {
	/// Assign every opaque pixel to the first cluster whose representative is
	/// closer than `threshold` in RGB space, starting a new cluster when none is.
	///
	/// Pixels identical to a representative always join it,
	/// so a threshold of `0.0` gives one cluster per distinct RGBA color.
	/// Negative thresholds are treated as `0.0`.
	#[must_use]
	pub fn from_pixels(pixels: &PixelBuffer, threshold: f64) -> Self {
		let mut clusters = Self::default();
		let threshold = threshold.max(0.0);
		let threshold = threshold * threshold;

		// Representatives never change and clusters are only appended,
		// so a repeated RGBA always lands in the same cluster as its first occurrence.

		// Packed RGBA -> cluster index
		let mut memo: HashMap<u32, u32> = HashMap::new();

		for &pixel in pixels.pixels() {
			if pixel.alpha < ALPHA_CUTOFF {
				continue;
			}

			let key = pixel.into_u32::<Rgba>();
			let index = *memo
				.entry(key)
				.or_insert_with(|| clusters.first_within(pixel, threshold).unwrap_or_else(|| clusters.push(pixel)));

			clusters.counts[index as usize] += 1;
		}

		log::trace!(
			"grouped {}x{} pixels into {} clusters",
			pixels.width(),
			pixels.height(),
			clusters.len()
		);

		clusters
	}

	/// The index of the first cluster that is identical to `pixel`
	/// or whose RGB lies within `squared_threshold` of it
	fn first_within(&self, pixel: Srgba<u8>, squared_threshold: f64) -> Option<u32> {
		let index = self.representatives.iter().position(|&representative| {
			representative == pixel || f64::from(squared_distance(representative.color, pixel.color)) < squared_threshold
		})?;

		// fewer than 2^32 clusters, one per distinct RGBA at most
		#[allow(clippy::cast_possible_truncation)]
		let index = index as u32;
		Some(index)
	}

	/// Start a new, empty cluster and return its index
	fn push(&mut self, representative: Srgba<u8>) -> u32 {
		#[allow(clippy::cast_possible_truncation)]
		let index = self.representatives.len() as u32;
		self.representatives.push(representative);
		self.counts.push(0);
		index
	}

	/// The number of clusters
	#[must_use]
	pub fn len(&self) -> usize {
		self.representatives.len()
	}

	/// Whether there are no clusters, i.e., no opaque pixels
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.representatives.is_empty()
	}

	/// The first pixel of each cluster
	#[must_use]
	pub fn representatives(&self) -> &[Srgba<u8>] {
		&self.representatives
	}

	/// The number of pixels in each cluster
	#[must_use]
	pub fn counts(&self) -> &[u32] {
		&self.counts
	}

	/// Each cluster's representative ranked by the given criterion, in creation order
	#[must_use]
	pub fn ranked(&self, sort_by: SortBy) -> Vec<Color> {
		self.representatives
			.iter()
			.zip(&self.counts)
			.map(|(&representative, &count)| {
				let color = Color::from(representative);
				match sort_by {
					SortBy::Dominance => color.with_rank(f64::from(count)),
					SortBy::Vibrance => color.with_rank(color.vibrance()),
				}
			})
			.collect()
	}
}
