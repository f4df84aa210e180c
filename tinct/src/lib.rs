//! Extract a dominant color, darker and lighter variants of it,
//! and a ranked list of top colors from an image, for theming a UI around it.
//!
//! # Examples
//!
//! ## Get the top colors of a decoded image as hex codes.
//!
//! ```no_run
//! use tinct::{ColorFormat, Options, Palette, PixelBuffer};
//!
//! let image = image::open("some image").unwrap().thumbnail(18, 18).into_rgba8();
//! let pixels = PixelBuffer::from(image);
//! let palette = Palette::from_pixels(&pixels, &Options::DEFAULT);
//! let result = palette.format(ColorFormat::Hex, 3);
//! ```
//!
//! ## Load an image file asynchronously and rank its colors by vibrance.
//!
//! ```no_run
//! # async fn run() -> Result<(), tinct::ExtractError> {
//! use tinct::{FileSource, Options, SortBy};
//!
//! let options = Options { sort_by: SortBy::Vibrance, max_colors: 5, ..Options::DEFAULT };
//! let result = tinct::extract(&FileSource, "some image", &options).await?;
//! println!("{}", result.dominant_color);
//! # Ok(())
//! # }
//! ```
//!
//! ## Follow the colors of whichever image is currently shown.
//!
//! ```no_run
//! # async fn run() {
//! use tinct::{FileSource, Options, PaletteWatcher};
//!
//! let watcher = PaletteWatcher::new(FileSource, Options::DEFAULT);
//! let mut state = watcher.subscribe();
//!
//! watcher.set_image("first image");
//! watcher.set_image("second image"); // the first result will never be observed
//!
//! while state.changed().await.is_ok() {
//!     let current = state.borrow_and_update();
//!     if !current.loading {
//!         println!("{:?} {:?}", current.dominant_color, current.error);
//!     }
//! }
//! # }
//! ```
//!
//! # Algorithm
//!
//! Pixels with an alpha below [`ALPHA_CUTOFF`] are ignored.
//! Each remaining pixel joins the first existing cluster whose representative
//! (the pixel that started it) is closer than the similarity threshold
//! in RGB space, or otherwise starts a new cluster.
//! Clusters are then ranked either by how many pixels they hold ([`SortBy::Dominance`])
//! or by the saturation times value of their representative ([`SortBy::Vibrance`]).
//!
//! The dominant color is the highest ranked one.
//! Its darker variant has [`DARKER_OFFSET`] subtracted from each RGB channel
//! and its lighter variant has [`LIGHTER_OFFSET`] added, clamping to `0..=255`.
//!
//! # Options
//!
//! ## Max Colors
//!
//! The number of top colors to output. It does not affect the dominant, darker, and lighter colors.
//!
//! ## Max Size
//!
//! Images are downscaled so that their longest edge is at most this many pixels before clustering.
//! Clustering compares every pixel against every cluster found so far,
//! so this is what keeps extraction fast. Small values like the default of `18` are usually enough.
//!
//! ## Color Similarity Threshold
//!
//! The RGB distance below which a pixel joins an existing cluster.
//! Lower values give more, finer clusters; `0.0` only groups exactly matching colors,
//! and values above `442` (the distance from black to white) put every pixel in one cluster.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::enum_glob_use)]
#![allow(clippy::unreadable_literal)]

/// Record the running time of an expression and log the elapsed time
macro_rules! time {
	($name: literal, $expr: expr) => {{
		let start = std::time::Instant::now();
		let result = $expr;
		log::debug!("{} took {}us", $name, start.elapsed().as_micros());
		result
	}};
}

pub(crate) use time;

mod cluster;
mod color;
mod error;
mod format;
mod source;
mod watch;

pub use cluster::{ColorClusters, PixelBuffer, SortBy, ALPHA_CUTOFF};
pub use color::{Color, DARKER_OFFSET, LIGHTER_OFFSET};
pub use error::ExtractError;
pub use format::{ColorFormat, FormattedPalette, Palette};
pub use source::{decode, FileSource, ImageSource, MemorySource};
pub use watch::{extract_cancellable, Generation, PaletteState, PaletteWatcher, Ticket};

/// Options controlling how colors are extracted and rendered
///
/// See the crate documentation for information on each option.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct Options {
	/// The number of top colors to output
	pub max_colors: usize,
	/// The text format for all output colors
	pub format: ColorFormat,
	/// The maximum length of the longest image edge, in pixels
	pub max_size: u32,
	/// The RGB distance below which a pixel joins an existing cluster
	pub color_similarity_threshold: f64,
	/// The criterion used to rank colors
	pub sort_by: SortBy,
}

impl Options {
	/// The default options
	pub const DEFAULT: Self = Self {
		max_colors: 3,
		format: ColorFormat::Rgba,
		max_size: 18,
		color_similarity_threshold: 50.0,
		sort_by: SortBy::Dominance,
	};

	/// Change the number of top colors to output
	#[must_use]
	pub const fn with_max_colors(self, max_colors: usize) -> Self {
		Self { max_colors, ..self }
	}

	/// Change the output format
	#[must_use]
	pub const fn with_format(self, format: ColorFormat) -> Self {
		Self { format, ..self }
	}

	/// Change the maximum image edge length, which should be greater than `0`
	#[must_use]
	pub fn with_max_size(self, max_size: u32) -> Self {
		debug_assert!(max_size > 0);
		Self { max_size, ..self }
	}

	/// Change the similarity threshold, which should be `>= 0.0`
	#[must_use]
	pub fn with_color_similarity_threshold(self, threshold: f64) -> Self {
		debug_assert!(threshold >= 0.0);
		Self { color_similarity_threshold: threshold, ..self }
	}

	/// Change the ranking criterion
	#[must_use]
	pub const fn with_sort_by(self, sort_by: SortBy) -> Self {
		Self { sort_by, ..self }
	}
}

impl Default for Options {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Acquire an image from the source and rank the colors of its pixels.
///
/// # Errors
/// Returns the source's error if the image could not be loaded, decoded, or read as pixels.
pub async fn extract_palette<S: ImageSource>(source: &S, image: &str, options: &Options) -> Result<Palette, ExtractError> {
	let pixels = time!("Image acquisition", source.acquire(image, options.max_size).await)?;
	Ok(Palette::from_pixels(&pixels, options))
}

/// Acquire an image from the source and render its palette according to the options.
///
/// # Errors
/// Returns the source's error if the image could not be loaded, decoded, or read as pixels.
/// No partial result is produced.
pub async fn extract<S: ImageSource>(source: &S, image: &str, options: &Options) -> Result<FormattedPalette, ExtractError> {
	let palette = extract_palette(source, image, options).await?;
	Ok(palette.format(options.format, options.max_colors))
}
