//! Ranks clusters into a [`Palette`] and renders colors as CSS-like text

use crate::{Color, ColorClusters, Options, PixelBuffer, SortBy};
use palette::Srgb;
use std::{
	fmt::{self, Display},
	str::FromStr,
};

/// Supported text formats for the final colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ColorFormat {
	/// `#rrggbb` in lowercase
	Hex,
	/// `rgb(r,g,b)`
	Rgb,
	/// `rgba(r,g,b,a)` with an integer alpha in `0..=255`
	#[default]
	Rgba,
	/// `hsl(h,s%,l%)`
	Hsl,
	/// `hsv(h,s%,v%)`
	Hsv,
}

impl ColorFormat {
	/// All formats, in declaration order
	pub const ALL: [Self; 5] = [Self::Hex, Self::Rgb, Self::Rgba, Self::Hsl, Self::Hsv];

	/// The text used in place of a missing color
	#[must_use]
	pub const fn fallback(self) -> &'static str {
		match self {
			Self::Hex => "#000000",
			Self::Rgb => "rgb(0,0,0)",
			Self::Rgba => "rgba(0,0,0,0)",
			Self::Hsl => "hsl(0,0%,0%)",
			Self::Hsv => "hsv(0,0%,0%)",
		}
	}

	/// Render a color in this format, or the [fallback](Self::fallback) if there is none.
	#[must_use]
	pub fn format(self, color: Option<Color>) -> String {
		let Some(color) = color else {
			return self.fallback().to_owned();
		};

		let Color { r, g, b, a, .. } = color;
		match self {
			Self::Hex => format!("#{:x}", Srgb::new(r, g, b)),
			Self::Rgb => format!("rgb({r},{g},{b})"),
			Self::Rgba => format!("rgba({r},{g},{b},{a})"),
			Self::Hsl => {
				let (h, s, l) = color.hsl();
				format!("hsl({},{}%,{}%)", round(h * 360.0), round(s * 100.0), round(l * 100.0))
			},
			Self::Hsv => {
				let (h, s, v) = color.hsv();
				format!("hsv({},{}%,{}%)", round(h * 360.0), round(s * 100.0), round(v * 100.0))
			},
		}
	}
}

/// Round a non-negative value half up to an integer
// values are at most 360.0
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round(x: f64) -> u32 {
	x.round() as u32
}

impl Display for ColorFormat {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(match self {
			Self::Hex => "hex",
			Self::Rgb => "rgb",
			Self::Rgba => "rgba",
			Self::Hsl => "hsl",
			Self::Hsv => "hsv",
		})
	}
}

impl FromStr for ColorFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|format| format.to_string() == s)
			.ok_or_else(|| format!("{s:?} is not one of hex, rgb, rgba, hsl, hsv"))
	}
}

/// The dominant color of an image, its darker and lighter variants,
/// and every cluster color by descending rank
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Palette {
	/// The highest ranked color
	pub dominant: Option<Color>,
	/// The dominant color with each RGB channel lowered
	pub darker: Option<Color>,
	/// The dominant color with each RGB channel raised
	pub lighter: Option<Color>,
	/// All cluster colors by descending rank
	pub colors: Vec<Color>,
}

impl Palette {
	/// Sort colors by descending rank, keeping the given order for ties,
	/// and derive the dominant, darker, and lighter colors from the first.
	#[must_use]
	pub fn from_ranked(mut colors: Vec<Color>) -> Self {
		colors.sort_by(|x, y| y.rank.total_cmp(&x.rank));

		let dominant = colors.first().copied();
		Self {
			dominant,
			darker: dominant.map(Color::darker),
			lighter: dominant.map(Color::lighter),
			colors,
		}
	}

	/// Rank the clusters by the given criterion
	#[must_use]
	pub fn from_clusters(clusters: &ColorClusters, sort_by: SortBy) -> Self {
		Self::from_ranked(clusters.ranked(sort_by))
	}

	/// Cluster the pixels and rank the clusters according to the options.
	///
	/// `options.format` and `options.max_colors` are applied later by [`Palette::format`].
	#[must_use]
	pub fn from_pixels(pixels: &PixelBuffer, options: &Options) -> Self {
		let clusters = crate::time!(
			"Clustering",
			ColorClusters::from_pixels(pixels, options.color_similarity_threshold)
		);
		log::debug!("Found {} color clusters", clusters.len());
		Self::from_clusters(&clusters, options.sort_by)
	}

	/// Whether the image had no opaque pixels
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.dominant.is_none()
	}

	/// The `max_colors` highest ranked colors
	#[must_use]
	pub fn top(&self, max_colors: usize) -> &[Color] {
		&self.colors[..max_colors.min(self.colors.len())]
	}

	/// Render the palette as text, keeping only the `max_colors` highest ranked colors.
	#[must_use]
	pub fn format(&self, format: ColorFormat, max_colors: usize) -> FormattedPalette {
		FormattedPalette {
			dominant_color: format.format(self.dominant),
			darker_color: format.format(self.darker),
			lighter_color: format.format(self.lighter),
			colors: self.top(max_colors).iter().map(|&color| format.format(Some(color))).collect(),
		}
	}
}

/// A [`Palette`] rendered in a [`ColorFormat`]
///
/// Missing colors are rendered as the format's fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FormattedPalette {
	/// The dominant color
	pub dominant_color: String,
	/// The darker variant of the dominant color
	pub darker_color: String,
	/// The lighter variant of the dominant color
	pub lighter_color: String,
	/// The highest ranked colors
	pub colors: Vec<String>,
}
