//! The ranked color record and the HSV/HSL math used for ranking and formatting

use palette::Srgba;

/// How much [`Color::darker`] subtracts from each RGB channel
pub const DARKER_OFFSET: u8 = 50;

/// How much [`Color::lighter`] adds to each RGB channel
pub const LIGHTER_OFFSET: u8 = 30;

/// A representative color of an image together with its rank
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
	/// Red channel
	pub r: u8,
	/// Green channel
	pub g: u8,
	/// Blue channel
	pub b: u8,
	/// Alpha channel
	pub a: u8,
	/// The number of pixels in the color's cluster,
	/// or its saturation times value when ranking by vibrance
	pub rank: f64,
}

impl Color {
	/// Create a color with the given channels and a rank of `0.0`
	#[must_use]
	pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
		Self { r, g, b, a, rank: 0.0 }
	}

	/// Return this color with the given rank
	#[must_use]
	pub const fn with_rank(self, rank: f64) -> Self {
		Self { rank, ..self }
	}

	/// Subtract [`DARKER_OFFSET`] from each RGB channel, stopping at `0`.
	#[must_use]
	pub const fn darker(self) -> Self {
		Self {
			r: self.r.saturating_sub(DARKER_OFFSET),
			g: self.g.saturating_sub(DARKER_OFFSET),
			b: self.b.saturating_sub(DARKER_OFFSET),
			..self
		}
	}

	/// Add [`LIGHTER_OFFSET`] to each RGB channel, stopping at `255`.
	#[must_use]
	pub const fn lighter(self) -> Self {
		Self {
			r: self.r.saturating_add(LIGHTER_OFFSET),
			g: self.g.saturating_add(LIGHTER_OFFSET),
			b: self.b.saturating_add(LIGHTER_OFFSET),
			..self
		}
	}

	/// Hue, saturation, and value, each in `0.0..=1.0`
	#[must_use]
	#[allow(clippy::float_cmp)]
	pub fn hsv(self) -> (f64, f64, f64) {
		let n = Normalized::from(self);
		let saturation = if n.max == 0.0 { 0.0 } else { (n.max - n.min) / n.max };
		let hue = if n.max == n.min { 0.0 } else { n.hue() };
		(hue, saturation, n.max)
	}

	/// Hue, saturation, and lightness, each in `0.0..=1.0`
	#[must_use]
	#[allow(clippy::float_cmp)]
	pub fn hsl(self) -> (f64, f64, f64) {
		let n = Normalized::from(self);
		let lightness = (n.max + n.min) / 2.0;

		if n.max == n.min {
			return (0.0, 0.0, lightness);
		}

		let delta = n.max - n.min;
		let saturation = if lightness > 0.5 {
			delta / (2.0 - n.max - n.min)
		} else {
			delta / (n.max + n.min)
		};

		(n.hue(), saturation, lightness)
	}

	/// Saturation times value, used as the rank when sorting by vibrance
	#[must_use]
	pub fn vibrance(self) -> f64 {
		let (_, saturation, value) = self.hsv();
		saturation * value
	}
}

impl From<Srgba<u8>> for Color {
	fn from(color: Srgba<u8>) -> Self {
		Self::new(color.red, color.green, color.blue, color.alpha)
	}
}

impl From<Color> for Srgba<u8> {
	fn from(color: Color) -> Self {
		Srgba::new(color.r, color.g, color.b, color.a)
	}
}

/// RGB channels scaled to `0.0..=1.0` along with their extremes
struct Normalized {
	/// Red
	r: f64,
	/// Green
	g: f64,
	/// Blue
	b: f64,
	/// Largest channel
	max: f64,
	/// Smallest channel
	min: f64,
}

impl From<Color> for Normalized {
	fn from(color: Color) -> Self {
		let r = f64::from(color.r) / 255.0;
		let g = f64::from(color.g) / 255.0;
		let b = f64::from(color.b) / 255.0;
		Self {
			r,
			g,
			b,
			max: r.max(g).max(b),
			min: r.min(g).min(b),
		}
	}
}

impl Normalized {
	/// Hexcone hue in `0.0..1.0`, chosen by whichever channel is the maximum.
	///
	/// Must only be called when `max != min`.
	#[allow(clippy::float_cmp)]
	fn hue(&self) -> f64 {
		let Self { r, g, b, max, min } = *self;
		let delta = max - min;
		let hue = if max == r {
			(g - b) / delta + if g < b { 6.0 } else { 0.0 }
		} else if max == g {
			(b - r) / delta + 2.0
		} else {
			(r - g) / delta + 4.0
		};
		hue / 6.0
	}
}
