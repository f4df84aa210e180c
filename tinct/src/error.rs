//! Error cases for acquiring pixels and extracting a palette

use std::{
	error::Error,
	fmt::{self, Display},
};

/// Error cases for loading an image and producing its pixel buffer
#[derive(Debug)]
pub enum ExtractError {
	/// Failed to read the image file
	Read(std::io::Error),
	/// Failed to decode the image data
	Decode(image::ImageError),
	/// The image reference is unknown to the source
	NotFound(String),
	/// The blocking task producing the pixel surface did not complete
	Surface(String),
	/// The pixel buffer does not hold `width * height * 4` bytes
	BufferSize {
		/// Number of bytes implied by the dimensions
		expected: usize,
		/// Number of bytes provided
		actual: usize,
	},
}

impl ExtractError {
	/// Whether the image reference could not be loaded or decoded,
	/// as opposed to a failure in producing a pixel surface from it.
	#[must_use]
	pub const fn is_acquisition(&self) -> bool {
		matches!(self, Self::Read(_) | Self::Decode(_) | Self::NotFound(_))
	}
}

impl Display for ExtractError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Read(e) => write!(f, "failed to read the image: {e}"),
			Self::Decode(e) => write!(f, "failed to decode the image: {e}"),
			Self::NotFound(image) => write!(f, "no image named {image:?}"),
			Self::Surface(reason) => write!(f, "failed to produce a pixel surface: {reason}"),
			Self::BufferSize { expected, actual } => {
				write!(f, "pixel buffer holds {actual} bytes but its dimensions require {expected}")
			},
		}
	}
}

impl Error for ExtractError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Read(e) => Some(e),
			Self::Decode(e) => Some(e),
			Self::NotFound(_) | Self::Surface(_) | Self::BufferSize { .. } => None,
		}
	}
}

impl From<std::io::Error> for ExtractError {
	fn from(e: std::io::Error) -> Self {
		Self::Read(e)
	}
}

impl From<image::ImageError> for ExtractError {
	fn from(e: image::ImageError) -> Self {
		Self::Decode(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_acquisition_errors() {
		let read = ExtractError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
		assert!(read.is_acquisition());
		assert!(read.source().is_some());

		assert!(ExtractError::NotFound("cover".to_owned()).is_acquisition());
		assert!(!ExtractError::Surface("cancelled".to_owned()).is_acquisition());
		assert!(!ExtractError::BufferSize { expected: 4, actual: 3 }.is_acquisition());
	}

	#[test]
	fn buffer_size_message_names_both_lengths() {
		let message = ExtractError::BufferSize { expected: 16, actual: 12 }.to_string();
		assert!(message.contains("16") && message.contains("12"));
	}
}
