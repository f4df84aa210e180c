//! Acquiring a bounded-size pixel buffer for an image reference

use crate::{ExtractError, PixelBuffer};
use image::{DynamicImage, GenericImageView};
use std::{collections::HashMap, future::Future, path::PathBuf, sync::Arc};

/// Provides the pixels of an image given some reference to it, such as a path or name.
///
/// Implementations must downscale the image so that its longest edge is at most `max_size`.
pub trait ImageSource: Send + Sync {
	/// Load, decode, and downscale the referenced image.
	fn acquire(&self, image: &str, max_size: u32) -> impl Future<Output = Result<PixelBuffer, ExtractError>> + Send;
}

/// Decode an encoded image and shrink it to fit within `max_size` x `max_size`.
///
/// Images already within the bound are left as is.
/// Only the first frame of animated images is used.
///
/// # Errors
/// Returns [`ExtractError::Decode`] if the format is unsupported or the data is corrupt.
pub fn decode(bytes: &[u8], max_size: u32) -> Result<PixelBuffer, ExtractError> {
	let image = image::load_from_memory(bytes)?;
	Ok(generate_thumbnail(image, max_size).into_rgba8().into())
}

/// Create a thumbnail whose longest edge is at most `max_size` if the image is larger than that
fn generate_thumbnail(image: DynamicImage, max_size: u32) -> DynamicImage {
	let max_size = max_size.max(1);
	let (width, height) = image.dimensions();
	if width.max(height) <= max_size {
		log::trace!("Skipping image thumbnail since {width}x{height} is within {max_size}");
		image
	} else {
		let thumb = image.thumbnail(max_size, max_size);
		log::trace!("Created a {}x{} thumbnail of a {width}x{height} image", thumb.width(), thumb.height());
		thumb
	}
}

/// Run [`decode`] on the blocking thread pool
async fn decode_blocking(bytes: Vec<u8>, max_size: u32) -> Result<PixelBuffer, ExtractError> {
	tokio::task::spawn_blocking(move || decode(&bytes, max_size))
		.await
		.map_err(|e| ExtractError::Surface(e.to_string()))?
}

/// Reads images from the file system, treating each reference as a path
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl ImageSource for FileSource {
	fn acquire(&self, image: &str, max_size: u32) -> impl Future<Output = Result<PixelBuffer, ExtractError>> + Send {
		let path = PathBuf::from(image);
		async move {
			let bytes = tokio::fs::read(&path).await?;
			decode_blocking(bytes, max_size).await
		}
	}
}

/// Serves encoded images held in memory under a name
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	/// Encoded image data by name
	images: HashMap<String, Arc<[u8]>>,
}

impl MemorySource {
	/// Create an empty source
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace the encoded image with the given name
	pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
		self.images.insert(name.into(), bytes.into());
	}

	/// Return this source with the encoded image added
	#[must_use]
	pub fn with_image(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
		self.insert(name, bytes);
		self
	}
}

impl ImageSource for MemorySource {
	fn acquire(&self, image: &str, max_size: u32) -> impl Future<Output = Result<PixelBuffer, ExtractError>> + Send {
		let bytes = self
			.images
			.get(image)
			.cloned()
			.ok_or_else(|| ExtractError::NotFound(image.to_owned()));

		async move { decode_blocking(bytes?.to_vec(), max_size).await }
	}
}
