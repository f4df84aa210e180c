//! Re-extracts the palette whenever the watched image changes,
//! dropping results of runs that have been superseded or cancelled

use crate::{ExtractError, FormattedPalette, ImageSource, Options, Palette};
use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc, Mutex, PoisonError,
};
use tokio::{sync::watch, task::JoinHandle};

/// A counter that is bumped whenever outstanding work should be abandoned
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
	/// Create a counter starting at generation `0`
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Supersede all previously issued tickets and issue a ticket for the new generation.
	#[must_use]
	pub fn next_ticket(&self) -> Ticket {
		let generation = self.0.fetch_add(1, Ordering::AcqRel) + 1;
		Ticket { generation, current: Arc::clone(&self.0) }
	}

	/// Supersede all previously issued tickets.
	pub fn cancel(&self) {
		self.0.fetch_add(1, Ordering::AcqRel);
	}
}

/// Permission for a run to commit its result, valid until its [`Generation`] moves on
#[derive(Debug, Clone)]
pub struct Ticket {
	/// The generation this ticket was issued for
	generation: u64,
	/// The counter's current generation
	current: Arc<AtomicU64>,
}

impl Ticket {
	/// Whether no newer run has started and no cancellation has happened since this ticket was issued
	#[must_use]
	pub fn is_current(&self) -> bool {
		self.current.load(Ordering::Acquire) == self.generation
	}
}

/// Acquire and extract a palette, giving up with `None` if the ticket is no longer current.
///
/// The ticket is checked once acquisition finishes, before any clustering is done.
/// Callers must check it again before applying the result anywhere.
pub async fn extract_cancellable<S: ImageSource>(
	source: &S,
	image: &str,
	options: &Options,
	ticket: &Ticket,
) -> Option<Result<FormattedPalette, ExtractError>> {
	let pixels = crate::time!("Image acquisition", source.acquire(image, options.max_size).await);

	if !ticket.is_current() {
		log::trace!("Discarding pixels of superseded image {image:?}");
		return None;
	}

	Some(pixels.map(|pixels| Palette::from_pixels(&pixels, options).format(options.format, options.max_colors)))
}

/// The latest extraction result of a [`PaletteWatcher`]
#[derive(Debug, Clone, Default)]
pub struct PaletteState {
	/// The image the watcher was last asked to extract
	pub image: Option<String>,
	/// The dominant color, or `None` before the first successful extraction
	pub dominant_color: Option<String>,
	/// The darker variant of the dominant color
	pub darker_color: Option<String>,
	/// The lighter variant of the dominant color
	pub lighter_color: Option<String>,
	/// The highest ranked colors
	pub colors: Vec<String>,
	/// Whether an extraction is in progress
	pub loading: bool,
	/// The error of the last extraction, cleared when a new image is set
	pub error: Option<Arc<ExtractError>>,
}

impl PaletteState {
	/// Reset the colors to their initial, empty values
	fn clear_colors(&mut self) {
		self.dominant_color = None;
		self.darker_color = None;
		self.lighter_color = None;
		self.colors.clear();
	}

	/// Apply the outcome of an extraction
	fn settle(&mut self, result: Result<FormattedPalette, ExtractError>, clear_on_error: bool) {
		self.loading = false;
		match result {
			Ok(palette) => {
				self.dominant_color = Some(palette.dominant_color);
				self.darker_color = Some(palette.darker_color);
				self.lighter_color = Some(palette.lighter_color);
				self.colors = palette.colors;
				self.error = None;
			},
			Err(e) => {
				if clear_on_error {
					self.clear_colors();
				}
				self.error = Some(Arc::new(e));
			},
		}
	}
}

/// Extracts the palette of an image in the background, restarting whenever the image changes.
///
/// Only the most recently set image can ever affect the observable [`PaletteState`].
/// By default a failed extraction keeps the colors of the last successful one;
/// see [`PaletteWatcher::clear_on_error`].
#[derive(Debug)]
pub struct PaletteWatcher<S> {
	/// Where images are loaded from
	source: Arc<S>,
	/// Extraction options used for every image
	options: Options,
	/// Whether a failed extraction resets the colors
	clear_on_error: bool,
	/// Supersedes in-flight runs
	generation: Generation,
	/// The observable state
	state: Arc<watch::Sender<PaletteState>>,
	/// The in-flight run, if any
	task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: ImageSource + 'static> PaletteWatcher<S> {
	/// Create a watcher with no image
	#[must_use]
	pub fn new(source: S, options: Options) -> Self {
		Self {
			source: Arc::new(source),
			options,
			clear_on_error: false,
			generation: Generation::new(),
			state: Arc::new(watch::Sender::new(PaletteState::default())),
			task: Mutex::new(None),
		}
	}

	/// Choose whether a failed extraction resets the colors to `None` instead of keeping the last ones.
	#[must_use]
	pub fn clear_on_error(mut self, clear_on_error: bool) -> Self {
		self.clear_on_error = clear_on_error;
		self
	}

	/// The options used for every extraction
	#[must_use]
	pub const fn options(&self) -> &Options {
		&self.options
	}

	/// Start extracting the palette of `image`, superseding any extraction in progress.
	///
	/// `loading` becomes `true` and `error` is cleared immediately.
	///
	/// # Panics
	/// Panics if called outside of a Tokio runtime.
	pub fn set_image(&self, image: impl Into<String>) {
		let image = image.into();
		let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

		// Issue the ticket under the state lock so a stale run cannot commit in between.
		let mut ticket = None;
		self.state.send_modify(|state| {
			ticket = Some(self.generation.next_ticket());
			state.image = Some(image.clone());
			state.loading = true;
			state.error = None;
		});
		let Some(ticket) = ticket else { return };

		log::debug!("Extracting colors of {image:?}");

		let source = Arc::clone(&self.source);
		let state = Arc::clone(&self.state);
		let options = self.options;
		let clear_on_error = self.clear_on_error;

		let run = tokio::spawn(async move {
			let Some(result) = extract_cancellable(&*source, &image, &options, &ticket).await else {
				return;
			};

			if let Err(e) = &result {
				log::warn!("Failed to extract colors of {image:?}: {e}");
			}

			let committed = state.send_if_modified(|state| {
				if ticket.is_current() {
					state.settle(result, clear_on_error);
					true
				} else {
					false
				}
			});

			if !committed {
				log::trace!("Dropped result of superseded image {image:?}");
			}
		});

		if let Some(previous) = task.replace(run) {
			previous.abort();
		}
	}

	/// Abandon any extraction in progress; its result will never be observed.
	///
	/// `loading` becomes `false` and the colors keep their current values.
	pub fn cancel(&self) {
		self.state.send_modify(|state| {
			self.generation.cancel();
			state.loading = false;
		});
		self.abort_task();
	}

	/// Abandon any extraction in progress and reset the state as if no image was ever set.
	pub fn clear(&self) {
		self.state.send_modify(|state| {
			self.generation.cancel();
			*state = PaletteState::default();
		});
		self.abort_task();
	}

	/// A snapshot of the current state
	#[must_use]
	pub fn state(&self) -> PaletteState {
		self.state.borrow().clone()
	}

	/// Observe every change to the state
	#[must_use]
	pub fn subscribe(&self) -> watch::Receiver<PaletteState> {
		self.state.subscribe()
	}
}

impl<S> PaletteWatcher<S> {
	/// Abort the in-flight task, if any
	fn abort_task(&self) {
		if let Some(task) = self.task.lock().unwrap_or_else(PoisonError::into_inner).take() {
			task.abort();
		}
	}
}

impl<S> Drop for PaletteWatcher<S> {
	fn drop(&mut self) {
		self.generation.cancel();
		self.abort_task();
	}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use crate::{ColorFormat, PixelBuffer};
	use std::{collections::HashMap, future::Future, time::Duration};
	use tokio::sync::Notify;

	/// Serves single-color images, each only once its gate is opened
	#[derive(Default)]
	struct GatedSource {
		/// Color of each image
		colors: HashMap<&'static str, [u8; 4]>,
		/// Gate of each image
		gates: Mutex<HashMap<String, Arc<Notify>>>,
	}

	impl GatedSource {
		fn new(colors: &[(&'static str, [u8; 4])]) -> Self {
			Self { colors: colors.iter().copied().collect(), ..Self::default() }
		}

		fn gate(&self, image: &str) -> Arc<Notify> {
			Arc::clone(self.gates.lock().unwrap().entry(image.to_owned()).or_default())
		}

		fn open(&self, image: &str) {
			self.gate(image).notify_one();
		}
	}

	impl ImageSource for GatedSource {
		fn acquire(&self, image: &str, _: u32) -> impl Future<Output = Result<PixelBuffer, ExtractError>> + Send {
			let gate = self.gate(image);
			let color = self.colors.get(image).copied();
			let image = image.to_owned();
			async move {
				gate.notified().await;
				let color = color.ok_or(ExtractError::NotFound(image))?;
				PixelBuffer::new(2, 2, color.repeat(4))
			}
		}
	}

	/// Lets a shared source be opened from the test while the watcher owns a handle to it
	impl ImageSource for Arc<GatedSource> {
		fn acquire(&self, image: &str, max_size: u32) -> impl Future<Output = Result<PixelBuffer, ExtractError>> + Send {
			(**self).acquire(image, max_size)
		}
	}

	const RED: [u8; 4] = [255, 0, 0, 255];
	const BLUE: [u8; 4] = [0, 0, 255, 255];

	fn source() -> Arc<GatedSource> {
		Arc::new(GatedSource::new(&[("red", RED), ("blue", BLUE)]))
	}

	fn options() -> Options {
		Options::DEFAULT.with_format(ColorFormat::Hex)
	}

	async fn settled(receiver: &mut watch::Receiver<PaletteState>) -> PaletteState {
		receiver.wait_for(|state| !state.loading).await.unwrap().clone()
	}

	#[test]
	fn tickets_expire_on_next_and_cancel() {
		let generation = Generation::new();

		let first = generation.next_ticket();
		assert!(first.is_current());

		let second = generation.next_ticket();
		assert!(!first.is_current());
		assert!(second.is_current());

		generation.cancel();
		assert!(!second.is_current());
	}

	#[tokio::test]
	async fn cancelled_extraction_yields_nothing() {
		let source = source();
		source.open("red");

		let generation = Generation::new();
		let ticket = generation.next_ticket();
		generation.cancel();

		let options = options();
		assert!(extract_cancellable(&source, "red", &options, &ticket).await.is_none());

		let ticket = generation.next_ticket();
		let result = extract_cancellable(&source, "blue", &options, &ticket);
		source.open("blue");
		assert_eq!(result.await.unwrap().unwrap().dominant_color, "#0000ff");
	}

	#[tokio::test]
	async fn extracts_the_set_image() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options());
		let mut receiver = watcher.subscribe();

		assert!(!watcher.state().loading);
		assert_eq!(watcher.state().dominant_color, None);

		watcher.set_image("red");
		assert!(watcher.state().loading);

		source.open("red");
		let state = settled(&mut receiver).await;
		assert_eq!(state.image.as_deref(), Some("red"));
		assert_eq!(state.dominant_color.as_deref(), Some("#ff0000"));
		assert_eq!(state.darker_color.as_deref(), Some("#cd0000"));
		assert_eq!(state.lighter_color.as_deref(), Some("#ff1e1e"));
		assert_eq!(state.colors, vec!["#ff0000"]);
		assert!(state.error.is_none());
	}

	#[tokio::test]
	async fn newer_image_supersedes_older() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options());
		let mut receiver = watcher.subscribe();

		watcher.set_image("red");
		watcher.set_image("blue");

		source.open("blue");
		let state = settled(&mut receiver).await;
		assert_eq!(state.dominant_color.as_deref(), Some("#0000ff"));

		source.open("red");
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(watcher.state().dominant_color.as_deref(), Some("#0000ff"));
		assert_eq!(watcher.state().image.as_deref(), Some("blue"));
	}

	#[tokio::test]
	async fn cancel_drops_in_flight_result() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options());

		watcher.set_image("red");
		watcher.cancel();
		assert!(!watcher.state().loading);

		source.open("red");
		tokio::time::sleep(Duration::from_millis(20)).await;
		assert_eq!(watcher.state().dominant_color, None);
	}

	#[tokio::test]
	async fn failure_keeps_previous_colors() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options());
		let mut receiver = watcher.subscribe();

		watcher.set_image("red");
		source.open("red");
		settled(&mut receiver).await;

		watcher.set_image("missing");
		assert!(watcher.state().error.is_none());
		source.open("missing");
		let state = settled(&mut receiver).await;

		assert!(matches!(state.error.as_deref(), Some(ExtractError::NotFound(_))));
		assert_eq!(state.dominant_color.as_deref(), Some("#ff0000"));
		assert_eq!(state.colors, vec!["#ff0000"]);

		watcher.set_image("blue");
		assert!(watcher.state().error.is_none());
		assert!(watcher.state().loading);
	}

	#[tokio::test]
	async fn failure_can_clear_colors() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options()).clear_on_error(true);
		let mut receiver = watcher.subscribe();

		watcher.set_image("red");
		source.open("red");
		settled(&mut receiver).await;

		watcher.set_image("missing");
		source.open("missing");
		let state = settled(&mut receiver).await;

		assert!(state.error.is_some());
		assert_eq!(state.dominant_color, None);
		assert!(state.colors.is_empty());
	}

	#[tokio::test]
	async fn clear_resets_state() {
		let source = source();
		let watcher = PaletteWatcher::new(Arc::clone(&source), options());
		let mut receiver = watcher.subscribe();

		watcher.set_image("red");
		source.open("red");
		settled(&mut receiver).await;

		watcher.clear();
		let state = watcher.state();
		assert_eq!(state.image, None);
		assert_eq!(state.dominant_color, None);
		assert!(!state.loading);
	}
}
