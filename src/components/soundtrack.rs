//! A track picked by the user, played through an `<audio>` element and sampled by an
//! analyser node. The browser decodes the file; only the byte spectrum is read back.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{AnalyserNode, AudioContext, File, HtmlAudioElement, HtmlInputElement, Url};

use crate::audio::{AudioFeed, FrequencyBands, SpectrumFeed, SyntheticFeed};

const FFT_SIZE: u32 = 2048;
const ANALYSER_SMOOTHING: f64 = 0.92;
const VOLUME: f64 = 0.2;

struct Live {
	context: AudioContext,
	analyser: AnalyserNode,
	element: HtmlAudioElement,
	url: Option<String>,
}

impl Live {
	fn new() -> Result<Self, JsValue> {
		let context = AudioContext::new()?;
		let analyser = context.create_analyser()?;
		analyser.set_fft_size(FFT_SIZE);
		analyser.set_smoothing_time_constant(ANALYSER_SMOOTHING);

		let element = HtmlAudioElement::new()?;
		element.set_loop(true);
		element.set_volume(VOLUME);

		let source = context.create_media_element_source(&element)?;
		source.connect_with_audio_node(&analyser)?;
		analyser.connect_with_audio_node(&context.destination())?;
		Ok(Self {
			context,
			analyser,
			element,
			url: None,
		})
	}
}

impl Drop for Live {
	fn drop(&mut self) {
		let _ = self.element.pause();
		if let Some(url) = self.url.take() {
			let _ = Url::revoke_object_url(&url);
		}
		let _ = self.context.close();
		info!("Audio graph closed");
	}
}

/// Handle to the page's audio graph. Empty until a track is chosen.
#[derive(Clone, Default)]
pub struct AudioSource(Rc<RefCell<Option<Live>>>);

impl AudioSource {
	/// Start looping `file`, building the graph on first use.
	pub fn play_file(&self, file: &File) -> Result<(), JsValue> {
		let mut slot = self.0.borrow_mut();
		if slot.is_none() {
			*slot = Some(Live::new()?);
		}
		let Some(live) = slot.as_mut() else {
			return Ok(());
		};
		if let Some(old) = live.url.take() {
			let _ = Url::revoke_object_url(&old);
		}
		let url = Url::create_object_url_with_blob(file)?;
		live.element.set_src(&url);
		live.url = Some(url);
		let _ = live.context.resume()?;
		let _ = live.element.play()?;
		info!("Playing {}", file.name());
		Ok(())
	}

	/// Pause or resume. Returns whether the track is playing afterwards.
	pub fn toggle(&self) -> bool {
		let slot = self.0.borrow();
		let Some(live) = slot.as_ref() else {
			return false;
		};
		if live.element.paused() {
			let _ = live.context.resume();
			let _ = live.element.play();
			true
		} else {
			let _ = live.element.pause();
			false
		}
	}

	/// Whether a track is loaded and not paused.
	pub fn is_playing(&self) -> bool {
		self.0.borrow().as_ref().is_some_and(|live| !live.element.paused())
	}

	/// Copy the analyser's byte spectrum into `bins`. False while nothing plays.
	fn sample(&self, bins: &mut Vec<u8>) -> bool {
		let slot = self.0.borrow();
		let Some(live) = slot.as_ref().filter(|live| !live.element.paused()) else {
			return false;
		};
		bins.resize(live.analyser.frequency_bin_count() as usize, 0);
		live.analyser.get_byte_frequency_data(bins);
		true
	}
}

/// Page-wide audio source, shared with the canvases through context.
pub type SharedAudio = StoredValue<AudioSource, LocalStorage>;

/// Create the (empty) audio source and put it in context.
pub fn provide_audio() -> SharedAudio {
	let audio = StoredValue::new_local(AudioSource::default());
	provide_context(audio);
	audio
}

pub fn use_audio() -> SharedAudio {
	expect_context::<SharedAudio>()
}

/// The live spectrum while a track plays, the synthetic signal otherwise.
pub struct AnalyserFeed {
	source: AudioSource,
	spectrum: SpectrumFeed,
	fallback: SyntheticFeed,
	bins: Vec<u8>,
	sampled_at: Option<f64>,
}

impl AnalyserFeed {
	pub fn new(source: AudioSource) -> Self {
		Self {
			source,
			spectrum: SpectrumFeed::new(),
			fallback: SyntheticFeed::new(),
			bins: Vec::new(),
			sampled_at: None,
		}
	}

	/// Pull at most one analyser frame per timestamp.
	fn refresh(&mut self, now: f64) -> bool {
		if self.sampled_at != Some(now) {
			self.sampled_at = Some(now);
			if self.source.sample(&mut self.bins) {
				self.spectrum.push_spectrum(&self.bins);
			}
		}
		self.source.is_playing()
	}
}

impl AudioFeed for AnalyserFeed {
	fn bands(&mut self, now: f64) -> FrequencyBands {
		if self.refresh(now) {
			self.spectrum.bands(now)
		} else {
			self.fallback.bands(now)
		}
	}

	fn reactivity(&mut self, now: f64) -> f32 {
		if self.refresh(now) {
			self.spectrum.reactivity(now)
		} else {
			self.fallback.reactivity(now)
		}
	}

	fn start(&mut self) {
		self.spectrum.start();
		self.fallback.start();
	}

	fn stop(&mut self) {
		self.spectrum.stop();
		self.fallback.stop();
	}

	fn dispose(&mut self) {
		self.spectrum.dispose();
		self.fallback.dispose();
	}
}

/// File picker and play/pause for the soundtrack.
#[component]
pub fn Soundtrack() -> impl IntoView {
	let audio = use_audio();
	let track = RwSignal::new(None::<String>);
	let playing = RwSignal::new(false);

	let on_change = move |ev: web_sys::Event| {
		let Some(input) = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
			return;
		};
		let Some(file) = input.files().and_then(|files| files.get(0)) else {
			return;
		};
		match audio.with_value(|source| source.play_file(&file)) {
			Ok(()) => {
				track.set(Some(file.name()));
				playing.set(true);
			}
			Err(e) => warn!("Could not play {}: {e:?}", file.name()),
		}
	};

	view! {
		<div class="soundtrack">
			<label class="chip">
				{move || track.get().unwrap_or_else(|| "Choose a soundtrack".to_string())}
				<input type="file" accept="audio/*" on:change=on_change />
			</label>
			<Show when=move || track.with(Option::is_some)>
				<button
					class="chip"
					on:click=move |_| playing.set(audio.with_value(AudioSource::toggle))
				>
					{move || if playing.get() { "Pause" } else { "Play" }}
				</button>
			</Show>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn without_a_track_the_feed_is_synthetic() {
		let mut feed = AnalyserFeed::new(AudioSource::default());
		let mut synthetic = SyntheticFeed::new();
		feed.start();
		for i in 0..20 {
			let t = i as f64 * 0.25;
			assert_eq!(feed.bands(t), synthetic.bands(t));
			assert_eq!(feed.reactivity(t), synthetic.reactivity(t));
		}
	}

	#[test]
	fn disposed_feed_is_silent() {
		let mut feed = AnalyserFeed::new(AudioSource::default());
		feed.start();
		feed.dispose();
		assert_eq!(feed.bands(3.0), FrequencyBands::default());
		assert_eq!(feed.reactivity(3.0), 0.0);
	}
}
