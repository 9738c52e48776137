//! Frequency-band feeds that drive the audio-reactive visuals.
//!
//! A feed is constructed by whoever owns the view and handed to the consumers that need
//! it; its lifecycle is driven by that owner through [`AudioFeed::start`],
//! [`AudioFeed::stop`] and [`AudioFeed::dispose`].

use log::info;

/// Smoothed band energies in `0..=1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrequencyBands {
	/// Lowest tenth of the spectrum.
	pub low: f32,
	/// Up to the middle of the spectrum.
	pub mid: f32,
	/// The upper half.
	pub high: f32,
}

/// Source of band energies for the audio-reactive visuals.
pub trait AudioFeed {
	/// Band energies at time `now` (seconds).
	fn bands(&mut self, now: f64) -> FrequencyBands;
	/// Overall loudness in `0..=1`.
	fn reactivity(&mut self, now: f64) -> f32;

	/// Begin producing values.
	fn start(&mut self) {}
	/// Pause; a stopped feed may report silence.
	fn stop(&mut self) {}
	/// Release the source. The feed reports silence afterwards.
	fn dispose(&mut self) {}
}

/// Fallback signal used when no audio source is available.
#[derive(Clone, Debug)]
pub struct SyntheticFeed {
	running: bool,
}

impl SyntheticFeed {
	/// A running feed.
	pub fn new() -> Self {
		Self { running: true }
	}
}

impl Default for SyntheticFeed {
	fn default() -> Self {
		Self::new()
	}
}

fn wave(now: f64, speed: f64, phase: f64) -> f32 {
	(((now * speed + phase).sin() + 1.0) * 0.5) as f32
}

impl AudioFeed for SyntheticFeed {
	fn bands(&mut self, now: f64) -> FrequencyBands {
		if !self.running {
			return FrequencyBands::default();
		}
		FrequencyBands {
			low: wave(now, 0.5, 0.0),
			mid: wave(now, 0.8, 2.0),
			high: wave(now, 1.2, 4.0),
		}
	}

	fn reactivity(&mut self, now: f64) -> f32 {
		if !self.running {
			return 0.0;
		}
		wave(now, 1.0, 0.0)
	}

	fn start(&mut self) {
		self.running = true;
	}

	fn stop(&mut self) {
		self.running = false;
	}

	fn dispose(&mut self) {
		self.running = false;
	}
}

const SMOOTHING: f32 = 0.8;

/// Smooths byte spectra pushed by an analyser (0..=255 per bin).
///
/// The lowest 10% of bins form the low band, up to 50% the mid band, the rest the high band.
#[derive(Clone, Debug, Default)]
pub struct SpectrumFeed {
	bands: FrequencyBands,
	reactivity: f32,
	playing: bool,
	disposed: bool,
}

impl SpectrumFeed {
	/// A stopped feed; call [`AudioFeed::start`] before pushing spectra.
	pub fn new() -> Self {
		Self::default()
	}

	/// Started and not yet stopped or disposed.
	pub fn is_playing(&self) -> bool {
		self.playing
	}

	/// Fold one analyser frame into the smoothed state.
	pub fn push_spectrum(&mut self, bins: &[u8]) {
		if !self.playing || bins.is_empty() {
			return;
		}
		let low_end = (bins.len() / 10).max(1);
		let mid_end = (bins.len() / 2).max(low_end);

		let fresh = FrequencyBands {
			low: mean(&bins[..low_end]),
			mid: mean(&bins[low_end..mid_end]),
			high: mean(&bins[mid_end..]),
		};
		self.bands = FrequencyBands {
			low: smooth(self.bands.low, fresh.low),
			mid: smooth(self.bands.mid, fresh.mid),
			high: smooth(self.bands.high, fresh.high),
		};
		self.reactivity = smooth(self.reactivity, mean(bins));
	}
}

fn mean(bins: &[u8]) -> f32 {
	if bins.is_empty() {
		return 0.0;
	}
	let sum: u32 = bins.iter().map(|&b| b as u32).sum();
	sum as f32 / bins.len() as f32 / 255.0
}

fn smooth(previous: f32, fresh: f32) -> f32 {
	SMOOTHING * previous + (1.0 - SMOOTHING) * fresh
}

impl AudioFeed for SpectrumFeed {
	fn bands(&mut self, _now: f64) -> FrequencyBands {
		self.bands
	}

	fn reactivity(&mut self, _now: f64) -> f32 {
		self.reactivity
	}

	fn start(&mut self) {
		if self.disposed || self.playing {
			return;
		}
		self.playing = true;
		info!("Audio feed started");
	}

	fn stop(&mut self) {
		if !self.playing {
			return;
		}
		self.playing = false;
		info!("Audio feed stopped");
	}

	fn dispose(&mut self) {
		self.playing = false;
		self.disposed = true;
		self.bands = FrequencyBands::default();
		self.reactivity = 0.0;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn synthetic_feed_stays_in_unit_range() {
		let mut feed = SyntheticFeed::new();
		for i in 0..200 {
			let t = i as f64 * 0.37;
			let b = feed.bands(t);
			for v in [b.low, b.mid, b.high, feed.reactivity(t)] {
				assert!((0.0..=1.0).contains(&v));
			}
		}
		feed.stop();
		assert_eq!(feed.bands(1.0), FrequencyBands::default());
	}

	#[test]
	fn spectrum_is_split_into_bands() {
		let mut feed = SpectrumFeed::new();
		feed.start();
		let mut bins = vec![0u8; 100];
		bins[..10].fill(255);
		for _ in 0..200 {
			feed.push_spectrum(&bins);
		}
		let bands = feed.bands(0.0);
		assert!((bands.low - 1.0).abs() < 1e-3);
		assert!(bands.mid.abs() < 1e-6);
		assert!(bands.high.abs() < 1e-6);
		assert!((feed.reactivity(0.0) - 0.1).abs() < 1e-3);
	}

	#[test]
	fn smoothing_moves_gradually() {
		let mut feed = SpectrumFeed::new();
		feed.start();
		feed.push_spectrum(&[255; 20]);
		let first = feed.reactivity(0.0);
		assert!((first - 0.2).abs() < 1e-5);
		feed.push_spectrum(&[255; 20]);
		assert!(feed.reactivity(0.0) > first);
	}

	#[test]
	fn stopped_or_disposed_feed_ignores_input() {
		let mut feed = SpectrumFeed::new();
		feed.push_spectrum(&[255; 20]);
		assert_eq!(feed.reactivity(0.0), 0.0);
		feed.start();
		feed.dispose();
		feed.start();
		assert!(!feed.is_playing());
		feed.push_spectrum(&[255; 20]);
		assert_eq!(feed.bands(0.0), FrequencyBands::default());
	}
}
