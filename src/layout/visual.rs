//! Interaction state and the smoothing shared by markers and graph nodes.

/// Interaction state of a node or marker. `Selected` wins over `Hovered`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
	#[default]
	/// Neither hovered nor selected.
	Default,
	/// Under the pointer.
	Hovered,
	/// Clicked.
	Selected,
}

impl NodeState {
	/// State from the two flags.
	pub fn resolve(selected: bool, hovered: bool) -> Self {
		if selected {
			NodeState::Selected
		} else if hovered {
			NodeState::Hovered
		} else {
			NodeState::Default
		}
	}

	/// Settled scale.
	pub fn scale(self) -> f32 {
		match self {
			NodeState::Selected => 2.2,
			NodeState::Hovered => 1.8,
			NodeState::Default => 1.2,
		}
	}

	/// Settled opacity.
	pub fn opacity(self) -> f32 {
		match self {
			NodeState::Selected => 0.95,
			NodeState::Hovered => 0.9,
			NodeState::Default => 0.8,
		}
	}

	/// Settled glow.
	pub fn emissive(self) -> f32 {
		match self {
			NodeState::Selected => 1.2,
			NodeState::Hovered => 1.0,
			NodeState::Default => 0.8,
		}
	}

	/// Pulse `(amplitude, angular speed)` layered on top of the settled scale.
	pub fn pulse(self) -> (f32, f32) {
		match self {
			NodeState::Selected => (0.15, 1.2),
			NodeState::Hovered => (0.1, 1.1),
			NodeState::Default => (0.05, 0.8),
		}
	}

	/// Hovered or selected.
	pub fn is_active(self) -> bool {
		self != NodeState::Default
	}
}

/// Pointer intents delivered by the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
	/// Pointer entered the item with this id.
	PointerOver(String),
	/// Pointer left every item.
	PointerOut,
	/// Toggles selection of the clicked id.
	Click(String),
	/// Deselect whatever is selected.
	ClearSelection,
}

/// Hover/selection pair shared by both engines.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
	/// Id under the pointer.
	pub hovered: Option<String>,
	/// Selected id.
	pub selected: Option<String>,
}

impl Interaction {
	/// Apply an intent. Returns whether anything changed.
	pub fn apply(&mut self, intent: Intent) -> bool {
		let before = self.clone();
		match intent {
			Intent::PointerOver(id) => self.hovered = Some(id),
			Intent::PointerOut => self.hovered = None,
			Intent::Click(id) => {
				if self.selected.as_deref() == Some(id.as_str()) {
					self.selected = None;
				} else {
					self.selected = Some(id);
				}
			}
			Intent::ClearSelection => self.selected = None,
		}
		*self != before
	}

	/// State of the item with this id.
	pub fn state_of(&self, id: &str) -> NodeState {
		NodeState::resolve(
			self.selected.as_deref() == Some(id),
			self.hovered.as_deref() == Some(id),
		)
	}
}

/// Frame-rate independent smoothing factor for a frame of `dt` seconds.
pub fn lerp_factor(dt: f32) -> f32 {
	(dt * 10.0).clamp(0.0, 1.0)
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// A value eased toward a target.
pub struct Tween {
	/// Value shown this frame.
	pub current: f32,
	/// Value being approached.
	pub target: f32,
}

impl Tween {
	/// Settled at `value`.
	pub fn new(value: f32) -> Self {
		Self {
			current: value,
			target: value,
		}
	}

	/// Move `factor` of the remaining way.
	pub fn step(&mut self, factor: f32) {
		self.current += (self.target - self.current) * factor;
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// RGB counterpart of [`Tween`].
pub struct ColorTween {
	/// Color shown this frame.
	pub current: [f32; 3],
	/// Color being approached.
	pub target: [f32; 3],
}

impl ColorTween {
	/// Settled at `color`.
	pub fn new(color: [f32; 3]) -> Self {
		Self {
			current: color,
			target: color,
		}
	}

	/// Move every channel `factor` of the remaining way.
	pub fn step(&mut self, factor: f32) {
		for (c, t) in self.current.iter_mut().zip(self.target) {
			*c += (t - *c) * factor;
		}
	}
}

/// Brighten a color, saturating at 1.
pub fn brighten(color: [f32; 3], factor: f32) -> [f32; 3] {
	color.map(|c| (c * factor).min(1.0))
}

/// Scale multiplier for the idle pulse at `time` seconds.
pub fn pulse(state: NodeState, time: f32, offset: f32, boost: f32) -> f32 {
	let (amplitude, speed) = state.pulse();
	1.0 + (time * speed + offset).sin() * amplitude * (1.0 + boost)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selection_wins_over_hover() {
		assert_eq!(NodeState::resolve(true, true), NodeState::Selected);
		assert_eq!(NodeState::resolve(false, true), NodeState::Hovered);
		assert_eq!(NodeState::resolve(false, false), NodeState::Default);
		assert!(NodeState::Selected.scale() > NodeState::Hovered.scale());
		assert!(NodeState::Hovered.scale() > NodeState::Default.scale());
	}

	#[test]
	fn click_toggles_selection() {
		let mut i = Interaction::default();
		assert!(i.apply(Intent::Click("a".into())));
		assert_eq!(i.state_of("a"), NodeState::Selected);
		assert!(i.apply(Intent::Click("b".into())));
		assert_eq!(i.state_of("a"), NodeState::Default);
		assert!(i.apply(Intent::Click("b".into())));
		assert_eq!(i.selected, None);
	}

	#[test]
	fn hover_and_pointer_out() {
		let mut i = Interaction::default();
		i.apply(Intent::PointerOver("a".into()));
		assert!(!i.apply(Intent::PointerOver("a".into())));
		assert_eq!(i.state_of("a"), NodeState::Hovered);
		i.apply(Intent::Click("a".into()));
		assert_eq!(i.state_of("a"), NodeState::Selected);
		i.apply(Intent::PointerOut);
		assert_eq!(i.state_of("a"), NodeState::Selected);
		i.apply(Intent::ClearSelection);
		assert_eq!(i.state_of("a"), NodeState::Default);
	}

	#[test]
	fn tween_approaches_without_overshoot() {
		for &dt in &[0.008, 0.016, 0.05, 0.2, 3.0] {
			let mut t = Tween::new(1.2);
			t.target = 2.2;
			let mut last = t.current;
			for _ in 0..500 {
				t.step(lerp_factor(dt));
				assert!(t.current >= last);
				assert!(t.current <= 2.2 + 1e-6);
				last = t.current;
			}
			assert!((t.current - 2.2).abs() < 1e-3, "dt={dt}");
		}
	}

	#[test]
	fn pulse_stays_within_amplitude() {
		for i in 0..100 {
			let p = pulse(NodeState::Hovered, i as f32 * 0.1, 0.3, 0.0);
			assert!((p - 1.0).abs() <= 0.1 + 1e-6);
		}
	}

	#[test]
	fn color_tween_converges() {
		let mut c = ColorTween::new([0.0, 0.0, 0.0]);
		c.target = [1.0, 0.5, 0.25];
		for _ in 0..200 {
			c.step(0.16);
		}
		assert!((c.current[1] - 0.5).abs() < 1e-4);
	}
}
