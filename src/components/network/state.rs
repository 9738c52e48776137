use glam::Vec2;

use crate::audio::AudioFeed;
use crate::layout::camera::project_with;
use crate::layout::{
	Camera, ForceLayout, Intent, LayoutConfig, LinkForce, LinkFrame, NodeFrame, Viewport,
};
use crate::schools::School;

pub const NODE_RADIUS: f32 = 6.0;
const AUTO_ROTATE_SPEED: f32 = 0.05;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub moved: bool,
	pub last: Vec2,
}

/// One frame of the network, projected to the screen.
pub struct Snapshot {
	pub nodes: Vec<(NodeFrame, Vec2, f32)>,
	pub links: Vec<LinkFrame>,
}

pub struct NetworkState {
	pub layout: ForceLayout,
	pub camera: Camera,
	pub viewport: Viewport,
	pub feed: Box<dyn AudioFeed>,
	pub drag: DragState,
	pub auto_rotate: bool,
	pub time: f64,
	boost: f32,
}

impl NetworkState {
	pub fn new(schools: &[School], width: f32, height: f32, feed: Box<dyn AudioFeed>) -> Self {
		let camera = Camera {
			distance: 18.0,
			min_distance: 6.0,
			max_distance: 40.0,
			far: 200.0,
			..Default::default()
		};
		let mut state = Self {
			layout: ForceLayout::new(schools, LayoutConfig::default(), 0xC0FFEE),
			camera,
			viewport: Viewport::new(width, height),
			feed,
			drag: DragState::default(),
			auto_rotate: true,
			time: 0.0,
			boost: 0.0,
		};
		state.feed.start();
		state
	}

	pub fn resize(&mut self, width: f32, height: f32) {
		self.viewport = Viewport::new(width, height);
	}

	/// Switch the spring force along links on or off.
	pub fn set_link_springs(&mut self, on: bool) {
		let config = LayoutConfig {
			link_force: on.then(LinkForce::default),
			..*self.layout.config()
		};
		self.layout.set_config(config);
	}

	/// Stop and release the audio feed. The state is not ticked again.
	pub fn shutdown(&mut self) {
		self.feed.stop();
		self.feed.dispose();
		self.boost = 0.0;
	}

	pub fn tick(&mut self, dt: f32) {
		self.time += dt as f64;
		if self.auto_rotate && !self.drag.active {
			self.camera.yaw += AUTO_ROTATE_SPEED * dt;
		}
		self.boost = self.feed.reactivity(self.time);
		self.layout.step(dt);
		self.layout.animate(dt);
	}

	/// Project nodes and links. Nodes come back far-to-near for painting.
	pub fn snapshot(&self) -> Snapshot {
		let vp = self.camera.view_projection(self.viewport);
		let time = self.time as f32;
		let mut nodes: Vec<(NodeFrame, Vec2, f32)> = self
			.layout
			.node_frames(time, self.boost)
			.into_iter()
			.filter_map(|frame| {
				let p = project_with(&vp, frame.position, self.viewport);
				p.visible().then_some((frame, p.pos, p.depth))
			})
			.collect();
		nodes.sort_by(|a, b| b.2.total_cmp(&a.2));
		Snapshot {
			nodes,
			links: self.layout.link_frames(time),
		}
	}

	/// Nearest node under the pointer.
	pub fn pick(&self, pos: Vec2) -> Option<String> {
		let snapshot = self.snapshot();
		snapshot
			.nodes
			.iter()
			.filter_map(|(frame, at, _)| {
				let d = at.distance(pos);
				(d <= NODE_RADIUS * frame.scale + 2.0).then_some((frame, d))
			})
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(frame, _)| frame.id.clone())
	}

	pub fn hover(&mut self, id: Option<String>) {
		let intent = match id {
			Some(id) => Intent::PointerOver(id),
			None => Intent::PointerOut,
		};
		self.layout.handle(intent);
	}

	/// Push the store's selection (by node id) into the layout.
	pub fn sync_selection(&mut self, selected: Option<&str>) {
		let current = self.layout.interaction().selected.clone();
		match selected {
			Some(id) if current.as_deref() != Some(id) => {
				self.layout.handle(Intent::Click(id.to_string()));
			}
			None if current.is_some() => {
				self.layout.handle(Intent::ClearSelection);
			}
			_ => {}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::audio::{FrequencyBands, SyntheticFeed};
	use crate::schools::{BUNDLED_SCHOOLS, load_schools};

	fn state() -> NetworkState {
		let schools = load_schools(BUNDLED_SCHOOLS).unwrap();
		NetworkState::new(&schools, 1200.0, 800.0, Box::new(SyntheticFeed::new()))
	}

	#[test]
	fn snapshot_is_painted_far_to_near() {
		let mut net = state();
		for _ in 0..60 {
			net.tick(0.016);
		}
		let snapshot = net.snapshot();
		assert!(!snapshot.nodes.is_empty());
		assert!(snapshot.nodes.windows(2).all(|w| w[0].2 >= w[1].2));
		assert_eq!(snapshot.links.len(), net.layout.links().len());
	}

	#[test]
	fn picking_a_projected_node() {
		let mut net = state();
		net.tick(0.016);
		let snapshot = net.snapshot();
		let (frame, at, _) = snapshot.nodes.last().unwrap();
		assert_eq!(net.pick(*at).as_deref(), Some(frame.id.as_str()));
	}

	#[test]
	fn link_springs_toggle_the_layout_config() {
		let mut net = state();
		assert_eq!(net.layout.config().link_force, None);
		net.set_link_springs(true);
		assert_eq!(net.layout.config().link_force, Some(LinkForce::default()));
		assert_eq!(net.layout.config().damping, LayoutConfig::default().damping);
		net.set_link_springs(false);
		assert_eq!(net.layout.config().link_force, None);
	}

	#[test]
	fn shutdown_silences_the_feed() {
		let mut net = state();
		net.tick(0.5);
		net.shutdown();
		assert_eq!(net.feed.reactivity(2.0), 0.0);
		assert_eq!(net.feed.bands(2.0), FrequencyBands::default());
	}

	#[test]
	fn selection_sync_highlights_node() {
		let mut net = state();
		net.sync_selection(Some("Städelschule"));
		assert_eq!(
			net.layout.active_node().map(|n| n.id.as_str()),
			Some("Städelschule")
		);
		net.sync_selection(None);
		assert!(net.layout.active_node().is_none());
	}
}
