use std::collections::HashSet;

use glam::{Vec2, Vec3};

use crate::audio::{AudioFeed, FrequencyBands};
use crate::geo::vec3_to_lat_long;
use crate::layout::{
	Camera, ClusterConfig, ClusteringEngine, Intent, MarkerSprite, Swarm, SwarmConfig, Viewport,
};
use crate::schools::School;

/// Pixel radius for picking markers and cluster bubbles.
pub const HIT_RADIUS: f32 = 10.0;
/// Lat/lng distance, in degrees, for the nearby-schools list.
const NEARBY_DEGREES: f32 = 1.5;
/// Yaw change per second while auto-rotating.
const AUTO_ROTATE_SPEED: f32 = 0.08;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub moved: bool,
	pub last: Vec2,
}

/// What lies under the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum Hit {
	Marker(String),
	Cluster(String),
}

pub struct GlobeState {
	pub engine: ClusteringEngine<MarkerSprite>,
	pub camera: Camera,
	pub viewport: Viewport,
	pub swarm: Swarm,
	pub feed: Box<dyn AudioFeed>,
	pub bands: FrequencyBands,
	pub reactivity: f32,
	pub drag: DragState,
	pub auto_rotate: bool,
	pub time: f64,
}

impl GlobeState {
	pub fn new(schools: &[School], width: f32, height: f32, feed: Box<dyn AudioFeed>) -> Self {
		let mut state = Self {
			engine: ClusteringEngine::new(ClusterConfig::default()),
			camera: Camera::default(),
			viewport: Viewport::new(width, height),
			swarm: Swarm::new(SwarmConfig::default(), 0x5eed),
			feed,
			bands: FrequencyBands::default(),
			reactivity: 0.0,
			drag: DragState::default(),
			auto_rotate: true,
			time: 0.0,
		};
		state.set_schools(schools);
		state.feed.start();
		state
	}

	/// Bring the marker set in line with the filtered schools. Markers that stay keep
	/// their hover and selection easing.
	pub fn set_schools(&mut self, schools: &[School]) {
		let keep: HashSet<&str> = schools.iter().map(|s| s.id.as_str()).collect();
		let gone: Vec<String> = self
			.engine
			.markers()
			.map(|m| m.school.id.clone())
			.filter(|id| !keep.contains(id.as_str()))
			.collect();
		for id in gone {
			self.engine.remove_marker(&id);
		}
		for school in schools {
			if self.engine.marker(&school.id).is_none_or(|m| m.school != *school) {
				self.engine.add_marker(school.clone(), MarkerSprite::default());
			}
		}
	}

	pub fn resize(&mut self, width: f32, height: f32) {
		self.viewport = Viewport::new(width, height);
		self.engine.recluster(&self.camera, self.viewport);
	}

	pub fn tick(&mut self, dt: f32) {
		self.time += dt as f64;
		if self.auto_rotate && !self.drag.active {
			self.camera.yaw += AUTO_ROTATE_SPEED * dt;
		}
		self.engine.update(&self.camera, self.viewport);
		self.engine.animate(dt);

		self.bands = self.feed.bands(self.time);
		self.reactivity = self.feed.reactivity(self.time);
		self.swarm.step(self.bands, self.reactivity, self.time as f32);
	}

	/// Whether a local-frame point faces the camera.
	pub fn faces_camera(&self, local: Vec3) -> bool {
		self.engine.faces(local, self.camera.position())
	}

	pub fn pick(&self, pos: Vec2) -> Option<Hit> {
		if let Some(cluster) = self
			.engine
			.cluster_at(pos, &self.camera, self.viewport, HIT_RADIUS * 1.5)
		{
			return Some(Hit::Cluster(cluster.id.clone()));
		}
		self.engine
			.marker_at(pos, &self.camera, self.viewport, HIT_RADIUS)
			.map(|m| Hit::Marker(m.school.id.clone()))
	}

	/// Push the store's selection into the engine.
	pub fn sync_selection(&mut self, selected: Option<&str>) {
		let current = self.engine.interaction().selected.clone();
		match selected {
			Some(id) if current.as_deref() != Some(id) => {
				self.engine.handle(Intent::Click(id.to_string()))
			}
			None if current.is_some() => self.engine.handle(Intent::ClearSelection),
			_ => {}
		}
	}

	pub fn hover(&mut self, id: Option<String>) {
		let intent = match id {
			Some(id) => Intent::PointerOver(id),
			None => Intent::PointerOut,
		};
		self.engine.handle(intent);
	}

	/// Turn the camera to a coordinate, accounting for the globe's own spin.
	pub fn focus(&mut self, lat: f32, lng: f32) {
		self.camera.focus_on(lat, lng + self.engine.spin().to_degrees());
		self.auto_rotate = false;
	}

	/// Coordinate at the center of the view.
	pub fn center_coordinate(&self) -> (f32, f32) {
		let local = self.engine.rotation().inverse() * self.camera.position();
		vec3_to_lat_long(local)
	}

	/// Schools inside the lat/lng box spanned by the visible cap around the view center.
	pub fn schools_in_view(&self) -> usize {
		let (lat, lng) = self.center_coordinate();
		let radius = self.engine.config().globe_radius;
		let span = (radius / self.camera.distance).clamp(-1.0, 1.0).acos().to_degrees();
		let lng_span = (span / lat.to_radians().cos().max(0.1)).min(180.0);
		self.engine
			.schools_in_bounds(lat - span, lng - lng_span, lat + span, lng + lng_span)
			.len()
	}

	/// Other shown schools close to `school`.
	pub fn nearby(&self, school: &School) -> Vec<School> {
		self.engine
			.schools_near(school.lat, school.lng, NEARBY_DEGREES)
			.into_iter()
			.filter(|other| other.id != school.id)
			.cloned()
			.collect()
	}

	/// Stop and release the audio feed. The state is not ticked again.
	pub fn shutdown(&mut self) {
		self.feed.stop();
		self.feed.dispose();
		self.engine.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::audio::SyntheticFeed;
	use crate::layout::{MarkerVisual, NodeState};
	use crate::schools::{BUNDLED_SCHOOLS, SchoolKind, load_schools, test_school};

	fn state() -> GlobeState {
		let schools = load_schools(BUNDLED_SCHOOLS).unwrap();
		GlobeState::new(&schools, 1280.0, 800.0, Box::new(SyntheticFeed::new()))
	}

	#[test]
	fn dense_dataset_clusters_at_default_zoom() {
		let mut globe = state();
		globe.tick(0.016);
		// Germany spans a few degrees; at the default distance most schools crowd together.
		assert!(!globe.engine.clusters().is_empty());
		let clustered: usize = globe.engine.clusters().iter().map(|c| c.members.len()).sum();
		let loose = globe.engine.markers().filter(|m| m.visual.is_visible()).count();
		assert_eq!(clustered + loose, globe.engine.len());
	}

	#[test]
	fn focus_centers_the_coordinate() {
		let mut globe = state();
		for _ in 0..100 {
			globe.tick(0.016);
		}
		globe.focus(48.1, 11.6);
		assert!(!globe.auto_rotate);
		let (lat, lng) = globe.center_coordinate();
		assert!((lat - 48.1).abs() < 0.1, "lat {lat}");
		assert!((lng - 11.6).abs() < 0.1, "lng {lng}");
	}

	#[test]
	fn limb_cluster_is_pickable_at_its_front_member() {
		let schools = [
			test_school("front", "Bavaria", SchoolKind::ArtAcademy, 0.0, 88.5),
			test_school("back", "Bavaria", SchoolKind::ArtAcademy, 0.0, 95.0),
		];
		let mut globe = GlobeState::new(&schools, 1280.0, 800.0, Box::new(SyntheticFeed::new()));
		globe.auto_rotate = false;
		globe.tick(0.016);
		assert_eq!(globe.engine.clusters().len(), 1);
		let cluster_id = globe.engine.clusters()[0].id.clone();

		let front = globe.engine.marker("front").unwrap();
		assert!(globe.faces_camera(front.position));
		let at = globe
			.engine
			.screen_position("front", &globe.camera, globe.viewport)
			.unwrap();
		assert_eq!(globe.pick(at.pos), Some(Hit::Cluster(cluster_id)));
	}

	#[test]
	fn filtering_keeps_surviving_markers() {
		let schools = load_schools(BUNDLED_SCHOOLS).unwrap();
		let mut globe = GlobeState::new(&schools, 1280.0, 800.0, Box::new(SyntheticFeed::new()));
		globe.sync_selection(Some(schools[0].id.as_str()));
		globe.set_schools(&schools[..5]);
		assert_eq!(globe.engine.len(), 5);
		assert_eq!(
			globe.engine.marker(&schools[0].id).unwrap().state,
			NodeState::Selected
		);
		globe.set_schools(&schools);
		assert_eq!(globe.engine.len(), schools.len());
	}

	#[test]
	fn view_count_and_nearby_come_from_the_index() {
		let schools = load_schools(BUNDLED_SCHOOLS).unwrap();
		let mut globe = state();
		globe.focus(51.0, 10.0);
		assert_eq!(globe.schools_in_view(), schools.len());
		globe.focus(-30.0, -60.0);
		assert_eq!(globe.schools_in_view(), 0);

		let munich = schools.iter().find(|s| s.id == "13").unwrap();
		let nearby = globe.nearby(munich);
		assert!(nearby.iter().any(|s| s.id == "14"));
		assert!(nearby.iter().all(|s| s.id != munich.id));
		assert!(nearby.iter().all(|s| (s.lat - munich.lat).abs() <= NEARBY_DEGREES));
	}

	#[test]
	fn shutdown_silences_the_feed() {
		let mut globe = state();
		globe.tick(0.5);
		globe.shutdown();
		assert_eq!(globe.feed.bands(2.0), FrequencyBands::default());
		assert_eq!(globe.feed.reactivity(2.0), 0.0);
		assert!(globe.engine.is_empty());
	}

	#[test]
	fn selection_sync_is_idempotent() {
		let mut globe = state();
		globe.sync_selection(Some("3"));
		globe.sync_selection(Some("3"));
		assert_eq!(globe.engine.interaction().selected.as_deref(), Some("3"));
		globe.sync_selection(None);
		assert_eq!(globe.engine.interaction().selected, None);
	}
}
