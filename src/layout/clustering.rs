//! Screen-space clustering of globe markers.
//!
//! Markers whose projections fall within a pixel radius of each other are drawn as one
//! bubble, anchored at a member that faces the camera.

use std::collections::{BTreeMap, HashSet};
use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};
use log::debug;

use super::camera::{Camera, ScreenPoint, Viewport, project_with};
use super::spatial::{GeoIndex, ScreenGrid};
use super::visual::{Intent, Interaction, NodeState, Tween, lerp_factor};
use crate::geo::{MARKER_RADIUS, lat_long_to_vec3};
use crate::schools::School;

/// Anything that can be shown or hidden on behalf of a marker.
pub trait MarkerVisual {
	/// Show or hide the marker.
	fn set_visible(&mut self, visible: bool);
	/// Whether the marker is shown individually.
	fn is_visible(&self) -> bool;
}

/// Visibility flag read by the canvas renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerSprite {
	visible: bool,
}

impl Default for MarkerSprite {
	fn default() -> Self {
		Self { visible: true }
	}
}

impl MarkerVisual for MarkerSprite {
	fn set_visible(&mut self, visible: bool) {
		self.visible = visible;
	}

	fn is_visible(&self) -> bool {
		self.visible
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Tunables for [`ClusteringEngine`].
pub struct ClusterConfig {
	/// Screen distance in pixels under which markers merge.
	pub radius_px: f32,
	/// Radius markers and cluster centers sit on.
	pub globe_radius: f32,
	/// Camera displacement below which an update is skipped.
	pub camera_epsilon: f32,
	/// Rotation of the globe group per update, radians.
	pub spin_per_update: f32,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			radius_px: 30.0,
			globe_radius: MARKER_RADIUS,
			camera_epsilon: 0.1,
			spin_per_update: 0.0005,
		}
	}
}

/// A school pinned to the globe.
pub struct Marker<V> {
	/// Source record.
	pub school: School,
	/// Position in the globe group's local frame.
	pub position: Vec3,
	/// Visibility handle, hidden while clustered.
	pub visual: V,
	/// Hover and selection state.
	pub state: NodeState,
	/// Eased scale.
	pub scale: Tween,
	/// Eased opacity.
	pub opacity: Tween,
}

#[derive(Clone, Debug, PartialEq)]
/// Two or more markers drawn as one bubble.
pub struct Cluster {
	/// Synthetic, valid until the next pass.
	pub id: String,
	/// Member school ids in sweep order.
	pub members: Vec<String>,
	/// Center on the globe surface, local frame.
	pub center: Vec3,
	/// Screen position of the seed marker at clustering time.
	pub screen: Vec2,
}

impl Cluster {
	/// Text for the bubble and overlay header.
	pub fn label(&self) -> String {
		format!("{} schools", self.members.len())
	}
}

/// Groups markers whose projections crowd together into cluster markers.
///
/// Markers are kept in id order so the greedy sweep is deterministic.
pub struct ClusteringEngine<V: MarkerVisual = MarkerSprite> {
	config: ClusterConfig,
	markers: BTreeMap<String, Marker<V>>,
	index: GeoIndex<String>,
	clusters: Vec<Cluster>,
	interaction: Interaction,
	last_camera: Option<Vec3>,
	dirty: bool,
	spin: f32,
}

impl<V: MarkerVisual> ClusteringEngine<V> {
	/// An empty engine.
	pub fn new(config: ClusterConfig) -> Self {
		Self {
			config,
			markers: BTreeMap::new(),
			index: GeoIndex::default(),
			clusters: Vec::new(),
			interaction: Interaction::default(),
			last_camera: None,
			dirty: true,
			spin: 0.0,
		}
	}

	/// Active configuration.
	pub fn config(&self) -> &ClusterConfig {
		&self.config
	}

	/// Register a marker. Adding an existing id replaces its school and visual.
	pub fn add_marker(&mut self, school: School, visual: V) {
		let position = lat_long_to_vec3(school.lat, school.lng, self.config.globe_radius);
		let state = self.interaction.state_of(&school.id);
		let marker = Marker {
			position,
			visual,
			state,
			scale: Tween::new(state.scale()),
			opacity: Tween::new(state.opacity()),
			school,
		};
		self.markers.insert(marker.school.id.clone(), marker);
		self.rebuild_index();
		self.dirty = true;
	}

	/// Drop a marker and any cluster it belonged to.
	pub fn remove_marker(&mut self, id: &str) -> Option<Marker<V>> {
		let removed = self.markers.remove(id)?;
		self.clusters.retain(|c| !c.members.iter().any(|m| m == id));
		self.rebuild_index();
		self.dirty = true;
		Some(removed)
	}

	/// Drop every marker and cluster.
	pub fn clear(&mut self) {
		self.markers.clear();
		self.clusters.clear();
		self.index = GeoIndex::default();
		self.dirty = true;
	}

	fn rebuild_index(&mut self) {
		let points = self
			.markers
			.values()
			.map(|m| (Vec2::new(m.school.lng, m.school.lat), m.school.id.clone()))
			.collect();
		self.index = GeoIndex::build(points);
	}

	/// Markers in id order.
	pub fn markers(&self) -> impl Iterator<Item = &Marker<V>> {
		self.markers.values()
	}

	/// Look up a marker by school id.
	pub fn marker(&self, id: &str) -> Option<&Marker<V>> {
		self.markers.get(id)
	}

	/// Number of markers.
	pub fn len(&self) -> usize {
		self.markers.len()
	}

	/// Whether there are no markers.
	pub fn is_empty(&self) -> bool {
		self.markers.is_empty()
	}

	/// Clusters from the latest pass.
	pub fn clusters(&self) -> &[Cluster] {
		&self.clusters
	}

	/// Accumulated spin of the globe group around the y axis, radians.
	pub fn spin(&self) -> f32 {
		self.spin
	}

	/// Current rotation of the globe group.
	pub fn rotation(&self) -> Quat {
		Quat::from_rotation_y(self.spin)
	}

	/// Apply the globe spin to a local-frame point.
	pub fn world_position(&self, local: Vec3) -> Vec3 {
		self.rotation() * local
	}

	/// Project a marker with the current spin.
	pub fn screen_position(&self, id: &str, camera: &Camera, viewport: Viewport) -> Option<ScreenPoint> {
		let marker = self.markers.get(id)?;
		Some(camera.project(self.world_position(marker.position), viewport))
	}

	/// Per-frame entry point. Returns whether clusters were recomputed.
	pub fn update(&mut self, camera: &Camera, viewport: Viewport) -> bool {
		self.spin = (self.spin + self.config.spin_per_update) % TAU;

		let eye = camera.position();
		let moved = self
			.last_camera
			.is_none_or(|last| last.distance(eye) > self.config.camera_epsilon);
		if !moved && !self.dirty {
			return false;
		}
		self.last_camera = Some(eye);
		self.dirty = false;

		self.recluster(camera, viewport);
		true
	}

	/// Regroup unconditionally with the current camera.
	pub fn recluster(&mut self, camera: &Camera, viewport: Viewport) {
		for cluster in self.clusters.drain(..) {
			for id in &cluster.members {
				if let Some(marker) = self.markers.get_mut(id) {
					marker.visual.set_visible(true);
				}
			}
		}

		let view_projection = camera.view_projection(viewport);
		let rotation = self.rotation();
		let projected: Vec<(&str, ScreenPoint)> = self
			.markers
			.iter()
			.map(|(id, m)| {
				(
					id.as_str(),
					project_with(&view_projection, rotation * m.position, viewport),
				)
			})
			.collect();

		let mut grid = ScreenGrid::new(self.config.radius_px);
		for (i, (_, p)) in projected.iter().enumerate() {
			if p.visible() {
				grid.insert(p.pos, i);
			}
		}

		let mut processed = vec![false; projected.len()];
		let mut groups: Vec<Vec<usize>> = Vec::new();
		for (seed, (_, point)) in projected.iter().enumerate() {
			if processed[seed] || !point.visible() {
				continue;
			}
			processed[seed] = true;
			let mut group = vec![seed];
			for other in grid.query(point.pos, self.config.radius_px) {
				if !processed[other] {
					processed[other] = true;
					group.push(other);
				}
			}
			if group.len() > 1 {
				groups.push(group);
			}
		}

		let mut clusters = Vec::with_capacity(groups.len());
		for group in groups {
			let members: Vec<String> = group.iter().map(|&i| projected[i].0.to_string()).collect();
			let Some(center) = self.cluster_center(&members) else {
				continue;
			};
			clusters.push(Cluster {
				id: format!("cluster-{}", clusters.len()),
				screen: projected[group[0]].1.pos,
				members,
				center,
			});
		}

		let absorbed: HashSet<&str> = clusters
			.iter()
			.flat_map(|c| c.members.iter().map(String::as_str))
			.collect();
		for (id, marker) in self.markers.iter_mut() {
			marker.visual.set_visible(!absorbed.contains(id.as_str()));
		}

		debug!(
			"Clustered {} markers into {} clusters",
			self.markers.len(),
			clusters.len()
		);
		self.clusters = clusters;
	}

	fn cluster_center(&self, members: &[String]) -> Option<Vec3> {
		let mut sum = Vec3::ZERO;
		let mut count = 0;
		for id in members {
			let Some(marker) = self.markers.get(id) else {
				debug!("Cluster member {id} has no marker, skipping");
				continue;
			};
			sum += marker.position;
			count += 1;
		}
		if count == 0 {
			return None;
		}
		Some((sum / count as f32).normalize_or_zero() * self.config.globe_radius)
	}

	/// Schools belonging to a cluster, for the overlay.
	pub fn cluster_members(&self, cluster_id: &str) -> Vec<&School> {
		let Some(cluster) = self.clusters.iter().find(|c| c.id == cluster_id) else {
			return Vec::new();
		};
		cluster
			.members
			.iter()
			.filter_map(|id| {
				let marker = self.markers.get(id);
				if marker.is_none() {
					debug!("Cluster {cluster_id} lists unknown marker {id}");
				}
				marker.map(|m| &m.school)
			})
			.collect()
	}

	/// Whether a local-frame point lies on the hemisphere facing `eye`.
	pub fn faces(&self, local: Vec3, eye: Vec3) -> bool {
		self.world_position(local).dot(eye) > 0.0
	}

	/// Where to draw a cluster's bubble: its center, or the first member facing `eye`
	/// when the center has rotated onto the far side.
	pub fn cluster_anchor(&self, cluster: &Cluster, eye: Vec3) -> Option<Vec3> {
		if self.faces(cluster.center, eye) {
			return Some(cluster.center);
		}
		cluster
			.members
			.iter()
			.filter_map(|id| self.markers.get(id))
			.map(|m| m.position)
			.find(|&p| self.faces(p, eye))
	}

	/// Front-facing cluster whose bubble is within `radius` pixels of `pos`.
	pub fn cluster_at(&self, pos: Vec2, camera: &Camera, viewport: Viewport, radius: f32) -> Option<&Cluster> {
		let view_projection = camera.view_projection(viewport);
		let rotation = self.rotation();
		let eye = camera.position();
		self.clusters.iter().find(|c| {
			let Some(anchor) = self.cluster_anchor(c, eye) else {
				return false;
			};
			let p = project_with(&view_projection, rotation * anchor, viewport);
			p.visible() && p.pos.distance(pos) <= radius
		})
	}

	/// Closest visible, unclustered, front-facing marker within `radius` pixels of `pos`.
	pub fn marker_at(&self, pos: Vec2, camera: &Camera, viewport: Viewport, radius: f32) -> Option<&Marker<V>> {
		let view_projection = camera.view_projection(viewport);
		let rotation = self.rotation();
		let eye = camera.position();
		self.markers
			.values()
			.filter(|m| m.visual.is_visible() && self.faces(m.position, eye))
			.filter_map(|m| {
				let p = project_with(&view_projection, rotation * m.position, viewport);
				let d = p.pos.distance(pos);
				(p.visible() && d <= radius).then_some((m, d))
			})
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(m, _)| m)
	}

	/// Schools whose coordinates fall inside a lat/lng box.
	pub fn schools_in_bounds(&self, min_lat: f32, min_lng: f32, max_lat: f32, max_lng: f32) -> Vec<&School> {
		self.lookup(
			self.index
				.range(Vec2::new(min_lng, min_lat), Vec2::new(max_lng, max_lat)),
		)
	}

	/// Schools within `degrees` of a coordinate, measured in lat/lng space.
	pub fn schools_near(&self, lat: f32, lng: f32, degrees: f32) -> Vec<&School> {
		self.lookup(self.index.within(Vec2::new(lng, lat), degrees))
	}

	fn lookup(&self, ids: Vec<&String>) -> Vec<&School> {
		let mut schools: Vec<&School> = ids
			.into_iter()
			.filter_map(|id| self.markers.get(id).map(|m| &m.school))
			.collect();
		schools.sort_by(|a, b| a.id.cmp(&b.id));
		schools
	}

	/// Feed a hover/select intent to the markers.
	pub fn handle(&mut self, intent: Intent) {
		if !self.interaction.apply(intent) {
			return;
		}
		for (id, marker) in self.markers.iter_mut() {
			let state = self.interaction.state_of(id);
			if state != marker.state {
				marker.state = state;
				marker.scale.target = state.scale();
				marker.opacity.target = state.opacity();
			}
		}
	}

	/// Current hover and selection.
	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	/// Ease marker scale and opacity toward their targets.
	pub fn animate(&mut self, dt: f32) {
		let factor = lerp_factor(dt);
		for marker in self.markers.values_mut() {
			marker.scale.step(factor);
			marker.opacity.step(factor);
		}
	}
}

impl<V: MarkerVisual> Default for ClusteringEngine<V> {
	fn default() -> Self {
		Self::new(ClusterConfig::default())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schools::{SchoolKind, test_school};
	use rand::rngs::SmallRng;
	use rand::{Rng, SeedableRng};

	fn viewport() -> Viewport {
		Viewport::new(1000.0, 1000.0)
	}

	fn engine_with(points: &[(&str, f32, f32)]) -> ClusteringEngine {
		let mut engine = ClusteringEngine::default();
		for &(id, lat, lng) in points {
			engine.add_marker(
				test_school(id, "Bavaria", SchoolKind::ArtAcademy, lat, lng),
				MarkerSprite::default(),
			);
		}
		engine
	}

	fn assert_partition(engine: &ClusteringEngine) {
		let mut seen = HashSet::new();
		for cluster in engine.clusters() {
			assert!(cluster.members.len() >= 2, "singleton cluster {}", cluster.id);
			for id in &cluster.members {
				assert!(seen.insert(id.clone()), "{id} in two clusters");
				assert!(!engine.marker(id).unwrap().visual.is_visible());
			}
		}
		for marker in engine.markers() {
			if !seen.contains(&marker.school.id) {
				assert!(marker.visual.is_visible(), "{} hidden but unclustered", marker.school.id);
			}
		}
	}

	#[test]
	fn three_close_markers_form_one_cluster() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.5), ("c", 0.0, 1.0)]);
		let camera = Camera::default();
		assert!(engine.update(&camera, viewport()));

		let clusters = engine.clusters();
		assert_eq!(clusters.len(), 1);
		assert_eq!(clusters[0].members, vec!["a", "b", "c"]);
		assert_eq!(clusters[0].label(), "3 schools");
		assert!(engine.markers().all(|m| !m.visual.is_visible()));
		assert!((clusters[0].center.length() - MARKER_RADIUS).abs() < 1e-5);
		assert_partition(&engine);
	}

	#[test]
	fn distant_markers_stay_individual() {
		let mut engine = engine_with(&[("a", 0.0, -25.0), ("b", 0.0, 25.0)]);
		let camera = Camera::default();
		let a = engine.screen_position("a", &camera, viewport()).unwrap();
		let b = engine.screen_position("b", &camera, viewport()).unwrap();
		assert!(a.pos.distance(b.pos) > 450.0);

		engine.update(&camera, viewport());
		assert!(engine.clusters().is_empty());
		assert!(engine.markers().all(|m| m.visual.is_visible()));
	}

	#[test]
	fn update_is_skipped_while_camera_rests() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.5)]);
		let mut camera = Camera::default();
		assert!(engine.update(&camera, viewport()));
		assert!(!engine.update(&camera, viewport()));
		camera.yaw += 0.01;
		assert!(!engine.update(&camera, viewport()));
		camera.yaw += 0.5;
		assert!(engine.update(&camera, viewport()));
	}

	#[test]
	fn adding_a_marker_forces_regrouping() {
		let mut engine = engine_with(&[("a", 0.0, 0.0)]);
		let camera = Camera::default();
		engine.update(&camera, viewport());
		assert!(engine.clusters().is_empty());

		engine.add_marker(
			test_school("b", "Bavaria", SchoolKind::ArtAcademy, 0.0, 0.3),
			MarkerSprite::default(),
		);
		assert!(engine.update(&camera, viewport()));
		assert_eq!(engine.clusters().len(), 1);
	}

	#[test]
	fn re_adding_replaces_the_marker() {
		let engine = engine_with(&[("a", 0.0, 0.0), ("a", 10.0, 10.0)]);
		assert_eq!(engine.len(), 1);
		assert_eq!(engine.marker("a").unwrap().school.lat, 10.0);
	}

	#[test]
	fn markers_behind_the_globe_never_cluster() {
		// Far side of the globe, beyond the far plane.
		let mut engine = engine_with(&[("a", 0.0, 180.0), ("b", 0.0, 179.5), ("c", 0.0, 0.0)]);
		let camera = Camera {
			far: 3.5,
			..Default::default()
		};
		engine.update(&camera, viewport());
		assert!(!engine.screen_position("a", &camera, viewport()).unwrap().visible());
		assert!(engine.clusters().is_empty());
		assert_partition(&engine);
	}

	#[test]
	fn removing_a_member_drops_its_cluster() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.5)]);
		let camera = Camera::default();
		engine.update(&camera, viewport());
		assert_eq!(engine.clusters().len(), 1);
		engine.remove_marker("b");
		assert!(engine.clusters().is_empty());
		engine.update(&camera, viewport());
		assert!(engine.marker("a").unwrap().visual.is_visible());
	}

	#[test]
	fn random_layouts_partition_markers() {
		let mut rng = SmallRng::seed_from_u64(7);
		for round in 0..20 {
			let mut engine: ClusteringEngine = ClusteringEngine::default();
			for i in 0..60 {
				let lat = rng.gen_range(47.0..55.0);
				let lng = rng.gen_range(6.0..15.0);
				engine.add_marker(
					test_school(&format!("{round}-{i}"), "Hesse", SchoolKind::University, lat, lng),
					MarkerSprite::default(),
				);
			}
			let mut camera = Camera::default();
			camera.focus_on(51.0, 10.0);
			camera.distance = rng.gen_range(1.5..6.0);
			engine.update(&camera, viewport());
			assert_partition(&engine);
		}
	}

	#[test]
	fn grouping_is_stable_for_identical_input() {
		let points = [("a", 50.0, 8.0), ("b", 50.1, 8.1), ("c", 52.5, 13.4), ("d", 52.52, 13.38)];
		let mut camera = Camera::default();
		camera.focus_on(51.0, 10.0);
		let mut first = engine_with(&points);
		let mut second = engine_with(&points);
		first.update(&camera, viewport());
		second.update(&camera, viewport());
		assert_eq!(first.clusters(), second.clusters());
	}

	#[test]
	fn overlay_lists_cluster_members() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.5)]);
		engine.update(&Camera::default(), viewport());
		let names: Vec<&str> = engine
			.cluster_members("cluster-0")
			.iter()
			.map(|s| s.name.as_str())
			.collect();
		assert_eq!(names, vec!["School a", "School b"]);
		assert!(engine.cluster_members("cluster-9").is_empty());
	}

	#[test]
	fn hit_testing_finds_clusters_and_markers() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 0.5), ("c", 0.0, 25.0)]);
		let camera = Camera::default();
		engine.update(&camera, viewport());
		let center = engine.clusters()[0].center;
		let screen = camera.project(engine.world_position(center), viewport());
		assert!(engine.cluster_at(screen.pos, &camera, viewport(), 10.0).is_some());

		let c = engine.screen_position("c", &camera, viewport()).unwrap();
		let hit = engine.marker_at(c.pos + Vec2::new(2.0, 0.0), &camera, viewport(), 8.0);
		assert_eq!(hit.map(|m| m.school.id.as_str()), Some("c"));
	}

	#[test]
	fn cluster_straddling_the_limb_stays_reachable() {
		// Camera on +x; the first school just faces it, the second is past the limb.
		let mut engine = engine_with(&[("a", 0.0, 88.5), ("b", 0.0, 95.0)]);
		let camera = Camera::default();
		let eye = camera.position();
		engine.update(&camera, viewport());
		assert_eq!(engine.clusters().len(), 1);
		let cluster = engine.clusters()[0].clone();
		assert!(!engine.faces(cluster.center, eye));

		let a = engine.marker("a").unwrap();
		assert!(engine.faces(a.position, eye));
		assert!(!a.visual.is_visible());
		assert_eq!(engine.cluster_anchor(&cluster, eye), Some(a.position));

		let screen = engine.screen_position("a", &camera, viewport()).unwrap();
		let hit = engine.cluster_at(screen.pos, &camera, viewport(), 10.0);
		assert_eq!(hit.map(|c| c.id.as_str()), Some(cluster.id.as_str()));
	}

	#[test]
	fn clusters_fully_behind_the_globe_have_no_anchor() {
		let mut engine = engine_with(&[("a", 0.0, 150.0), ("b", 0.0, 150.5)]);
		let camera = Camera::default();
		engine.update(&camera, viewport());
		for cluster in engine.clusters() {
			assert_eq!(engine.cluster_anchor(cluster, camera.position()), None);
		}
		assert!(engine.marker_at(Vec2::new(500.0, 500.0), &camera, viewport(), 1000.0).is_none());
	}

	#[test]
	fn geo_queries_use_the_index() {
		let engine = engine_with(&[("a", 48.1, 11.5), ("b", 52.5, 13.4), ("c", 48.2, 11.6)]);
		let south: Vec<&str> = engine
			.schools_in_bounds(47.0, 10.0, 49.0, 12.0)
			.iter()
			.map(|s| s.id.as_str())
			.collect();
		assert_eq!(south, vec!["a", "c"]);
		assert_eq!(engine.schools_near(52.5, 13.4, 0.5).len(), 1);
	}

	#[test]
	fn hover_and_select_drive_marker_targets() {
		let mut engine = engine_with(&[("a", 0.0, 0.0), ("b", 0.0, 10.0)]);
		engine.handle(Intent::PointerOver("a".into()));
		assert_eq!(engine.marker("a").unwrap().state, NodeState::Hovered);
		engine.handle(Intent::Click("b".into()));
		assert_eq!(engine.marker("b").unwrap().scale.target, NodeState::Selected.scale());
		for _ in 0..100 {
			engine.animate(0.016);
		}
		let b = engine.marker("b").unwrap();
		assert!((b.scale.current - NodeState::Selected.scale()).abs() < 1e-3);
	}
}
