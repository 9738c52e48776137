//! 3D force-directed layout of the school network.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::Vec3;
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::spatial::SpatialHash;
use super::visual::{
	ColorTween, Intent, Interaction, NodeState, Tween, brighten, lerp_factor, pulse,
};
use crate::schools::School;

/// Spring along links toward `base_distance / value`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkForce {
	/// Resting length for a link of value 1.
	pub base_distance: f32,
	/// Spring constant for a link of value 1.
	pub stiffness: f32,
}

impl Default for LinkForce {
	fn default() -> Self {
		Self {
			base_distance: 5.0,
			stiffness: 0.05,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Force constants for [`ForceLayout`].
pub struct LayoutConfig {
	/// Pull toward the origin per unit distance.
	pub center_attraction: f32,
	/// Inverse-square push coefficient.
	pub repulsion_strength: f32,
	/// Below this distance the push is constant.
	pub repulsion_min: f32,
	/// Beyond this distance nodes ignore each other.
	pub repulsion_max: f32,
	/// Velocity multiplier per step.
	pub damping: f32,
	/// Longest step integrated at once, seconds.
	pub max_dt: f32,
	/// Edge length of the cube nodes spawn in.
	pub spawn_extent: f32,
	/// Spring along links. Off by default.
	pub link_force: Option<LinkForce>,
	/// Nodes leaving this sphere are pulled back onto it.
	pub bounds_radius: Option<f32>,
}

const FORCE_SCALE: f32 = 5.0;

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			center_attraction: 0.02 * FORCE_SCALE,
			repulsion_strength: 0.8 * FORCE_SCALE,
			repulsion_min: 0.5,
			repulsion_max: 4.0,
			damping: 0.95,
			max_dt: 0.05,
			spawn_extent: 8.0,
			link_force: None,
			bounds_radius: None,
		}
	}
}

impl LayoutConfig {
	/// Magnitude of the push between two nodes `distance` apart.
	pub fn repulsion_magnitude(&self, distance: f32) -> f32 {
		if distance >= self.repulsion_max || distance <= 1e-3 {
			0.0
		} else if distance <= self.repulsion_min {
			self.repulsion_strength * 2.0 / (self.repulsion_min * self.repulsion_min)
		} else {
			self.repulsion_strength / (distance * distance)
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Why two schools are linked.
pub enum LinkKind {
	/// Same federal state.
	Region,
	/// Same institution type.
	Kind,
}

impl LinkKind {
	/// Link strength.
	pub fn value(self) -> f32 {
		match self {
			LinkKind::Region => 1.0,
			LinkKind::Kind => 0.5,
		}
	}

	fn resting_opacity(self) -> f32 {
		match self {
			LinkKind::Region => 0.4,
			LinkKind::Kind => 0.3,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
/// An undirected link between two node ids.
pub struct GraphLink {
	/// Node id at one end.
	pub source: String,
	/// Node id at the other end.
	pub target: String,
	/// What the two schools share.
	pub kind: LinkKind,
	/// Strength from [`LinkKind::value`].
	pub value: f32,
	/// Line width, eased on highlight.
	pub width: Tween,
	/// Eased opacity.
	pub opacity: Tween,
}

impl GraphLink {
	fn new(source: &str, target: &str, kind: LinkKind) -> Self {
		let value = kind.value();
		Self {
			source: source.to_string(),
			target: target.to_string(),
			kind,
			value,
			width: Tween::new(value * 1.5),
			opacity: Tween::new(kind.resting_opacity()),
		}
	}

	/// Whether `id` is either end.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

#[derive(Clone, Debug)]
/// A school placed in the layout.
pub struct GraphNode {
	/// School name, unique within a dataset.
	pub id: String,
	/// Source record.
	pub school: School,
	/// Simulated position.
	pub pos: Vec3,
	/// Velocity in units per second.
	pub vel: Vec3,
	/// Hover and selection state.
	pub state: NodeState,
	/// Eased scale, before the pulse.
	pub scale: Tween,
	/// Eased opacity.
	pub opacity: Tween,
	/// Eased color.
	pub color: ColorTween,
	/// Glow intensity.
	pub emissive: Tween,
}

impl GraphNode {
	fn new(school: School, pos: Vec3) -> Self {
		let state = NodeState::Default;
		Self {
			id: school.name.clone(),
			pos,
			vel: Vec3::ZERO,
			state,
			scale: Tween::new(state.scale()),
			opacity: Tween::new(state.opacity()),
			color: ColorTween::new(school.kind.color()),
			emissive: Tween::new(state.emissive()),
			school,
		}
	}
}

/// What the renderer draws for one node this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeFrame {
	/// Node id.
	pub id: String,
	/// World position including the float offset.
	pub position: Vec3,
	/// Scale with the pulse applied.
	pub scale: f32,
	/// Current opacity.
	pub opacity: f32,
	/// Current color.
	pub color: [f32; 3],
	/// Current glow.
	pub emissive: f32,
	/// Hover and selection state.
	pub state: NodeState,
}

/// Sampled link curve for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkFrame {
	/// Curve samples from source to target.
	pub points: Vec<Vec3>,
	/// Current line width.
	pub width: f32,
	/// Current opacity.
	pub opacity: f32,
	/// Touches the hovered or selected node.
	pub highlighted: bool,
}

const CURVE_SEGMENTS: usize = 10;

/// Force-directed placement of schools in 3D.
pub struct ForceLayout {
	config: LayoutConfig,
	nodes: Vec<GraphNode>,
	links: Vec<GraphLink>,
	index: HashMap<String, usize>,
	/// Per-node `(neighbor, link value)` pairs.
	adjacency: Vec<Vec<(usize, f32)>>,
	interaction: Interaction,
	rng: SmallRng,
}

impl ForceLayout {
	/// One node per school, spawned from `seed`.
	pub fn new(schools: &[School], config: LayoutConfig, seed: u64) -> Self {
		let mut layout = Self {
			config,
			nodes: Vec::new(),
			links: Vec::new(),
			index: HashMap::new(),
			adjacency: Vec::new(),
			interaction: Interaction::default(),
			rng: SmallRng::seed_from_u64(seed),
		};
		layout.set_schools(schools);
		layout
	}

	/// Active force constants.
	pub fn config(&self) -> &LayoutConfig {
		&self.config
	}

	/// Takes effect on the next step.
	pub fn set_config(&mut self, config: LayoutConfig) {
		self.config = config;
	}

	/// Nodes in school order.
	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	/// Current links.
	pub fn links(&self) -> &[GraphLink] {
		&self.links
	}

	/// Look up a node by school name.
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	/// Rebuild nodes and links for a new school list. Nodes that survive keep their
	/// position and velocity; new ones spawn at random inside the spawn cube.
	pub fn set_schools(&mut self, schools: &[School]) {
		let keep: HashSet<&str> = schools.iter().map(|s| s.name.as_str()).collect();
		let gone: Vec<String> = self
			.nodes
			.iter()
			.filter(|n| !keep.contains(n.id.as_str()))
			.map(|n| n.id.clone())
			.collect();
		for id in &gone {
			self.remove_node(id);
		}

		let mut previous: HashMap<String, GraphNode> = self
			.nodes
			.drain(..)
			.map(|n| (n.id.clone(), n))
			.collect();

		let half = self.config.spawn_extent * 0.5;
		let mut nodes = Vec::with_capacity(schools.len());
		for school in schools {
			if let Some(mut node) = previous.remove(&school.name) {
				node.school = school.clone();
				nodes.push(node);
				continue;
			}
			let pos = Vec3::new(
				self.rng.gen_range(-half..=half),
				self.rng.gen_range(-half..=half),
				self.rng.gen_range(-half..=half),
			);
			nodes.push(GraphNode::new(school.clone(), pos));
		}
		self.nodes = nodes;
		self.links = build_links(schools);
		self.reindex();
		self.refresh_targets();
		info!(
			"Graph rebuilt with {} nodes and {} links",
			self.nodes.len(),
			self.links.len()
		);
	}

	/// Remove a node and every link touching it.
	pub fn remove_node(&mut self, id: &str) -> Option<GraphNode> {
		let i = *self.index.get(id)?;
		let node = self.nodes.remove(i);
		self.links.retain(|l| !l.touches(id));
		if self.interaction.hovered.as_deref() == Some(id) {
			self.interaction.hovered = None;
		}
		if self.interaction.selected.as_deref() == Some(id) {
			self.interaction.selected = None;
		}
		self.reindex();
		self.refresh_targets();
		Some(node)
	}

	fn reindex(&mut self) {
		self.index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
		self.adjacency = vec![Vec::new(); self.nodes.len()];
		for link in &self.links {
			let (Some(&a), Some(&b)) = (self.index.get(&link.source), self.index.get(&link.target)) else {
				continue;
			};
			self.adjacency[a].push((b, link.value));
			self.adjacency[b].push((a, link.value));
		}
	}

	/// Advance the simulation by `dt` seconds, clamped to `max_dt`.
	///
	/// Forces are computed from the positions at the start of the step.
	pub fn step(&mut self, dt: f32) {
		let dt = dt.clamp(0.0, self.config.max_dt);
		if dt == 0.0 || self.nodes.is_empty() {
			return;
		}
		let cfg = self.config;
		let positions: Vec<Vec3> = self.nodes.iter().map(|n| n.pos).collect();
		let hash = SpatialHash::from_positions(cfg.repulsion_max, &positions);

		for (i, node) in self.nodes.iter_mut().enumerate() {
			let p = positions[i];
			let mut force = -p * cfg.center_attraction;

			for j in hash.candidates(p, cfg.repulsion_max) {
				if j == i {
					continue;
				}
				let delta = p - positions[j];
				let distance = delta.length();
				let magnitude = cfg.repulsion_magnitude(distance);
				if magnitude > 0.0 {
					force += delta / distance * magnitude;
				}
			}

			if let Some(spring) = cfg.link_force {
				for &(j, value) in &self.adjacency[i] {
					let to = positions[j] - p;
					let distance = to.length();
					if distance <= 1e-6 {
						continue;
					}
					let displacement = distance - spring.base_distance / value;
					force += to / distance * displacement * spring.stiffness * value;
				}
			}

			node.vel += force * dt;
			node.vel *= cfg.damping;
			node.pos += node.vel * dt;

			if let Some(radius) = cfg.bounds_radius {
				if node.pos.length() > radius {
					node.pos = node.pos.normalize() * radius;
					node.vel *= 0.8;
				}
			}
		}
	}

	/// Feed a hover/select intent. Targets are recomputed only when something changed.
	pub fn handle(&mut self, intent: Intent) -> bool {
		if let Intent::PointerOver(id) | Intent::Click(id) = &intent {
			if !self.index.contains_key(id) {
				debug!("Ignoring intent for unknown node {id}");
				return false;
			}
		}
		let changed = self.interaction.apply(intent);
		if changed {
			self.refresh_targets();
		}
		changed
	}

	/// Current hover and selection.
	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	/// Node shown in the label: selection first, then hover.
	pub fn active_node(&self) -> Option<&GraphNode> {
		let id = self
			.interaction
			.selected
			.as_deref()
			.or(self.interaction.hovered.as_deref())?;
		self.node(id)
	}

	fn refresh_targets(&mut self) {
		for node in &mut self.nodes {
			let state = self.interaction.state_of(&node.id);
			node.state = state;
			node.scale.target = state.scale();
			node.opacity.target = state.opacity();
			node.emissive.target = state.emissive();
			let base = node.school.kind.color();
			node.color.target = if state.is_active() {
				brighten(base, 1.3)
			} else {
				base
			};
		}
		for link in &mut self.links {
			let highlighted = self.interaction.hovered.as_deref().is_some_and(|h| link.touches(h))
				|| self.interaction.selected.as_deref().is_some_and(|s| link.touches(s));
			link.width.target = link.value * if highlighted { 2.5 } else { 1.5 };
			link.opacity.target = if highlighted {
				0.8
			} else {
				link.kind.resting_opacity()
			};
		}
	}

	fn link_highlighted(&self, link: &GraphLink) -> bool {
		[&self.interaction.hovered, &self.interaction.selected]
			.into_iter()
			.flatten()
			.any(|id| link.touches(id))
	}

	/// Ease visual properties toward their targets.
	pub fn animate(&mut self, dt: f32) {
		let factor = lerp_factor(dt);
		for node in &mut self.nodes {
			node.scale.step(factor);
			node.opacity.step(factor);
			node.emissive.step(factor);
			node.color.step(factor);
		}
		for link in &mut self.links {
			link.width.step(factor);
			link.opacity.step(factor);
		}
	}

	/// Node snapshots at `time` seconds. `boost` (audio reactivity) strengthens the pulse.
	pub fn node_frames(&self, time: f32, boost: f32) -> Vec<NodeFrame> {
		self.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				let offset = i as f32 * 0.1;
				let drift = Vec3::new(
					(time * 0.3 + offset).cos() * 0.03,
					(time * 0.5 + offset).sin() * 0.05,
					(time * 0.4 + offset).sin() * 0.04,
				);
				NodeFrame {
					id: node.id.clone(),
					position: node.pos + drift,
					scale: node.scale.current * pulse(node.state, time, offset, boost),
					opacity: node.opacity.current,
					color: node.color.current,
					emissive: node.emissive.current,
					state: node.state,
				}
			})
			.collect()
	}

	/// Link curves at `time` seconds. Links whose endpoints are missing are skipped.
	pub fn link_frames(&self, time: f32) -> Vec<LinkFrame> {
		let mut frames = Vec::with_capacity(self.links.len());
		for (i, link) in self.links.iter().enumerate() {
			let (Some(a), Some(b)) = (self.node(&link.source), self.node(&link.target)) else {
				debug!("Link {} -> {} has a missing endpoint", link.source, link.target);
				continue;
			};
			let lift = (i as f32 * 0.5 + time * 0.2).sin() * 0.5;
			let control = (a.pos + b.pos) * 0.5 + Vec3::Y * lift;
			frames.push(LinkFrame {
				points: quadratic_bezier(a.pos, control, b.pos, CURVE_SEGMENTS),
				width: link.width.current,
				opacity: link.opacity.current,
				highlighted: self.link_highlighted(link),
			});
		}
		frames
	}

	/// Current position per node id.
	pub fn positions(&self) -> impl Iterator<Item = (&str, Vec3)> {
		self.nodes.iter().map(|n| (n.id.as_str(), n.pos))
	}
}

/// Sample a quadratic Bézier curve into `segments + 1` points.
pub fn quadratic_bezier(p0: Vec3, control: Vec3, p2: Vec3, segments: usize) -> Vec<Vec3> {
	let segments = segments.max(1);
	(0..=segments)
		.map(|s| {
			let t = s as f32 / segments as f32;
			let u = 1.0 - t;
			p0 * (u * u) + control * (2.0 * u * t) + p2 * (t * t)
		})
		.collect()
}

/// Links between each school and the next two sharing its region, then the same
/// for institution type, skipping pairs already linked.
pub fn build_links(schools: &[School]) -> Vec<GraphLink> {
	let mut links = Vec::new();
	let mut seen: HashSet<(String, String)> = HashSet::new();

	let by_region = group_by(schools, |s| s.region.clone());
	let by_kind = group_by(schools, |s| s.kind);

	let groups = by_region
		.into_values()
		.map(|g| (LinkKind::Region, g))
		.chain(by_kind.into_values().map(|g| (LinkKind::Kind, g)));

	for (kind, group) in groups {
		for i in 0..group.len() {
			for j in i + 1..group.len().min(i + 3) {
				let (a, b) = (&group[i].name, &group[j].name);
				let key = if a < b {
					(a.clone(), b.clone())
				} else {
					(b.clone(), a.clone())
				};
				if seen.insert(key) {
					links.push(GraphLink::new(a, b, kind));
				}
			}
		}
	}
	links
}

fn group_by<K: Ord>(schools: &[School], key: impl Fn(&School) -> K) -> BTreeMap<K, Vec<&School>> {
	let mut groups: BTreeMap<K, Vec<&School>> = BTreeMap::new();
	for school in schools {
		groups.entry(key(school)).or_default().push(school);
	}
	groups
}
