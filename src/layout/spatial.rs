//! Spatial indexes used by the layout engines.
//!
//! - `GeoIndex`: static kd index over (longitude, latitude), rebuilt whenever a marker is added.
//! - `ScreenGrid`: per-pass bucket grid over projected pixel positions for cluster gathering.
//! - `SpatialHash`: 3D bucket hash for repulsion and flocking neighbor queries.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

const LEAF_SIZE: usize = 16;

/// Static kd index over 2D points. Items are stored in kd order; rebuild to change them.
#[derive(Debug, Clone)]
pub struct GeoIndex<T> {
	entries: Vec<(Vec2, T)>,
}

impl<T> Default for GeoIndex<T> {
	fn default() -> Self {
		Self {
			entries: Vec::new(),
		}
	}
}

fn axis_value(p: Vec2, axis: usize) -> f32 {
	if axis == 0 { p.x } else { p.y }
}

impl<T> GeoIndex<T> {
	/// Build the index over `points`.
	pub fn build(points: Vec<(Vec2, T)>) -> Self {
		let mut entries = points;
		sort_kd(&mut entries, 0);
		Self { entries }
	}

	/// Number of indexed items.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Whether nothing is indexed.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Items inside the axis-aligned box `[min, max]`.
	pub fn range(&self, min: Vec2, max: Vec2) -> Vec<&T> {
		let mut result = Vec::new();
		self.visit(
			|p| p.cmpge(min).all() && p.cmple(max).all(),
			|axis, split| (axis_value(min, axis) <= split, axis_value(max, axis) >= split),
			&mut result,
		);
		result
	}

	/// Items within `radius` (Euclidean, in index units) of `center`.
	pub fn within(&self, center: Vec2, radius: f32) -> Vec<&T> {
		let r2 = radius * radius;
		let mut result = Vec::new();
		self.visit(
			|p| p.distance_squared(center) <= r2,
			|axis, split| {
				let c = axis_value(center, axis);
				(c - radius <= split, c + radius >= split)
			},
			&mut result,
		);
		result
	}

	fn visit<'a>(
		&'a self,
		accept: impl Fn(Vec2) -> bool,
		descend: impl Fn(usize, f32) -> (bool, bool),
		out: &mut Vec<&'a T>,
	) {
		let mut stack = vec![(0usize, self.entries.len(), 0usize)];
		while let Some((lo, hi, axis)) = stack.pop() {
			if hi - lo <= LEAF_SIZE {
				for (p, item) in &self.entries[lo..hi] {
					if accept(*p) {
						out.push(item);
					}
				}
				continue;
			}
			let mid = lo + (hi - lo) / 2;
			let (p, item) = &self.entries[mid];
			if accept(*p) {
				out.push(item);
			}
			let (left, right) = descend(axis, axis_value(*p, axis));
			if left {
				stack.push((lo, mid, 1 - axis));
			}
			if right {
				stack.push((mid + 1, hi, 1 - axis));
			}
		}
	}
}

fn sort_kd<T>(entries: &mut [(Vec2, T)], axis: usize) {
	if entries.len() <= LEAF_SIZE {
		return;
	}
	let mid = entries.len() / 2;
	entries.select_nth_unstable_by(mid, |a, b| {
		axis_value(a.0, axis).total_cmp(&axis_value(b.0, axis))
	});
	let (left, rest) = entries.split_at_mut(mid);
	sort_kd(left, 1 - axis);
	sort_kd(&mut rest[1..], 1 - axis);
}

/// Uniform bucket grid over screen pixels.
#[derive(Debug, Clone)]
pub struct ScreenGrid {
	cell_size: f32,
	cells: HashMap<(i32, i32), Vec<(Vec2, usize)>>,
}

impl ScreenGrid {
	/// Cell size should match the query radius so a query touches at most 3x3 cells.
	pub fn new(cell_size: f32) -> Self {
		Self {
			cell_size: cell_size.max(1.0),
			cells: HashMap::new(),
		}
	}

	fn cell(&self, p: Vec2) -> (i32, i32) {
		(
			(p.x / self.cell_size).floor() as i32,
			(p.y / self.cell_size).floor() as i32,
		)
	}

	/// Bucket `item` at pixel position `p`.
	pub fn insert(&mut self, p: Vec2, item: usize) {
		let cell = self.cell(p);
		self.cells.entry(cell).or_default().push((p, item));
	}

	/// Items within `radius` pixels of `p`, sorted by item.
	pub fn query(&self, p: Vec2, radius: f32) -> Vec<usize> {
		let (cx, cy) = self.cell(p);
		let reach = (radius / self.cell_size).ceil() as i32;
		let r2 = radius * radius;
		let mut hits = Vec::new();
		for x in cx - reach..=cx + reach {
			for y in cy - reach..=cy + reach {
				let Some(bucket) = self.cells.get(&(x, y)) else {
					continue;
				};
				hits.extend(
					bucket
						.iter()
						.filter(|(q, _)| q.distance_squared(p) <= r2)
						.map(|&(_, item)| item),
				);
			}
		}
		hits.sort_unstable();
		hits
	}
}

/// Uniform bucket hash over 3D positions.
#[derive(Debug, Clone)]
pub struct SpatialHash {
	inv_cell_size: f32,
	cells: HashMap<(i32, i32, i32), Vec<usize>>,
}

impl SpatialHash {
	/// An empty hash with cubic cells of `cell_size`.
	pub fn new(cell_size: f32) -> Self {
		Self {
			inv_cell_size: 1.0 / cell_size.max(1e-3),
			cells: HashMap::new(),
		}
	}

	/// Hash every position, keyed by its index in `positions`.
	pub fn from_positions(cell_size: f32, positions: &[Vec3]) -> Self {
		let mut hash = Self::new(cell_size);
		for (i, &p) in positions.iter().enumerate() {
			hash.insert(p, i);
		}
		hash
	}

	fn cell(&self, p: Vec3) -> (i32, i32, i32) {
		let c = (p * self.inv_cell_size).floor();
		(c.x as i32, c.y as i32, c.z as i32)
	}

	/// Bucket `item` at `p`.
	pub fn insert(&mut self, p: Vec3, item: usize) {
		let cell = self.cell(p);
		self.cells.entry(cell).or_default().push(item);
	}

	/// Candidate items in every cell overlapping the sphere of `radius` around `p`.
	/// Callers still check exact distances.
	pub fn candidates(&self, p: Vec3, radius: f32) -> impl Iterator<Item = usize> + '_ {
		let (cx, cy, cz) = self.cell(p);
		let reach = (radius * self.inv_cell_size).ceil().max(0.0) as i32;
		(cx - reach..=cx + reach)
			.flat_map(move |x| (cy - reach..=cy + reach).map(move |y| (x, y)))
			.flat_map(move |(x, y)| (cz - reach..=cz + reach).map(move |z| (x, y, z)))
			.filter_map(|key| self.cells.get(&key))
			.flat_map(|bucket| bucket.iter().copied())
	}
}
