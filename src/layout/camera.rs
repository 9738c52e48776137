//! Orbit camera and projection of world points to screen pixels.

use glam::{Mat4, Vec2, Vec3};

use crate::geo::lat_long_to_vec3;

/// Drawing surface size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Width in pixels.
	pub width: f32,
	/// Height in pixels.
	pub height: f32,
}

impl Viewport {
	/// A viewport of the given size.
	pub fn new(width: f32, height: f32) -> Self {
		Self { width, height }
	}

	/// Width over height, 1 for an empty viewport.
	pub fn aspect(&self) -> f32 {
		if self.height > 0.0 {
			self.width / self.height
		} else {
			1.0
		}
	}
}

/// A world point after projection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
	/// Pixels from the top-left corner.
	pub pos: Vec2,
	/// Normalized device depth; `>= 1` means clipped or behind the camera.
	pub depth: f32,
}

impl ScreenPoint {
	/// Inside the depth range.
	pub fn visible(&self) -> bool {
		self.depth < 1.0
	}
}

/// Perspective camera orbiting the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
	/// Rotation around the y axis, radians.
	pub yaw: f32,
	/// Elevation above the equator, radians.
	pub pitch: f32,
	/// Distance from the origin.
	pub distance: f32,
	/// Vertical field of view, radians.
	pub fov_y: f32,
	/// Near clip plane.
	pub near: f32,
	/// Far clip plane.
	pub far: f32,
	/// Closest zoom.
	pub min_distance: f32,
	/// Farthest zoom.
	pub max_distance: f32,
}

impl Default for Camera {
	fn default() -> Self {
		Self {
			yaw: 0.0,
			pitch: 0.0,
			distance: 3.0,
			fov_y: 45f32.to_radians(),
			near: 0.1,
			far: 100.0,
			min_distance: 1.3,
			max_distance: 12.0,
		}
	}
}

const PITCH_LIMIT: f32 = 1.45;

impl Camera {
	/// Eye position in world space.
	pub fn position(&self) -> Vec3 {
		let (sy, cy) = self.yaw.sin_cos();
		let (sp, cp) = self.pitch.sin_cos();
		Vec3::new(cp * cy, sp, -cp * sy) * self.distance
	}

	/// View matrix looking at the origin.
	pub fn view(&self) -> Mat4 {
		Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
	}

	/// GL-style perspective matrix.
	pub fn projection(&self, viewport: Viewport) -> Mat4 {
		Mat4::perspective_rh_gl(self.fov_y, viewport.aspect(), self.near, self.far)
	}

	/// Projection times view.
	pub fn view_projection(&self, viewport: Viewport) -> Mat4 {
		self.projection(viewport) * self.view()
	}

	/// Project a world point to screen pixels.
	pub fn project(&self, world: Vec3, viewport: Viewport) -> ScreenPoint {
		project_with(&self.view_projection(viewport), world, viewport)
	}

	/// Rotate around the globe by pixel deltas from a drag gesture.
	pub fn orbit(&mut self, dx: f32, dy: f32) {
		let speed = 0.005 * self.distance / 3.0;
		self.yaw -= dx * speed;
		self.pitch = (self.pitch + dy * speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);
	}

	/// Scale the distance, clamped to the zoom limits.
	pub fn zoom(&mut self, factor: f32) {
		self.distance = (self.distance * factor).clamp(self.min_distance, self.max_distance);
	}

	/// Turn the camera so `(lat, lng)` faces the viewer.
	pub fn focus_on(&mut self, lat: f32, lng: f32) {
		let target = lat_long_to_vec3(lat, lng, 1.0);
		self.pitch = target.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
		self.yaw = (-target.z).atan2(target.x);
	}
}

/// Project with a precomputed view-projection matrix.
pub fn project_with(view_projection: &Mat4, world: Vec3, viewport: Viewport) -> ScreenPoint {
	let ndc = view_projection.project_point3(world);
	ScreenPoint {
		pos: Vec2::new(
			(ndc.x * 0.5 + 0.5) * viewport.width,
			(-ndc.y * 0.5 + 0.5) * viewport.height,
		),
		depth: ndc.z,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_camera_sits_on_positive_x() {
		let cam = Camera::default();
		let p = cam.position();
		assert!((p - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
	}

	#[test]
	fn origin_projects_to_viewport_center() {
		let cam = Camera::default();
		let vp = Viewport::new(800.0, 600.0);
		let s = cam.project(Vec3::ZERO, vp);
		assert!((s.pos - Vec2::new(400.0, 300.0)).length() < 1e-3);
		assert!(s.visible());
	}

	#[test]
	fn points_behind_the_camera_are_not_visible() {
		let cam = Camera::default();
		let vp = Viewport::new(800.0, 600.0);
		assert!(!cam.project(Vec3::new(5.0, 0.0, 0.0), vp).visible());
		assert!(!cam.project(Vec3::new(-200.0, 0.0, 0.0), vp).visible());
	}

	#[test]
	fn projection_is_deterministic() {
		let cam = Camera {
			yaw: 0.7,
			pitch: 0.3,
			..Default::default()
		};
		let vp = Viewport::new(1024.0, 768.0);
		let p = Vec3::new(0.3, 0.8, -0.4);
		assert_eq!(cam.project(p, vp), cam.project(p, vp));
	}

	#[test]
	fn focus_brings_target_to_center() {
		let mut cam = Camera::default();
		cam.focus_on(52.5, 13.4);
		let vp = Viewport::new(800.0, 800.0);
		let s = cam.project(lat_long_to_vec3(52.5, 13.4, 1.0), vp);
		assert!((s.pos - Vec2::new(400.0, 400.0)).length() < 0.5, "{:?}", s.pos);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut cam = Camera::default();
		cam.zoom(0.01);
		assert_eq!(cam.distance, cam.min_distance);
		cam.zoom(1000.0);
		assert_eq!(cam.distance, cam.max_distance);
	}
}
