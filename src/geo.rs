//! Geographic helpers shared by the globe and the layout engines.

use glam::Vec3;

/// Radius of the sphere markers sit on, slightly above the globe surface.
pub const MARKER_RADIUS: f32 = 1.02;

/// Project a latitude/longitude pair in degrees onto a sphere of `radius`.
///
/// Latitude is measured from the north pole and longitude is offset by 180°, so
/// `(0, 0)` lands on the positive x axis. Non-finite input yields non-finite output;
/// coordinates are validated where the dataset is loaded.
pub fn lat_long_to_vec3(lat: f32, lng: f32, radius: f32) -> Vec3 {
	let phi = (90.0 - lat).to_radians();
	let theta = (lng + 180.0).to_radians();

	Vec3::new(
		-radius * phi.sin() * theta.cos(),
		radius * phi.cos(),
		radius * phi.sin() * theta.sin(),
	)
}

/// Inverse of [`lat_long_to_vec3`], returning `(lat, lng)` in degrees.
pub fn vec3_to_lat_long(point: Vec3) -> (f32, f32) {
	let radius = point.length();
	if radius <= f32::EPSILON {
		return (0.0, 0.0);
	}
	let lat = 90.0 - (point.y / radius).clamp(-1.0, 1.0).acos().to_degrees();
	let lng = point.z.atan2(-point.x).to_degrees() - 180.0;
	(lat, normalize_longitude(lng))
}

fn normalize_longitude(lng: f32) -> f32 {
	let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
	if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
	use super::*;

	const EPS: f32 = 1e-5;

	#[test]
	fn origin_coordinate_lands_on_positive_x() {
		let p = lat_long_to_vec3(0.0, 0.0, MARKER_RADIUS);
		assert!((p.length() - MARKER_RADIUS).abs() < EPS);
		assert!((p.x - MARKER_RADIUS).abs() < EPS);
		assert!(p.y.abs() < EPS);
		assert!(p.z.abs() < EPS);
	}

	#[test]
	fn poles_map_to_y_axis() {
		let north = lat_long_to_vec3(90.0, 13.4, 2.0);
		let south = lat_long_to_vec3(-90.0, 13.4, 2.0);
		assert!((north.y - 2.0).abs() < EPS);
		assert!((south.y + 2.0).abs() < EPS);
	}

	#[test]
	fn points_stay_on_the_sphere() {
		for &(lat, lng) in &[(52.52, 13.40), (48.14, 11.58), (-33.9, 151.2), (0.0, -179.9)] {
			let p = lat_long_to_vec3(lat, lng, 3.5);
			assert!((p.length() - 3.5).abs() < 1e-4, "{lat},{lng} -> {p}");
		}
	}

	#[test]
	fn inverse_recovers_coordinates() {
		let (lat, lng) = vec3_to_lat_long(lat_long_to_vec3(51.96, 7.62, 1.0));
		assert!((lat - 51.96).abs() < 1e-3);
		assert!((lng - 7.62).abs() < 1e-3);
	}

	#[test]
	fn nan_propagates() {
		let p = lat_long_to_vec3(f32::NAN, 10.0, 1.0);
		assert!(p.x.is_nan() && p.y.is_nan());
	}
}
