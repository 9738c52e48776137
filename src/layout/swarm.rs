//! Background particle swarm with boids-style flocking.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::spatial::SpatialHash;
use crate::audio::FrequencyBands;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Flocking weights and particle budget.
pub struct SwarmConfig {
	/// Number of particles spawned.
	pub particle_count: usize,
	/// Containment radius before the low band widens it.
	pub radius: f32,
	/// Pull toward the neighborhood center.
	pub cohesion: f32,
	/// Push away from close neighbors.
	pub separation: f32,
	/// Steering toward the neighborhood velocity.
	pub alignment: f32,
}

impl Default for SwarmConfig {
	fn default() -> Self {
		Self {
			particle_count: 600,
			radius: 8.0,
			cohesion: 0.015,
			separation: 0.025,
			alignment: 0.02,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// One swarm particle.
pub struct Particle {
	/// Position.
	pub pos: Vec3,
	/// Velocity per step.
	pub vel: Vec3,
	/// Random phase for twinkle.
	pub phase: f32,
	/// Radius in pixels before perspective.
	pub size: f32,
}

/// Audio-reactive flocking particles drawn behind the globe.
pub struct Swarm {
	config: SwarmConfig,
	particles: Vec<Particle>,
}

const NOISE: f32 = 0.001;
const NOISE_SCALE: f32 = 0.5;

impl Swarm {
	/// Spawn particles inside a shell between 20% and 100% of the radius.
	pub fn new(config: SwarmConfig, seed: u64) -> Self {
		let mut rng = SmallRng::seed_from_u64(seed);
		let particles = (0..config.particle_count)
			.map(|_| {
				let theta = rng.gen_range(0.0..std::f32::consts::TAU);
				let phi = rng.gen_range(-1.0f32..=1.0).acos();
				let r = config.radius * (0.2 + rng.gen_range(0.0..0.8));
				let (sp, cp) = phi.sin_cos();
				let (st, ct) = theta.sin_cos();
				Particle {
					pos: Vec3::new(sp * ct, sp * st, cp) * r,
					vel: Vec3::new(
						rng.gen_range(-0.01..0.01),
						rng.gen_range(-0.01..0.01),
						rng.gen_range(-0.01..0.01),
					),
					phase: rng.gen_range(0.0..std::f32::consts::TAU),
					size: rng.gen_range(1.0..2.0),
				}
			})
			.collect();
		Self { config, particles }
	}

	/// Current particles.
	pub fn particles(&self) -> &[Particle] {
		&self.particles
	}

	/// Active configuration.
	pub fn config(&self) -> &SwarmConfig {
		&self.config
	}

	/// Advance one frame. Audio widens the neighborhood (`reactivity`), the containment
	/// sphere (`low`), the speed (`high`) and lowers the drag (`mid`).
	pub fn step(&mut self, bands: FrequencyBands, reactivity: f32, time: f32) {
		let cfg = self.config;
		let neighborhood = 1.0 + reactivity * 3.0;
		let bound = cfg.radius * (1.0 + bands.low * 0.5);
		let speed = 1.0 + bands.high * 2.0;
		let damping = 0.98 + bands.mid * 0.01;

		let snapshot: Vec<(Vec3, Vec3)> = self.particles.iter().map(|p| (p.pos, p.vel)).collect();
		let positions: Vec<Vec3> = snapshot.iter().map(|&(p, _)| p).collect();
		let hash = SpatialHash::from_positions(neighborhood, &positions);
		let r2 = neighborhood * neighborhood;

		for (i, particle) in self.particles.iter_mut().enumerate() {
			let p = positions[i];
			let mut center = Vec3::ZERO;
			let mut heading = Vec3::ZERO;
			let mut push = Vec3::ZERO;
			let mut neighbors = 0u32;

			for j in hash.candidates(p, neighborhood) {
				if j == i {
					continue;
				}
				let (q, v) = snapshot[j];
				let away = p - q;
				let d2 = away.length_squared();
				if d2 >= r2 {
					continue;
				}
				center += q;
				heading += v;
				if d2 > 0.0 {
					// Unit direction scaled by 1/d.
					push += away / d2;
				}
				neighbors += 1;
			}

			let mut accel = Vec3::ZERO;
			if neighbors > 0 {
				let n = neighbors as f32;
				accel += (center / n - p) * cfg.cohesion;
				accel += heading / n * cfg.alignment;
				accel += push * cfg.separation;
			}
			accel += Vec3::new(
				(time * 0.5 + p.x * NOISE_SCALE).sin(),
				(time * 0.4 + p.y * NOISE_SCALE).cos(),
				(time * 0.3 + p.z * NOISE_SCALE).sin(),
			) * NOISE;

			particle.vel = (particle.vel + accel * speed) * damping;
			particle.pos += particle.vel;
			if particle.pos.length() > bound {
				particle.pos = particle.pos.normalize() * bound;
			}
		}
	}
}
