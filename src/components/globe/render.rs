use std::f64::consts::{PI, TAU};

use glam::Vec3;
use web_sys::CanvasRenderingContext2d;

use super::state::GlobeState;
use crate::layout::camera::project_with;
use crate::layout::{MarkerVisual, NodeState};

const MARKER_RADIUS_PX: f64 = 4.0;

fn rgba(color: [f32; 3], alpha: f64) -> String {
	format!(
		"rgba({}, {}, {}, {})",
		(color[0] * 255.0) as u8,
		(color[1] * 255.0) as u8,
		(color[2] * 255.0) as u8,
		alpha
	)
}

pub fn render(state: &GlobeState, ctx: &CanvasRenderingContext2d) {
	let (w, h) = (state.viewport.width as f64, state.viewport.height as f64);
	ctx.set_fill_style_str("#05060f");
	ctx.fill_rect(0.0, 0.0, w, h);
	draw_swarm(state, ctx);
	draw_globe(state, ctx);
	draw_markers(state, ctx);
	draw_clusters(state, ctx);
}

/// Particles are laid out flat behind the globe; depth only fades them.
fn draw_swarm(state: &GlobeState, ctx: &CanvasRenderingContext2d) {
	let (w, h) = (state.viewport.width as f64, state.viewport.height as f64);
	let radius = state.swarm.config().radius as f64;
	let scale = w.max(h) * 0.5 / radius;
	let glow = 0.25 + state.reactivity as f64 * 0.5;
	let time = state.time;

	for p in state.swarm.particles() {
		let depth = ((p.pos.z as f64 / radius) + 1.0) * 0.5;
		let twinkle = ((time * 1.5 + p.phase as f64).sin() + 1.0) * 0.5;
		let alpha = (glow * (0.3 + 0.7 * depth) * (0.5 + 0.5 * twinkle)).min(1.0);
		ctx.set_fill_style_str(&format!("rgba(77, 27, 255, {alpha})"));
		let size = p.size as f64 * (0.5 + depth);
		ctx.fill_rect(
			w * 0.5 + p.pos.x as f64 * scale,
			h * 0.5 - p.pos.y as f64 * scale,
			size,
			size,
		);
	}
}

fn draw_globe(state: &GlobeState, ctx: &CanvasRenderingContext2d) {
	let cam = &state.camera;
	let center = cam.project(Vec3::ZERO, state.viewport);
	let d = cam.distance.max(1.0001);
	let focal = state.viewport.height * 0.5 / (cam.fov_y * 0.5).tan();
	let r = (focal / (d * d - 1.0).sqrt()) as f64;
	let (cx, cy) = (center.pos.x as f64, center.pos.y as f64);

	if let Ok(gradient) = ctx.create_radial_gradient(cx - r * 0.3, cy - r * 0.3, r * 0.1, cx, cy, r) {
		let _ = gradient.add_color_stop(0.0, "#1b2a6b");
		let _ = gradient.add_color_stop(1.0, "#070b24");
		ctx.begin_path();
		let _ = ctx.arc(cx, cy, r, 0.0, TAU);
		#[allow(deprecated)]
		ctx.set_fill_style(&gradient);
		ctx.fill();
	}
	ctx.set_stroke_style_str("rgba(41, 121, 255, 0.35)");
	ctx.set_line_width(1.0);
	ctx.begin_path();
	let _ = ctx.arc(cx, cy, r, 0.0, TAU);
	ctx.stroke();
}

fn draw_markers(state: &GlobeState, ctx: &CanvasRenderingContext2d) {
	let vp = state.camera.view_projection(state.viewport);
	let mut active = Vec::new();

	for marker in state.engine.markers() {
		if !marker.visual.is_visible() || !state.faces_camera(marker.position) {
			continue;
		}
		let p = project_with(&vp, state.engine.world_position(marker.position), state.viewport);
		if !p.visible() {
			continue;
		}
		if marker.state != NodeState::Default {
			active.push((marker, p));
			continue;
		}
		ctx.set_global_alpha(marker.opacity.current as f64);
		ctx.begin_path();
		let _ = ctx.arc(
			p.pos.x as f64,
			p.pos.y as f64,
			MARKER_RADIUS_PX * marker.scale.current as f64 / 1.2,
			0.0,
			2.0 * PI,
		);
		ctx.set_fill_style_str(&rgba(marker.school.kind.color(), 1.0));
		ctx.fill();
	}
	ctx.set_global_alpha(1.0);

	// Hovered and selected markers on top, with their name.
	for (marker, p) in active {
		let (x, y) = (p.pos.x as f64, p.pos.y as f64);
		let radius = MARKER_RADIUS_PX * marker.scale.current as f64 / 1.2;
		ctx.set_global_alpha(marker.opacity.current as f64);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str("#ffffff");
		ctx.fill();
		ctx.set_global_alpha(1.0);
		ctx.set_fill_style_str("white");
		ctx.set_font("12px sans-serif");
		let _ = ctx.fill_text(&marker.school.name, x + radius + 4.0, y + 4.0);
	}
}

fn draw_clusters(state: &GlobeState, ctx: &CanvasRenderingContext2d) {
	let vp = state.camera.view_projection(state.viewport);
	ctx.set_font("bold 11px sans-serif");
	ctx.set_text_align("center");
	let eye = state.camera.position();
	for cluster in state.engine.clusters() {
		let Some(anchor) = state.engine.cluster_anchor(cluster, eye) else {
			continue;
		};
		let p = project_with(&vp, state.engine.world_position(anchor), state.viewport);
		if !p.visible() {
			continue;
		}
		let (x, y) = (p.pos.x as f64, p.pos.y as f64);
		let radius = 9.0 + (cluster.members.len() as f64).sqrt() * 3.0;
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str("rgba(41, 121, 255, 0.85)");
		ctx.fill();
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.6)");
		ctx.set_line_width(1.5);
		ctx.stroke();
		ctx.set_fill_style_str("white");
		let _ = ctx.fill_text(&cluster.members.len().to_string(), x, y + 4.0);
	}
	ctx.set_text_align("start");
}
