use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::{NODE_RADIUS, NetworkState};
use crate::layout::NodeState;
use crate::layout::camera::project_with;

fn rgb(color: [f32; 3]) -> String {
	format!(
		"rgb({}, {}, {})",
		(color[0].clamp(0.0, 1.0) * 255.0) as u8,
		(color[1].clamp(0.0, 1.0) * 255.0) as u8,
		(color[2].clamp(0.0, 1.0) * 255.0) as u8
	)
}

pub fn render(state: &NetworkState, ctx: &CanvasRenderingContext2d) {
	let (w, h) = (state.viewport.width as f64, state.viewport.height as f64);
	ctx.set_fill_style_str("#05060f");
	ctx.fill_rect(0.0, 0.0, w, h);

	let snapshot = state.snapshot();
	let vp = state.camera.view_projection(state.viewport);

	for link in &snapshot.links {
		let mut points = link
			.points
			.iter()
			.map(|&p| project_with(&vp, p, state.viewport))
			.filter(|p| p.visible());
		let Some(first) = points.next() else {
			continue;
		};
		let color = if link.highlighted { "255, 255, 255" } else { "41, 121, 255" };
		ctx.set_stroke_style_str(&format!("rgba({color}, {})", link.opacity));
		ctx.set_line_width(link.width as f64);
		ctx.begin_path();
		ctx.move_to(first.pos.x as f64, first.pos.y as f64);
		for p in points {
			ctx.line_to(p.pos.x as f64, p.pos.y as f64);
		}
		ctx.stroke();
	}

	for (frame, at, _) in &snapshot.nodes {
		let (x, y) = (at.x as f64, at.y as f64);
		let radius = (NODE_RADIUS * frame.scale) as f64 / 1.2;

		if frame.state != NodeState::Default {
			let glow = radius * (1.5 + frame.emissive as f64);
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow) {
				let _ = gradient.add_color_stop(0.0, "rgba(255, 255, 255, 0.35)");
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.set_global_alpha(frame.opacity as f64);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&rgb(frame.color.map(|c| c * frame.emissive.max(0.8))));
		ctx.fill();
		ctx.set_global_alpha(1.0);
	}

	// Label for the selected node, or the hovered one.
	if let Some(node) = state.layout.active_node() {
		let at = snapshot
			.nodes
			.iter()
			.find(|(frame, _, _)| frame.id == node.id)
			.map(|(_, at, _)| *at);
		if let Some(at) = at {
			let label = match &node.school.city {
				Some(city) => format!("{} · {}", node.school.name, city),
				None => node.school.name.clone(),
			};
			ctx.set_font("13px sans-serif");
			ctx.set_fill_style_str("rgba(5, 6, 15, 0.75)");
			let width = ctx.measure_text(&label).map(|m| m.width()).unwrap_or(0.0);
			let (lx, ly) = (at.x as f64 + 12.0, at.y as f64 - 12.0);
			ctx.fill_rect(lx - 4.0, ly - 14.0, width + 8.0, 20.0);
			ctx.set_fill_style_str("white");
			let _ = ctx.fill_text(&label, lx, ly);
		}
	}
}
