use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::NetworkState;
use crate::components::soundtrack::{AnalyserFeed, AudioSource, use_audio};
use crate::components::window::FrameLoop;
use crate::store::use_view_store;

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Vec2> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Vec2::new(
		(ev.client_x() as f64 - rect.left()) as f32,
		(ev.client_y() as f64 - rect.top()) as f32,
	))
}

fn window_size(win: &web_sys::Window) -> (f64, f64) {
	(
		win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
		win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
	)
}

/// Schools as a 3D force-directed graph linked by region and institution type.
#[component]
pub fn UniversityNetwork() -> impl IntoView {
	let store = use_view_store();
	let audio = use_audio().with_value(AudioSource::clone);
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<NetworkState>>> = Rc::new(RefCell::new(None));
	let frames = StoredValue::new_local(FrameLoop::default());
	on_cleanup(move || frames.dispose());
	let springs = RwSignal::new(false);

	let state_init = state.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = window_size(&window);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			debug!("Canvas 2d context unavailable");
			return;
		};
		let schools = untrack(|| store.visible_schools());
		let feed = AnalyserFeed::new(audio.clone());
		let mut network = NetworkState::new(&schools, w as f32, h as f32, Box::new(feed));
		network.auto_rotate = untrack(|| store.auto_rotate.get());
		network.set_link_springs(untrack(|| springs.get()));
		*state_init.borrow_mut() = Some(network);

		let (state_resize, state_anim, state_down) =
			(state_init.clone(), state_init.clone(), state_init.clone());
		frames.with_value(|frames| {
			frames.on_resize(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				canvas.set_width(nw as u32);
				canvas.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw as f32, nh as f32);
				}
			});
			frames.on_teardown(move || {
				if let Some(mut network) = state_down.borrow_mut().take() {
					network.shutdown();
				}
			});
			frames.start(move |dt| {
				if let Some(ref mut s) = *state_anim.borrow_mut() {
					s.tick(dt);
					render::render(s, &ctx);
				}
			});
		});
	});

	let state_filter = state.clone();
	Effect::new(move |_| {
		let schools = store.visible_schools();
		if let Some(ref mut s) = *state_filter.borrow_mut() {
			s.layout.set_schools(&schools);
		}
	});

	let state_rotate = state.clone();
	Effect::new(move |_| {
		let on = store.auto_rotate.get();
		if let Some(ref mut s) = *state_rotate.borrow_mut() {
			s.auto_rotate = on;
		}
	});

	let state_springs = state.clone();
	Effect::new(move |_| {
		let on = springs.get();
		if let Some(ref mut s) = *state_springs.borrow_mut() {
			s.set_link_springs(on);
		}
	});

	// Nodes are keyed by school name, the store by school id.
	let state_select = state.clone();
	Effect::new(move |_| {
		let selected = store.selected_school();
		if let Some(ref mut s) = *state_select.borrow_mut() {
			s.sync_selection(selected.as_ref().map(|school| school.name.as_str()));
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(pos) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.drag.active = true;
			s.drag.moved = false;
			s.drag.last = pos;
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(pos) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let mut guard = state_mm.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		if s.drag.active {
			let delta = pos - s.drag.last;
			if delta.length_squared() > 4.0 {
				s.drag.moved = true;
			}
			if s.drag.moved {
				s.camera.orbit(delta.x, delta.y);
				s.drag.last = pos;
			}
			return;
		}
		let hovered = s.pick(pos);
		if hovered != s.layout.interaction().hovered {
			s.hover(hovered);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(pos) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let picked = {
			let mut guard = state_mu.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let clicked = s.drag.active && !s.drag.moved;
			s.drag.active = false;
			if !clicked {
				return;
			}
			s.pick(pos)
				.and_then(|id| s.layout.node(&id).map(|n| n.school.id.clone()))
		};
		match picked {
			Some(id) => store.toggle_selected(&id),
			None => store.selected.set(None),
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.hover(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.camera.zoom(if ev.delta_y() > 0.0 { 1.1 } else { 0.9 });
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="network-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
		<label class="network-hud chip" class:active=move || springs.get()>
			<input
				type="checkbox"
				prop:checked=move || springs.get()
				on:change=move |ev| springs.set(event_target_checked(&ev))
			/>
			"Pull linked schools together"
		</label>
	}
}
