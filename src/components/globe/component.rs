use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use leptos::prelude::*;
use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::{GlobeState, Hit};
use crate::components::soundtrack::{AnalyserFeed, AudioSource, use_audio};
use crate::components::window::FrameLoop;
use crate::schools::School;
use crate::store::use_view_store;

/// Seconds between HUD refreshes.
const HUD_INTERVAL: f32 = 0.25;

fn window_size(window: &Window) -> (f64, f64) {
	let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0);
	let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0);
	(w, h)
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Vec2> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Vec2::new(
		(ev.client_x() as f64 - rect.left()) as f32,
		(ev.client_y() as f64 - rect.top()) as f32,
	))
}

fn format_coordinate((lat, lng): (f32, f32)) -> String {
	let ns = if lat >= 0.0 { 'N' } else { 'S' };
	let ew = if lng >= 0.0 { 'E' } else { 'W' };
	format!("{:.1}°{ns} {:.1}°{ew}", lat.abs(), lng.abs())
}

/// Full-window globe with clustered school markers.
#[component]
pub fn SchoolGlobe() -> impl IntoView {
	let store = use_view_store();
	let audio = use_audio().with_value(AudioSource::clone);
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<GlobeState>>> = Rc::new(RefCell::new(None));
	let frames = StoredValue::new_local(FrameLoop::default());
	on_cleanup(move || frames.dispose());
	let overlay = RwSignal::new(Vec::<School>::new());
	let nearby = RwSignal::new(Vec::<School>::new());
	let center = RwSignal::new(String::new());
	let in_view = RwSignal::new(0usize);

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
		let mut globe = GlobeState::new(&schools, w as f32, h as f32, Box::new(feed));
		globe.auto_rotate = untrack(|| store.auto_rotate.get());
		*state_init.borrow_mut() = Some(globe);

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
				if let Some(mut globe) = state_down.borrow_mut().take() {
					globe.shutdown();
				}
			});

			let mut since_hud = HUD_INTERVAL;
			frames.start(move |dt| {
				let mut guard = state_anim.borrow_mut();
				let Some(s) = guard.as_mut() else {
					return;
				};
				s.tick(dt);
				render::render(s, &ctx);
				since_hud += dt;
				if since_hud >= HUD_INTERVAL {
					since_hud = 0.0;
					center.set(format_coordinate(s.center_coordinate()));
					in_view.set(s.schools_in_view());
				}
			});
		});
	});

	let state_filter = state.clone();
	Effect::new(move |_| {
		let schools = store.visible_schools();
		if let Some(ref mut s) = *state_filter.borrow_mut() {
			s.set_schools(&schools);
		}
		store.open_cluster.set(None);
	});

	Effect::new(move |_| {
		if store.open_cluster.get().is_none() {
			overlay.set(Vec::new());
		}
	});

	let state_rotate = state.clone();
	Effect::new(move |_| {
		let on = store.auto_rotate.get();
		if let Some(ref mut s) = *state_rotate.borrow_mut() {
			s.auto_rotate = on;
		}
	});

	let state_select = state.clone();
	Effect::new(move |_| {
		let selected = store.selected_school();
		let mut guard = state_select.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		s.sync_selection(selected.as_ref().map(|school| school.id.as_str()));
		nearby.set(selected.as_ref().map(|school| s.nearby(school)).unwrap_or_default());
		if let Some(school) = &selected {
			s.focus(school.lat, school.lng);
			store.auto_rotate.set(false);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(pos) = pointer(canvas_ref, &ev) else {
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
		let Some(pos) = pointer(canvas_ref, &ev) else {
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
		let hovered = match s.pick(pos) {
			Some(Hit::Marker(id)) => Some(id),
			_ => None,
		};
		if hovered != s.engine.interaction().hovered {
			s.hover(hovered.clone());
			store.hovered.set(hovered);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(pos) = pointer(canvas_ref, &ev) else {
			return;
		};
		let hit = {
			let mut guard = state_mu.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			let clicked = s.drag.active && !s.drag.moved;
			s.drag.active = false;
			if !clicked {
				return;
			}
			let hit = s.pick(pos);
			if let Some(Hit::Cluster(id)) = &hit {
				overlay.set(s.engine.cluster_members(id).into_iter().cloned().collect());
			}
			hit
		};
		// Store updates run effects that borrow the state again.
		match hit {
			Some(Hit::Marker(id)) => store.toggle_selected(&id),
			Some(Hit::Cluster(id)) => store.open_cluster.set(Some(id)),
			None => store.open_cluster.set(None),
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.drag.active = false;
			s.hover(None);
		}
		store.hovered.set(None);
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.camera.zoom(if ev.delta_y() > 0.0 { 1.1 } else { 0.9 });
		}
	};

	let on_pick = Callback::new(move |school: School| {
		store.selected.set(Some(school.id));
	});
	let on_close = Callback::new(move |_: ()| store.open_cluster.set(None));
	let hovered_name = move || {
		let id = store.hovered.get()?;
		store
			.schools
			.with(|all| all.iter().find(|s| s.id == id).map(|s| s.name.clone()))
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="globe-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
		<div class="globe-hud">
			<span>{move || center.get()}</span>
			<span>{move || format!("{} in view", in_view.get())}</span>
			<span class="hovered">{hovered_name}</span>
			<span class="hint">
				{move || if store.auto_rotate.get() { "R: stop rotation" } else { "R: rotate" }}
			</span>
		</div>
		<Show when=move || !nearby.with(Vec::is_empty)>
			<div class="nearby">
				<h4>"Nearby"</h4>
				<ul>
					<For
						each=move || nearby.get()
						key=|school| school.id.clone()
						children=move |school| {
							let id = school.id.clone();
							view! {
								<li on:click=move |_| store.selected.set(Some(id.clone()))>
									{school.name}
								</li>
							}
						}
					/>
				</ul>
			</div>
		</Show>
		<ClusterOverlay members=overlay on_pick=on_pick on_close=on_close />
	}
}

/// Lists the schools inside an expanded cluster.
#[component]
fn ClusterOverlay(
	#[prop(into)] members: Signal<Vec<School>>,
	on_pick: Callback<School>,
	on_close: Callback<()>,
) -> impl IntoView {
	view! {
		<Show when=move || !members.with(Vec::is_empty)>
			<div class="cluster-overlay">
				<div class="cluster-overlay-header">
					<h3>{move || format!("{} schools", members.with(Vec::len))}</h3>
					<button on:click=move |_| on_close.run(())>"×"</button>
				</div>
				<ul>
					<For
						each=move || members.get()
						key=|school| school.id.clone()
						children=move |school| {
							let picked = school.clone();
							view! {
								<li on:click=move |_| on_pick.run(picked.clone())>
									<strong>{school.name}</strong>
									<span>{school.city.unwrap_or_default()}</span>
									<span class="kind">{school.kind.label()}</span>
								</li>
							}
						}
					/>
				</ul>
			</div>
		</Show>
	}
}
