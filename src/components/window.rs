//! Browser callbacks owned by a mounted component and released with it.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::Event;

/// A listener on `window`, removed when dropped.
pub struct WindowListener {
	event: &'static str,
	callback: Closure<dyn FnMut(Event)>,
}

impl WindowListener {
	pub fn new(event: &'static str, handler: impl FnMut(Event) + 'static) -> Option<Self> {
		let window = web_sys::window()?;
		let callback = Closure::<dyn FnMut(Event)>::new(handler);
		window
			.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
			.ok()?;
		Some(Self { event, callback })
	}
}

impl Drop for WindowListener {
	fn drop(&mut self) {
		if let Some(window) = web_sys::window() {
			let _ = window
				.remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
		}
	}
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// `requestAnimationFrame` loop plus the resize listener of one canvas.
///
/// Dropping it cancels the pending frame, removes the listener and runs the teardown
/// hook. The frame closure holds a handle to its own slot; clearing that slot here is
/// what frees it.
#[derive(Default)]
pub struct FrameLoop {
	frame: FrameCallback,
	frame_id: Rc<Cell<Option<i32>>>,
	resize: RefCell<Option<WindowListener>>,
	teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl FrameLoop {
	pub fn on_resize(&self, mut handler: impl FnMut() + 'static) {
		*self.resize.borrow_mut() = WindowListener::new("resize", move |_| handler());
	}

	/// Runs once when the loop is dropped.
	pub fn on_teardown(&self, hook: impl FnOnce() + 'static) {
		*self.teardown.borrow_mut() = Some(Box::new(hook));
	}

	/// Call `tick` every animation frame with the elapsed seconds, capped at 0.1.
	pub fn start(&self, mut tick: impl FnMut(f32) + 'static) {
		let (frame, frame_id) = (self.frame.clone(), self.frame_id.clone());
		let mut last = js_sys::Date::now();
		*self.frame.borrow_mut() = Some(Closure::new(move || {
			let now = js_sys::Date::now();
			let dt = ((now - last) / 1000.0).clamp(0.0, 0.1) as f32;
			last = now;
			tick(dt);
			frame_id.set(request_frame(&frame));
		}));
		self.frame_id.set(request_frame(&self.frame));
	}
}

fn request_frame(frame: &FrameCallback) -> Option<i32> {
	let window = web_sys::window()?;
	let slot = frame.borrow();
	let callback = slot.as_ref()?;
	window
		.request_animation_frame(callback.as_ref().unchecked_ref())
		.ok()
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		if let (Some(window), Some(id)) = (web_sys::window(), self.frame_id.take()) {
			let _ = window.cancel_animation_frame(id);
		}
		self.resize.get_mut().take();
		self.frame.borrow_mut().take();
		if let Some(hook) = self.teardown.get_mut().take() {
			hook();
		}
		debug!("Frame loop stopped");
	}
}
