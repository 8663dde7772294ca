use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::Window;

type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// A running animation loop plus the listeners it installed.
///
/// Dropping the session cancels the pending frame, removes every listener
/// and breaks the closure's self-reference so nothing outlives the view.
pub struct RenderSession {
	window: Window,
	frame: FrameClosure,
	frame_id: Rc<Cell<Option<i32>>>,
	resize: Option<Closure<dyn FnMut()>>,
	interval: Option<(i32, Closure<dyn FnMut()>)>,
}

impl RenderSession {
	/// Call `on_frame` once per animation frame until dropped.
	pub fn start(window: Window, mut on_frame: impl FnMut() + 'static) -> Result<Self, JsValue> {
		let frame: FrameClosure = Rc::new(RefCell::new(None));
		let frame_id = Rc::new(Cell::new(None));

		let (frame_inner, id_inner) = (frame.clone(), frame_id.clone());
		*frame.borrow_mut() = Some(Closure::new(move || {
			on_frame();
			let Some(window) = web_sys::window() else {
				return;
			};
			if let Some(ref cb) = *frame_inner.borrow() {
				id_inner.set(
					window
						.request_animation_frame(cb.as_ref().unchecked_ref())
						.ok(),
				);
			}
		}));
		if let Some(ref cb) = *frame.borrow() {
			frame_id.set(Some(
				window.request_animation_frame(cb.as_ref().unchecked_ref())?,
			));
		}

		Ok(Self {
			window,
			frame,
			frame_id,
			resize: None,
			interval: None,
		})
	}

	/// Run `handler` on every window resize while the session lives.
	pub fn on_resize(&mut self, handler: impl FnMut() + 'static) -> Result<(), JsValue> {
		let cb = Closure::<dyn FnMut()>::new(handler);
		self.window
			.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())?;
		self.remove_resize();
		self.resize = Some(cb);
		Ok(())
	}

	/// Run `handler` every `ms` milliseconds while the session lives.
	pub fn every(&mut self, ms: u32, handler: impl FnMut() + 'static) -> Result<(), JsValue> {
		let cb = Closure::<dyn FnMut()>::new(handler);
		let id = self
			.window
			.set_interval_with_callback_and_timeout_and_arguments_0(
				cb.as_ref().unchecked_ref(),
				ms.min(i32::MAX as u32) as i32,
			)?;
		self.clear_interval();
		self.interval = Some((id, cb));
		Ok(())
	}

	fn remove_resize(&mut self) {
		if let Some(cb) = self.resize.take() {
			let _ = self
				.window
				.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}
	}

	fn clear_interval(&mut self) {
		if let Some((id, _cb)) = self.interval.take() {
			self.window.clear_interval_with_handle(id);
		}
	}
}

impl Drop for RenderSession {
	fn drop(&mut self) {
		if let Some(id) = self.frame_id.take() {
			let _ = self.window.cancel_animation_frame(id);
		}
		self.remove_resize();
		self.clear_interval();
		self.frame.borrow_mut().take();
		debug!("render session stopped");
	}
}
