use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Window,
};

use super::render;
use super::session::RenderSession;
use super::state::{CanvasState, FRAME_DT};
use crate::engine::interaction::NodeDetail;
use crate::engine::{
	DemoGraphSource, EngineConfig, GraphError, GraphSource, HttpGraphSource, RefreshController,
	RefreshStatus, ViewStatus, Viewport, refresh,
};
use crate::engine::wire::GraphResponse;

/// Node count of the built-in topology used when no endpoint is given.
const DEMO_NODES: usize = 60;
/// Pointer travel, in pixels, below which a background press is a click.
const CLICK_SLOP: f64 = 3.0;

enum Source {
	Http(HttpGraphSource),
	Demo(DemoGraphSource),
}

impl GraphSource for Source {
	async fn fetch_graph(&self) -> Result<GraphResponse, GraphError> {
		match self {
			Source::Http(source) => source.fetch_graph().await,
			Source::Demo(source) => source.fetch_graph().await,
		}
	}
}

type Shared<T> = Rc<RefCell<T>>;

/// Everything the view owns that must be released on unmount.
struct Live {
	controller: Shared<RefreshController>,
	session: Shared<Option<RenderSession>>,
}

impl Live {
	fn teardown(&self) {
		self.session.borrow_mut().take();
		self.controller.borrow_mut().dispose();
	}
}

/// Interactive canvas view of a security graph API.
///
/// Fetches on mount, and again on Retry or on the configured polling
/// interval. Every fetch replaces the previous graph entirely.
#[component]
pub fn SecurityGraphCanvas(
	/// Graph API URL; a built-in sample topology is shown when absent.
	#[prop(default = None)]
	endpoint: Option<String>,
	#[prop(default = EngineConfig::default())] config: EngineConfig,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let status = RwSignal::new(ViewStatus::default());
	let detail = RwSignal::new(None::<NodeDetail>);
	let refresh_requests = RwSignal::new(0u64);

	let interval = config.refresh_interval_ms;
	let source = Rc::new(match endpoint {
		Some(url) => Source::Http(HttpGraphSource::new(url)),
		None => Source::Demo(DemoGraphSource::new(DEMO_NODES)),
	});
	let viewport = Viewport::new(width.unwrap_or(800.0), height.unwrap_or(600.0));
	let controller: Shared<RefreshController> =
		Rc::new(RefCell::new(RefreshController::new(config, viewport)));
	let canvas: Shared<CanvasState> = Rc::new(RefCell::new(CanvasState::new(
		viewport.width,
		viewport.height,
	)));
	let session: Shared<Option<RenderSession>> = Rc::new(RefCell::new(None));

	let live = StoredValue::new_local(Live {
		controller: controller.clone(),
		session: session.clone(),
	});
	on_cleanup(move || {
		live.try_with_value(Live::teardown);
	});

	let (fetch_ctrl, fetch_canvas) = (controller.clone(), canvas.clone());
	Effect::new(move |_| {
		refresh_requests.track();
		let (ctrl, view, source) = (fetch_ctrl.clone(), fetch_canvas.clone(), source.clone());
		wasm_bindgen_futures::spawn_local(async move {
			status.set(ViewStatus {
				status: RefreshStatus::Loading,
				..ViewStatus::default()
			});
			detail.set(None);
			view.borrow_mut().cancel_gestures();
			if refresh(&ctrl, &*source).await {
				// a gesture started on the loading screen targets no node
				view.borrow_mut().cancel_gestures();
				status.set(ctrl.borrow().view_status());
			}
		});
	});

	let (mount_ctrl, mount_canvas, mount_session) =
		(controller.clone(), canvas.clone(), session.clone());
	Effect::new(move |_| {
		let Some(el) = canvas_ref.get() else {
			return;
		};
		let el: HtmlCanvasElement = el.into();
		let Some(window) = web_sys::window() else {
			error!("no window; graph canvas not started");
			return;
		};
		let (w, h) = if fullscreen {
			window_size(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					el.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					el.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		el.set_width(w as u32);
		el.set_height(h as u32);
		mount_canvas.borrow_mut().resize(w, h);
		mount_ctrl.borrow_mut().set_viewport(Viewport::new(w, h));

		let ctx: CanvasRenderingContext2d = match el
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("2d canvas context unavailable");
				return;
			}
		};

		let (frame_ctrl, frame_canvas) = (mount_ctrl.clone(), mount_canvas.clone());
		let started = RenderSession::start(window.clone(), move || {
			let mut view = frame_canvas.borrow_mut();
			view.tick(FRAME_DT);
			let mut ctrl = frame_ctrl.borrow_mut();
			if let Some(scene) = ctrl.scene_mut() {
				if !scene.is_settled() {
					scene.tick();
				}
			}
			let frame = ctrl.scene().map(|scene| scene.frame());
			render::render(frame.as_ref(), &view, &ctx);
		});
		let mut new_session = match started {
			Ok(s) => s,
			Err(e) => {
				error!("failed to start render loop: {e:?}");
				return;
			}
		};

		if fullscreen {
			let (resize_ctrl, resize_canvas, resize_el) =
				(mount_ctrl.clone(), mount_canvas.clone(), el.clone());
			let resized = new_session.on_resize(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&win);
				resize_el.set_width(nw as u32);
				resize_el.set_height(nh as u32);
				resize_canvas.borrow_mut().resize(nw, nh);
				resize_ctrl.borrow_mut().set_viewport(Viewport::new(nw, nh));
			});
			if let Err(e) = resized {
				warn!("resize listener not installed: {e:?}");
			}
		}
		if let Some(ms) = interval {
			let polled = new_session.every(ms, move || {
				refresh_requests.update(|n| *n += 1);
			});
			if let Err(e) = polled {
				warn!("polling not started: {e:?}");
			}
		}

		// replacing an earlier session drops it, which stops its loop
		*mount_session.borrow_mut() = Some(new_session);
	});

	let (md_ctrl, md_canvas) = (controller.clone(), canvas.clone());
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) {
			pointer_down(&md_ctrl, &md_canvas, x, y, detail);
		}
	};

	let (mm_ctrl, mm_canvas) = (controller.clone(), canvas.clone());
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) {
			pointer_move(&mm_ctrl, &mm_canvas, x, y, true);
		}
	};

	let (mu_ctrl, mu_canvas) = (controller.clone(), canvas.clone());
	let on_mouseup = move |ev: MouseEvent| {
		let point = local_point(canvas_ref, ev.client_x(), ev.client_y());
		pointer_up(&mu_ctrl, &mu_canvas, point, detail);
	};

	let (ml_ctrl, ml_canvas) = (controller.clone(), canvas.clone());
	let on_mouseleave = move |_: MouseEvent| {
		pointer_up(&ml_ctrl, &ml_canvas, None, detail);
		if let Some(scene) = ml_ctrl.borrow_mut().scene_mut() {
			scene.hover_index(None);
		}
		ml_canvas.borrow_mut().set_hover_active(false);
	};

	let wh_canvas = canvas.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) {
			wh_canvas.borrow_mut().zoom_at(x, y, ev.delta_y() <= 0.0);
		}
	};

	let (ts_ctrl, ts_canvas) = (controller.clone(), canvas.clone());
	let on_touchstart = move |ev: TouchEvent| {
		let Some(touch) = ev.touches().get(0) else {
			return;
		};
		ev.prevent_default();
		if let Some((x, y)) = local_point(canvas_ref, touch.client_x(), touch.client_y()) {
			pointer_down(&ts_ctrl, &ts_canvas, x, y, detail);
		}
	};

	let (tm_ctrl, tm_canvas) = (controller.clone(), canvas.clone());
	let on_touchmove = move |ev: TouchEvent| {
		let Some(touch) = ev.touches().get(0) else {
			return;
		};
		ev.prevent_default();
		if let Some((x, y)) = local_point(canvas_ref, touch.client_x(), touch.client_y()) {
			pointer_move(&tm_ctrl, &tm_canvas, x, y, false);
		}
	};

	let (te_ctrl, te_canvas) = (controller.clone(), canvas.clone());
	let on_touchend = move |ev: TouchEvent| {
		let point = ev
			.changed_touches()
			.get(0)
			.and_then(|t| local_point(canvas_ref, t.client_x(), t.client_y()));
		pointer_up(&te_ctrl, &te_canvas, point, detail);
	};

	view! {
		<div class="security-graph">
			<canvas
				node_ref=canvas_ref
				class="security-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:touchstart=on_touchstart
				on:touchmove=on_touchmove
				on:touchend=on_touchend
				style="display: block; cursor: grab; touch-action: none;"
			/>
			<StatusOverlay status=status refresh_requests=refresh_requests />
			<DetailPanel detail=detail />
		</div>
	}
}

#[component]
fn StatusOverlay(status: RwSignal<ViewStatus>, refresh_requests: RwSignal<u64>) -> impl IntoView {
	move || {
		let current = status.get();
		match current.status {
			RefreshStatus::Idle => ().into_any(),
			RefreshStatus::Loading => view! {
				<div class="graph-status loading">"Loading security graph..."</div>
			}
			.into_any(),
			RefreshStatus::Error => {
				let message = current.error.unwrap_or_default();
				let class = format!("graph-status error {}", current.error_kind.unwrap_or(""));
				view! {
					<div class=class>
						<p>{message}</p>
						<button on:click=move |_| refresh_requests.update(|n| *n += 1)>"Retry"</button>
					</div>
				}
				.into_any()
			}
			RefreshStatus::Ready => {
				let Some(stats) = current.stats else {
					return ().into_any();
				};
				view! {
					<div class="graph-status ready">
						<span>{format!("{} nodes", stats.nodes)}</span>
						<span>{format!("{} edges", stats.edges)}</span>
						<span>{format!("{} anomalous", stats.anomalous_nodes)}</span>
						<span>{format!("{} high risk", stats.high_risk_nodes)}</span>
						<span>{format!("{} CVEs", stats.total_cves)}</span>
						<span>{format!("avg risk {:.1}", stats.avg_risk)}</span>
						{(current.warnings > 0)
							.then(|| view! { <span class="warnings">{format!("{} warnings", current.warnings)}</span> })}
						<button on:click=move |_| refresh_requests.update(|n| *n += 1)>"Refresh"</button>
					</div>
				}
				.into_any()
			}
		}
	}
}

#[component]
fn DetailPanel(detail: RwSignal<Option<NodeDetail>>) -> impl IntoView {
	move || {
		detail.get().map(|d| {
			let cves = if d.cve_ids.is_empty() {
				"none".to_string()
			} else {
				d.cve_ids.join(", ")
			};
			view! {
				<aside class="graph-detail">
					<h2>{d.name}</h2>
					<dl>
						<dt>"ID"</dt><dd>{d.id}</dd>
						<dt>"Type"</dt><dd>{d.kind}</dd>
						<dt>"Platform"</dt><dd>{d.platform}</dd>
						<dt>"Risk score"</dt><dd>{format!("{:.1}", d.risk_score)}</dd>
						<dt>"Anomaly"</dt><dd>{if d.is_anomaly { "yes" } else { "no" }}</dd>
						<dt>"Connections"</dt><dd>{d.degree}</dd>
						<dt>{format!("CVEs ({})", d.cve_count)}</dt><dd>{cves}</dd>
					</dl>
				</aside>
			}
		})
	}
}

fn window_size(window: &Window) -> (f64, f64) {
	(
		window
			.inner_width()
			.ok()
			.and_then(|v| v.as_f64())
			.unwrap_or(800.0),
		window
			.inner_height()
			.ok()
			.and_then(|v| v.as_f64())
			.unwrap_or(600.0),
	)
}

fn local_point(
	canvas_ref: NodeRef<leptos::html::Canvas>,
	client_x: i32,
	client_y: i32,
) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get_untracked()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((client_x as f64 - rect.left(), client_y as f64 - rect.top()))
}

fn pointer_down(
	controller: &RefCell<RefreshController>,
	canvas: &RefCell<CanvasState>,
	x: f64,
	y: f64,
	detail: RwSignal<Option<NodeDetail>>,
) {
	let mut view = canvas.borrow_mut();
	let mut ctrl = controller.borrow_mut();
	let (gx, gy) = view.screen_to_graph(x, y);
	let hit = ctrl.scene_mut().and_then(|scene| {
		let idx = scene.node_at(gx, gy)?;
		scene.begin_drag(idx);
		scene.select_index(Some(idx));
		Some((idx, scene.positions()[idx], scene.detail()))
	});

	match hit {
		Some((idx, start, selected)) => {
			view.drag.active = true;
			view.drag.node_idx = Some(idx);
			view.drag.start_x = x;
			view.drag.start_y = y;
			view.drag.node_start = start;
			detail.set(selected);
		}
		None => {
			view.pan.active = true;
			view.pan.start_x = x;
			view.pan.start_y = y;
			view.pan.transform_start_x = view.transform.x;
			view.pan.transform_start_y = view.transform.y;
		}
	}
}

fn pointer_move(
	controller: &RefCell<RefreshController>,
	canvas: &RefCell<CanvasState>,
	x: f64,
	y: f64,
	track_hover: bool,
) {
	let mut view = canvas.borrow_mut();
	let mut ctrl = controller.borrow_mut();
	let Some(scene) = ctrl.scene_mut() else {
		return;
	};

	if view.drag.active {
		if let Some(idx) = view.drag.node_idx {
			let k = view.transform.k;
			let start = view.drag.node_start;
			scene.drag_to(
				idx,
				start.x + (x - view.drag.start_x) / k,
				start.y + (y - view.drag.start_y) / k,
			);
		}
	} else if view.pan.active {
		view.transform.x = view.pan.transform_start_x + (x - view.pan.start_x);
		view.transform.y = view.pan.transform_start_y + (y - view.pan.start_y);
	} else if track_hover {
		let (gx, gy) = view.screen_to_graph(x, y);
		let hovered = scene.node_at(gx, gy);
		scene.hover_index(hovered);
		view.set_hover_active(hovered.is_some());
	}
}

fn pointer_up(
	controller: &RefCell<RefreshController>,
	canvas: &RefCell<CanvasState>,
	point: Option<(f64, f64)>,
	detail: RwSignal<Option<NodeDetail>>,
) {
	let mut view = canvas.borrow_mut();
	let mut ctrl = controller.borrow_mut();
	if let (Some(idx), Some(scene)) = (view.drag.node_idx, ctrl.scene_mut()) {
		scene.end_drag(idx);
	}
	if view.pan.active {
		let clicked = point.is_some_and(|(x, y)| {
			(x - view.pan.start_x).hypot(y - view.pan.start_y) < CLICK_SLOP
		});
		if clicked {
			if let Some(scene) = ctrl.scene_mut() {
				scene.select_index(None);
			}
			detail.set(None);
		}
	}
	view.drag = Default::default();
	view.pan.active = false;
}
