use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::CanvasState;
use crate::engine::encoding::{BorderStyle, Emphasis, NodeShape};
use crate::engine::scene::{Frame, RenderEdge, RenderNode};

const BACKGROUND: &str = "#1a1a2e";
const BORDER: &str = "#f5f5f5";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(frame: Option<&Frame<'_>>, state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	let Some(frame) = frame else {
		return;
	};
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(frame, state, ctx);
	draw_nodes(frame, state, ctx);
	ctx.restore();
}

fn draw_edges(frame: &Frame<'_>, state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (dash, gap, arrow_size) = (8.0 / k, 4.0 / k, 6.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.highlight_t);

	for edge in &frame.edges {
		draw_edge(edge, ctx, dash, gap, dash_offset, arrow_size, t);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_global_alpha(1.0);
}

fn draw_edge(
	edge: &RenderEdge,
	ctx: &CanvasRenderingContext2d,
	dash: f64,
	gap: f64,
	dash_offset: f64,
	arrow_size: f64,
	t: f64,
) {
	let (x1, y1, x2, y2) = (edge.source.x, edge.source.y, edge.target.x, edge.target.y);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < edge.source_radius + edge.target_radius + 0.001 {
		return;
	}

	// dimming fades in with the hover transition instead of snapping
	let style = edge.style;
	let opacity = 1.0 - (1.0 - style.opacity) * t;
	ctx.set_global_alpha(opacity);
	ctx.set_stroke_style_str(style.color);
	ctx.set_line_width(style.width);
	if style.highlighted {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);
	} else {
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}

	let (ux, uy) = (dx / dist, dy / dist);
	ctx.begin_path();
	ctx.move_to(x1 + ux * edge.source_radius, y1 + uy * edge.source_radius);
	ctx.line_to(
		x2 - ux * (edge.target_radius + arrow_size),
		y2 - uy * (edge.target_radius + arrow_size),
	);
	ctx.stroke();

	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_fill_style_str(style.color);
	let (tip_x, tip_y) = (x2 - ux * edge.target_radius, y2 - uy * edge.target_radius);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
}

fn draw_nodes(frame: &Frame<'_>, state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let (t, k) = (ease_out_cubic(state.highlight_t), state.transform.k);

	// emphasized nodes last so they sit on top
	let emphasized = |n: &&RenderNode<'_>| {
		matches!(n.style.emphasis, Emphasis::Highlighted | Emphasis::Selected)
	};
	for node in frame.nodes.iter().filter(|n| !emphasized(n)) {
		draw_node(node, ctx, t, k);
	}
	for node in frame.nodes.iter().filter(emphasized) {
		draw_glow(node, ctx, t);
		draw_node(node, ctx, t, k);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_node(node: &RenderNode<'_>, ctx: &CanvasRenderingContext2d, t: f64, k: f64) {
	let style = node.style;
	let (x, y) = (node.position.x, node.position.y);
	let radius = style.size / 2.0;
	let alpha = match style.emphasis {
		Emphasis::Dimmed => 1.0 - (1.0 - style.opacity) * t,
		_ => style.opacity,
	};

	ctx.set_global_alpha(alpha);
	trace_shape(ctx, style.shape, x, y, radius);
	ctx.set_fill_style_str(style.color);
	ctx.fill();

	ctx.set_stroke_style_str(BORDER);
	ctx.set_line_width(style.border_width / k.max(0.5));
	match style.border_style {
		BorderStyle::Dashed => {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(3.0 / k),
				&JsValue::from_f64(2.0 / k),
			));
		}
		BorderStyle::Solid => {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}
	}
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	if !node.label.is_empty() {
		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.85));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(node.label, x + radius + 3.0, y + 3.0);
	}
}

fn draw_glow(node: &RenderNode<'_>, ctx: &CanvasRenderingContext2d, t: f64) {
	let (x, y) = (node.position.x, node.position.y);
	let radius = node.style.size / 2.0;
	let selected = node.style.emphasis == Emphasis::Selected;
	// selection glow does not depend on hover
	let strength = if selected { 1.0 } else { t };
	if strength <= 0.01 {
		return;
	}
	let glow_radius = radius * if selected { 2.6 } else { 1.4 + 0.8 * t };
	let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) else {
		return;
	};
	let alpha = if selected { 0.4 } else { 0.25 * strength };
	let _ = gradient.add_color_stop(0.0, &format!("rgba(0, 229, 255, {})", alpha));
	let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 240, 255, {})", alpha * 0.3));
	let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
	ctx.set_global_alpha(1.0);
	ctx.begin_path();
	let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}

fn trace_shape(ctx: &CanvasRenderingContext2d, shape: NodeShape, x: f64, y: f64, r: f64) {
	ctx.begin_path();
	match shape {
		NodeShape::Circle => {
			let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
		}
		NodeShape::Ellipse => {
			let _ = ctx.ellipse(x, y, r * 1.3, r * 0.8, 0.0, 0.0, 2.0 * PI);
		}
		NodeShape::RoundRectangle => {
			let (w, h, c) = (r * 1.1, r * 0.9, r * 0.35);
			ctx.move_to(x - w + c, y - h);
			let _ = ctx.arc_to(x + w, y - h, x + w, y + h, c);
			let _ = ctx.arc_to(x + w, y + h, x - w, y + h, c);
			let _ = ctx.arc_to(x - w, y + h, x - w, y - h, c);
			let _ = ctx.arc_to(x - w, y - h, x + w, y - h, c);
			ctx.close_path();
		}
		NodeShape::Diamond => {
			let d = r * 1.2;
			ctx.move_to(x, y - d);
			ctx.line_to(x + d, y);
			ctx.line_to(x, y + d);
			ctx.line_to(x - d, y);
			ctx.close_path();
		}
	}
}
