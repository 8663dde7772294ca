use leptos::prelude::*;
use log::{info, warn};

use crate::components::security_graph::SecurityGraphCanvas;
use crate::engine::EngineConfig;

/// Graph API endpoint baked in at build time; the sample topology is shown
/// when unset.
const GRAPH_API_URL: Option<&str> = option_env!("GRAPH_API_URL");
/// Optional JSON engine configuration baked in at build time.
const GRAPH_ENGINE_CONFIG: Option<&str> = option_env!("GRAPH_ENGINE_CONFIG");

fn engine_config() -> EngineConfig {
	match GRAPH_ENGINE_CONFIG.map(EngineConfig::from_json) {
		None => EngineConfig::default(),
		Some(Ok(config)) => {
			info!("using configured engine settings");
			config
		}
		Some(Err(e)) => {
			warn!("ignoring GRAPH_ENGINE_CONFIG: {e}");
			EngineConfig::default()
		}
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let endpoint = GRAPH_API_URL.map(str::to_string);
	let subtitle = match &endpoint {
		Some(url) => format!("Live topology from {url}"),
		None => "Sample topology (set GRAPH_API_URL to connect a backend)".to_string(),
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<SecurityGraphCanvas endpoint=endpoint config=engine_config() fullscreen=true />
				<div class="graph-overlay">
					<h1>"Security Graph"</h1>
					<p class="subtitle">{subtitle}</p>
					<p class="subtitle">"Hover to trace connections. Click a node for details. Drag to reposition, scroll to zoom."</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
