//! Rendering-agnostic core: graph model, visual encoding, layout,
//! interaction and refresh. Nothing in here touches the DOM except the
//! HTTP graph source.

/// Engine configuration.
pub mod config;
/// Attribute-to-style rules.
pub mod encoding;
/// Errors and data-quality warnings.
pub mod error;
/// Hover and selection.
pub mod interaction;
/// Node placement strategies.
pub mod layout;
/// Normalized graph snapshot.
pub mod model;
/// Refresh state machine.
pub mod refresh;
/// Loaded snapshot plus layout and styles.
pub mod scene;
/// Graph data sources.
pub mod source;
/// Graph API wire format.
pub mod wire;

pub use config::EngineConfig;
pub use error::{ConfigError, GraphError, GraphWarning};
pub use layout::{LayoutKind, Position, Viewport};
pub use model::{GraphSnapshot, build_graph_model};
pub use refresh::{RefreshController, RefreshStatus, ViewStatus, refresh};
pub use scene::{Frame, Scene};
pub use source::{DemoGraphSource, GraphSource, HttpGraphSource};
