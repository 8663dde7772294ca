mod component;
mod render;
mod session;
mod state;

pub use component::SecurityGraphCanvas;
