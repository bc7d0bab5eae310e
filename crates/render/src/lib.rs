//! Renderer handoff: per-frame synchronization of scene registries into a
//! render backend, plus a renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read front arrays only; they never mutate records.
//! - A kind's struct array is uploaded only in frames where that kind had
//!   dirty slots before the pass.
//! - Each kind is synchronized and uploaded under its registry's lock, so an
//!   upload never mixes two passes.

mod backend;
mod renderer;
mod sync;

pub use backend::{RecordingBackend, RenderBackend, RenderError, StructUpload};
pub use renderer::{DebugTextRenderer, RenderView, Renderer};
pub use sync::{FrameStats, SceneSync};

pub fn crate_info() -> &'static str {
    "prism-render v0.1.0"
}
