//! Developer tooling: a read-only scene inspector.
//!
//! # Invariants
//! - Inspection never mutates records or dirty state.

mod inspector;

pub use inspector::{KindSummary, SceneInspector, SceneSummary};

pub fn crate_info() -> &'static str {
    "prism-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
