//! Component registry: fixed-capacity, name-addressable component tables with
//! dirty tracking and a parallel array of render structs.
//!
//! One `Registry<T>` exists per component kind. Callers create, look up and
//! mutate records by name or handle; once per frame the renderer runs
//! `update_components` and reads the front struct array.
//!
//! # Invariants
//! - A name maps to slot `i` iff slot `i` holds a live record with that name.
//! - Capacity is fixed at `initialize_factory`; slot indices never move.
//! - Every created, mutated or removed slot is dirty until the next pass.
//! - Render structs are written only by the synchronization pass.
//! - Every operation holds the registry's re-entrant lock for its full duration.

mod component;
mod error;
mod registry;

pub use component::{Component, ComponentMeta, Handle};
pub use error::RegistryError;
pub use registry::{Registry, RegistryGuard};

pub fn crate_info() -> &'static str {
    "prism-registry v0.1.0"
}
